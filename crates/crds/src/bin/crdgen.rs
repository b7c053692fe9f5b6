//! Prints the CRD manifests for all metal-operator resources as a
//! multi-document YAML stream, suitable for `kubectl apply -f -`.

use anyhow::Result;
use crds::{Device, SpotMarketRequest, VirtualNetwork};
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let crds = [
        serde_yaml::to_string(&Device::crd())?,
        serde_yaml::to_string(&VirtualNetwork::crd())?,
        serde_yaml::to_string(&SpotMarketRequest::crd())?,
    ];
    print!("{}", crds.join("---\n"));
    Ok(())
}
