//! Integration tests for the provider API client
//!
//! These tests run against the live provider API.
//! Set METAL_API_URL, METAL_AUTH_TOKEN, and METAL_PROJECT_ID to run.

use metal_client::MetalClient;

fn client_from_env() -> MetalClient {
    let url = std::env::var("METAL_API_URL")
        .unwrap_or_else(|_| "https://api.equinix.com/metal/v1".to_string());
    let token =
        std::env::var("METAL_AUTH_TOKEN").expect("METAL_AUTH_TOKEN environment variable must be set");
    MetalClient::new(url, token).expect("Failed to create client")
}

fn project_from_env() -> String {
    std::env::var("METAL_PROJECT_ID").expect("METAL_PROJECT_ID environment variable must be set")
}

#[tokio::test]
#[ignore] // Requires provider API access
async fn test_validate_token() {
    let client = client_from_env();
    client.validate_token().await.expect("Token validation failed");
}

#[tokio::test]
#[ignore]
async fn test_list_devices() {
    let client = client_from_env();
    let project = project_from_env();

    let devices = client
        .list_devices(&project, &[], false)
        .await
        .expect("Failed to list devices");

    println!("Found {} devices", devices.len());
}

#[tokio::test]
#[ignore]
async fn test_list_virtual_networks() {
    let client = client_from_env();
    let project = project_from_env();

    let vnets = client
        .list_virtual_networks(&project)
        .await
        .expect("Failed to list virtual networks");

    println!("Found {} virtual networks", vnets.len());
}
