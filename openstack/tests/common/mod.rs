//! Shared fixtures: a mockito server standing in for Keystone and the services

#![allow(dead_code)]

use mockito::{Mock, ServerGuard};
use openstack::config::Environment;
use openstack::OpenStackProvider;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use tfplug::types::{Dynamic, DynamicValue};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

pub const TOKEN: &str = "tok-1";

pub type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

/// Keystone token body whose catalog points every service at `base`
pub fn token_body(base: &str) -> String {
    serde_json::json!({
        "token": {
            "expires_at": "2099-01-01T00:00:00.000000Z",
            "project": { "id": "p-1" },
            "catalog": [
                {
                    "type": "workflowv2",
                    "name": "mistral",
                    "endpoints": [
                        { "interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": format!("{}/workflow/v2", base) }
                    ]
                },
                {
                    "type": "network",
                    "name": "neutron",
                    "endpoints": [
                        { "interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": format!("{}/network", base) }
                    ]
                },
                {
                    "type": "volumev3",
                    "name": "cinderv3",
                    "endpoints": [
                        { "interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": format!("{}/volume/v3/p-1", base) }
                    ]
                }
            ]
        }
    })
    .to_string()
}

fn keystone(server: &mut ServerGuard) -> mockito::Mock {
    let body = token_body(&server.url());
    server
        .mock("POST", "/v3/auth/tokens")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_header("X-Subject-Token", TOKEN)
        .with_body(body)
}

/// Token endpoint issuing `TOKEN` for every login
pub async fn mock_keystone(server: &mut ServerGuard) -> Mock {
    keystone(server).create_async().await
}

/// Token endpoint that must be hit exactly `hits` times
pub async fn mock_keystone_times(server: &mut ServerGuard, hits: usize) -> Mock {
    keystone(server).expect(hits).create_async().await
}

pub fn object(pairs: &[(&str, Dynamic)]) -> DynamicValue {
    let map: HashMap<String, Dynamic> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    DynamicValue::new(Dynamic::Map(map))
}

pub fn string(value: &str) -> Dynamic {
    Dynamic::String(value.to_string())
}

/// Provider block for a password login against `server`
pub fn provider_config(server: &ServerGuard, extra: &[(&str, Dynamic)]) -> DynamicValue {
    let mut pairs = vec![
        ("auth_url", string(&format!("{}/v3", server.url()))),
        ("user_name", string("admin")),
        ("password", string("secret")),
        ("tenant_name", string("demo")),
        ("region", string("RegionOne")),
    ];
    pairs.extend(extra.iter().cloned());
    object(&pairs)
}

pub async fn configure_provider(config: DynamicValue) -> (OpenStackProvider, ProviderData) {
    let mut provider = OpenStackProvider::with_environment(Environment::default());
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    (provider, response.provider_data)
}

pub async fn resource(
    provider: &OpenStackProvider,
    data: &ProviderData,
    type_name: &str,
) -> Box<dyn ResourceWithConfigure> {
    let factory = provider.resources()[type_name];
    let mut resource = factory();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: data.clone(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

pub async fn data_source(
    provider: &OpenStackProvider,
    data: &ProviderData,
    type_name: &str,
) -> Box<dyn DataSourceWithConfigure> {
    let factory = provider.data_sources()[type_name];
    let mut data_source = factory();
    let response = data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: data.clone(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    data_source
}

/// Read one HTTP/1.1 request off a raw socket and return its method and
/// path. The body, if any, is consumed so the peer never sees a reset.
pub async fn read_request(socket: &mut TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body_read = buf.len() - head_end;
    while body_read < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    Some((method, path))
}

/// Raw HTTP/1.1 response that closes the connection
pub fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}
