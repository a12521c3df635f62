//! Block storage volumes and the snapshot data source

mod common;

use common::*;
use mockito::{Matcher, Server};
use tfplug::context::Context;
use tfplug::data_source::ReadDataSourceRequest;
use tfplug::resource::{CreateResourceRequest, UpdateResourceRequest};
use tfplug::types::{Dynamic, DynamicValue};

const VOLUME: &str = "openstack_blockstorage_volume_v3";
const SNAPSHOT: &str = "openstack_blockstorage_snapshot_v3";

fn volume_body(status: &str, size: i64) -> String {
    named_volume_body("data", status, size)
}

fn named_volume_body(name: &str, status: &str, size: i64) -> String {
    serde_json::json!({
        "volume": {
            "id": "vol-1",
            "status": status,
            "size": size,
            "name": name,
            "volume_type": "lvmdriver-1",
            "availability_zone": "nova",
            "metadata": {}
        }
    })
    .to_string()
}

fn attr(state: &DynamicValue, name: &str) -> Option<Dynamic> {
    match &state.value {
        Dynamic::Map(map) => map.get(name).cloned(),
        _ => None,
    }
}

fn volume_state(size: f64) -> DynamicValue {
    object(&[
        ("id", string("vol-1")),
        ("region", string("RegionOne")),
        ("name", string("data")),
        ("size", Dynamic::Number(size)),
    ])
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_create_waits_for_available() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let created = server
        .mock("POST", "/volume/v3/p-1/volumes")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "volume": { "size": 1, "name": "data" }
        })))
        .with_status(202)
        .with_body(volume_body("creating", 1))
        .expect(1)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/volume/v3/p-1/volumes/vol-1")
        .with_status(200)
        .with_body(volume_body("available", 1))
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, VOLUME).await;

    let config = object(&[("size", Dynamic::Number(1.0)), ("name", string("data"))]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: VOLUME.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.new_state, "id"), Some(string("vol-1")));
    assert_eq!(attr(&response.new_state, "status"), Some(string("available")));
    assert_eq!(attr(&response.new_state, "availability_zone"), Some(string("nova")));
    created.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_error_status_keeps_identifier() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let _created = server
        .mock("POST", "/volume/v3/p-1/volumes")
        .with_status(202)
        .with_body(volume_body("creating", 1))
        .create_async()
        .await;
    let _failed = server
        .mock("GET", "/volume/v3/p-1/volumes/vol-1")
        .with_status(200)
        .with_body(volume_body("error", 1))
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, VOLUME).await;

    let config = object(&[("size", Dynamic::Number(1.0))]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: VOLUME.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("Unexpected status"));
    assert_eq!(attr(&response.new_state, "id"), Some(string("vol-1")));
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_grows_in_place() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let extended = server
        .mock("POST", "/volume/v3/p-1/volumes/vol-1/action")
        .match_body(Matcher::Json(serde_json::json!({ "os-extend": { "new_size": 2 } })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;
    let renamed = server
        .mock("PUT", "/volume/v3/p-1/volumes/vol-1")
        .expect(0)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/volume/v3/p-1/volumes/vol-1")
        .with_status(200)
        .with_body(volume_body("available", 2))
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, VOLUME).await;

    let planned = volume_state(2.0);
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: VOLUME.to_string(),
                prior_state: volume_state(1.0),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.new_state, "size"), Some(Dynamic::Number(2.0)));
    extended.assert_async().await;
    renamed.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn volume_cannot_shrink() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let extended = server
        .mock("POST", "/volume/v3/p-1/volumes/vol-1/action")
        .expect(0)
        .create_async()
        .await;
    let renamed = server
        .mock("PUT", "/volume/v3/p-1/volumes/vol-1")
        .expect(0)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, VOLUME).await;

    let mut planned = volume_state(1.0);
    if let Dynamic::Map(map) = &mut planned.value {
        map.insert("name".to_string(), string("renamed"));
    }
    let prior = volume_state(4.0);
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: VOLUME.to_string(),
                prior_state: prior.clone(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("cannot shrink"));
    assert_eq!(response.new_state, prior);
    extended.assert_async().await;
    renamed.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_extend_reports_applied_rename() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let renamed = server
        .mock("PUT", "/volume/v3/p-1/volumes/vol-1")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "volume": { "name": "renamed" }
        })))
        .with_status(200)
        .with_body(named_volume_body("renamed", "available", 1))
        .expect(1)
        .create_async()
        .await;
    let _extend_failed = server
        .mock("POST", "/volume/v3/p-1/volumes/vol-1/action")
        .with_status(500)
        .with_body(r#"{"computeFault": {"message": "backend offline"}}"#)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/volume/v3/p-1/volumes/vol-1")
        .with_status(200)
        .with_body(named_volume_body("renamed", "available", 1))
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, VOLUME).await;

    let mut planned = volume_state(2.0);
    if let Dynamic::Map(map) = &mut planned.value {
        map.insert("name".to_string(), string("renamed"));
    }
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: VOLUME.to_string(),
                prior_state: volume_state(1.0),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("backend offline"));
    assert_eq!(attr(&response.new_state, "name"), Some(string("renamed")));
    assert_eq!(attr(&response.new_state, "size"), Some(Dynamic::Number(1.0)));
    renamed.assert_async().await;
}

fn snapshot(id: &str, created_at: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "nightly",
        "status": "available",
        "size": 1,
        "volume_id": "vol-1",
        "metadata": { "owner": "ops" },
        "created_at": created_at
    })
}

async fn read_snapshots(
    server: &mut mockito::ServerGuard,
    snapshots: Vec<serde_json::Value>,
    most_recent: bool,
) -> tfplug::data_source::ReadDataSourceResponse {
    let _keystone = mock_keystone(server).await;
    let listed = server
        .mock("GET", "/volume/v3/p-1/snapshots/detail")
        .match_query(Matcher::UrlEncoded("name".into(), "nightly".into()))
        .with_status(200)
        .with_body(serde_json::json!({ "snapshots": snapshots }).to_string())
        .expect(1)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(server, &[])).await;
    let ds = data_source(&provider, &data, SNAPSHOT).await;
    let response = ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: SNAPSHOT.to_string(),
                config: object(&[
                    ("name", string("nightly")),
                    ("most_recent", Dynamic::Bool(most_recent)),
                ]),
            },
        )
        .await;
    listed.assert_async().await;
    response
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshot_most_recent_picks_newest() {
    let mut server = Server::new_async().await;
    let snapshots = vec![
        snapshot("snap-old", "2023-01-01T00:00:00.000000"),
        snapshot("snap-new", "2024-01-01T00:00:00.000000"),
    ];

    let response = read_snapshots(&mut server, snapshots, true).await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.state, "id"), Some(string("snap-new")));
    assert_eq!(attr(&response.state, "volume_id"), Some(string("vol-1")));
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshot_ambiguity_suggests_most_recent() {
    let mut server = Server::new_async().await;
    let snapshots = vec![
        snapshot("snap-old", "2023-01-01T00:00:00.000000"),
        snapshot("snap-new", "2024-01-01T00:00:00.000000"),
    ];

    let response = read_snapshots(&mut server, snapshots, false).await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("most_recent"));
}
