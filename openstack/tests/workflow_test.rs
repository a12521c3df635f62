//! Workflow service resources and data source against a mocked Mistral endpoint

mod common;

use common::*;
use mockito::{Matcher, Server};
use tfplug::context::Context;
use tfplug::data_source::ReadDataSourceRequest;
use tfplug::resource::{
    CreateResourceRequest, DeleteResourceRequest, ImportResourceStateRequest, ReadResourceRequest,
};
use tfplug::types::{Dynamic, DynamicValue};

const CRON_TRIGGER: &str = "openstack_workflow_cron_trigger_v2";
const WORKFLOW: &str = "openstack_workflow_workflow_v2";
const WORKBOOK: &str = "openstack_workflow_workbook_v2";

fn trigger_body() -> String {
    serde_json::json!({
        "id": "ct-1",
        "name": "cron_trigger_1",
        "pattern": "0 5 * * *",
        "workflow_id": "wf-1",
        "workflow_input": "{}",
        "workflow_params": "{}",
        "remaining_executions": 3,
        "first_execution_time": "2022-01-01 01:01:00",
        "project_id": "p-1",
        "created_at": "2018-09-12 15:48:18"
    })
    .to_string()
}

fn trigger_config() -> DynamicValue {
    object(&[
        ("name", string("cron_trigger_1")),
        ("pattern", string("0 5 * * *")),
        ("workflow_id", string("wf-1")),
        ("remaining_executions", Dynamic::Number(3.0)),
        ("id", Dynamic::Unknown),
        ("project_id", Dynamic::Unknown),
        ("created_at", Dynamic::Unknown),
    ])
}

fn attr<'a>(state: &'a DynamicValue, name: &str) -> Option<&'a str> {
    match &state.value {
        Dynamic::Map(map) => map.get(name).and_then(|v| v.as_str()),
        _ => None,
    }
}

fn trigger_state() -> DynamicValue {
    object(&[
        ("id", string("ct-1")),
        ("region", string("RegionOne")),
        ("name", string("cron_trigger_1")),
        ("pattern", string("0 5 * * *")),
        ("workflow_id", string("wf-1")),
    ])
}

#[tokio::test(flavor = "multi_thread")]
async fn cron_trigger_create_records_computed_attributes() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let created = server
        .mock("POST", "/workflow/v2/cron_triggers")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "cron_trigger_1",
            "pattern": "0 5 * * *",
            "workflow_id": "wf-1",
            "remaining_executions": 3
        })))
        .with_status(201)
        .with_body(trigger_body())
        .expect(1)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/workflow/v2/cron_triggers/ct-1")
        .with_status(200)
        .with_body(trigger_body())
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let config = trigger_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: CRON_TRIGGER.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.new_state;
    assert_eq!(attr(&state, "id"), Some("ct-1"));
    assert_eq!(attr(&state, "region"), Some("RegionOne"));
    assert_eq!(attr(&state, "project_id"), Some("p-1"));
    assert_eq!(attr(&state, "created_at"), Some("2018-09-12T15:48:18Z"));
    created.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn identifier_kept_when_read_after_create_fails() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let _created = server
        .mock("POST", "/workflow/v2/cron_triggers")
        .with_status(201)
        .with_body(trigger_body())
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/workflow/v2/cron_triggers/ct-1")
        .with_status(500)
        .with_body(r#"{"faultstring": "database unavailable"}"#)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let config = trigger_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: CRON_TRIGGER.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("database unavailable"));
    assert_eq!(attr(&response.new_state, "id"), Some("ct-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_workflow_reference_fails_before_any_request() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let never = server
        .mock("POST", "/workflow/v2/cron_triggers")
        .expect(0)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let config = object(&[
        ("name", string("cron_trigger_1")),
        ("pattern", string("0 5 * * *")),
    ]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: CRON_TRIGGER.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Missing workflow");
    never.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn out_of_band_delete_drops_state_without_diagnostics() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let _gone = server
        .mock("GET", "/workflow/v2/cron_triggers/ct-1")
        .with_status(404)
        .with_body(r#"{"faultstring": "Cron trigger not found"}"#)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: CRON_TRIGGER.to_string(),
                current_state: trigger_state(),
            },
        )
        .await;

    assert!(response.new_state.is_none());
    assert!(response.diagnostics.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn read_failure_keeps_prior_state() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let _broken = server
        .mock("GET", "/workflow/v2/cron_triggers/ct-1")
        .with_status(500)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let prior = trigger_state();
    let response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: CRON_TRIGGER.to_string(),
                current_state: prior.clone(),
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.new_state, Some(prior));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_is_idempotent() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let first = server
        .mock("DELETE", "/workflow/v2/cron_triggers/ct-1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("DELETE", "/workflow/v2/cron_triggers/ct-1")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    for _ in 0..2 {
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: CRON_TRIGGER.to_string(),
                    prior_state: trigger_state(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn import_reads_existing_trigger() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let _fetched = server
        .mock("GET", "/workflow/v2/cron_triggers/ct-1")
        .with_status(200)
        .with_body(trigger_body())
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: CRON_TRIGGER.to_string(),
                id: "ct-1".to_string(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(response.imported_resources.len(), 1);
    let state = &response.imported_resources[0].state;
    assert_eq!(attr(state, "id"), Some("ct-1"));
    assert_eq!(attr(state, "name"), Some("cron_trigger_1"));
    assert_eq!(attr(state, "region"), Some("RegionOne"));
}

#[tokio::test(flavor = "multi_thread")]
async fn import_of_missing_trigger_is_an_error() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let _gone = server
        .mock("GET", "/workflow/v2/cron_triggers/missing")
        .with_status(404)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, CRON_TRIGGER).await;

    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: CRON_TRIGGER.to_string(),
                id: "missing".to_string(),
            },
        )
        .await;

    assert!(response.imported_resources.is_empty());
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].summary,
        "Cannot import non-existent remote object"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn workflow_create_manages_last_declared_workflow() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let definition_crlf = "version: '2.0'\r\nfirst:\r\n  tasks: {}\r\nsecond:\r\n  tasks: {}\r\n";
    let definition = "version: '2.0'\nfirst:\n  tasks: {}\nsecond:\n  tasks: {}\n";

    let created = server
        .mock("POST", "/workflow/v2/workflows")
        .match_query(Matcher::UrlEncoded("scope".into(), "private".into()))
        .match_header("content-type", "text/plain")
        .match_body(definition)
        .with_status(201)
        .with_body(
            serde_json::json!({
                "workflows": [
                    { "id": "wf-a", "name": "first", "scope": "private" },
                    { "id": "wf-b", "name": "second", "scope": "private" }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/workflow/v2/workflows/wf-b")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "id": "wf-b",
                "name": "second",
                "scope": "private",
                "definition": definition,
                "tags": ["nightly"],
                "project_id": "p-1",
                "created_at": "2018-09-12 15:48:18"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, WORKFLOW).await;

    let config = object(&[
        ("scope", string("private")),
        ("definition", string(definition_crlf)),
    ]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: WORKFLOW.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.new_state, "id"), Some("wf-b"));
    assert_eq!(attr(&response.new_state, "name"), Some("second"));
    assert_eq!(attr(&response.new_state, "definition"), Some(definition));
    created.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_scope_is_rejected() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, WORKFLOW).await;

    let config = object(&[
        ("scope", string("shared")),
        ("definition", string("version: '2.0'\n")),
    ]);
    let response = resource
        .validate(
            Context::new(),
            tfplug::resource::ValidateResourceConfigRequest {
                type_name: WORKFLOW.to_string(),
                config,
            },
        )
        .await;
    assert_eq!(response.diagnostics.len(), 1);
}

async fn read_trigger_data_source(server: &mut mockito::ServerGuard, body: String) -> tfplug::data_source::ReadDataSourceResponse {
    let _keystone = mock_keystone(server).await;
    let listed = server
        .mock("GET", "/workflow/v2/cron_triggers")
        .match_query(Matcher::UrlEncoded("name".into(), "eq:cron_trigger_1".into()))
        .with_status(200)
        .with_body(body)
        .expect(1)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(server, &[])).await;
    let ds = data_source(&provider, &data, CRON_TRIGGER).await;
    let response = ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: CRON_TRIGGER.to_string(),
                config: object(&[("name", string("cron_trigger_1"))]),
            },
        )
        .await;
    listed.assert_async().await;
    response
}

#[tokio::test(flavor = "multi_thread")]
async fn data_source_reads_single_match() {
    let mut server = Server::new_async().await;
    let body = format!(r#"{{"cron_triggers": [{}]}}"#, trigger_body());

    let response = read_trigger_data_source(&mut server, body).await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.state, "id"), Some("ct-1"));
    assert_eq!(attr(&response.state, "pattern"), Some("0 5 * * *"));
    assert_eq!(
        attr(&response.state, "first_execution_time"),
        Some("2022-01-01T01:01:00Z")
    );
    assert_eq!(attr(&response.state, "region"), Some("RegionOne"));
}

#[tokio::test(flavor = "multi_thread")]
async fn data_source_with_no_match_fails() {
    let mut server = Server::new_async().await;

    let response = read_trigger_data_source(&mut server, r#"{"cron_triggers": []}"#.to_string()).await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.contains("no results"));
}

#[tokio::test(flavor = "multi_thread")]
async fn data_source_with_several_matches_fails() {
    let mut server = Server::new_async().await;
    let body = format!(
        r#"{{"cron_triggers": [{}, {}]}}"#,
        trigger_body(),
        trigger_body().replace("ct-1", "ct-2")
    );

    let response = read_trigger_data_source(&mut server, body).await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.contains("more than one result"));
}

const WORKBOOK_DEFINITION: &str = "version: '2.0'\nname: my_workbook\ntags:\n  - test\nworkflows:\n  test:\n    tasks: {}\n";

fn workbook_body() -> String {
    serde_json::json!({
        "id": "wb-1",
        "name": "my_workbook",
        "namespace": "my_namespace",
        "scope": "private",
        "definition": WORKBOOK_DEFINITION,
        "tags": ["test"],
        "project_id": "p-1",
        "created_at": "2018-09-12 15:48:18"
    })
    .to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn workbook_create_posts_yaml_and_reads_back() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let created = server
        .mock("POST", "/workflow/v2/workbooks")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("scope".into(), "private".into()),
            Matcher::UrlEncoded("namespace".into(), "my_namespace".into()),
        ]))
        .match_header("content-type", "text/plain")
        .match_body(WORKBOOK_DEFINITION)
        .with_status(201)
        .with_body(workbook_body())
        .expect(1)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/workflow/v2/workbooks/wb-1")
        .with_status(200)
        .with_body(workbook_body())
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, WORKBOOK).await;

    let config = object(&[
        ("scope", string("private")),
        ("namespace", string("my_namespace")),
        ("definition", string(&WORKBOOK_DEFINITION.replace('\n', "\r\n"))),
        ("name", Dynamic::Unknown),
    ]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: WORKBOOK.to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.new_state, "id"), Some("wb-1"));
    assert_eq!(attr(&response.new_state, "name"), Some("my_workbook"));
    assert_eq!(attr(&response.new_state, "definition"), Some(WORKBOOK_DEFINITION));
    assert_eq!(attr(&response.new_state, "created_at"), Some("2018-09-12T15:48:18Z"));
    match &response.new_state.value {
        Dynamic::Map(map) => match map.get("tags") {
            Some(Dynamic::List(tags)) => assert_eq!(tags, &vec![string("test")]),
            other => panic!("unexpected tags {other:?}"),
        },
        other => panic!("unexpected state {other:?}"),
    }
    created.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn workbook_delete_and_import() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let deleted = server
        .mock("DELETE", "/workflow/v2/workbooks/wb-1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let _fetched = server
        .mock("GET", "/workflow/v2/workbooks/wb-1")
        .with_status(200)
        .with_body(workbook_body())
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let resource = resource(&provider, &data, WORKBOOK).await;

    let imported = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: WORKBOOK.to_string(),
                id: "wb-1".to_string(),
            },
        )
        .await;
    assert!(imported.diagnostics.is_empty(), "{:?}", imported.diagnostics);
    let state = imported.imported_resources[0].state.clone();
    assert_eq!(attr(&state, "namespace"), Some("my_namespace"));
    assert_eq!(attr(&state, "scope"), Some("private"));

    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: WORKBOOK.to_string(),
                prior_state: state,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    deleted.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn workflow_data_source_filters_by_name_and_namespace() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;

    let listed = server
        .mock("GET", "/workflow/v2/workflows")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "eq:my_workflow_datasource".into()),
            Matcher::UrlEncoded("namespace".into(), "my_namespace".into()),
        ]))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "workflows": [{
                    "id": "wf-ds",
                    "name": "my_workflow_datasource",
                    "namespace": "my_namespace",
                    "input": "my_arg1, my_arg2",
                    "definition": "version: '2.0'\nmy_workflow_datasource:\n  tasks: {}\n",
                    "tags": ["echo"],
                    "scope": "private",
                    "project_id": "p-1",
                    "created_at": "2018-09-12 15:48:18"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let ds = data_source(&provider, &data, WORKFLOW).await;
    let response = ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: WORKFLOW.to_string(),
                config: object(&[
                    ("name", string("my_workflow_datasource")),
                    ("namespace", string("my_namespace")),
                ]),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(attr(&response.state, "id"), Some("wf-ds"));
    assert_eq!(attr(&response.state, "input"), Some("my_arg1, my_arg2"));
    assert_eq!(attr(&response.state, "scope"), Some("private"));
    assert_eq!(attr(&response.state, "region"), Some("RegionOne"));
    listed.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn workflow_data_source_without_match_fails() {
    let mut server = Server::new_async().await;
    let _keystone = mock_keystone(&mut server).await;
    let _listed = server
        .mock("GET", "/workflow/v2/workflows")
        .match_query(Matcher::UrlEncoded("name".into(), "eq:missing".into()))
        .with_status(200)
        .with_body(r#"{"workflows": []}"#)
        .create_async()
        .await;

    let (provider, data) = configure_provider(provider_config(&server, &[])).await;
    let ds = data_source(&provider, &data, WORKFLOW).await;
    let response = ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: WORKFLOW.to_string(),
                config: object(&[("name", string("missing"))]),
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.contains("no results"));
}
