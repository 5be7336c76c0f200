//! Integration tests for the generic resource operations using wiremock
//!
//! Every test points one service of the profile at a mock server and drives
//! `Resource` directly with schemas from the embedded registry.

use futures::TryStreamExt;
use osdk::resource::{attrs, schema, NextMarker, Operation, Resource, Schema};
use osdk::{Error, Profile, Session};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session(server: &MockServer, service: &str) -> Session {
    let mut profile = Profile::default();
    profile.set_endpoint_override(service, &server.uri()).unwrap();
    Session::new(profile).unwrap().with_token("test-token")
}

mod listing {
    use super::*;

    /// A full first page makes the stream ask for the next one with the
    /// last id as marker
    #[tokio::test]
    async fn test_marker_pagination_follows_last_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(query_param("marker", "id2"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [{"id": "id3", "name": "three"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(query_param_is_missing("marker"))
            .and(header("X-Auth-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [{"id": "id1", "name": "one"}, {"id": "id2", "name": "two"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "compute");
        let stream = Resource::list(
            &session,
            schema("compute.server").unwrap(),
            true,
            attrs(json!({"limit": 2})),
        )
        .unwrap();
        let servers: Vec<Resource> = assert_ok!(stream.try_collect().await);

        let ids: Vec<String> = servers.iter().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["id1", "id2", "id3"]);
        assert!(servers.iter().all(|s| !s.is_dirty()));
    }

    /// A page shorter than the limit ends the listing
    #[tokio::test]
    async fn test_short_page_stops() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "n1"}, {"id": "n2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let stream = Resource::list(
            &session,
            schema("network.network").unwrap(),
            true,
            attrs(json!({"limit": 3})),
        )
        .unwrap();
        let networks: Vec<Resource> = assert_ok!(stream.try_collect().await);
        assert_eq!(networks.len(), 2);
    }

    /// Unpaginated listings fetch a single page even when it is full
    #[tokio::test]
    async fn test_unpaginated_fetches_one_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "n1"}, {"id": "n2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let stream = Resource::list(
            &session,
            schema("network.network").unwrap(),
            false,
            attrs(json!({"limit": 2})),
        )
        .unwrap();
        let networks: Vec<Resource> = assert_ok!(stream.try_collect().await);
        assert_eq!(networks.len(), 2);
    }

    /// `start_number` paging ends once the reported total is reached
    #[tokio::test]
    async fn test_start_number_total_ends_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/scaling_configuration"))
            .and(query_param("start_number", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_number": 4,
                "scaling_configurations": [
                    {"scaling_configuration_id": "c3"},
                    {"scaling_configuration_id": "c4"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/scaling_configuration"))
            .and(query_param_is_missing("start_number"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_number": 4,
                "scaling_configurations": [
                    {"scaling_configuration_id": "c1"},
                    {"scaling_configuration_id": "c2"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "auto-scaling");
        let stream = Resource::list(
            &session,
            schema("auto_scaling.config").unwrap(),
            true,
            attrs(json!({"limit": 2})),
        )
        .unwrap();
        let configs: Vec<Resource> = assert_ok!(stream.try_collect().await);
        let ids: Vec<String> = configs.iter().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
    }

    /// Uri attributes fill the collection path and are set on every item
    #[tokio::test]
    async fn test_uri_attribute_scopes_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/scaling_policy/g1/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_number": 1,
                "scaling_policies": [{"scaling_policy_id": "p1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "auto-scaling");
        let stream = Resource::list(
            &session,
            schema("auto_scaling.policy").unwrap(),
            true,
            attrs(json!({"scaling_group_id": "g1"})),
        )
        .unwrap();
        let policies: Vec<Resource> = assert_ok!(stream.try_collect().await);
        assert_eq!(policies.len(), 1);
        assert_eq!(
            policies[0].attr_as::<String>("scaling_group_id").as_deref(),
            Some("g1")
        );
    }

    fn widget_schema(next_marker: Option<NextMarker>) -> Arc<Schema> {
        let mut schema = Schema::new("test.widget", "widget", "network")
            .base_path("/widgets")
            .resources_key("widgets")
            .allow(&[Operation::List]);
        schema.next_marker = next_marker;
        Arc::new(schema)
    }

    /// After a full page the next request carries the last id and the page
    /// size; an empty page ends the listing
    #[tokio::test]
    async fn test_empty_page_ends_marker_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/widgets"))
            .and(query_param_is_missing("marker"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "widgets": [{"id": "w1"}, {"id": "w2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/widgets"))
            .and(query_param("marker", "w2"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"widgets": []})))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let stream = Resource::list(&session, widget_schema(None), true, attrs(json!({"limit": 2}))).unwrap();
        let widgets: Vec<Resource> = assert_ok!(stream.try_collect().await);

        let ids: Vec<String> = widgets.iter().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["w1", "w2"]);
    }

    /// A cursor found at the declared path replaces the last id
    #[tokio::test]
    async fn test_next_marker_path_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/widgets"))
            .and(query_param_is_missing("marker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "widgets": [{"id": "w1"}, {"id": "w2"}],
                "page_info": {"next_marker": "cursor-7"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/widgets"))
            .and(query_param("marker", "cursor-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "widgets": [{"id": "w3"}],
                "page_info": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let schema = widget_schema(Some(NextMarker::Path("page_info.next_marker".to_string())));
        let stream = Resource::list(&session, schema, true, attrs(json!({"limit": 2}))).unwrap();
        let widgets: Vec<Resource> = assert_ok!(stream.try_collect().await);
        assert_eq!(widgets.len(), 3);
    }

    /// A `-1` cursor ends the listing even after a full page
    #[tokio::test]
    async fn test_next_marker_path_sentinel_stops() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/widgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "widgets": [{"id": "w1"}, {"id": "w2"}],
                "page_info": {"next_marker": -1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let schema = widget_schema(Some(NextMarker::Path("page_info.next_marker".to_string())));
        let stream = Resource::list(&session, schema, true, attrs(json!({"limit": 2}))).unwrap();
        let widgets: Vec<Resource> = assert_ok!(stream.try_collect().await);
        assert_eq!(widgets.len(), 2);
    }

    /// Offset paging advances the page index until a short page
    #[tokio::test]
    async fn test_offset_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "snapshots": [{"id": "a"}, {"id": "b"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .and(query_param("offset", "1"))
            .and(query_param("limit", "2"))
            .and(query_param_is_missing("marker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "snapshots": [{"id": "c"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "volumev2");
        let stream = Resource::list_by_offset(
            &session,
            schema("block_store.snapshot").unwrap(),
            true,
            attrs(json!({"limit": 2, "offset": 0})),
        )
        .unwrap();
        let snapshots: Vec<Resource> = assert_ok!(stream.try_collect().await);

        let ids: Vec<String> = snapshots.iter().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_list_not_allowed() {
        let server = MockServer::start().await;
        let session = session(&server, "network");
        let err = Resource::list(&session, schema("network.quota_default").unwrap(), true, attrs(json!({})))
            .err()
            .unwrap();
        assert!(matches!(err, Error::MethodNotSupported { method: "list", .. }));
    }
}

mod crud {
    use super::*;

    #[tokio::test]
    async fn test_create_wraps_body_and_cleans() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/networks"))
            .and(body_json(json!({"network": {"name": "net1"}})))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "network": {"id": "n1", "name": "net1", "status": "ACTIVE", "unknown_field": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let net = Resource::new(schema("network.network").unwrap(), attrs(json!({"name": "net1"})));
        let net = assert_ok!(net.create(&session, true).await);

        assert_eq!(net.id().as_deref(), Some("n1"));
        assert_eq!(net.status().as_deref(), Some("ACTIVE"));
        assert!(net.attr("unknown_field").is_none());
        assert!(!net.is_dirty());
    }

    #[tokio::test]
    async fn test_delete_not_allowed() {
        let server = MockServer::start().await;
        let session = session(&server, "compute");

        let zone = Resource::existing(
            schema("compute.availability_zone").unwrap(),
            attrs(json!({"id": "az1"})),
        );
        let err = assert_err!(zone.delete(&session, None, false).await);
        assert!(matches!(err, Error::MethodNotSupported { method: "delete", .. }));
        assert!(err.to_string().contains("delete"));
    }

    /// Image updates PATCH a list of the changed attributes with the
    /// image-specific content type
    #[tokio::test]
    async fn test_attrs_list_patch_update() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/images/img1"))
            .and(header(
                "Content-Type",
                "application/openstack-images-v2.1-json-patch",
            ))
            .and(body_json(json!([{"name": "new"}])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "img1", "name": "new"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "image");
        let mut image = Resource::existing(
            schema("image.image").unwrap(),
            attrs(json!({"id": "img1", "name": "old"})),
        );
        image.set_attr("name", json!("new")).unwrap();
        let image = assert_ok!(image.update(&session, false, true).await);
        assert_eq!(image.name().as_deref(), Some("new"));
        assert!(!image.is_dirty());
    }

    #[tokio::test]
    async fn test_clean_update_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let net = Resource::existing(
            schema("network.network").unwrap(),
            attrs(json!({"id": "n1", "name": "net1"})),
        );
        let net = assert_ok!(net.update(&session, true, true).await);
        assert_eq!(net.name().as_deref(), Some("net1"));
    }

    #[tokio::test]
    async fn test_get_404_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/networks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "NeutronError": {"type": "NetworkNotFound", "message": "Network missing could not be found."}
            })))
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let net = Resource::existing(schema("network.network").unwrap(), attrs(json!({"id": "missing"})));
        let err = assert_err!(net.get(&session, true).await);
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }
}

mod find {
    use super::*;

    #[tokio::test]
    async fn test_find_falls_back_to_name() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/networks/net-name"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "n1", "name": "net-name"}, {"id": "n2", "name": "other"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let found = assert_ok!(
            Resource::find(&session, schema("network.network").unwrap(), "net-name", false, attrs(json!({}))).await
        );
        assert_eq!(found.and_then(|r| r.id()).as_deref(), Some("n1"));
    }

    /// Names with reserved characters stay one path segment on the id lookup
    #[tokio::test]
    async fn test_find_encodes_name_in_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers/web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "other", "name": "web"}
            })))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/servers/web%231"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [{"id": "s1", "name": "web#1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "compute");
        let found = assert_ok!(
            Resource::find(&session, schema("compute.server").unwrap(), "web#1", false, attrs(json!({}))).await
        );
        assert_eq!(found.and_then(|r| r.id()).as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_find_duplicate_names() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/networks/twin"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "networks": [{"id": "n1", "name": "twin"}, {"id": "n2", "name": "twin"}]
            })))
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let err = assert_err!(
            Resource::find(&session, schema("network.network").unwrap(), "twin", true, attrs(json!({}))).await
        );
        assert!(matches!(err, Error::DuplicateResource(_)));
    }

    #[tokio::test]
    async fn test_find_missing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/networks/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"networks": []})))
            .mount(&server)
            .await;

        let session = session(&server, "network");
        let network = schema("network.network").unwrap();

        let found = assert_ok!(Resource::find(&session, network.clone(), "nope", true, attrs(json!({}))).await);
        assert!(found.is_none());

        let err = assert_err!(Resource::find(&session, network, "nope", false, attrs(json!({}))).await);
        assert!(matches!(err, Error::ResourceNotFound(_)));
    }
}

mod wait {
    use super::*;
    use osdk::resource::{wait_for_delete, wait_for_status};

    fn building_server() -> Resource {
        Resource::existing(
            schema("compute.server").unwrap(),
            attrs(json!({"id": "s1", "status": "BUILD"})),
        )
    }

    #[tokio::test]
    async fn test_wait_reaches_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "s1", "status": "ACTIVE"}
            })))
            .mount(&server)
            .await;

        let session = session(&server, "compute");
        let res = assert_ok!(
            wait_for_status(
                &session,
                building_server(),
                "ACTIVE",
                &["ERROR"],
                Duration::from_millis(10),
                Duration::from_secs(1),
            )
            .await
        );
        assert_eq!(res.status().as_deref(), Some("ACTIVE"));
    }

    #[tokio::test]
    async fn test_wait_failure_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "s1", "status": "ERROR"}
            })))
            .mount(&server)
            .await;

        let session = session(&server, "compute");
        let err = assert_err!(
            wait_for_status(
                &session,
                building_server(),
                "ACTIVE",
                &["ERROR"],
                Duration::from_millis(10),
                Duration::from_secs(1),
            )
            .await
        );
        assert!(matches!(err, Error::ResourceFailure(_)));
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "s1", "status": "BUILD"}
            })))
            .mount(&server)
            .await;

        let session = session(&server, "compute");
        let err = assert_err!(
            wait_for_status(
                &session,
                building_server(),
                "ACTIVE",
                &["ERROR"],
                Duration::from_millis(10),
                Duration::from_millis(30),
            )
            .await
        );
        assert!(matches!(err, Error::ResourceTimeout(_)));
    }

    #[tokio::test]
    async fn test_wait_for_delete_on_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers/s1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, "compute");
        let res = assert_ok!(
            wait_for_delete(
                &session,
                building_server(),
                Duration::from_millis(10),
                Duration::from_secs(1),
            )
            .await
        );
        assert_eq!(res.id().as_deref(), Some("s1"));
    }
}
