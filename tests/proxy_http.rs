//! Integration tests for the service proxies using wiremock

use futures::TryStreamExt;
use osdk::resource::{attrs, Resource};
use osdk::services::identity::Actor;
use osdk::services::network::RouterInterface;
use osdk::{Connection, Error, Profile, Session};
use serde_json::json;
use std::collections::BTreeMap;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{
    body_json, header, header_exists, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connection(server: &MockServer, service: &str) -> Connection {
    let mut profile = Profile::default();
    profile.set_endpoint_override(service, &server.uri()).unwrap();
    Connection::new(Session::new(profile).unwrap().with_project("p1"))
}

mod compute_tests {
    use super::*;

    #[tokio::test]
    async fn test_reboot_posts_action() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/servers/s1/action"))
            .and(body_json(json!({"reboot": {"type": "SOFT"}})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "compute");
        assert_ok!(conn.compute.reboot_server("s1", "SOFT").await);
    }

    #[tokio::test]
    async fn test_action_on_listed_server() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/servers/s2/action"))
            .and(body_json(json!({"os-stop": null})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "compute");
        let listed = Resource::existing(
            conn.proxy().schema("compute.server_detail").unwrap(),
            attrs(json!({"id": "s2", "status": "ACTIVE"})),
        );
        assert_ok!(conn.compute.stop_server(&listed).await);
    }

    #[tokio::test]
    async fn test_scheduler_hints_outside_server_document() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/servers"))
            .and(body_json(json!({
                "server": {"name": "vm1"},
                "os:scheduler_hints": {"group": "g1"}
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "server": {"id": "s1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "compute");
        let created = assert_ok!(
            conn.compute
                .create_server(attrs(json!({"name": "vm1", "scheduler_hints": {"group": "g1"}})))
                .await
        );
        assert_eq!(created.id().as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_get_missing_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/servers/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let conn = connection(&server, "compute");
        let err = assert_err!(conn.compute.get_server("gone").await);
        assert!(matches!(err, Error::ResourceNotFound(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[tokio::test]
    async fn test_delete_ignore_missing() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/servers/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let conn = connection(&server, "compute");
        let deleted = assert_ok!(conn.compute.delete_server("gone", true).await);
        assert!(deleted.is_none());

        let err = assert_err!(conn.compute.delete_server("gone", false).await);
        assert!(err.is_not_found());
    }
}

mod network_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_router_interface() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/routers/r1/add_router_interface"))
            .and(body_json(json!({"subnet_id": "sub1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "r1", "subnet_id": "sub1", "port_id": "port1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "network");
        let body = assert_ok!(
            conn.network
                .add_interface_to_router("r1", RouterInterface::Subnet("sub1".into()))
                .await
        );
        assert_eq!(body["port_id"], "port1");
    }

    #[tokio::test]
    async fn test_quota_default_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/quotas/p9/default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quota": {"network": 10, "port": "50"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "network");
        let quota = assert_ok!(conn.network.get_quota_default("p9").await);
        assert_eq!(quota.attr("networks"), Some(json!(10)));
        assert_eq!(quota.attr("ports"), Some(json!(50)));
    }
}

mod image_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_checksum_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/images/img1/file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-MD5", "00000000000000000000000000000000")
                    .set_body_bytes(b"abc".to_vec()),
            )
            .mount(&server)
            .await;

        let conn = connection(&server, "image");
        let err = assert_err!(conn.image.download_image("img1").await);
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_download_checks_image_checksum() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/images/img1/file"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/images/img1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "img1", "checksum": "900150983cd24fb0d6963f7d28e17f72"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "image");
        let data = assert_ok!(conn.image.download_image("img1").await);
        assert_eq!(data, b"abc");
    }

    #[tokio::test]
    async fn test_add_tag() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/images/img1/tags/blue"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "image");
        assert_ok!(conn.image.add_tag("img1", "blue").await);
    }

    #[tokio::test]
    async fn test_remove_tag_with_space() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/images/img1/tags/blue%20sky"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "image");
        assert_ok!(conn.image.remove_tag("img1", "blue sky").await);
    }
}

mod identity_tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_role_returns_true_on_204() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/projects/p1/users/u1/roles/r1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "identity");
        let assigned = assert_ok!(
            conn.identity
                .assign_project_role("p1", Actor::User("u1".into()), "r1")
                .await
        );
        assert!(assigned);
    }

    #[tokio::test]
    async fn test_validate_role_404_is_false() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/projects/p1/groups/g1/roles/r1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        Mock::given(method("HEAD"))
            .and(path("/projects/p1/users/u1/roles/r1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let conn = connection(&server, "identity");
        let group = assert_ok!(
            conn.identity
                .validate_project_role("p1", Actor::Group("g1".into()), "r1")
                .await
        );
        assert!(!group);
        let user = assert_ok!(
            conn.identity
                .validate_project_role("p1", Actor::User("u1".into()), "r1")
                .await
        );
        assert!(user);
    }
}

mod object_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_account_metadata_from_headers() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(204)
                    .insert_header("X-Account-Container-Count", "3")
                    .insert_header("X-Account-Meta-Owner", "ops"),
            )
            .mount(&server)
            .await;

        let conn = connection(&server, "object-store");
        let account = assert_ok!(conn.object_store.get_account_metadata().await);
        assert_eq!(account.attr("account_container_count"), Some(json!(3)));

        let meta = assert_ok!(conn.object_store.account_metadata().await);
        assert_eq!(meta.get("owner").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn test_set_account_metadata_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("X-Account-Meta-Color", "blue"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "object-store");
        let mut meta = BTreeMap::new();
        meta.insert("Color".to_string(), "blue".to_string());
        assert_ok!(conn.object_store.set_account_metadata(&meta).await);
    }
}

mod auto_scaling_tests {
    use super::*;

    #[tokio::test]
    async fn test_instances_page_by_start_number() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/scaling_group_instance/g1/list"))
            .and(query_param("start_number", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_number": 2,
                "scaling_group_instances": [{"instance_id": "i2", "life_cycle_state": "INSERVICE"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/scaling_group_instance/g1/list"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_number": 2,
                "scaling_group_instances": [{"instance_id": "i1", "life_cycle_state": "INSERVICE"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "auto-scaling");
        let instances: Vec<Resource> = assert_ok!(
            conn.auto_scaling
                .instances("g1", attrs(json!({"limit": 1})))
                .unwrap()
                .try_collect()
                .await
        );
        let ids: Vec<String> = instances.iter().filter_map(Resource::id).collect();
        assert_eq!(ids, vec!["i1", "i2"]);
        assert_eq!(
            instances[0].attr_as::<String>("lifecycle_status").as_deref(),
            Some("INSERVICE")
        );
    }

    #[tokio::test]
    async fn test_batch_remove_instances() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/scaling_group_instance/g1/action"))
            .and(body_json(json!({
                "action": "REMOVE",
                "instances_id": ["i1", "i2"],
                "instance_delete": "yes"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "auto-scaling");
        assert_ok!(
            conn.auto_scaling
                .batch_remove_instances("g1", ["i1", "i2"], true)
                .await
        );
    }
}

mod message_tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_scope_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/queues/q1/subscriptions"))
            .and(header_exists("Client-ID"))
            .and(header("X-PROJECT-ID", "p1"))
            .and(body_json(json!({"subscriber": "http://example.com/hook", "ttl": 3600})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "subscription_id": "sub1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "messaging");
        let sub = assert_ok!(
            conn.message
                .create_subscription(
                    "q1",
                    attrs(json!({"subscriber": "http://example.com/hook", "ttl": 3600})),
                )
                .await
        );
        assert_eq!(sub.id().as_deref(), Some("sub1"));
        assert_eq!(sub.attr_as::<String>("queue_name").as_deref(), Some("q1"));
    }

    #[tokio::test]
    async fn test_list_subscriptions_with_client_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues/q1/subscriptions"))
            .and(header("Client-ID", "c1"))
            .and(query_param_is_missing("marker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subscriptions": [{"subscription_id": "sub1", "subscriber": "mailto:a@example.com"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/queues/q1/subscriptions"))
            .and(header("Client-ID", "c1"))
            .and(query_param("marker", "sub1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subscriptions": []})))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server, "messaging");
        let subs: Vec<Resource> = assert_ok!(
            conn.message
                .subscriptions("q1", attrs(json!({"client_id": "c1"})))
                .unwrap()
                .try_collect()
                .await
        );
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id().as_deref(), Some("sub1"));
    }
}
