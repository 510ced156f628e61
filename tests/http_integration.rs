//! Integration tests for resource operations using wiremock
//!
//! These tests drive a real `ApiSession` against mocked token and API
//! endpoints, checking URLs, query parameters, bodies and status handling.

use panapi::{Address, AddressGroup, ApiSession, Credentials, Error, Resource, Session, Tag};
use serde_json::json;
use wiremock::matchers::{
    basic_auth, bearer_token, body_json, body_string_contains, header, method, path,
    query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/am/oauth2/access_token";

async fn mount_token(server: &MockServer, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(basic_auth("client", "secret"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": expires_in
        })))
        .mount(server)
        .await;
}

fn session_for(server: &MockServer) -> ApiSession {
    let credentials = Credentials::new("client", "secret", "tsg_id:1234567890")
        .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH))
        .with_base_url(server.uri());
    ApiSession::new(credentials).expect("session should build")
}

fn address(value: serde_json::Value) -> Address {
    Address::from_attributes(value.as_object().cloned().unwrap()).unwrap()
}

mod session_tests {
    use super::*;

    /// The first operation fetches a token and uses it as bearer
    #[tokio::test]
    async fn test_authenticates_before_first_request() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("GET"))
            .and(path("/sse/config/v1/tags"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        assert!(session.is_expired());

        let tags = Tag::default().list(&mut session).await.unwrap();

        assert!(tags.is_empty());
        assert!(!session.is_expired());
    }

    /// A token inside the expiry buffer is refreshed on every operation
    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-token",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sse/config/v1/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        Tag::default().list(&mut session).await.unwrap();
        Tag::default().list(&mut session).await.unwrap();
    }

    /// Rejected credentials surface as an auth error, not a status error
    #[tokio::test]
    async fn test_token_rejection_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let err = Tag::default().list(&mut session).await.unwrap_err();

        assert!(matches!(err, Error::Auth(_)));
        assert!(session.response().is_none());
    }

    /// An unreachable server is a transport error
    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        let credentials = Credentials::new("client", "secret", "tsg_id:1")
            .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH))
            .with_base_url("http://127.0.0.1:9");
        let mut session = ApiSession::new(credentials).unwrap();

        let err = Tag::new("t").read(&mut session).await.unwrap_err();
        assert!(err.is_transport());
    }
}

mod resource_tests {
    use super::*;

    /// Create posts the payload with the folder as a query parameter
    #[tokio::test]
    async fn test_create_sets_id() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("POST"))
            .and(path("/sse/config/v1/addresses"))
            .and(query_param("folder", "Shared"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"name": "web", "fqdn": "web.example.com"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "abc",
                "name": "web",
                "folder": "Shared",
                "fqdn": "web.example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let mut obj = Address::new("web").in_folder("Shared").fqdn("web.example.com");

        obj.create(&mut session).await.unwrap();

        assert_eq!(obj.id(), Some("abc"));
        assert_eq!(session.response().map(|r| r.status), Some(201));
    }

    /// A conflict leaves the object untouched and the response inspectable
    #[tokio::test]
    async fn test_create_conflict() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("POST"))
            .and(path("/sse/config/v1/addresses"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "_errors": [{"code": "E006", "message": "Name Not Unique"}]
            })))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let mut obj = Address::new("web").in_folder("Shared");

        let err = obj.create(&mut session).await.unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(obj.id(), None);
        let response = session.response().unwrap();
        assert!(response.body.contains("Name Not Unique"));
    }

    /// Read by id targets the object URL and sends no name parameter
    #[tokio::test]
    async fn test_read_by_id() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("GET"))
            .and(path("/sse/config/v1/addresses/x1"))
            .and(query_param_is_missing("name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "x1",
                "name": "web",
                "folder": "Shared",
                "ip_netmask": "192.0.2.10/32"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let fetched = address(json!({"id": "x1", "name": "web"}))
            .read(&mut session)
            .await
            .unwrap();

        assert_eq!(fetched.ip_netmask.as_deref(), Some("192.0.2.10/32"));
        assert_eq!(fetched.folder(), Some("Shared"));
    }

    /// Read by name queries the collection and takes the first match
    #[tokio::test]
    async fn test_read_by_name() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("GET"))
            .and(path("/sse/config/v1/address-groups"))
            .and(query_param("name", "servers"))
            .and(query_param("folder", "Shared"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "g1", "name": "servers", "folder": "Shared", "static": ["web"]}],
                "limit": 200,
                "offset": 0,
                "total": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let fetched = AddressGroup::new("servers")
            .in_folder("Shared")
            .read(&mut session)
            .await
            .unwrap();

        assert_eq!(fetched.id(), Some("g1"));
        assert_eq!(fetched.static_members, Some(vec!["web".to_string()]));
    }

    /// Read without id or name fails without touching the network
    #[tokio::test]
    async fn test_read_without_identifier() {
        let server = MockServer::start().await;

        let mut session = session_for(&server);
        let err = Address::default()
            .in_folder("Shared")
            .read(&mut session)
            .await
            .unwrap_err();

        assert!(err.is_precondition());
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    /// Listing with a folder sends the folder and the fixed limit
    #[tokio::test]
    async fn test_list_in_folder() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        let data = json!([
            {"id": "1", "name": "a", "folder": "F", "fqdn": "a.example"},
            {"id": "2", "name": "b", "folder": "F", "ip_netmask": "198.51.100.0/24"},
            {
                "id": "3",
                "name": "c",
                "folder": "F",
                "description": null,
                "snippet": "predefined",
                "override_loc": {"path": ["F", "sub"], "depth": 2}
            }
        ]);

        Mock::given(method("GET"))
            .and(path("/sse/config/v1/addresses"))
            .and(query_param("folder", "F"))
            .and(query_param("limit", "5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": data.clone(),
                "limit": 5000,
                "offset": 0,
                "total": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let items = Address::default()
            .in_folder("F")
            .list(&mut session)
            .await
            .unwrap();

        let names: Vec<_> = items.iter().filter_map(|a| a.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(items[1].ip_netmask.as_deref(), Some("198.51.100.0/24"));

        let expected = data.as_array().unwrap();
        assert_eq!(items.len(), expected.len());
        for (item, expected) in items.iter().zip(expected) {
            assert_eq!(&serde_json::Value::Object(item.attributes().unwrap()), expected);
        }
    }

    /// Update puts the payload to the object URL
    #[tokio::test]
    async fn test_update_twice_is_identical() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("PUT"))
            .and(path("/sse/config/v1/tags/t1"))
            .and(query_param("folder", "Shared"))
            .and(body_json(json!({"name": "prod", "color": "Red"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "t1",
                "name": "prod",
                "color": "Red"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let mut tag = Tag::new("prod").in_folder("Shared");
        tag.id = Some("t1".to_string());
        tag.color = Some("Red".to_string());

        tag.update(&mut session).await.unwrap();
        tag.update(&mut session).await.unwrap();

        let puts: Vec<_> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "PUT")
            .collect();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].url, puts[1].url);
        assert_eq!(puts[0].body, puts[1].body);
    }

    /// Delete targets the object URL with the folder scope
    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("DELETE"))
            .and(path("/sse/config/v1/addresses/abc"))
            .and(query_param("folder", "Shared"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let obj = address(json!({"id": "abc", "name": "web", "folder": "Shared"}));

        obj.delete(&mut session).await.unwrap();
    }

    /// A missing object is reported as not found
    #[tokio::test]
    async fn test_delete_missing_object() {
        let server = MockServer::start().await;
        mount_token(&server, 900).await;

        Mock::given(method("DELETE"))
            .and(path("/sse/config/v1/addresses/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "_errors": [{"code": "E005", "message": "Object Not Present"}]
            })))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let err = address(json!({"id": "gone"}))
            .delete(&mut session)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(session.response().map(|r| r.status), Some(404));
    }
}
