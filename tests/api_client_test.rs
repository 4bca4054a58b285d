use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use clover_client::api::models::*;
use clover_client::config::ApiConfig;
use clover_client::{ApiClient, ClientError, SocialApi};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::from_config(&ApiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        page_size: 20,
    })
    .unwrap()
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "message": "ok", "data": data }))
}

#[tokio::test]
async fn test_login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/account/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "pw" })))
        .respond_with(ok(json!({ "userId": "u1", "token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .login(LoginRequest {
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();

    let data = response.data.unwrap();
    assert_eq!(data.token.as_deref(), Some("tok-1"));
    assert_eq!(response.message.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_logout_sends_token_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/account/logout"))
        .and(query_param("token", "tok-1"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).logout("tok-1".to_string()).await.unwrap();
    assert_eq!(response.data, None);
}

#[tokio::test]
async fn test_access_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/me"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ok(json!({ "userId": "u1", "email": "ada@example.com" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_token("tok-1");
    let user = client.get_user_info().await.unwrap().data.unwrap();
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_no_token_means_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/group/list-all"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/group/list-all"))
        .respond_with(ok(json!([{ "groupId": "g1", "name": "Rust" }])))
        .mount(&server)
        .await;

    let groups = client_for(&server).list_all_groups().await.unwrap();
    assert_eq!(groups.data.unwrap()[0].name.as_deref(), Some("Rust"));
}

#[tokio::test]
async fn test_search_passes_keyword() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/search"))
        .and(query_param("keyword", "ada love"))
        .respond_with(ok(json!([{ "userId": "u1" }, { "userId": "u2" }])))
        .expect(1)
        .mount(&server)
        .await;

    let found = client_for(&server)
        .search_user("ada love".to_string())
        .await
        .unwrap();
    assert_eq!(found.data.unwrap().len(), 2);
}

#[tokio::test]
async fn test_feed_pages_use_configured_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/list-newsfeed"))
        .and(query_param("page", "3"))
        .and(query_param("size", "20"))
        .respond_with(ok(json!([{ "postId": "p1", "content": "hi" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/list-post-by-group"))
        .and(query_param("groupId", "g1"))
        .and(query_param("page", "0"))
        .and(query_param("size", "20"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let page = client.list_feed(3).await.unwrap();
    assert!(page.has_data());

    let group_page = client.list_feed_of_group(0, "g1".to_string()).await.unwrap();
    assert!(!group_page.has_data());
}

#[tokio::test]
async fn test_writes_post_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/feed/post"))
        .and(body_json(json!({ "toGroupId": "g1", "content": "hello" })))
        .respond_with(ok(json!({ "postId": "p9" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/feed/comment"))
        .and(body_json(json!({ "postId": "p9", "content": "first" })))
        .respond_with(ok(json!({ "commentId": "c1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/group/create"))
        .and(body_json(json!({ "name": "Crabs", "description": "rust" })))
        .respond_with(ok(json!({ "groupId": "g2" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/user/update-profile"))
        .and(body_json(json!({ "lastName": "Lovelace" })))
        .respond_with(ok(json!({ "userId": "u1", "lastName": "Lovelace" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/account/register"))
        .and(body_json(json!({
            "email": "a@b.c",
            "password": "pw",
            "firstName": "Ada",
            "lastName": "Lovelace"
        })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let post = client
        .post_feed(FeedPostRequest {
            to_group_id: "g1".to_string(),
            content: "hello".to_string(),
            privacy_type: None,
            image_urls: None,
        })
        .await
        .unwrap();
    assert_eq!(post.data.unwrap().post_id.as_deref(), Some("p9"));

    let comment = client
        .post_comment(FeedCommentRequest {
            post_id: "p9".to_string(),
            content: "first".to_string(),
            parent_id: None,
        })
        .await
        .unwrap();
    assert_eq!(comment.data.unwrap().comment_id.as_deref(), Some("c1"));

    let group = client
        .create_group(CreateGroupRequest {
            name: "Crabs".to_string(),
            description: Some("rust".to_string()),
            avatar_img_url: None,
            banner_img_url: None,
            group_privacy: None,
        })
        .await
        .unwrap();
    assert_eq!(group.data.unwrap().group_id.as_deref(), Some("g2"));

    let profile = client
        .update_profile(UpdateProfileRequest {
            last_name: Some("Lovelace".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.data.unwrap().last_name.as_deref(), Some("Lovelace"));

    client
        .register(RegisterRequest {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            gender: None,
            phone_no: None,
            day_of_birth: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_group_info_uses_id_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/group/g42"))
        .respond_with(ok(json!({ "groupId": "g42", "totalMember": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let group = client_for(&server)
        .get_group_info("g42".to_string())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(group.total_member, Some(7));
}

#[tokio::test]
async fn test_upload_sends_multipart_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/image/upload"))
        .and(|request: &Request| {
            let content_type = request
                .headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&request.body);
            content_type.starts_with("multipart/form-data")
                && body.contains("name=\"file\"")
                && body.contains("filename=\"cat.png\"")
                && body.contains("PNGDATA")
        })
        .respond_with(ok(json!({ "url": "https://cdn.example/cat.png" })))
        .expect(1)
        .mount(&server)
        .await;

    let uploaded = client_for(&server)
        .upload_image(ImageUpload::new("cat.png", "image/png", b"PNGDATA".to_vec()))
        .await
        .unwrap();
    assert_eq!(
        uploaded.data.unwrap().url.as_deref(),
        Some("https://cdn.example/cat.png")
    );
}

#[tokio::test]
async fn test_error_status_maps_to_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/me"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_user_info().await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Http {
            status: 403,
            body: "forbidden".to_string()
        }
    );
}

#[tokio::test]
async fn test_garbage_body_maps_to_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/group/list-all"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_all_groups().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_server_maps_to_transport_error() {
    let client = ApiClient::from_config(&ApiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        page_size: 10,
    })
    .unwrap();

    let err = client.list_all_groups().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}
