use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use super::models::*;
use super::SocialApi;
use crate::config::ApiConfig;
use crate::error::{ClientError, Result};
use crate::trace_request;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    page_size: u32,
    client: Client,
    // In-memory only, never written anywhere
    access_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: ApiConfig::default().page_size,
            client: Client::new(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            client,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_access_token(Some(token.into()));
        self
    }

    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        trace_request!(method, path);
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            debug!(target: "api", "Request failed with {}: {}", status, body);
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }
}

#[async_trait]
impl SocialApi for ApiClient {
    async fn login(&self, body: LoginRequest) -> Result<LoginResponse> {
        self.send(self.request(Method::POST, "/api/v1/account/login").json(&body))
            .await
    }

    async fn logout(&self, token: String) -> Result<AckResponse> {
        self.send(
            self.request(Method::DELETE, "/api/v1/account/logout")
                .query(&[("token", token)]),
        )
        .await
    }

    async fn register(&self, body: RegisterRequest) -> Result<AckResponse> {
        self.send(self.request(Method::POST, "/api/v1/account/register").json(&body))
            .await
    }

    async fn get_user_info(&self) -> Result<UserInfoResponse> {
        self.send(self.request(Method::GET, "/api/v1/user/me")).await
    }

    async fn update_profile(&self, body: UpdateProfileRequest) -> Result<UserInfoResponse> {
        self.send(
            self.request(Method::POST, "/api/v1/user/update-profile")
                .json(&body),
        )
        .await
    }

    async fn upload_image(&self, file: ImageUpload) -> Result<UploadResponse> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| ClientError::Transport(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part("file", part);

        self.send(self.request(Method::POST, "/api/v1/image/upload").multipart(form))
            .await
    }

    async fn search_user(&self, keyword: String) -> Result<SearchUserResponse> {
        self.send(
            self.request(Method::GET, "/api/v1/user/search")
                .query(&[("keyword", keyword)]),
        )
        .await
    }

    async fn list_feed(&self, page: u32) -> Result<FeedPage> {
        self.send(
            self.request(Method::GET, "/api/v1/feed/list-newsfeed")
                .query(&[("page", page), ("size", self.page_size)]),
        )
        .await
    }

    async fn list_feed_of_group(&self, page: u32, group_id: String) -> Result<FeedPage> {
        self.send(
            self.request(Method::GET, "/api/v1/feed/list-post-by-group")
                .query(&[("groupId", group_id)])
                .query(&[("page", page), ("size", self.page_size)]),
        )
        .await
    }

    async fn post_feed(&self, body: FeedPostRequest) -> Result<FeedPostResponse> {
        self.send(self.request(Method::POST, "/api/v1/feed/post").json(&body))
            .await
    }

    async fn post_comment(&self, body: FeedCommentRequest) -> Result<FeedCommentResponse> {
        self.send(self.request(Method::POST, "/api/v1/feed/comment").json(&body))
            .await
    }

    async fn list_all_groups(&self) -> Result<GroupListResponse> {
        self.send(self.request(Method::GET, "/api/v1/group/list-all"))
            .await
    }

    async fn get_group_info(&self, id: String) -> Result<GroupInfoResponse> {
        let path = format!("/api/v1/group/{}", id);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn create_group(&self, body: CreateGroupRequest) -> Result<GroupInfoResponse> {
        self.send(self.request(Method::POST, "/api/v1/group/create").json(&body))
            .await
    }
}
