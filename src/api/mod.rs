//! External API client and models
//!
//! This module handles communication with the Clover service
//! and defines the data models for API requests/responses.

pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::error::Result;
use models::*;

pub use client::ApiClient;

/// Every remote endpoint the hooks call, one method per call.
///
/// `ApiClient` is the HTTP implementation. Tests substitute recording fakes.
#[async_trait]
pub trait SocialApi: Send + Sync {
    // Auth
    async fn login(&self, body: LoginRequest) -> Result<LoginResponse>;
    async fn logout(&self, token: String) -> Result<AckResponse>;
    async fn register(&self, body: RegisterRequest) -> Result<AckResponse>;

    // User
    async fn get_user_info(&self) -> Result<UserInfoResponse>;
    async fn update_profile(&self, body: UpdateProfileRequest) -> Result<UserInfoResponse>;
    async fn upload_image(&self, file: ImageUpload) -> Result<UploadResponse>;
    async fn search_user(&self, keyword: String) -> Result<SearchUserResponse>;

    // Feed
    /// `page` is zero-based
    async fn list_feed(&self, page: u32) -> Result<FeedPage>;
    async fn list_feed_of_group(&self, page: u32, group_id: String) -> Result<FeedPage>;
    async fn post_feed(&self, body: FeedPostRequest) -> Result<FeedPostResponse>;
    async fn post_comment(&self, body: FeedCommentRequest) -> Result<FeedCommentResponse>;

    // Groups
    async fn list_all_groups(&self) -> Result<GroupListResponse>;
    async fn get_group_info(&self, id: String) -> Result<GroupInfoResponse>;
    async fn create_group(&self, body: CreateGroupRequest) -> Result<GroupInfoResponse>;
}
