//! One entry point per screen-level data need.
//!
//! Queries go through the shared [`QueryClient`] and are cached by key;
//! mutations are handed back as [`Mutation`] values the caller runs when it
//! wants. Every hook forwards its arguments to the matching [`SocialApi`]
//! call untouched, except that infinite feeds count pages from 1 while the
//! service counts from 0.

use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::api::models::*;
use crate::api::{ApiClient, SocialApi};
use crate::config::Config;
use crate::debouncer::Debounced;
use crate::error::Result;
use crate::query::{
    next_page_after, InfiniteQuery, Mutation, QueryClient, QueryKey, QueryOptions,
};

/// Profile and group list stay fresh this long
pub const SHARED_STALE_TIME: Duration = Duration::from_millis(5000);

/// Retries for the profile and group reads
pub const FIXED_RETRY: u32 = 2;

/// First page parameter of the feed queries
pub const FEED_INITIAL_PAGE: u32 = 1;

/// Cache keys used by the hooks
pub mod keys {
    use super::*;

    pub fn user_info() -> QueryKey {
        QueryKey::new("UserInfo")
    }

    pub fn search_user_info(keyword: &str) -> QueryKey {
        QueryKey::new("SearchUserInfo").with(keyword)
    }

    pub fn list_feed() -> QueryKey {
        QueryKey::new("ListFeed")
    }

    pub fn list_feed_of_group(group_id: &str) -> QueryKey {
        QueryKey::new("ListFeedOfGroup").with(json!({ "groupId": group_id }))
    }

    pub fn list_all_group() -> QueryKey {
        QueryKey::new("ListAllGroup")
    }

    pub fn group_info(id: &str) -> QueryKey {
        QueryKey::new("GroupInfo").with(json!({ "id": id }))
    }
}

pub struct Hooks<A> {
    api: Arc<A>,
    client: QueryClient,
    search_delay: Duration,
}

impl<A> Clone for Hooks<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            client: self.client.clone(),
            search_delay: self.search_delay,
        }
    }
}

impl Hooks<ApiClient> {
    /// HTTP-backed hooks with cache and search settings from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(&config.api)?;
        Ok(Self::with_client(Arc::new(api), QueryClient::with_defaults(config.query.defaults()))
            .with_search_delay(config.search.debounce_delay()))
    }
}

impl<A: SocialApi + 'static> Hooks<A> {
    pub fn new(api: A) -> Self {
        Self::with_client(Arc::new(api), QueryClient::new())
    }

    pub fn with_client(api: Arc<A>, client: QueryClient) -> Self {
        Self {
            api,
            client,
            search_delay: Duration::from_millis(500),
        }
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Keyword box for [`Self::get_search_user_info`]: settles after the
    /// configured search delay
    pub fn debounced_keyword(&self, initial: &str) -> Debounced<String> {
        Debounced::new(initial.to_string(), self.search_delay)
    }

    /// Whatever is cached under `key`, without fetching
    pub async fn get_fetch_query<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.client.get_query_data(key).await
    }

    // --- auth ---

    pub fn post_login(&self) -> Mutation<LoginRequest, LoginResponse> {
        let api = self.api.clone();
        let client = self.client.clone();
        Mutation::new(move |body| {
            let api = api.clone();
            let client = client.clone();
            async move {
                let response = api.login(body).await;
                if response.is_ok() {
                    client.invalidate_queries(&keys::user_info()).await;
                }
                response
            }
        })
    }

    pub fn delete_logout(&self) -> Mutation<String, AckResponse> {
        let api = self.api.clone();
        let client = self.client.clone();
        Mutation::new(move |token| {
            let api = api.clone();
            let client = client.clone();
            async move {
                let response = api.logout(token).await;
                if response.is_ok() {
                    client.clear().await;
                }
                response
            }
        })
    }

    pub fn post_register(&self) -> Mutation<RegisterRequest, AckResponse> {
        let api = self.api.clone();
        Mutation::new(move |body| {
            let api = api.clone();
            async move { api.register(body).await }
        })
    }

    // --- user ---

    pub async fn get_user_info(
        &self,
        options: Option<QueryOptions>,
    ) -> Result<Option<UserInfoResponse>> {
        let defaults = QueryOptions::new()
            .stale_time(SHARED_STALE_TIME)
            .retry(FIXED_RETRY);
        let api = &self.api;
        self.client
            .fetch_query(&keys::user_info(), defaults.merge(options), move || {
                api.get_user_info()
            })
            .await
    }

    pub fn post_update_profile(&self) -> Mutation<UpdateProfileRequest, UserInfoResponse> {
        let api = self.api.clone();
        let client = self.client.clone();
        Mutation::new(move |body| {
            let api = api.clone();
            let client = client.clone();
            async move {
                let response = api.update_profile(body).await;
                if response.is_ok() {
                    client.invalidate_queries(&keys::user_info()).await;
                }
                response
            }
        })
    }

    pub fn post_image(&self) -> Mutation<ImageUpload, UploadResponse> {
        let api = self.api.clone();
        Mutation::new(move |file| {
            let api = api.clone();
            async move { api.upload_image(file).await }
        })
    }

    /// Disabled while `keyword` is empty
    pub async fn get_search_user_info(
        &self,
        keyword: &str,
        options: Option<QueryOptions>,
    ) -> Result<Option<SearchUserResponse>> {
        let defaults = QueryOptions::new().enabled(!keyword.is_empty());
        let api = &self.api;
        self.client
            .fetch_query(
                &keys::search_user_info(keyword),
                defaults.merge(options),
                move || api.search_user(keyword.to_string()),
            )
            .await
    }

    // --- feed ---

    pub fn post_feed(&self) -> Mutation<FeedPostRequest, FeedPostResponse> {
        let api = self.api.clone();
        let client = self.client.clone();
        Mutation::new(move |body| {
            let api = api.clone();
            let client = client.clone();
            async move {
                let response = api.post_feed(body).await;
                if response.is_ok() {
                    invalidate_feeds(&client).await;
                }
                response
            }
        })
    }

    pub fn post_comment(&self) -> Mutation<FeedCommentRequest, FeedCommentResponse> {
        let api = self.api.clone();
        let client = self.client.clone();
        Mutation::new(move |body| {
            let api = api.clone();
            let client = client.clone();
            async move {
                let response = api.post_comment(body).await;
                if response.is_ok() {
                    invalidate_feeds(&client).await;
                }
                response
            }
        })
    }

    /// News feed, with its first page loaded
    pub async fn get_list_feed(&self) -> Result<InfiniteQuery<FeedPage>> {
        let api = self.api.clone();
        let mut query = InfiniteQuery::new(
            keys::list_feed(),
            self.client.clone(),
            FEED_INITIAL_PAGE,
            move |page_param: u32| {
                let api = api.clone();
                async move { api.list_feed(page_param.saturating_sub(1)).await }
            },
            next_page_after,
        )
        .await;

        query.ensure_loaded(self.client.defaults().stale_time).await?;
        Ok(query)
    }

    /// Posts of one group, with the first page loaded
    pub async fn get_list_feed_of_group(&self, group_id: &str) -> Result<InfiniteQuery<FeedPage>> {
        let api = self.api.clone();
        let owned_group_id = group_id.to_string();
        let mut query = InfiniteQuery::new(
            keys::list_feed_of_group(group_id),
            self.client.clone(),
            FEED_INITIAL_PAGE,
            move |page_param: u32| {
                let api = api.clone();
                let group_id = owned_group_id.clone();
                async move {
                    api.list_feed_of_group(page_param.saturating_sub(1), group_id)
                        .await
                }
            },
            next_page_after,
        )
        .await;

        query.ensure_loaded(self.client.defaults().stale_time).await?;
        Ok(query)
    }

    // --- groups ---

    pub fn post_create_group(&self) -> Mutation<CreateGroupRequest, GroupInfoResponse> {
        let api = self.api.clone();
        let client = self.client.clone();
        Mutation::new(move |body| {
            let api = api.clone();
            let client = client.clone();
            async move {
                let response = api.create_group(body).await;
                if response.is_ok() {
                    client.invalidate_queries(&keys::list_all_group()).await;
                }
                response
            }
        })
    }

    pub async fn get_list_all_group(
        &self,
        options: Option<QueryOptions>,
    ) -> Result<Option<GroupListResponse>> {
        let defaults = QueryOptions::new()
            .stale_time(SHARED_STALE_TIME)
            .retry(FIXED_RETRY);
        let api = &self.api;
        self.client
            .fetch_query(&keys::list_all_group(), defaults.merge(options), move || {
                api.list_all_groups()
            })
            .await
    }

    pub async fn get_group_info(
        &self,
        id: &str,
        options: Option<QueryOptions>,
    ) -> Result<Option<GroupInfoResponse>> {
        let defaults = QueryOptions::new().retry(FIXED_RETRY);
        let api = &self.api;
        self.client
            .fetch_query(&keys::group_info(id), defaults.merge(options), move || {
                api.get_group_info(id.to_string())
            })
            .await
    }
}

async fn invalidate_feeds(client: &QueryClient) {
    client.invalidate_queries(&keys::list_feed()).await;
    client
        .invalidate_queries(&QueryKey::new("ListFeedOfGroup"))
        .await;
}
