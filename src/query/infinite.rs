use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::client::QueryClient;
use super::key::QueryKey;
use super::retry::{with_retry, RetryPolicy};
use crate::api::models::HasData;
use crate::error::Result;

/// Pages fetched so far, with the page parameter each one was fetched with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfiniteData<T> {
    pub pages: Vec<T>,
    pub page_params: Vec<u32>,
}

impl<T> Default for InfiniteData<T> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            page_params: Vec::new(),
        }
    }
}

/// Next page number for page-counting pagination.
///
/// Pages are numbered from 1, so after `all` pages the next one is
/// `all.len() + 1`. A page without data ends the sequence.
pub fn next_page_after<T: HasData>(last: &T, all: &[T]) -> Option<u32> {
    if last.has_data() {
        Some(all.len() as u32 + 1)
    } else {
        None
    }
}

type PageFetcher<T> = Arc<dyn Fn(u32) -> BoxFuture<'static, Result<T>> + Send + Sync>;
type NextPageParam<T> = fn(&T, &[T]) -> Option<u32>;

/// A paginated read whose pages accumulate under one cache key
pub struct InfiniteQuery<T> {
    key: QueryKey,
    client: QueryClient,
    fetch_page: PageFetcher<T>,
    initial_page_param: u32,
    get_next_page_param: NextPageParam<T>,
    retry: RetryPolicy,
    data: InfiniteData<T>,
}

impl<T> InfiniteQuery<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Create the query, resuming from pages already cached under `key`
    pub async fn new<F, Fut>(
        key: QueryKey,
        client: QueryClient,
        initial_page_param: u32,
        fetch_page: F,
        get_next_page_param: NextPageParam<T>,
    ) -> Self
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let data = client
            .get_query_data::<InfiniteData<T>>(&key)
            .await
            .unwrap_or_default();
        let retry = client.resolve(&Default::default()).retry;

        Self {
            key,
            client,
            fetch_page: Arc::new(move |page| Box::pin(fetch_page(page))),
            initial_page_param,
            get_next_page_param,
            retry,
            data,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn data(&self) -> &InfiniteData<T> {
        &self.data
    }

    pub fn pages(&self) -> &[T] {
        &self.data.pages
    }

    /// Parameter the next fetch would use, or `None` when the sequence ended
    pub fn next_page_param(&self) -> Option<u32> {
        match self.data.pages.last() {
            None => Some(self.initial_page_param),
            Some(last) => (self.get_next_page_param)(last, &self.data.pages),
        }
    }

    pub fn has_next_page(&self) -> bool {
        !self.data.pages.is_empty() && self.next_page_param().is_some()
    }

    /// Fetch the first page if nothing is loaded, or refetch every loaded
    /// page when the cached copy is older than `stale_time`
    pub async fn ensure_loaded(&mut self, stale_time: Duration) -> Result<()> {
        if self.data.pages.is_empty() {
            self.fetch_next_page().await?;
        } else if !self.client.is_fresh(&self.key, stale_time).await {
            self.refetch().await?;
        }
        Ok(())
    }

    /// Fetch the page after the last one loaded.
    ///
    /// Returns the new page, or `None` without making a request when the
    /// previous page had no data.
    pub async fn fetch_next_page(&mut self) -> Result<Option<&T>> {
        let Some(page_param) = self.next_page_param() else {
            debug!(target: "query", "{}: no further pages", self.key);
            return Ok(None);
        };

        let page = self.load(page_param).await?;
        self.data.pages.push(page);
        self.data.page_params.push(page_param);
        // appending a page does not make the earlier ones fresh
        self.client.update_query_data(&self.key, &self.data).await?;

        Ok(self.data.pages.last())
    }

    /// Reload the loaded pages from the first one, stopping early if the
    /// sequence now ends sooner
    pub async fn refetch(&mut self) -> Result<()> {
        let wanted = self.data.pages.len().max(1);
        let mut fresh = InfiniteData::default();
        let mut page_param = Some(self.initial_page_param);

        while let Some(param) = page_param {
            if fresh.pages.len() >= wanted {
                break;
            }
            let page = self.load(param).await?;
            fresh.pages.push(page);
            fresh.page_params.push(param);
            page_param = fresh
                .pages
                .last()
                .and_then(|last| (self.get_next_page_param)(last, &fresh.pages));
        }

        self.data = fresh;
        self.client.set_query_data(&self.key, &self.data).await
    }

    async fn load(&self, page_param: u32) -> Result<T> {
        let label = format!("{} page {}", self.key, page_param);
        let fetch_page = self.fetch_page.clone();
        with_retry(&self.retry, &label, || fetch_page(page_param)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ApiResponse;
    use crate::error::ClientError;
    use std::sync::Mutex;

    type Page = ApiResponse<Vec<u32>>;

    #[test]
    fn test_next_page_after_page_with_data() {
        let pages: Vec<Page> = vec![
            ApiResponse::with_data(vec![1, 2]),
            ApiResponse::with_data(vec![3]),
        ];
        assert_eq!(next_page_after(&pages[1], &pages), Some(3));
    }

    #[test]
    fn test_next_page_after_empty_page_is_none() {
        let pages: Vec<Page> = vec![
            ApiResponse::with_data(vec![1]),
            ApiResponse::with_data(vec![]),
        ];
        assert_eq!(next_page_after(&pages[1], &pages), None);

        let missing: Vec<Page> = vec![ApiResponse::empty()];
        assert_eq!(next_page_after(&missing[0], &missing), None);
    }

    /// Serves `total` one-item pages, then empty ones, and records requests
    fn paged_source(
        total: u32,
        log: Arc<Mutex<Vec<u32>>>,
    ) -> impl Fn(u32) -> futures::future::Ready<Result<Page>> {
        move |page| {
            log.lock().unwrap().push(page);
            let items = if page <= total { vec![page] } else { vec![] };
            futures::future::ready(Ok(ApiResponse::with_data(items)))
        }
    }

    #[tokio::test]
    async fn test_pages_accumulate_until_empty_page() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = InfiniteQuery::new(
            QueryKey::new("Numbers"),
            QueryClient::new(),
            1,
            paged_source(2, log.clone()),
            next_page_after,
        )
        .await;

        assert!(!query.has_next_page());
        assert!(query.fetch_next_page().await.unwrap().is_some());
        assert!(query.fetch_next_page().await.unwrap().is_some());
        assert!(query.has_next_page());
        // third page comes back empty
        assert!(query.fetch_next_page().await.unwrap().is_some());
        assert!(!query.has_next_page());
        assert!(query.fetch_next_page().await.unwrap().is_none());

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(query.data().page_params, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_pages_are_mirrored_into_cache() {
        let client = QueryClient::new();
        let key = QueryKey::new("Numbers");
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut query = InfiniteQuery::new(
            key.clone(),
            client.clone(),
            1,
            paged_source(5, log.clone()),
            next_page_after,
        )
        .await;
        query.fetch_next_page().await.unwrap();
        query.fetch_next_page().await.unwrap();

        let cached: Option<InfiniteData<Page>> = client.get_query_data(&key).await;
        assert_eq!(cached.map(|d| d.page_params), Some(vec![1, 2]));

        let resumed =
            InfiniteQuery::new(key, client, 1, paged_source(5, log), next_page_after).await;
        assert_eq!(resumed.pages().len(), 2);
        assert_eq!(resumed.next_page_param(), Some(3));
    }

    #[tokio::test]
    async fn test_next_page_does_not_undo_invalidation() {
        let client = QueryClient::new();
        let key = QueryKey::new("Numbers");
        let log = Arc::new(Mutex::new(Vec::new()));
        let fresh_for = Duration::from_secs(60);

        let mut query = InfiniteQuery::new(
            key.clone(),
            client.clone(),
            1,
            paged_source(5, log.clone()),
            next_page_after,
        )
        .await;
        query.ensure_loaded(fresh_for).await.unwrap();

        client.invalidate_queries(&key).await;
        query.fetch_next_page().await.unwrap();
        assert!(!client.is_fresh(&key, fresh_for).await);

        let mut reopened =
            InfiniteQuery::new(key, client, 1, paged_source(5, log.clone()), next_page_after)
                .await;
        reopened.ensure_loaded(fresh_for).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 1, 2]);
        assert_eq!(reopened.pages().len(), 2);
    }

    #[tokio::test]
    async fn test_refetch_reloads_loaded_pages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = InfiniteQuery::new(
            QueryKey::new("Numbers"),
            QueryClient::new(),
            1,
            paged_source(5, log.clone()),
            next_page_after,
        )
        .await;
        query.fetch_next_page().await.unwrap();
        query.fetch_next_page().await.unwrap();

        query.refetch().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 1, 2]);
        assert_eq!(query.pages().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_leaves_loaded_pages_alone() {
        let mut query = InfiniteQuery::new(
            QueryKey::new("Broken"),
            QueryClient::new(),
            1,
            |page: u32| async move {
                if page == 1 {
                    Ok(ApiResponse::with_data(vec![page]))
                } else {
                    Err(ClientError::Http {
                        status: 500,
                        body: "boom".to_string(),
                    })
                }
            },
            next_page_after,
        )
        .await
        .with_retry(RetryPolicy::none());

        query.fetch_next_page().await.unwrap();
        assert!(query.fetch_next_page().await.is_err());
        assert_eq!(query.pages().len(), 1);
    }
}
