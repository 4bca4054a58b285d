use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use super::retry::{with_retry, RetryPolicy};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Debug)]
struct MutationState<T> {
    status: MutationStatus,
    data: Option<T>,
    error: Option<ClientError>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
        }
    }
}

type MutationFn<V, T> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A write operation. Results are tracked on the mutation itself but never
/// cached by key.
pub struct Mutation<V, T> {
    mutation_fn: MutationFn<V, T>,
    retry: RetryPolicy,
    state: Arc<Mutex<MutationState<T>>>,
}

impl<V, T> Clone for Mutation<V, T> {
    fn clone(&self) -> Self {
        Self {
            mutation_fn: self.mutation_fn.clone(),
            retry: self.retry.clone(),
            state: self.state.clone(),
        }
    }
}

impl<V, T> Mutation<V, T>
where
    V: Clone + Send + 'static,
    T: Clone + Send + 'static,
{
    pub fn new<F, Fut>(mutation_fn: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            mutation_fn: Arc::new(move |variables| Box::pin(mutation_fn(variables))),
            retry: RetryPolicy::none(),
            state: Arc::new(Mutex::new(MutationState::default())),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the mutation with `variables` and record the outcome
    pub async fn mutate(&self, variables: V) -> Result<T> {
        {
            let mut state = self.lock();
            state.status = MutationStatus::Pending;
            state.error = None;
        }

        let mutation_fn = self.mutation_fn.clone();
        let result = with_retry(&self.retry, "mutation", || mutation_fn(variables.clone())).await;

        let mut state = self.lock();
        match &result {
            Ok(data) => {
                state.status = MutationStatus::Success;
                state.data = Some(data.clone());
            }
            Err(err) => {
                state.status = MutationStatus::Error;
                state.error = Some(err.clone());
            }
        }
        result
    }

    pub fn status(&self) -> MutationStatus {
        self.lock().status
    }

    pub fn is_pending(&self) -> bool {
        self.status() == MutationStatus::Pending
    }

    /// Data from the last successful run
    pub fn data(&self) -> Option<T> {
        self.lock().data.clone()
    }

    /// Error from the last run, cleared when a new run starts
    pub fn error(&self) -> Option<ClientError> {
        self.lock().error.clone()
    }

    pub fn reset(&self) {
        *self.lock() = MutationState::default();
    }

    fn lock(&self) -> MutexGuard<'_, MutationState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
