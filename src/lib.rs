pub mod api;
pub mod config;
pub mod debouncer;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod query;

pub use api::{ApiClient, SocialApi};
pub use error::{ClientError, Result};
pub use hooks::Hooks;
