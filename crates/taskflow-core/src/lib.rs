//! Core Taskflow library (config, credential store, session, API client).

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod validation;

pub use api::ApiClient;
pub use app::Taskflow;
pub use config::Config;
pub use error::{ApiError, StorageError, ValidationError};
pub use session::{SessionState, SessionStatus};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use validation::Registration;
