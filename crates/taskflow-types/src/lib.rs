//! Shared data types for the Taskflow client (no I/O).

pub mod auth;
pub mod task;

pub use auth::{
    LoginRequest, Receipt, RefreshRequest, RefreshResponse, RegisterRequest, Session, User,
    VerifyOtpRequest,
};
pub use task::{NewTask, Task, TaskSummary};
