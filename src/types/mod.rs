//! Wire types of the task REST contract.

pub mod auth;
pub mod task;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest, Session};
pub use task::{DeleteResponse, Task, TaskPriority, TaskRequest, TaskStatus};
