pub mod assembler;
pub mod dto;
pub mod handlers;
pub mod models;
pub mod service;
pub mod stream;

// Re-export commonly used types
pub use models::JobInfo;
pub use service::{JobService, ServiceError};
