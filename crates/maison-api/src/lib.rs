// HTTP client for the hosted marketplace backend (PostgREST-style API)

pub mod rest;
pub mod retry;

pub use rest::{NotificationRow, ProductRow, RestClient, RestError};
pub use retry::RetryConfig;
