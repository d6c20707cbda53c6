pub mod client;
pub mod retry;
mod translate;

pub use client::OpenRouterClient;
pub use retry::RetryPolicy;
