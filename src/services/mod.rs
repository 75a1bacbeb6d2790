pub mod analyzer;
pub mod llm_service;
pub mod post_store;
pub mod prompt_builder;
pub mod rate_limiter;
pub mod response_parser;
pub mod retry;

pub use analyzer::Analyzer;
pub use llm_service::LlmService;
pub use post_store::PostStore;
pub use rate_limiter::RateLimiter;
pub use response_parser::ParseOutcome;
pub use retry::{classify_failure, FailureKind, RetryCoordinator, RetryDecision};
