//! Reasoning-backend implementations and wrappers.

mod rate_limited;

#[cfg(feature = "openai")]
mod openai;

pub use rate_limited::{BackendExt, RateLimitedBackend};

#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;
