//! graphmind-llm - Model runner implementations for graphmind.
//!
//! # Supported Providers
//!
//! - **Workers AI** - Cloudflare's hosted models, the default
//! - **OpenAI-compatible** - any `/chat/completions` endpoint
//!
//! # Example
//!
//! ```ignore
//! use graphmind_llm::RunnerFactory;
//!
//! let runner = RunnerFactory::workers_ai()?;
//! let text = runner.run("@cf/meta/llama-3.1-8b-instruct-fast", &request).await?;
//! ```

mod factory;
mod http;
mod openai_compat;
mod workers_ai;

pub use factory::RunnerFactory;
pub use openai_compat::OpenAiCompatRunner;
pub use workers_ai::WorkersAiRunner;

// Re-export core types for convenience
pub use graphmind_core::traits::{LlmConfig, LlmProvider, ModelRequest, ModelRunner};
