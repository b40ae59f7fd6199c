//! LLM provider adapters: OpenAI-compatible chat completions, Gemini
//! `generateContent`, and a scriptable mock, plus the registry that builds
//! them from config.

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod registry;

pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use registry::{build_http_client, ProviderRegistry};
