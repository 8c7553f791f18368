//! Model-serving adapters for generation, critique and intent fallback.

mod mock;
mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
