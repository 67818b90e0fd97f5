pub mod deepseek;
pub mod error;
pub mod parse;
pub mod provider;
pub mod verdict;

pub use deepseek::DeepSeekClient;
pub use error::{LlmError, LlmResult};
pub use parse::extract_json_object;
pub use provider::LlmProvider;
pub use verdict::{sanitize_rationale, strip_numbers, LlmVerdict, DEFAULT_CONFIDENCE};
