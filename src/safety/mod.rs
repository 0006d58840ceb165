pub mod prompt_guard;
pub mod sanitizer;

pub use prompt_guard::PromptGuard;
pub use sanitizer::{BlockReason, SanitizeResult, Sanitizer, validate_file_path};
