#![warn(clippy::pedantic)]
// Noisy doc/signature lints
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: format!("{}", x) over format!("{x}")
#![allow(clippy::uninlined_format_args)]
// Intentional casts in timing and size arithmetic (durations, counts, char limits)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
// The router pipeline and catalog tables are naturally long
#![allow(clippy::too_many_lines)]
// Module structure: tools::ToolRegistry, router::ChatRouter and similar
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod providers;
pub mod resilience;
pub mod router;
pub mod safety;
pub mod session;
pub mod tools;
pub(crate) mod utils;

pub use errors::ParleyError;
pub use router::{ChatResponse, ChatRouter, ChatRouterBuilder};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
