//! Output formatting for CLI.

mod json;
mod progress;
pub mod report;
mod text;

pub use json::JsonOutput;
pub use progress::ProgressBar;
pub use text::TextOutput;
