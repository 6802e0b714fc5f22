//! Terminal presentation: themes, prompts and output rendering

pub mod output;
pub mod prompt;
pub mod theme;

pub use output::{CommandOutput, OutputFormat, Reporter, Tone};
pub use prompt::{ci_from_env, Interaction};
pub use theme::Palette;
