//! Terminal output
//!
//! `cliclack` in an interactive terminal, plain prefixed lines in CI where
//! most builds run.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, remark, section, step_error_detail, step_info,
    step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::HashProgress;
pub use prompts::confirm;
pub use theme::init_theme;
