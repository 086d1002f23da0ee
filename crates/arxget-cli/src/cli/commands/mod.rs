//! CLI command handlers. Each command is in its own file.

mod completions;
mod list;
mod run;

pub use completions::run_completions;
pub use list::run_list;
pub use run::run_walk;
