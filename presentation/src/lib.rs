//! Presentation layer for argos
//!
//! This crate contains CLI definitions, console formatters and the
//! progress spinner.

pub mod cli {
    pub mod commands;
}

pub mod output {
    pub mod console;
}

pub mod progress {
    pub mod reporter;
}

// Re-export commonly used types
pub use cli::commands::{Cli, Commands};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::ProgressReporter;
