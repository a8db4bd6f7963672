// Library interface for pasajes-tui
// Exposes modules for testing and reuse

pub mod app_main;
pub mod config;
pub mod launcher;
pub mod state;
pub mod stylesheet;

// Re-export commonly used types
pub use app_main::AppMain;
pub use config::{AppConfig, Keymap};
pub use state::{Command, Focus, State, StatusKind};
