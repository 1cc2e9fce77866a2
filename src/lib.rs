//! orderly - move course folders where they belong
//!
//! This library matches directory names against user-defined prefixes,
//! moves matching folders into their configured destinations, and keeps the
//! prefix configuration (with a backup copy) in the per-user config directory.

pub mod cli;
pub mod config;
pub mod organizer;
pub mod output;
pub mod platform;
pub mod prompt;
pub mod resolver;

pub use config::{ConfigError, ConfigStore, Configuration, Courses, Settings};
pub use organizer::{ConflictPolicy, FolderOrganizer, MatchReport, OrganizeError};
pub use platform::Platform;
pub use prompt::{Prompter, ScriptedPrompter, StdinPrompter};

pub use cli::{Args, Mode, run_cli, run_cli_in};
