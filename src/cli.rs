//! Command-line interface module for orderly.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Mode selection (edit, reset, organize)
//! - First-run setup when no configuration exists
//! - Organizing a directory with the stored course prefixes

use crate::config::{ConfigError, ConfigStore, Courses, Settings};
use crate::organizer::{ConflictPolicy, DestinationPolicy, FolderOrganizer, OrganizeError};
use crate::output::OutputFormatter;
use crate::platform::{Platform, PlatformError};
use crate::prompt::Prompter;
use crate::resolver::{SetupError, gather_setup};
use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "orderly",
    version,
    about = "Move course folders into their destination directories by name prefix"
)]
pub struct Args {
    /// Edit the configuration file
    #[arg(long)]
    pub edit: bool,

    /// Delete the existing configuration file and its backup
    #[arg(long)]
    pub reset: bool,

    /// Directory to organize (default is the current directory)
    #[arg(long, value_name = "DIRECTORY", value_hint = clap::ValueHint::DirPath)]
    pub src: Option<PathBuf>,

    /// Directory holding the configuration files
    #[arg(long, env = "ORDERLY_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Editor used by --edit
    #[arg(long, env = "EDITOR", value_name = "COMMAND")]
    pub editor: Option<String>,

    /// What to do when a folder already exists at its destination
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
    pub on_conflict: ConflictPolicy,

    /// Create missing destination folders instead of failing the move
    #[arg(long)]
    pub create_dirs: bool,
}

/// The three things a run can do. Flags are checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Open the primary configuration document in an editor.
    Edit,
    /// Delete the configuration documents.
    Reset,
    /// Organize the source directory, running setup first if needed.
    Organize,
}

impl Mode {
    /// Picks the mode from the flags: `--edit` beats `--reset`, which beats
    /// the normal flow.
    pub fn from_args(args: &Args) -> Self {
        if args.edit {
            Mode::Edit
        } else if args.reset {
            Mode::Reset
        } else {
            Mode::Organize
        }
    }
}

/// Errors that end a run with a failure exit status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration file not found: {}", .0.display())]
    EditTargetMissing(PathBuf),
    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Runs orderly with the given arguments from the process's current directory.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use orderly::cli::{Args, run_cli};
/// use orderly::platform;
/// use orderly::prompt::StdinPrompter;
///
/// let args = Args::parse_from(["orderly", "--src", "/home/me/Downloads"]);
/// let platform = platform::current();
/// if let Err(e) = run_cli(&args, platform.as_ref(), &mut StdinPrompter::new()) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(
    args: &Args,
    platform: &dyn Platform,
    prompter: &mut dyn Prompter,
) -> Result<(), AppError> {
    let current_dir = std::env::current_dir().map_err(AppError::CurrentDir)?;
    run_cli_in(args, platform, prompter, &current_dir)
}

/// Runs orderly with an explicit current directory.
///
/// `current_dir` stands in for the process's working directory both as the
/// default scan root and as the default base directory during setup.
pub fn run_cli_in(
    args: &Args,
    platform: &dyn Platform,
    prompter: &mut dyn Prompter,
    current_dir: &Path,
) -> Result<(), AppError> {
    let settings = Settings::new(args.config_dir.clone(), args.editor.clone(), platform);
    log::debug!("configuration directory: {}", settings.config_dir.display());

    match Mode::from_args(args) {
        Mode::Edit => edit_configuration(&settings, platform),
        Mode::Reset => reset_configuration(&settings, platform),
        Mode::Organize => organize(args, &settings, platform, prompter, current_dir),
    }
}

/// Opens the primary document in an editor.
///
/// The document is made writable for the duration of the edit and restored
/// to read-only afterwards.
fn edit_configuration(settings: &Settings, platform: &dyn Platform) -> Result<(), AppError> {
    let primary = settings.primary_path();
    if !primary.exists() {
        return Err(AppError::EditTargetMissing(primary));
    }

    platform.set_writable(&primary)?;
    let edited = platform.open_in_editor(&primary, &settings.editor);
    platform.set_read_only(&primary)?;
    edited?;

    OutputFormatter::success(&format!("Finished editing {}", primary.display()));
    Ok(())
}

/// Deletes the primary and backup documents, elevating first if needed.
fn reset_configuration(settings: &Settings, platform: &dyn Platform) -> Result<(), AppError> {
    let store = ConfigStore::new(&settings.config_dir, platform);

    if !platform.is_elevated() {
        OutputFormatter::warning(
            "This operation requires root privileges. You will be prompted for your password.",
        );
        platform.elevate(store.dir())?;
        OutputFormatter::info("Reset continues in the elevated process.");
        return Ok(());
    }

    let report = match store.reset() {
        Ok(report) => report,
        Err(e) => {
            OutputFormatter::error(&format!("Error deleting configuration file: {}", e));
            OutputFormatter::plain(&format!(
                "Please delete the config file manually. File location: {}",
                store.dir().display()
            ));
            return Err(e.into());
        }
    };

    if report.primary_removed {
        OutputFormatter::success(&format!(
            "Configuration file '{}' deleted.",
            store.primary_path().display()
        ));
    } else {
        OutputFormatter::warning("No configuration file found to delete.");
    }

    if report.backup_removed {
        OutputFormatter::success("Configuration backup file deleted.");
    } else {
        OutputFormatter::warning("No backup configuration file found to delete.");
    }

    Ok(())
}

/// Resolves the directory to organize: `--src` (relative to `current_dir`)
/// or `current_dir` itself.
pub fn resolve_scan_root(src: Option<&Path>, current_dir: &Path) -> Result<PathBuf, OrganizeError> {
    let Some(src) = src else {
        return Ok(current_dir.to_path_buf());
    };

    let path = current_dir.join(src);
    if path.exists() {
        Ok(path)
    } else {
        Err(OrganizeError::SourceMissing {
            path: src.to_path_buf(),
        })
    }
}

fn organize(
    args: &Args,
    settings: &Settings,
    platform: &dyn Platform,
    prompter: &mut dyn Prompter,
    current_dir: &Path,
) -> Result<(), AppError> {
    let scan_root = resolve_scan_root(args.src.as_deref(), current_dir)?;
    let store = ConfigStore::new(&settings.config_dir, platform);

    let courses: Courses = match store.load(prompter) {
        Ok(config) => {
            log::info!(
                "loaded {} course prefixes from {}",
                config.courses.len(),
                store.primary_path().display()
            );
            config.courses
        }
        Err(e) => {
            report_missing_configuration(&e);
            first_run_setup(&store, prompter, current_dir)?
        }
    };

    let destinations = if args.create_dirs {
        DestinationPolicy::CreateMissing
    } else {
        DestinationPolicy::RequireExisting
    };
    let organizer = FolderOrganizer::new(args.on_conflict, destinations);

    OutputFormatter::info(&format!("Searching in directory: {}", scan_root.display()));
    let report = organizer.find_folders(&courses, &scan_root, prompter);
    OutputFormatter::match_report(&report);

    Ok(())
}

fn report_missing_configuration(error: &ConfigError) {
    match error {
        ConfigError::NotFound { .. } => {
            OutputFormatter::info("No configuration or backup file found. Starting setup.")
        }
        ConfigError::BackupDeclined => OutputFormatter::plain(&error.to_string()),
        other => OutputFormatter::error(&format!("Error loading configuration: {}", other)),
    }
}

/// Gathers a fresh configuration and saves it. A failed save is reported
/// but does not stop the run.
fn first_run_setup(
    store: &ConfigStore<'_>,
    prompter: &mut dyn Prompter,
    current_dir: &Path,
) -> Result<Courses, AppError> {
    let config = gather_setup(prompter, current_dir)?;

    match store.save(&config) {
        Ok(saved) => OutputFormatter::success(&format!(
            "Configuration saved to {}.",
            saved.primary.display()
        )),
        Err(e) => OutputFormatter::error(&format!("Error saving configuration: {}", e)),
    }

    Ok(config.courses)
}
