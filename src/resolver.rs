//! First-run setup: base directory, course prefixes and destination folders.

use crate::config::{Configuration, Courses};
use crate::output::OutputFormatter;
use crate::prompt::{Prompter, confirm};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that end the interactive setup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The subject count was not a non-negative integer.
    #[error("Invalid number of courses entered: '{0}'. Please enter an integer.")]
    InvalidCount(String),
    /// The base directory does not exist and was not created.
    #[error("The directory '{}' does not exist. Please provide a valid directory path.", .0.display())]
    BaseDirectoryMissing(PathBuf),
    /// Creating the base directory failed.
    #[error("Could not create directory {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// No answer could be read.
    #[error("Could not read input: {0}")]
    Input(#[from] io::Error),
}

/// Result type for setup operations.
pub type SetupResult<T> = Result<T, SetupError>;

/// Runs the whole first-run flow and returns the configuration to save.
///
/// `current_dir` is used when the base directory answer is left blank.
pub fn gather_setup(prompter: &mut dyn Prompter, current_dir: &Path) -> SetupResult<Configuration> {
    let base_directory = ask_base_directory(prompter, current_dir)?;
    let prefixes = ask_prefixes(prompter)?;
    let courses = FolderResolver::new(&base_directory).resolve(&prefixes, prompter)?;
    Ok(Configuration::new(base_directory, courses))
}

/// Asks for the base directory, offering to create it when it is missing.
pub fn ask_base_directory(prompter: &mut dyn Prompter, current_dir: &Path) -> SetupResult<PathBuf> {
    let answer = prompter.ask(
        "Enter the base directory for your folders (leave blank to use the current directory):",
    )?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(current_dir.to_path_buf());
    }

    let base = PathBuf::from(answer);
    if base.exists() {
        return Ok(base);
    }

    OutputFormatter::error(&format!("The directory '{}' does not exist.", base.display()));
    let create = prompter.ask(&format!(
        "Do you want to create the directory '{}'? (yes/no):",
        base.display()
    ))?;
    if !confirm(&create) {
        return Err(SetupError::BaseDirectoryMissing(base));
    }

    fs::create_dir_all(&base).map_err(|source| SetupError::CreateFailed {
        path: base.clone(),
        source,
    })?;
    OutputFormatter::success(&format!("Directory '{}' created.", base.display()));
    Ok(base)
}

/// Asks how many subjects there are, then one prefix per subject.
///
/// Prefixes are trimmed and lower-cased; empty or repeated prefixes are
/// asked for again.
pub fn ask_prefixes(prompter: &mut dyn Prompter) -> SetupResult<Vec<String>> {
    let count = prompter.ask("Enter the number of Subjects:")?;
    let count: usize = count
        .trim()
        .parse()
        .map_err(|_| SetupError::InvalidCount(count.trim().to_string()))?;

    let mut prefixes: Vec<String> = Vec::with_capacity(count);
    for i in 1..=count {
        loop {
            let prefix = prompter
                .ask(&format!("Enter prefix for Subject {}:", i))?
                .trim()
                .to_lowercase();
            if prefix.is_empty() {
                OutputFormatter::warning("The prefix cannot be empty.");
            } else if prefixes.contains(&prefix) {
                OutputFormatter::warning(&format!("Prefix '{}' is already used.", prefix));
            } else {
                prefixes.push(prefix);
                break;
            }
        }
    }

    Ok(prefixes)
}

/// Maps each course prefix to a destination folder under a base directory.
///
/// Only declares destinations; directories are not created here.
#[derive(Debug, Clone)]
pub struct FolderResolver {
    base_directory: PathBuf,
}

impl FolderResolver {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }

    /// Asks for a folder name per prefix, in order, and records
    /// `base_directory / name` as that course's destination.
    ///
    /// # Errors
    ///
    /// Fails only when an answer cannot be read.
    pub fn resolve(&self, prefixes: &[String], prompter: &mut dyn Prompter) -> SetupResult<Courses> {
        let mut courses = Courses::with_capacity(prefixes.len());
        for prefix in prefixes {
            let folder_path = self.ask_folder(prefix, prompter)?;
            courses.insert(prefix.clone(), folder_path);
        }
        Ok(courses)
    }

    fn ask_folder(&self, prefix: &str, prompter: &mut dyn Prompter) -> SetupResult<PathBuf> {
        loop {
            let answer = prompter.ask(&format!("Enter folder name for prefix '{}':", prefix))?;
            let folder_name = answer.trim();
            if folder_name.is_empty() {
                OutputFormatter::warning("The folder name cannot be empty.");
                continue;
            }

            let folder_path = self.base_directory.join(folder_name);
            if folder_path.exists() {
                OutputFormatter::warning(&format!(
                    "Folder '{}' already exists. Skipping creation...",
                    folder_name
                ));
            }
            log::debug!("prefix '{}' -> {}", prefix, folder_path.display());
            return Ok(folder_path);
        }
    }
}
