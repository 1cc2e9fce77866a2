//! Prefix matching and folder moving.
//!
//! [`FolderOrganizer::find_folders`] looks at the immediate children of a scan
//! root, matches each directory name against the configured course prefixes
//! and moves matches into their destination. Name collisions at the
//! destination are settled by a [`ConflictPolicy`], asking the user when the
//! policy says so.

use crate::config::Courses;
use crate::prompt::Prompter;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while scanning or moving folders.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The directory to organize does not exist.
    #[error("The source directory '{}' does not exist.", path.display())]
    SourceMissing { path: PathBuf },
    /// The scan root could not be listed.
    #[error("Error reading directory {}: {source}", path.display())]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The operating system refused access.
    #[error("Permission denied while moving {} to {}", source_path.display(), destination.display())]
    PermissionDenied {
        source_path: PathBuf,
        destination: PathBuf,
    },
    /// The destination folder for a course is not there.
    #[error("Destination folder {} does not exist", path.display())]
    DestinationMissing { path: PathBuf },
    /// Any other failure while moving a folder.
    #[error("Failed to move {} to {}: {source}", source_path.display(), destination.display())]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The overwrite question could not be answered.
    #[error("Could not read an answer for {}: {source}", path.display())]
    Prompt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for organize operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// How to handle a folder whose name already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Ask for every conflict.
    #[default]
    Ask,
    /// Replace the existing folder without asking.
    Overwrite,
    /// Leave the source folder in place without asking.
    Skip,
}

/// What to do when a course's destination directory does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestinationPolicy {
    /// Fail the move with [`OrganizeError::DestinationMissing`].
    #[default]
    RequireExisting,
    /// Create the destination (and parents) on the first move into it.
    CreateMissing,
}

/// The action chosen for a single matched folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDecision {
    /// Nothing in the way; move it.
    Move,
    /// Replace what is at the destination.
    Overwrite,
    /// Leave the source where it is.
    Skip,
}

/// Decides how to handle one matched folder.
///
/// `overwrite_approved` is only consulted when the destination exists.
pub fn decide(destination_exists: bool, overwrite_approved: bool) -> MoveDecision {
    match (destination_exists, overwrite_approved) {
        (false, _) => MoveDecision::Move,
        (true, true) => MoveDecision::Overwrite,
        (true, false) => MoveDecision::Skip,
    }
}

/// Whether an answer to the overwrite question approves it. Only `y` does.
pub fn is_overwrite_approved(answer: &str) -> bool {
    answer.trim().to_lowercase() == "y"
}

/// Returns the first prefix (in declaration order) that `name` starts with,
/// ignoring case, together with its destination.
pub fn match_prefix<'c>(courses: &'c Courses, name: &str) -> Option<(&'c str, &'c Path)> {
    let lowered = name.to_lowercase();
    courses
        .iter()
        .find(|(prefix, _)| lowered.starts_with(prefix.as_str()))
        .map(|(prefix, destination)| (prefix.as_str(), destination.as_path()))
}

/// What happened to a matched folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Overwritten,
    Skipped,
    Failed,
}

/// A folder at the scan root that matched a course prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMatch {
    /// Where the folder was found.
    pub source: PathBuf,
    /// The prefix that claimed it.
    pub prefix: String,
    /// `destination folder / folder name`.
    pub new_path: PathBuf,
    pub outcome: MoveOutcome,
}

impl FolderMatch {
    /// Name of the matched folder.
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of one [`FolderOrganizer::find_folders`] run.
///
/// Matches are kept even when the run stopped early; nothing is rolled back.
#[derive(Debug, Default)]
pub struct MatchReport {
    /// Every matched folder, whether or not it was moved.
    pub matches: Vec<FolderMatch>,
    /// The error that stopped the scan, if any.
    pub error: Option<OrganizeError>,
}

impl MatchReport {
    /// True when no folder matched any prefix.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of matches with the given outcome.
    pub fn count(&self, outcome: MoveOutcome) -> usize {
        self.matches.iter().filter(|m| m.outcome == outcome).count()
    }
}

/// Moves folders from a scan root into their course destinations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderOrganizer {
    pub conflicts: ConflictPolicy,
    pub destinations: DestinationPolicy,
}

impl FolderOrganizer {
    pub fn new(conflicts: ConflictPolicy, destinations: DestinationPolicy) -> Self {
        Self {
            conflicts,
            destinations,
        }
    }

    /// Scans the immediate entries of `scan_root` and moves every directory
    /// whose lower-cased name starts with a course prefix.
    ///
    /// Files and non-matching directories are left alone. The first error
    /// ends the scan and is stored in the report next to everything matched
    /// up to that point.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use orderly::config::Courses;
    /// use orderly::organizer::FolderOrganizer;
    /// use orderly::prompt::StdinPrompter;
    /// use std::path::{Path, PathBuf};
    ///
    /// let mut courses = Courses::new();
    /// courses.insert("cs".to_string(), PathBuf::from("/home/me/Uni/CS"));
    ///
    /// let report = FolderOrganizer::default().find_folders(
    ///     &courses,
    ///     Path::new("/home/me/Downloads"),
    ///     &mut StdinPrompter::new(),
    /// );
    /// println!("{} folders matched", report.matches.len());
    /// ```
    pub fn find_folders(
        &self,
        courses: &Courses,
        scan_root: &Path,
        prompter: &mut dyn Prompter,
    ) -> MatchReport {
        let mut report = MatchReport::default();
        if let Err(e) = self.scan(courses, scan_root, prompter, &mut report) {
            log::warn!("scan of {} stopped: {}", scan_root.display(), e);
            report.error = Some(e);
        }
        report
    }

    fn scan(
        &self,
        courses: &Courses,
        scan_root: &Path,
        prompter: &mut dyn Prompter,
        report: &mut MatchReport,
    ) -> OrganizeResult<()> {
        let entries = fs::read_dir(scan_root).map_err(|source| OrganizeError::ScanFailed {
            path: scan_root.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| OrganizeError::ScanFailed {
                path: scan_root.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some((prefix, destination)) = match_prefix(courses, &name) else {
                log::trace!("no prefix matches {}", name);
                continue;
            };

            let new_path = destination.join(entry.file_name());
            log::debug!(
                "{} matched prefix '{}' -> {}",
                path.display(),
                prefix,
                new_path.display()
            );
            report.matches.push(FolderMatch {
                source: path.clone(),
                prefix: prefix.to_string(),
                new_path: new_path.clone(),
                outcome: MoveOutcome::Failed,
            });

            let outcome = self.place(&path, destination, &new_path, prompter)?;
            if let Some(last) = report.matches.last_mut() {
                last.outcome = outcome;
            }
        }

        Ok(())
    }

    fn place(
        &self,
        source: &Path,
        destination: &Path,
        new_path: &Path,
        prompter: &mut dyn Prompter,
    ) -> OrganizeResult<MoveOutcome> {
        if is_within(new_path, source) {
            log::debug!("{} is already in place", source.display());
            return Ok(MoveOutcome::Skipped);
        }

        let exists = new_path.symlink_metadata().is_ok();
        let approved = exists && self.overwrite_approved(source, prompter)?;

        match decide(exists, approved) {
            MoveDecision::Skip => Ok(MoveOutcome::Skipped),
            MoveDecision::Move => {
                self.ensure_destination(destination)?;
                move_folder(source, new_path)?;
                Ok(MoveOutcome::Moved)
            }
            MoveDecision::Overwrite => {
                remove_existing(new_path).map_err(|e| move_error(source, new_path, e))?;
                move_folder(source, new_path)?;
                Ok(MoveOutcome::Overwritten)
            }
        }
    }

    fn overwrite_approved(&self, source: &Path, prompter: &mut dyn Prompter) -> OrganizeResult<bool> {
        match self.conflicts {
            ConflictPolicy::Overwrite => Ok(true),
            ConflictPolicy::Skip => Ok(false),
            ConflictPolicy::Ask => {
                let answer = prompter
                    .ask(&format!(
                        "Folder {} already exists in the destination. Do you want to overwrite this folder? (y/n):",
                        source.display()
                    ))
                    .map_err(|e| OrganizeError::Prompt {
                        path: source.to_path_buf(),
                        source: e,
                    })?;
                Ok(is_overwrite_approved(&answer))
            }
        }
    }

    fn ensure_destination(&self, destination: &Path) -> OrganizeResult<()> {
        if destination.is_dir() {
            return Ok(());
        }
        match self.destinations {
            DestinationPolicy::RequireExisting => Err(OrganizeError::DestinationMissing {
                path: destination.to_path_buf(),
            }),
            DestinationPolicy::CreateMissing => {
                fs::create_dir_all(destination).map_err(|source| OrganizeError::MoveFailed {
                    source_path: destination.to_path_buf(),
                    destination: destination.to_path_buf(),
                    source,
                })
            }
        }
    }
}

/// Moves `source` to `new_path`, copying across filesystems when a plain
/// rename is impossible.
fn move_folder(source: &Path, new_path: &Path) -> OrganizeResult<()> {
    match fs::rename(source, new_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!("{} is on another device, copying", new_path.display());
            copy_dir_all(source, new_path)
                .and_then(|()| fs::remove_dir_all(source))
                .map_err(|e| move_error(source, new_path, e))
        }
        Err(e) => Err(move_error(source, new_path, e)),
    }
}

/// True when `target` is `folder` itself or lies somewhere below it.
///
/// Happens when the scan root is a course destination, or when a destination
/// folder sits in the scan root and matches its own prefix.
fn is_within(target: &Path, folder: &Path) -> bool {
    let folder = fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
    // `target` usually does not exist yet, so resolve its parent instead.
    let target = match (target.parent(), target.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| target.to_path_buf()),
        _ => target.to_path_buf(),
    };
    target.starts_with(&folder)
}

fn move_error(source: &Path, new_path: &Path, error: io::Error) -> OrganizeError {
    if error.kind() == io::ErrorKind::PermissionDenied {
        OrganizeError::PermissionDenied {
            source_path: source.to_path_buf(),
            destination: new_path.to_path_buf(),
        }
    } else {
        OrganizeError::MoveFailed {
            source_path: source.to_path_buf(),
            destination: new_path.to_path_buf(),
            source: error,
        }
    }
}

fn remove_existing(path: &Path) -> io::Result<()> {
    let metadata = path.symlink_metadata()?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_dir_all(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
