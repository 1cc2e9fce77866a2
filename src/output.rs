//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output
//! and the end-of-run summary table. This module abstracts away output details,
//! making it easy to change formatting globally.

use crate::organizer::{FolderMatch, MatchReport, MoveOutcome};
use colored::*;
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - The per-destination summary of an organize run
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use orderly::output::OutputFormatter;
    /// OutputFormatter::success("Configuration saved");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message.green());
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message.red());
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message.yellow());
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints one line per matched folder describing what happened to it.
    pub fn folder_match(folder: &FolderMatch) {
        let source = folder.source.display();
        let target = folder.new_path.display();
        match folder.outcome {
            MoveOutcome::Moved => Self::success(&format!("Moved {} to {}", source, target)),
            MoveOutcome::Overwritten => {
                Self::success(&format!("Moved {} to {} (overwritten)", source, target))
            }
            MoveOutcome::Skipped => Self::plain(&format!("Skipped folder: {}", folder.name())),
            MoveOutcome::Failed => Self::error(&format!("Could not move {}", source)),
        }
    }

    /// Prints the outcome of an organize run: every match, then a table of
    /// moved folders per destination.
    pub fn match_report(report: &MatchReport) {
        for folder in &report.matches {
            Self::folder_match(folder);
        }

        if let Some(error) = &report.error {
            Self::error(&format!("An error occurred: {}", error));
        }

        if report.is_empty() {
            Self::warning("No matching folders found.");
            return;
        }

        let mut per_destination: BTreeMap<String, usize> = BTreeMap::new();
        for folder in &report.matches {
            if matches!(folder.outcome, MoveOutcome::Moved | MoveOutcome::Overwritten) {
                let destination = folder
                    .new_path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                *per_destination.entry(destination).or_insert(0) += 1;
            }
        }

        Self::summary_table(&per_destination, report.count(MoveOutcome::Skipped));
    }

    /// Prints a summary table of moved folder counts by destination.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use orderly::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("/home/me/Uni/CS".to_string(), 3);
    /// counts.insert("/home/me/Uni/Math".to_string(), 1);
    /// OutputFormatter::summary_table(&counts, 0);
    /// ```
    pub fn summary_table(per_destination: &BTreeMap<String, usize>, skipped: usize) {
        Self::header("SUMMARY");

        // Calculate column widths
        let width = per_destination
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(11); // At least "Destination" width

        println!(
            "{:<width$} | {}",
            "Destination".bold(),
            "Folders".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 12));

        for (destination, count) in per_destination {
            println!(
                "{:<width$} | {} {}",
                destination,
                count.to_string().green(),
                folder_word(*count),
                width = width
            );
        }

        let total: usize = per_destination.values().sum();
        println!("{}", "-".repeat(width + 12));
        println!(
            "{:<width$} | {} {}",
            "Moved".bold(),
            total.to_string().green().bold(),
            folder_word(total),
            width = width
        );
        if skipped > 0 {
            println!(
                "{:<width$} | {} {}",
                "Skipped".bold(),
                skipped.to_string().yellow(),
                folder_word(skipped),
                width = width
            );
        }
    }
}

fn folder_word(count: usize) -> &'static str {
    if count == 1 { "folder" } else { "folders" }
}
