//! Interactive question/answer plumbing.
//!
//! Every place that needs an answer from the user goes through the
//! [`Prompter`] trait, so the setup flow, the backup fallback and the
//! overwrite question can all be driven from tests with a [`ScriptedPrompter`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of answers to interactive questions.
pub trait Prompter {
    /// Shows `question` and returns the raw answer line (without the newline).
    ///
    /// # Errors
    ///
    /// Returns an error when no answer can be read, e.g. on end of input.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Returns true for answers that mean "yes" (`y` or `yes`, any case).
pub fn confirm(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prompts on stdout and reads answers from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{} ", question)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Replays a fixed list of answers and records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    /// Creates a prompter that will hand out `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }

    /// Questions asked so far, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Number of answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for: {}", question),
            )
        })
    }
}
