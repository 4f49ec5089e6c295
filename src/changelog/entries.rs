//! Sources of changelog entries.

use crate::error::{CliError, Result};
use std::io::{BufRead, Write};

/// Supplies the notes for a new changelog section.
///
/// An empty list means the changelog is left unchanged.
pub trait EntrySource {
    /// Entries for `repo_name`, in display order.
    fn provide_entries(&mut self, repo_name: &str) -> Result<Vec<String>>;
}

impl<T: EntrySource + ?Sized> EntrySource for Box<T> {
    fn provide_entries(&mut self, repo_name: &str) -> Result<Vec<String>> {
        (**self).provide_entries(repo_name)
    }
}

/// Fixed entries, e.g. from `--note` arguments.
#[derive(Debug, Clone, Default)]
pub struct StaticEntries(pub Vec<String>);

impl EntrySource for StaticEntries {
    fn provide_entries(&mut self, _repo_name: &str) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Interactive prompt asking for one note at a time.
pub struct ConsoleEntrySource<R, W> {
    input: R,
    output: W,
}

impl ConsoleEntrySource<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process terminal.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleEntrySource<R, W> {
    /// Prompt using the given streams.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CliError::ExecutionFailed {
                command: "changelog prompt".to_string(),
                reason: "input closed before the prompt was answered".to_string(),
            }
            .into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        self.read_line()
    }

    fn yes(&mut self, question: &str) -> Result<bool> {
        loop {
            let answer = self.ask(&format!("{question} (y/n): "))?.trim().to_lowercase();
            match answer.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Input yes or no")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> EntrySource for ConsoleEntrySource<R, W> {
    fn provide_entries(&mut self, repo_name: &str) -> Result<Vec<String>> {
        if !self.yes(&format!("\nUpdate {repo_name} Changelog file?"))? {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        loop {
            let entry = self.ask(&format!("[{}] ", entries.len() + 1))?;
            entries.push(entry);
            if !self.yes("Add another note to CHANGELOG.md?")? {
                return Ok(entries);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn collects_notes_until_declined() {
        let input = Cursor::new("maybe\ny\nFixed crash\nyes\nFaster model\nn\n");
        let mut output = Vec::new();
        let entries = ConsoleEntrySource::new(input, &mut output)
            .provide_entries("fritz-ai-ios-sdk")
            .unwrap();

        assert_eq!(entries, vec!["Fixed crash", "Faster model"]);
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("Input yes or no"));
        assert!(transcript.contains("[2] "));
    }

    #[test]
    fn declining_yields_no_entries() {
        let input = Cursor::new("no\n");
        let entries = ConsoleEntrySource::new(input, Vec::new())
            .provide_entries("sdk")
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn closed_input_is_an_error() {
        let input = Cursor::new("y\n");
        assert!(
            ConsoleEntrySource::new(input, Vec::new())
                .provide_entries("sdk")
                .is_err()
        );
    }
}
