//! Console output: messages, warnings, errors, yes/no prompts and the
//! download progress bar.

use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressStyle};

/// Everything the coordinator needs from the terminal. A trait so tests can
/// supply a recording fake instead of a real terminal.
pub trait Console: Send + Sync {
    /// Plain message, no prefix.
    fn message(&self, text: &str);
    /// Message prefixed as a warning.
    fn warning(&self, text: &str);
    /// Message prefixed as an error.
    fn error(&self, text: &str);
    /// Prompts a yes/no question; an empty answer returns `default`.
    fn ask(&self, question: &str, default: bool) -> bool;
    /// Sets the total byte count the progress bar measures against.
    fn set_total(&self, total: u64);
    /// Updates the progress bar to `complete` bytes downloaded so far.
    fn progress(&self, complete: u64);
    /// Clears the progress bar at the end of a run.
    fn finish(&self);
}

/// Real terminal console, backed by an `indicatif` progress bar.
pub struct TerminalConsole {
    bar: ProgressBar,
}

impl TerminalConsole {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "[{bar:40}] {percent:>3}% {bytes}/{total_bytes} {bytes_per_sec}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn message(&self, text: &str) {
        self.bar.println(text);
    }

    fn warning(&self, text: &str) {
        self.bar.println(format!("Warning: {text}"));
    }

    fn error(&self, text: &str) {
        self.bar.println(format!("Error: {text}"));
    }

    fn ask(&self, question: &str, default: bool) -> bool {
        const YES: &[&str] = &["y", "yes"];
        const NO: &[&str] = &["n", "no"];
        self.bar.suspend(|| loop {
            print!("{question} ");
            if io::stdout().flush().is_err() {
                return default;
            }
            let mut answer = String::new();
            if io::stdin().read_line(&mut answer).is_err() {
                return default;
            }
            let answer = answer.trim().to_ascii_lowercase();
            if YES.contains(&answer.as_str()) {
                return true;
            }
            if NO.contains(&answer.as_str()) {
                return false;
            }
            if answer.is_empty() {
                return default;
            }
        })
    }

    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn progress(&self, complete: u64) {
        self.bar.set_position(complete);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// A console that records everything instead of touching the terminal, for
/// tests that need to assert on the coordinator's narration.
#[cfg(test)]
pub struct RecordingConsole {
    pub messages: std::sync::Mutex<Vec<String>>,
    pub answer: bool,
}

#[cfg(test)]
impl RecordingConsole {
    pub fn new(answer: bool) -> Self {
        Self {
            messages: std::sync::Mutex::new(Vec::new()),
            answer,
        }
    }
}

#[cfg(test)]
impl Console for RecordingConsole {
    fn message(&self, text: &str) {
        #[allow(clippy::unwrap_used)]
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn warning(&self, text: &str) {
        #[allow(clippy::unwrap_used)]
        self.messages.lock().unwrap().push(format!("warning: {text}"));
    }

    fn error(&self, text: &str) {
        #[allow(clippy::unwrap_used)]
        self.messages.lock().unwrap().push(format!("error: {text}"));
    }

    fn ask(&self, _question: &str, _default: bool) -> bool {
        self.answer
    }

    fn set_total(&self, _total: u64) {}

    fn progress(&self, _complete: u64) {}

    fn finish(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_console_records_messages() {
        let console = RecordingConsole::new(true);
        console.message("hello");
        console.warning("careful");
        console.error("boom");
        #[allow(clippy::unwrap_used)]
        let messages = console.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages[1].starts_with("warning:"));
        assert!(messages[2].starts_with("error:"));
    }

    #[test]
    fn recording_console_ask_returns_configured_answer() {
        let console = RecordingConsole::new(false);
        assert!(!console.ask("proceed?", true));
    }
}
