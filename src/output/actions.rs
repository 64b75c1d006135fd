use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::config::PublishMode;
use crate::error::Result;
use crate::runner::Outcome;

/// Ordered `name -> value` pairs destined for `$GITHUB_OUTPUT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutputs {
    entries: Vec<(String, String)>,
}

impl StepOutputs {
    /// Outputs for a finished run. `version_dns` is only set in release mode.
    pub fn from_outcome(outcome: &Outcome) -> Self {
        let mut outputs = Self::default();
        outputs.set("version", &outcome.version);
        if outcome.mode == PublishMode::Release {
            outputs.set("version_dns", &outcome.version_dns);
        }
        outputs.set("major", outcome.major);
        outputs.set("minor", outcome.minor);
        outputs.set("patch", outcome.patch);
        outputs
    }

    pub fn set(&mut self, name: &str, value: impl ToString) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Render in the `$GITHUB_OUTPUT` file format.
    ///
    /// Single-line values use `name=value`; multi-line values use a heredoc
    /// whose delimiter does not occur in the value.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for (name, value) in &self.entries {
            if value.contains('\n') || value.contains('\r') {
                let delimiter = heredoc_delimiter(value);
                rendered.push_str(&format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"));
            } else {
                rendered.push_str(&format!("{name}={value}\n"));
            }
        }
        rendered
    }

    /// Append the outputs to the step output file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.render().as_bytes())?;
        debug!(path = %path.display(), count = self.entries.len(), "wrote step outputs");
        Ok(())
    }
}

fn heredoc_delimiter(value: &str) -> String {
    let mut delimiter = format!(
        "ghadelimiter_{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    delimiter
}

/// Escape message data for a workflow command.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Notice annotation shown on the run summary.
pub fn notice(message: &str) {
    println!("::notice::{}", escape_data(message));
}

/// Error annotation; the process exit code is what actually fails the step.
pub fn error(message: &str) {
    println!("::error::{}", escape_data(message));
}
