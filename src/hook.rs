//! External add/delete hook commands
//!
//! A hook is an explicit program plus argument list; the address is appended
//! as the final argument. Output is captured and surfaced to the log.

use crate::error::{Result, ScannerError};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::process::Command;

/// A program and its leading arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A configured hook, named for log and error messages
#[derive(Debug, Clone)]
pub struct Hook {
    name: &'static str,
    command: CommandLine,
}

impl Hook {
    pub fn add(command: CommandLine) -> Self {
        Self { name: "add", command }
    }

    pub fn delete(command: CommandLine) -> Self {
        Self {
            name: "delete",
            command,
        }
    }

    /// Run the hook for one address and wait for it to finish
    ///
    /// A spawn failure or non-zero exit is an error. A hook that never exits
    /// blocks the caller.
    pub async fn invoke(&self, address: &str) -> Result<()> {
        info!("{} hook: {} {}", self.name, self.command, address);

        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(address)
            .output()
            .await
            .map_err(|source| ScannerError::HookSpawn {
                hook: self.name,
                program: self.command.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            info!("[{}]: {}", self.command.program, stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            info!("[{}]: {}", self.command.program, stderr.trim_end());
        }

        if !output.status.success() {
            return Err(ScannerError::HookFailed {
                hook: self.name,
                command: format!("{} {}", self.command, address),
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}
