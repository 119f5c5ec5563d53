//! External process execution.
//!
//! Every tool the pipeline drives (git, the vcpkg and LuaRocks installers,
//! cmake) goes through [`Runner`], so the whole pipeline can run against a
//! fake toolchain.

use log::debug;
use std::process::Command;
use thiserror::Error;

/// A tool invocation that did not succeed.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}", describe_code(.code))]
    Failed { program: String, code: Option<i32> },
}

#[allow(clippy::ref_option)]
fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

/// Runs one external command to completion.
pub trait Runner {
    fn run(&self, cmd: &mut Command) -> Result<(), CommandError>;
}

/// Runs commands on the host, inheriting stdio so tool output reaches the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, cmd: &mut Command) -> Result<(), CommandError> {
        debug!("Running: {}", command_line(cmd));

        let status = cmd.status().map_err(|source| CommandError::Spawn {
            program: program_name(cmd),
            source,
        })?;

        if !status.success() {
            return Err(CommandError::Failed {
                program: program_name(cmd),
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// File name of the program, e.g. `cmake.exe` for a full path.
pub fn program_name(cmd: &Command) -> String {
    let program = std::path::Path::new(cmd.get_program());
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Space-joined program and arguments, for logs.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
