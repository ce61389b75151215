//! External sources for gatherers.
//!
//! Gatherers never spawn processes or open files directly; they go through a
//! `CommandExecutor` or a `FileReader` so tests can substitute canned output.

use std::fs;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("could not open {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs a program and returns its stdout.
pub trait CommandExecutor: Send + Sync {
    fn exec(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, ExecError>;
}

/// Executor backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn exec(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, ExecError> {
        debug!("Executing: {} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(ExecError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Reads a source file and returns its raw bytes.
pub trait FileReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, ExecError>;
}

/// Reader backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>, ExecError> {
        debug!("Reading: {}", path.display());

        fs::read(path).map_err(|source| ExecError::Read {
            path: path.display().to_string(),
            source,
        })
    }
}
