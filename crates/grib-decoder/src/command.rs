//! The external decode program seam.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::error::{DecodeError, DecodeResult};

/// Runs the external decode program with an argument list and returns its stdout.
///
/// Implementations must resolve only after the program has exited and both
/// output streams have been read to the end.
#[async_trait]
pub trait DecodeCommand: Send + Sync {
    async fn run(&self, args: &[String]) -> DecodeResult<String>;
}

/// ecCodes `grib_get` invoked as a child process.
#[derive(Debug, Clone)]
pub struct GribGet {
    program: PathBuf,
}

impl GribGet {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for GribGet {
    fn default() -> Self {
        Self::new("grib_get")
    }
}

#[async_trait]
impl DecodeCommand for GribGet {
    async fn run(&self, args: &[String]) -> DecodeResult<String> {
        trace!(program = %self.program.display(), args = ?args, "Running decode program");

        // Dropping the future (an aborted batch) kills the child instead of leaking it
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| DecodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(DecodeError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
