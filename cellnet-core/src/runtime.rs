//! Python runtime for external training scripts.
//!
//! Scripts receive their input as one JSON document on stdin and may finish
//! by printing a JSON object as their last stdout line. Anything else on
//! stdout (progress bars, epoch logs) is ignored, and a script that never
//! prints such an object still succeeds with no result. Their stderr is passed through untouched so the
//! framework's own progress output stays visible.

use crate::config::BackendConfig;
use crate::error::{CellnetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Information about the detected Python installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonInfo {
    pub path: PathBuf,
    pub version: String,
}

/// Managed Python subprocess runner.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    python_path: PathBuf,
    venv_path: Option<PathBuf>,
    workdir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl PythonRuntime {
    pub fn new(python_path: PathBuf) -> Self {
        Self {
            python_path,
            venv_path: None,
            workdir: None,
            timeout: None,
        }
    }

    pub fn from_config(cfg: &BackendConfig) -> Self {
        Self {
            python_path: cfg.python_path.clone(),
            venv_path: cfg.venv_path.clone(),
            workdir: cfg.workdir.clone(),
            timeout: cfg.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Detect an available Python installation.
    pub async fn detect() -> Result<PythonInfo> {
        for cmd in ["python3", "python"] {
            let Ok(output) = Command::new(cmd).arg("--version").output().await else {
                continue;
            };
            if !output.status.success() {
                continue;
            }
            // Python 2 prints its version on stderr
            let mut version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if version.is_empty() {
                version = String::from_utf8_lossy(&output.stderr).trim().to_string();
            }
            return Ok(PythonInfo {
                path: PathBuf::from(cmd),
                version,
            });
        }

        Err(CellnetError::Python(
            "Python not found. Install Python 3 or set backend.python_path.".to_string(),
        ))
    }

    /// The interpreter actually invoked, accounting for a virtual environment.
    pub fn python_cmd(&self) -> PathBuf {
        if let Some(venv) = &self.venv_path {
            let bin_dir = if cfg!(windows) { "Scripts" } else { "bin" };
            venv.join(bin_dir).join("python")
        } else {
            self.python_path.clone()
        }
    }

    /// Run `script` with `input` on stdin and parse stdout as JSON.
    ///
    /// Yields `Value::Null` when the last stdout line is not a JSON object.
    pub async fn run_json(
        &self,
        script: &Path,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let payload = serde_json::to_vec(input)?;
        debug!(
            script = %script.display(),
            payload_bytes = payload.len(),
            "Running Python script"
        );

        let run = async {
            let mut command = Command::new(self.python_cmd());
            command
                .arg(script)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true);
            if let Some(dir) = &self.workdir {
                command.current_dir(dir);
            }

            let mut child = command
                .spawn()
                .map_err(|e| CellnetError::Python(format!("Failed to spawn Python: {e}")))?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
            }

            let output = child.wait_with_output().await?;
            if !output.status.success() {
                return Err(CellnetError::Python(format!(
                    "{} failed (exit {})",
                    script.display(),
                    output.status
                )));
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(parse_json_output(&stdout))
        };

        match self.timeout {
            None => run.await,
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(inner) => inner,
                Err(_) => Err(CellnetError::Timeout(format!(
                    "{} timed out after {}s",
                    script.display(),
                    limit.as_secs()
                ))),
            },
        }
    }
}

/// Parse the last non-empty stdout line as a JSON object.
///
/// Training scripts tend to print progress before their result, so only the
/// final line is treated as the result document.
fn parse_json_output(stdout: &str) -> serde_json::Value {
    let Some(line) = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) else {
        return serde_json::Value::Null;
    };
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) if value.is_object() => value,
        Ok(_) => {
            warn!(line, "Last stdout line is not a JSON object, ignoring it");
            serde_json::Value::Null
        }
        Err(e) => {
            warn!(line, error = %e, "Last stdout line is not JSON, ignoring it");
            serde_json::Value::Null
        }
    }
}
