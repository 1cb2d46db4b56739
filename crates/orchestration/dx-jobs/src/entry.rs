//! Worker process entry point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Name of the worker binary shipped with this workspace.
pub const WORKER_BINARY: &str = "dx-worker";

/// How to start a worker process: program, arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub program: PathBuf,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<(String, String)>,
}

impl WorkerEntry {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// A `sh -c` script as the entry point.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").with_args(["-c".to_string(), script.into()])
    }

    /// The `dx-worker` binary next to the current executable.
    ///
    /// Test binaries live one level deeper (`target/<profile>/deps`), so the
    /// parent directory is tried too. Falls back to a `PATH` lookup.
    pub fn locate() -> Self {
        let binary = format!("{WORKER_BINARY}{}", std::env::consts::EXE_SUFFIX);

        let candidate = std::env::current_exe().ok().and_then(|exe| {
            let dir = exe.parent()?.to_path_buf();
            let mut dirs = vec![dir.clone()];
            if dir.ends_with("deps") {
                dirs.extend(dir.parent().map(Path::to_path_buf));
            }
            dirs.into_iter()
                .map(|d| d.join(&binary))
                .find(|path| path.is_file())
        });

        Self::new(candidate.unwrap_or_else(|| PathBuf::from(binary)))
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Program name for logs and errors.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Command with piped stdin/stdout and inherited stderr.
    ///
    /// The child is killed if the handle is dropped before it exits.
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

impl Default for WorkerEntry {
    fn default() -> Self {
        Self::locate()
    }
}

impl fmt::Display for WorkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
