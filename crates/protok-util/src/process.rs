use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::errors::ProtokError;

/// Builder for constructing and executing external processes.
///
/// Provides a fluent API for setting program, arguments, environment
/// variables, and working directory. `clear_env` starts the child with an
/// empty environment so that nothing from the build leaks into it.
pub struct CommandBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    clear_env: bool,
    cwd: Option<PathBuf>,
}

impl CommandBuilder {
    /// Create a new builder for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            clear_env: false,
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Start the child with an empty environment instead of inheriting.
    pub fn clear_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Set the working directory for the child process.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The program this builder will execute.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Execute the command, wait for it, and return its captured output.
    pub fn exec(&self) -> Result<Output, ProtokError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if self.clear_env {
            cmd.env_clear();
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
        tracing::debug!("spawning {} {:?}", self.program.display(), self.args);
        cmd.output().map_err(ProtokError::from)
    }
}
