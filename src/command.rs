//! Renderer command line assembly.

use crate::options::CommandOptionSet;
use crate::path::{self, PlatformFamily};
use std::fmt;
use std::path::{Path, PathBuf};

/// Program plus ordered arguments for one renderer invocation.
///
/// The renderer is spawned directly with this argument vector, never through
/// a shell. [`Display`](fmt::Display) joins everything with single spaces
/// without quoting, so paths containing spaces read ambiguously in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLine {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Serializes options and paths into `<binary> [--opt=value ...] <script> <input> <output>`.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder {
    platform: PlatformFamily,
}

impl CommandBuilder {
    pub fn new(platform: PlatformFamily) -> Self {
        Self { platform }
    }

    pub fn build(
        &self,
        binary_path: &Path,
        options: &CommandOptionSet,
        script_path: &Path,
        input_path: &Path,
        output_path: &Path,
    ) -> CommandLine {
        let mut args = options.serialize();
        args.push(script_path.display().to_string());
        args.push(path::normalize(
            &input_path.display().to_string(),
            self.platform,
        ));
        args.push(output_path.display().to_string());

        CommandLine {
            program: binary_path.to_path_buf(),
            args,
        }
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(PlatformFamily::current())
    }
}
