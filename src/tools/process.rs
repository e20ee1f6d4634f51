//! `os_run`: allowlisted command execution.
//!
//! The command line is split into words, checked against a per-binary
//! policy and run as an argv vector (never through a shell) with a hard
//! timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::literal::Literal;
use super::path_validation::{normalize_lexically, resolve_in_root};
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};
use crate::exec::{ExecError, run_command_in};

/// Where path arguments of a binary must point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope {
    /// Anywhere under the user's home directory.
    UserHome,
    /// Anywhere under the project root.
    ProjectRoot,
}

/// Per-binary argument policy.
#[derive(Debug, Clone, Copy)]
pub struct CommandPolicy {
    /// Binary name as the model writes it.
    pub name: &'static str,
    /// Whether any arguments are accepted.
    pub allow_args: bool,
    /// Accepted flags. `None` accepts any flag.
    pub safe_flags: Option<&'static [&'static str]>,
    /// Confinement for non-flag arguments.
    pub path_scope: Option<PathScope>,
    /// Binary actually executed, when different from `name`.
    pub alias_for: Option<&'static str>,
}

const fn no_args(name: &'static str) -> CommandPolicy {
    CommandPolicy {
        name,
        allow_args: false,
        safe_flags: None,
        path_scope: None,
        alias_for: None,
    }
}

/// The command allowlist.
pub const ALLOWLIST: &[CommandPolicy] = &[
    CommandPolicy {
        name: "ls",
        allow_args: true,
        safe_flags: Some(&["-l", "-a", "-h", "-t", "-r", "--color=auto"]),
        path_scope: Some(PathScope::UserHome),
        alias_for: None,
    },
    no_args("uptime"),
    no_args("whoami"),
    no_args("date"),
    no_args("gnome-calculator"),
    CommandPolicy {
        alias_for: Some("gnome-calculator"),
        ..no_args("calc")
    },
    CommandPolicy {
        name: "code",
        allow_args: true,
        safe_flags: Some(&["-n", "-r", "--new-window", "--reuse-window"]),
        path_scope: Some(PathScope::ProjectRoot),
        alias_for: None,
    },
    CommandPolicy {
        name: "cat",
        allow_args: true,
        safe_flags: Some(&["-n", "-b", "-A", "-s"]),
        path_scope: Some(PathScope::ProjectRoot),
        alias_for: None,
    },
    CommandPolicy {
        name: "echo",
        allow_args: true,
        safe_flags: None,
        path_scope: None,
        alias_for: None,
    },
];

/// Look up the policy for a binary name.
pub fn policy_for(binary: &str) -> Option<&'static CommandPolicy> {
    ALLOWLIST.iter().find(|p| p.name == binary)
}

/// A command that passed validation, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCommand {
    /// Executable to launch.
    pub program: String,
    /// Arguments, with `~` expanded.
    pub args: Vec<String>,
}

fn expand_home(word: &str, home: &Path) -> String {
    if word == "~" {
        home.display().to_string()
    } else if let Some(rest) = word.strip_prefix("~/") {
        home.join(rest).display().to_string()
    } else {
        word.to_owned()
    }
}

fn flag_allowed(flag: &str, safe: &[&str]) -> bool {
    if safe.contains(&flag) {
        return true;
    }
    // Combined short flags such as `-la`.
    match flag.strip_prefix('-') {
        Some(letters) if !letters.is_empty() && !letters.starts_with('-') => letters
            .chars()
            .all(|c| safe.iter().any(|s| s.len() == 2 && s.ends_with(c))),
        _ => false,
    }
}

fn path_allowed(arg: &str, scope: PathScope, project_root: &Path, home: &Path) -> bool {
    match scope {
        PathScope::ProjectRoot => resolve_in_root(arg, project_root).is_ok(),
        PathScope::UserHome => {
            let joined = project_root.join(arg);
            let Some(target) = normalize_lexically(&joined) else {
                return false;
            };
            let home = home.canonicalize().unwrap_or_else(|_| home.to_path_buf());
            let real = target.canonicalize().unwrap_or(target);
            real.starts_with(&home)
        }
    }
}

/// Check a command line against the allowlist.
///
/// Returns `None` when the command must be blocked.
pub fn validate_command(
    command: &str,
    project_root: &Path,
    home: &Path,
) -> Option<ValidatedCommand> {
    let words = shell_words::split(command).ok()?;
    let (binary, rest) = words.split_first()?;
    let policy = policy_for(binary)?;
    if !rest.is_empty() && !policy.allow_args {
        return None;
    }

    let mut args = Vec::with_capacity(rest.len());
    for raw in rest {
        let arg = expand_home(raw, home);
        if arg.starts_with('-') {
            if let Some(safe) = policy.safe_flags
                && !flag_allowed(&arg, safe)
            {
                return None;
            }
        } else if let Some(scope) = policy.path_scope
            && !path_allowed(&arg, scope, project_root, home)
        {
            return None;
        }
        args.push(arg);
    }

    Some(ValidatedCommand {
        program: policy.alias_for.unwrap_or(policy.name).to_owned(),
        args,
    })
}

/// `os_run(command)`.
#[derive(Debug, Clone)]
pub struct OsRunTool {
    project_root: PathBuf,
    home: PathBuf,
    timeout: Duration,
}

impl OsRunTool {
    /// Run commands from `project_root`, confining home-scoped paths to
    /// `home`.
    pub fn new(project_root: impl Into<PathBuf>, home: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            project_root: project_root.into(),
            home: home.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ToolHandler for OsRunTool {
    fn description(&self) -> &str {
        "Ejecuta un comando permitido del sistema (ls, date, uptime, whoami, calc, code, cat, echo)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["command"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(raw) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(tags::OS, "Falta el comando para ejecutar."));
        };
        let raw = raw.trim();

        let Some(cmd) = validate_command(raw, &self.project_root, &self.home) else {
            tracing::warn!(command = raw, "command blocked by allowlist");
            return Ok(ToolResult::failure(
                tags::SECURITY,
                format!("Comando bloqueado por política de seguridad (Whitelist): {raw}"),
            ));
        };

        tracing::info!(program = %cmd.program, args = ?cmd.args, "running allowlisted command");
        let output = match run_command_in(&cmd.program, &cmd.args, &self.project_root, self.timeout)
            .await
        {
            Ok(output) => output,
            Err(ExecError::Timeout { secs, .. }) => {
                return Ok(ToolResult::failure(
                    tags::OS,
                    format!("Fallo ejecución: el comando excedió {secs}s."),
                ));
            }
            Err(e) => {
                return Ok(ToolResult::failure(tags::OS, format!("Fallo ejecución: {e}")));
            }
        };

        let stdout = output.stdout_text();
        let stdout = stdout.trim();
        let stderr = output.stderr_text();
        let stderr = stderr.trim();
        let text = if !stdout.is_empty() {
            stdout.to_owned()
        } else if !stderr.is_empty() {
            format!("Error: {stderr}")
        } else {
            "(Comando ejecutado)".to_owned()
        };
        Ok(ToolResult::success(tags::OS, text))
    }
}
