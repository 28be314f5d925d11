//! Prompt Rendering
//!
//! The narrow interface between the backend core and prompt templating.
//! The core only needs one guarantee from a renderer: identical inputs
//! produce identical output. Callers with their own template machinery
//! implement [`PromptRenderer`]; everyone else gets [`CommandPrompt`],
//! which renders the instruction-generation prompt from a captured host
//! context.

use serde_json::{json, Value};
use thiserror::Error;

/// Task name for instruction-script generation
pub const COMMAND_TASK: &str = "command";

/// Errors raised while rendering a prompt
///
/// Fatal for the request that triggered rendering; never retried
/// internally.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The renderer has no template for the requested task
    #[error("no template for task `{0}`")]
    UnknownTask(String),
    /// The context object is missing a field the template requires
    #[error("prompt context is missing `{0}`")]
    MissingField(&'static str),
}

/// Renders a prompt string from a task name and a context object
///
/// Implementations must be deterministic for identical inputs. The
/// context is an opaque JSON object; each task defines the fields it
/// reads.
pub trait PromptRenderer: Send + Sync {
    /// Render the prompt for `task` from `context`
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the task is unknown or the context is
    /// unusable.
    fn render(&self, task: &str, context: &Value) -> Result<String, TemplateError>;
}

/// Host environment captured for the instruction-generation prompt
///
/// Everything the model needs to produce commands that actually run on
/// this machine: platform, working directory, shell, and whether the
/// commands will run with root permissions.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// Operating system name (e.g. "linux", "macos")
    pub os: String,
    /// CPU architecture (e.g. "x86_64", "aarch64")
    pub arch: String,
    /// Current working directory
    pub cwd: String,
    /// The user's shell
    pub shell: String,
    /// The invoking user
    pub user: String,
    /// Whether the process runs with root permissions
    pub has_root_permissions: bool,
    /// The natural-language request
    pub command: String,
}

impl CommandContext {
    /// Capture the current host environment for `command`
    #[must_use]
    pub fn capture(command: impl Into<String>) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cwd: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            shell: std::env::var("SHELL").unwrap_or_else(|_| "unknown shell".to_string()),
            user: std::env::var("USER").unwrap_or_else(|_| "unknown user".to_string()),
            has_root_permissions: has_root_permissions(),
            command: command.into(),
        }
    }

    /// The context as the JSON object handed to a renderer
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "os": self.os,
            "arch": self.arch,
            "cwd": self.cwd,
            "shell": self.shell,
            "user": self.user,
            "hasRootPermissions": self.has_root_permissions,
            "command": self.command,
        })
    }
}

#[cfg(unix)]
fn has_root_permissions() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn has_root_permissions() -> bool {
    false
}

/// Built-in renderer for the instruction-generation prompt
///
/// Asks the model for a strict JSON payload describing the commands to
/// run. The shape requested here is what the downstream execution engine
/// consumes; the core itself never inspects it.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandPrompt;

impl CommandPrompt {
    /// Create the built-in renderer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PromptRenderer for CommandPrompt {
    fn render(&self, task: &str, context: &Value) -> Result<String, TemplateError> {
        if task != COMMAND_TASK {
            return Err(TemplateError::UnknownTask(task.to_string()));
        }

        fn str_field<'a>(context: &'a Value, key: &str) -> &'a str {
            context.get(key).and_then(Value::as_str).unwrap_or("unknown")
        }

        let command = context
            .get("command")
            .and_then(Value::as_str)
            .ok_or(TemplateError::MissingField("command"))?;

        let root = context
            .get("hasRootPermissions")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut prompt = String::new();
        prompt.push_str(
            "You translate a natural-language request into shell commands \
             for the environment described below.\n\n",
        );
        prompt.push_str("Environment:\n");
        prompt.push_str(&format!(
            "- OS: {} ({})\n",
            str_field(context, "os"),
            str_field(context, "arch")
        ));
        prompt.push_str(&format!("- Shell: {}\n", str_field(context, "shell")));
        prompt.push_str(&format!(
            "- Working directory: {}\n",
            str_field(context, "cwd")
        ));
        prompt.push_str(&format!("- User: {}", str_field(context, "user")));
        if root {
            prompt.push_str(" (root permissions)");
        }
        prompt.push('\n');
        prompt.push_str(
            "\nRespond with ONLY a JSON object, no prose and no markdown fences:\n\
             {\n\
             \x20 \"description\": [\"one line per step, in plain language\"],\n\
             \x20 \"steps\": [\n\
             \x20   {\"type\": \"cmd\", \"command\": \"a shell command\"},\n\
             \x20   {\"type\": \"file\", \"path\": \"relative/path\", \"content\": \"file contents\"}\n\
             \x20 ]\n\
             }\n\
             Steps run in order. Prefer portable commands and never invent \
             paths that the request does not imply.\n",
        );
        prompt.push_str(&format!("\nRequest: {command}\n"));

        Ok(prompt)
    }
}
