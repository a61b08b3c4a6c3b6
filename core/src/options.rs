//! Parser configuration and environment access.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Case, OnErrorStrategy, Splicer};

/// Options shared by tree construction, parsing and completion.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{Case, CliOptions};
///
/// let options: CliOptions = serde_json::from_str(r#"{"arg_case": "snake"}"#).unwrap();
/// assert_eq!(options.arg_case, Case::Snake);
/// assert_eq!(options.env_case, Case::SnakeUpper);
/// assert_eq!(options.completion_line_var, "COMP_LINE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliOptions {
    /// Case applied to field names to form long flags.
    pub arg_case: Case,
    /// Case applied to field names to form environment variable names.
    pub env_case: Case,
    /// Case applied to field names to form subcommand names.
    pub cmd_case: Case,
    /// Joins argument-group prefixes and flag names.
    pub arg_splicer: Splicer,
    /// Joins argument-group prefixes and environment names.
    pub env_splicer: Splicer,
    /// Makes `global` flags reachable from descendant commands.
    pub globals_enabled: bool,
    /// Lifecycle behavior when a hook fails.
    pub on_error: OnErrorStrategy,
    /// Environment variable carrying the line being completed.
    pub completion_line_var: String,
    /// Environment variable carrying the cursor byte offset.
    pub completion_point_var: String,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            arg_case: Case::Kebab,
            env_case: Case::SnakeUpper,
            cmd_case: Case::Kebab,
            arg_splicer: Splicer::Dot,
            env_splicer: Splicer::Underscore,
            globals_enabled: false,
            on_error: OnErrorStrategy::default(),
            completion_line_var: "COMP_LINE".to_string(),
            completion_point_var: "COMP_POINT".to_string(),
        }
    }
}

/// Read access to environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
