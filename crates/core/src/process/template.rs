//! Command templates with `{placeholder}` substitution.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::TemplateError;

/// Placeholders a template may reference.
pub const PLACEHOLDERS: &[&str] = &[
    "scheduler_home",
    "annotator_home",
    "handler_dir",
    "job_template",
    "input",
    "raw_output",
    "output",
    "run_id",
    "run_dir",
];

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"));

/// An external program invocation whose arguments may reference placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Substitutes every placeholder in the program and arguments.
    pub fn render(&self, vars: &TemplateVars) -> Result<RenderedCommand, TemplateError> {
        let program = substitute(&self.program, vars)?;
        let args = self
            .args
            .iter()
            .map(|arg| substitute(arg, vars))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RenderedCommand {
            program,
            args,
            env: Vec::new(),
            current_dir: None,
        })
    }

    /// Names of the placeholders this template references, in order of appearance.
    pub fn referenced(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .flat_map(|s| {
                PLACEHOLDER_RE
                    .captures_iter(s)
                    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

fn substitute(input: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    substitute_with(input, vars, true)
}

/// Renders free-form text such as a job description file.
///
/// Unlike command arguments, braces with an unknown name are left untouched
/// since job files may carry their own `{...}` syntax. A known placeholder
/// without a value is still an error.
pub fn render_text(input: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    substitute_with(input, vars, false)
}

fn substitute_with(
    input: &str,
    vars: &TemplateVars,
    reject_unknown: bool,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(input) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if !PLACEHOLDERS.contains(&name) {
            if reject_unknown {
                return Err(TemplateError::Unknown {
                    name: name.to_string(),
                });
            }
            continue;
        }
        let value = vars.get(name).ok_or_else(|| TemplateError::Unresolved {
            name: name.to_string(),
        })?;

        out.push_str(&input[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }

    out.push_str(&input[last..]);
    Ok(out)
}

/// Values available to [`CommandTemplate::render`].
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    /// Sets a path value, made absolute against the current directory since
    /// the command may run elsewhere.
    pub fn with_path(self, name: &'static str, path: &Path) -> Self {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.with(name, path.to_string_lossy().into_owned())
    }

    /// Sets the value only when present, so a missing one surfaces as
    /// [`TemplateError::Unresolved`] if the template needs it.
    pub fn with_optional_path(self, name: &'static str, path: Option<&Path>) -> Self {
        match path {
            Some(p) => self.with_path(name, p),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// A fully substituted command, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl RenderedCommand {
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
