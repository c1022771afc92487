//! Non-fatal build findings.
//!
//! Authoring mistakes (unbalanced attribute lists, dangling child references,
//! unknown connection kinds) and benign collaborator failures are recorded
//! here and echoed through `tracing`; the build carries on without the
//! offending edge or attribute.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Expand,
    Mirror,
    Merge,
    Graph,
    Bind,
    Control,
    Wire,
    Limits,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Load => "load",
            Self::Expand => "expand",
            Self::Mirror => "mirror",
            Self::Merge => "merge",
            Self::Graph => "graph",
            Self::Bind => "bind",
            Self::Control => "control",
            Self::Wire => "wire",
            Self::Limits => "limits",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    pub component: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, stage: Stage, component: impl Into<String>, message: impl Into<String>) {
        self.push(stage, Severity::Warning, component.into(), message.into());
    }

    pub fn info(&mut self, stage: Stage, component: impl Into<String>, message: impl Into<String>) {
        self.push(stage, Severity::Info, component.into(), message.into());
    }

    fn push(&mut self, stage: Stage, severity: Severity, component: String, message: String) {
        match severity {
            Severity::Warning => {
                tracing::warn!(%stage, component = %component, "{}", message)
            }
            Severity::Info => tracing::info!(%stage, component = %component, "{}", message),
        }
        self.entries.push(Diagnostic {
            stage,
            severity,
            component,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn in_stage(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.stage == stage)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
