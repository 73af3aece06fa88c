//! Error types for the reorganization engine.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::tree::Node;

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Logical stage of the per-scope pipeline, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Expand,
    Dealias,
    Classify,
    Sort,
    Lift,
    Reconcile,
    Reassemble,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Expand => "expand",
            Stage::Dealias => "dealias",
            Stage::Classify => "classify",
            Stage::Sort => "sort",
            Stage::Lift => "lift",
            Stage::Reconcile => "reconcile",
            Stage::Reassemble => "reassemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Shape errors
// ---------------------------------------------------------------------------

/// A node reached a stage that assumes a structure it does not have.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected node at line {line} (`{rendered}`): {detail}")]
pub struct ShapeError {
    pub line: usize,
    pub rendered: String,
    pub detail: String,
}

impl ShapeError {
    pub fn new(node: &Node, detail: impl Into<String>) -> Self {
        Self {
            line: node.line(),
            rendered: node.to_string(),
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Main error type for the reorganization engine.
#[derive(Error, Debug)]
pub enum TidyError {
    #[error("{stage} stage failed in scope {scope} (line {line}): {source}")]
    Stage {
        stage: Stage,
        scope: String,
        line: usize,
        #[source]
        source: ShapeError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("post-processing step '{step}' failed: {detail}")]
    Step { step: String, detail: String },
}

impl TidyError {
    /// The stage a failure came from, if it was a pipeline failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TidyError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TidyError>;
