//! Declaration reorganization for module bodies.
//!
//! Sorts `alias`/`import`/`require`/`use` declarations into a configured
//! category order, expands grouped declarations, lifts frequently used deep
//! names into aliases, and keeps line metadata consistent for comment
//! placement.

pub mod config;
pub mod error;
pub mod reorg;
pub mod tree;

pub use config::{
    discover_and_load_config, discover_config, AliasLiftingConfig, ConfigError, DirectivesConfig,
    MarkersConfig, SortMode, TidyConfig, CONFIG_FILE_NAME,
};
pub use error::{Result, ShapeError, Stage, TidyError};
pub use reorg::{
    Category, FailurePolicy, Outcome, Reorganizer, RunStats, ScopeOutcome, Step, StepContext,
};
pub use tree::{Comment, Control, DirectiveKind, Meta, Node, NodeKind, QualifiedName, Segment, Zipper};
