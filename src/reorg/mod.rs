//! Declaration reorganization.

mod classify;
mod engine;
mod env;
pub mod lift;
pub mod lines;
mod sort;
mod step;

pub use classify::{
    classify, expand_declarations, expand_group, group_paths, is_degenerate_alias, is_grouped,
    is_well_formed, place_derives, Category, Classified,
};
pub use engine::{FailurePolicy, Outcome, Reorganizer, RunStats, ScopeOutcome};
pub use env::{dealias_body, AliasEnv};
pub use lift::{lift_aliases, scan_usages, select_candidates, LiftCandidate, LiftReport, LiftRules};
pub use lines::{is_monotonic, reconcile, LINE_MARGIN};
pub use sort::{alphabetize_group, dedup_in_place, sort_declarations, sort_key, SortKey};
pub use step::{Step, StepContext};
