//! Post-processing steps.
//!
//! A [`Step`] runs over the whole tree once every scope has been reorganized.
//! Steps see each node through the cursor and may rewrite it or adjust the
//! comment list, then tell the traversal how to continue.

use crate::config::TidyConfig;
use crate::error::Result;
use crate::tree::{Comment, Control, Zipper};

/// State shared by all steps of one run.
pub struct StepContext<'a> {
    pub config: &'a TidyConfig,
    pub comments: &'a mut Vec<Comment>,
}

/// A tree rewrite applied after reorganization.
pub trait Step: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Visit the focused node.
    fn apply(&self, zipper: &mut Zipper, ctx: &mut StepContext<'_>) -> Result<Control>;
}
