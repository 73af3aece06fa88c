//! Scope reorganization engine.
//!
//! Walks a tree with a [`Zipper`] and rewrites the body of every module scope:
//!
//! 1. expand grouped declarations (if enabled)
//! 2. dealias declarations sorting may move above their alias
//! 3. classify the body into category buckets and other content
//! 4. sort and deduplicate each bucket
//! 5. lift frequently used deep names into aliases (if enabled)
//! 6. place `@derive` after its struct, reconcile lines
//! 7. reassemble: declarations in category order, then content
//!
//! Each scope is handled on its own; nested modules are visited afterwards
//! as scopes of their own. A scope is replaced only once every stage has
//! succeeded.

use std::ops::AddAssign;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::TidyConfig;
use crate::error::{Result, ShapeError, Stage, TidyError};
use crate::tree::{Comment, Control, Node, NodeKind, Zipper};

use super::classify::{classify, expand_declarations, place_derives, Category, Classified};
use super::env::dealias_body;
use super::lift::{lift_aliases, LiftRules};
use super::lines::{is_monotonic, reconcile};
use super::sort::{alphabetize_group, dedup_in_place, sort_declarations};
use super::step::{Step, StepContext};

/// What to do when a stage fails for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log a warning and keep that scope's original body.
    #[default]
    SkipScope,
    /// Return the error from [`Reorganizer::run`].
    Abort,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub scopes_visited: usize,
    pub scopes_reorganized: usize,
    /// Scopes left alone because of a skip marker.
    pub scopes_skipped: usize,
    /// Scopes left alone because a stage failed.
    pub scopes_failed: usize,
    pub groups_expanded: usize,
    pub duplicates_removed: usize,
    pub aliases_lifted: usize,
    pub references_rewritten: usize,
    pub lines_shifted: usize,
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.scopes_visited += other.scopes_visited;
        self.scopes_reorganized += other.scopes_reorganized;
        self.scopes_skipped += other.scopes_skipped;
        self.scopes_failed += other.scopes_failed;
        self.groups_expanded += other.groups_expanded;
        self.duplicates_removed += other.duplicates_removed;
        self.aliases_lifted += other.aliases_lifted;
        self.references_rewritten += other.references_rewritten;
        self.lines_shifted += other.lines_shifted;
    }
}

/// Result of processing a single scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeOutcome {
    Rewritten { body: Vec<Node>, stats: RunStats },
    /// A skip marker opted the scope out.
    Skipped,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub tree: Node,
    pub comments: Vec<Comment>,
    pub stats: RunStats,
}

pub struct Reorganizer {
    config: TidyConfig,
    rules: LiftRules,
    policy: FailurePolicy,
    steps: Vec<Box<dyn Step>>,
}

impl Reorganizer {
    /// Validate `config` and compile its lifting rules.
    pub fn new(config: TidyConfig) -> Result<Self> {
        config.validate()?;
        let rules = LiftRules::from_config(&config.alias_lifting)?;
        Ok(Self {
            config,
            rules,
            policy: FailurePolicy::default(),
            steps: Vec::new(),
        })
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a step to run after reorganization. Steps run in
    /// registration order, each over the whole tree.
    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn config(&self) -> &TidyConfig {
        &self.config
    }

    /// Reorganize every module scope in `tree`, then run the registered steps.
    pub fn run(&self, tree: Node, comments: Vec<Comment>) -> Result<Outcome> {
        let mut stats = RunStats::default();
        let tree = Zipper::new(tree).traverse(|zipper| self.visit(zipper, &comments, &mut stats))?;

        let mut comments = comments;
        let mut tree = tree;
        for step in &self.steps {
            let mut ctx = StepContext {
                config: &self.config,
                comments: &mut comments,
            };
            tree = Zipper::new(tree).traverse(|zipper| step.apply(zipper, &mut ctx))?;
            debug!(step = step.name(), "applied step");
        }

        info!(
            scopes = stats.scopes_visited,
            reorganized = stats.scopes_reorganized,
            skipped = stats.scopes_skipped,
            failed = stats.scopes_failed,
            lifted = stats.aliases_lifted,
            "reorganization finished"
        );

        Ok(Outcome {
            tree,
            comments,
            stats,
        })
    }

    /// Process independent trees in parallel.
    pub fn run_many(&self, inputs: Vec<(Node, Vec<Comment>)>) -> Vec<Result<Outcome>> {
        inputs
            .into_par_iter()
            .map(|(tree, comments)| self.run(tree, comments))
            .collect()
    }

    fn visit(&self, zipper: &mut Zipper, comments: &[Comment], stats: &mut RunStats) -> Result<Control> {
        if !matches!(zipper.node().kind, NodeKind::Module(_)) {
            return Ok(Control::Continue);
        }
        stats.scopes_visited += 1;

        match self.organize_scope(zipper.node(), comments) {
            Ok(ScopeOutcome::Rewritten { body, stats: scope }) => {
                zipper.node_mut().children = body;
                stats.scopes_reorganized += 1;
                *stats += scope;
            }
            Ok(ScopeOutcome::Skipped) => stats.scopes_skipped += 1,
            Err(err) => match self.policy {
                FailurePolicy::Abort => return Err(err),
                FailurePolicy::SkipScope => {
                    warn!(error = %err, "leaving scope unchanged");
                    stats.scopes_failed += 1;
                }
            },
        }
        Ok(Control::Continue)
    }

    /// Compute the new body of one module scope. `comments` may cover the
    /// whole file; only those inside the scope (and outside nested modules)
    /// are checked for markers.
    pub fn organize_scope(&self, scope: &Node, comments: &[Comment]) -> Result<ScopeOutcome> {
        let markers = &self.config.markers;
        let own = scope_comments(scope, comments);
        if own.iter().any(|c| c.text.contains(&markers.skip_all)) {
            debug!(scope = %scope_name(scope), "skip marker found");
            return Ok(ScopeOutcome::Skipped);
        }
        let keep_order = own.iter().any(|c| c.text.contains(&markers.keep_order));

        let directives = &self.config.directives;
        let mut stats = RunStats::default();
        let mut body = scope.children.clone();

        if directives.expand_groups {
            let (expanded, count) =
                expand_declarations(body).map_err(stage_error(Stage::Expand, scope))?;
            body = expanded;
            stats.groups_expanded += count;
        }

        let body = dealias_body(body, directives).map_err(stage_error(Stage::Dealias, scope))?;

        let Classified {
            mut buckets,
            mut content,
        } = classify(body);
        debug!(
            stage = %Stage::Classify,
            categories = buckets.len(),
            content = content.len(),
            "classified scope"
        );

        for (category, nodes) in buckets.iter_mut() {
            let (sorted, removed) = self
                .order_bucket(*category, std::mem::take(nodes), keep_order)
                .map_err(stage_error(Stage::Sort, scope))?;
            *nodes = sorted;
            stats.duplicates_removed += removed;
        }

        if self.config.alias_lifting.enabled {
            let report = lift_aliases(&mut buckets, &mut content, directives, &self.rules, !keep_order)
                .map_err(stage_error(Stage::Lift, scope))?;
            stats.aliases_lifted += report.new_aliases;
            stats.references_rewritten += report.rewritten;

            if keep_order {
                if let Some(aliases) = buckets.get_mut(&Category::Alias) {
                    let (kept, removed) = dedup_in_place(std::mem::take(aliases));
                    *aliases = kept;
                    stats.duplicates_removed += removed;
                }
            } else if report.rewritten > 0 {
                // shortened declarations may no longer be in order
                let alias_rank = directives.rank(Category::Alias);
                for (category, nodes) in buckets.iter_mut() {
                    if directives.rank(*category) > alias_rank {
                        let (sorted, removed) = self
                            .order_bucket(*category, std::mem::take(nodes), false)
                            .map_err(stage_error(Stage::Sort, scope))?;
                        *nodes = sorted;
                        stats.duplicates_removed += removed;
                    }
                }
            }
        }

        // derives keep the content in line order; this only moves content
        // whose input lines were already inverted, so nested modules keep
        // the ranges their comments were recorded against
        let mut content = place_derives(content);
        stats.lines_shifted += reconcile(&mut content, usize::MAX);

        let mut declarations: Vec<Node> = directives
            .ordered_categories()
            .into_iter()
            .filter_map(|category| buckets.remove(&category))
            .flatten()
            .collect();
        let ceiling = content.first().map(Node::line).unwrap_or(usize::MAX);
        stats.lines_shifted += reconcile(&mut declarations, ceiling);
        debug!(stage = %Stage::Reconcile, shifted = stats.lines_shifted, "reconciled lines");

        if !content.is_empty() {
            if let Some(last) = declarations.last_mut() {
                last.meta.newlines = last.meta.newlines.max(1);
            }
        }
        declarations.extend(content);
        debug_assert!(is_monotonic(&declarations));
        debug!(stage = %Stage::Reassemble, nodes = declarations.len(), "reassembled scope");

        Ok(ScopeOutcome::Rewritten {
            body: declarations,
            stats,
        })
    }

    fn order_bucket(
        &self,
        category: Category,
        nodes: Vec<Node>,
        keep_order: bool,
    ) -> std::result::Result<(Vec<Node>, usize), ShapeError> {
        let mode = self.config.directives.sort;
        if category == Category::Doc {
            return Ok((nodes, 0));
        }
        if keep_order {
            return Ok(dedup_in_place(nodes));
        }
        let nodes = if self.config.directives.expand_groups {
            nodes
        } else {
            nodes.into_iter().map(|n| alphabetize_group(n, mode)).collect()
        };
        sort_declarations(nodes, mode)
    }
}

fn scope_name(scope: &Node) -> String {
    match &scope.kind {
        NodeKind::Module(name) => name.to_string(),
        _ => "<top level>".to_string(),
    }
}

fn stage_error(stage: Stage, scope: &Node) -> impl FnOnce(ShapeError) -> TidyError {
    let name = scope_name(scope);
    let line = scope.line();
    move |source| TidyError::Stage {
        stage,
        scope: name,
        line,
        source,
    }
}

/// Last line covered by `node`.
fn end_line(node: &Node) -> usize {
    node.meta.end_line.unwrap_or_else(|| {
        let mut last = node.line();
        node.walk(&mut |n| last = last.max(n.meta.end_line.unwrap_or(n.line())));
        last
    })
}

/// Comments inside `scope` but outside its nested modules.
fn scope_comments<'c>(scope: &Node, comments: &'c [Comment]) -> Vec<&'c Comment> {
    let range = scope.line()..=end_line(scope);
    let nested: Vec<_> = scope
        .children
        .iter()
        .filter(|child| matches!(child.kind, NodeKind::Module(_)))
        .map(|child| child.line()..=end_line(child))
        .collect();
    comments
        .iter()
        .filter(|c| range.contains(&c.line) && !nested.iter().any(|r| r.contains(&c.line)))
        .collect()
}
