//! Alias lifting.
//!
//! Promotes deep qualified names that are used often enough into new
//! `alias` declarations and rewrites their usages to the short name.
//!
//! # Collisions
//!
//! A short name is never lifted when any of these holds somewhere in the
//! scope. Collisions are sticky: one hit disqualifies the name for the whole
//! scope, whatever order occurrences are seen in.
//!
//! - it is already bound to a different path by an existing alias
//! - it is the root of a nested module's name, or a root referenced or a
//!   short name bound anywhere inside a nested module
//! - it is bound by an alias local to a block, which shadows the scope's
//!   binding there
//! - it is the root segment of some other reference, which lifting would
//!   silently redirect
//! - it is excluded by configuration or is a reserved standard-library name
//!
//! Two different paths that shorten to the same name also collide.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use regex::RegexSet;
use tracing::debug;

use crate::config::{AliasLiftingConfig, ConfigError, DirectivesConfig};
use crate::error::ShapeError;
use crate::tree::{DirectiveKind, Node, NodeKind, QualifiedName};

use super::classify::{group_paths, Category};
use super::env::AliasEnv;
use super::sort::sort_declarations;

lazy_static! {
    /// Standard-library module names. Shadowing one with a lifted alias
    /// changes what every unqualified use of it means.
    static ref RESERVED_NAMES: HashSet<&'static str> = [
        "Access", "Agent", "Application", "Atom", "Base", "Behaviour", "Bitwise",
        "Calendar", "Code", "Collectable", "Config", "Date", "DateTime", "Enum",
        "Enumerable", "Exception", "File", "Float", "Function", "GenServer",
        "Inspect", "Integer", "IO", "Kernel", "Keyword", "List", "Logger",
        "Macro", "Map", "MapSet", "Module", "NaiveDateTime", "Node", "Path",
        "Port", "Process", "Protocol", "Range", "Record", "Regex", "Registry",
        "Stream", "String", "Supervisor", "System", "Task", "Time", "Tuple",
        "URI", "Version",
    ]
    .into_iter()
    .collect();
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Compiled lifting thresholds and filters.
#[derive(Debug, Clone)]
pub struct LiftRules {
    pub min_depth: usize,
    pub min_frequency: usize,
    include: Option<RegexSet>,
    exclude_namespaces: HashSet<String>,
    exclude_last_names: HashSet<String>,
}

impl LiftRules {
    pub fn from_config(config: &AliasLiftingConfig) -> Result<Self, ConfigError> {
        let include = if config.include.is_empty() {
            None
        } else {
            Some(RegexSet::new(&config.include).map_err(|e| {
                ConfigError::InvalidPattern(config.include.join(", "), e.to_string())
            })?)
        };
        Ok(Self {
            min_depth: config.min_depth,
            min_frequency: config.min_frequency,
            include,
            exclude_namespaces: config.exclude_namespaces.iter().cloned().collect(),
            exclude_last_names: config.exclude_last_names.iter().cloned().collect(),
        })
    }

    fn is_excluded(&self, path: &QualifiedName, short: &str) -> bool {
        RESERVED_NAMES.contains(short)
            || self.exclude_last_names.contains(short)
            || path.first().is_some_and(|root| self.exclude_namespaces.contains(root))
    }

    fn is_included(&self, path: &QualifiedName) -> bool {
        match &self.include {
            Some(set) => set.is_match(&path.to_string()),
            None => true,
        }
    }

    fn qualifies(&self, path: &QualifiedName, count: usize) -> bool {
        count > self.min_frequency && path.len() > self.min_depth && self.is_included(path)
    }
}

impl Default for LiftRules {
    fn default() -> Self {
        Self {
            min_depth: 1,
            min_frequency: 1,
            include: None,
            exclude_namespaces: HashSet::new(),
            exclude_last_names: HashSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Usage scan
// ---------------------------------------------------------------------------

/// A short name seen during the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftCandidate {
    pub path: QualifiedName,
    pub short: String,
    pub count: usize,
    pub collided: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tally {
    Seen { path: QualifiedName, count: usize },
    Collision,
}

struct UsageScanner<'a> {
    env: &'a AliasEnv,
    rules: &'a LiftRules,
    tallies: BTreeMap<String, Tally>,
}

impl<'a> UsageScanner<'a> {
    /// Existing `alias A.B.C` bindings start above the frequency threshold:
    /// they are bindings already, lifting only re-confirms them.
    fn new(env: &'a AliasEnv, rules: &'a LiftRules) -> Self {
        let mut tallies = BTreeMap::new();
        for (short, path) in env.iter() {
            if path.is_literal() && path.last() == Some(short.as_str()) {
                tallies.insert(
                    short.clone(),
                    Tally::Seen {
                        path: path.clone(),
                        count: rules.min_frequency + 1,
                    },
                );
            }
        }
        Self { env, rules, tallies }
    }

    fn scan(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Module(name) => {
                if let Some(root) = name.first() {
                    self.collide(root);
                }
                for child in &node.children {
                    self.reserve(child);
                }
                return;
            }
            NodeKind::Directive(DirectiveKind::Alias) => {
                self.scan_alias(node);
                return;
            }
            NodeKind::Group => {
                if let Ok(paths) = group_paths(node) {
                    for path in &paths {
                        self.visit_name(path);
                    }
                }
                return;
            }
            NodeKind::Pair(key) if key == "as" => return,
            NodeKind::Name(name) => self.visit_name(name),
            _ => {}
        }
        for child in &node.children {
            self.scan(child);
        }
    }

    /// Nested module bodies inherit this scope's aliases but are rewritten
    /// separately. Nothing in them is counted; every root they reference and
    /// every short name they bind is reserved.
    fn reserve(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Module(name) => {
                if let Some(root) = name.first() {
                    self.collide(root);
                }
            }
            NodeKind::Directive(DirectiveKind::Alias) => {
                for (short, _) in alias_bindings(node) {
                    self.collide(&short);
                }
            }
            NodeKind::Name(name) => {
                if let Some(root) = name.first() {
                    self.collide(root);
                }
            }
            NodeKind::Group => {
                for path in group_paths(node).unwrap_or_default() {
                    if let Some(root) = path.first() {
                        self.collide(root);
                    }
                }
                return;
            }
            _ => {}
        }
        for child in &node.children {
            self.reserve(child);
        }
    }

    /// Alias targets are bindings, not usages. Their roots are reserved, and
    /// so is every short name they bind to something other than the scope's
    /// own binding for it (block-local aliases).
    fn scan_alias(&mut self, node: &Node) {
        for (short, path) in alias_bindings(node) {
            if let Some(root) = path.first() {
                if path.len() > 1 && !self.env.contains(root) {
                    self.collide(root);
                }
            }
            if self.env.get(&short) != Some(&path) {
                self.collide(&short);
            }
        }
    }

    fn visit_name(&mut self, name: &QualifiedName) {
        let Some(root) = name.first() else {
            return;
        };
        if self.env.contains(root) {
            // short-form usage through an existing binding
            return;
        }
        self.collide(root);

        if !name.is_literal() || name.len() < 2 {
            return;
        }
        let Some(short) = name.last() else {
            return;
        };
        if self.rules.is_excluded(name, short) {
            self.collide(short);
            return;
        }
        if self.env.get(short).is_some_and(|bound| bound != name) {
            self.collide(short);
            return;
        }
        self.count(short, name);
    }

    fn collide(&mut self, short: &str) {
        self.tallies.insert(short.to_string(), Tally::Collision);
    }

    fn count(&mut self, short: &str, path: &QualifiedName) {
        match self.tallies.entry(short.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(Tally::Seen {
                    path: path.clone(),
                    count: 1,
                });
            }
            Entry::Occupied(mut entry) => {
                let consistent = match entry.get_mut() {
                    Tally::Seen { path: seen, count } if seen == path => {
                        *count += 1;
                        true
                    }
                    Tally::Seen { .. } => false,
                    Tally::Collision => true,
                };
                if !consistent {
                    entry.insert(Tally::Collision);
                }
            }
        }
    }

    fn into_candidates(self) -> Vec<LiftCandidate> {
        self.tallies
            .into_iter()
            .filter_map(|(short, tally)| match tally {
                Tally::Seen { path, count } => Some(LiftCandidate {
                    path,
                    short,
                    count,
                    collided: false,
                }),
                Tally::Collision => None,
            })
            .collect()
    }

    fn collided_names(&self) -> Vec<String> {
        self.tallies
            .iter()
            .filter(|(_, t)| **t == Tally::Collision)
            .map(|(short, _)| short.clone())
            .collect()
    }
}

/// `(short name, path)` pairs an alias declaration binds.
fn alias_bindings(node: &Node) -> Vec<(String, QualifiedName)> {
    let Some(target) = node.target() else {
        return Vec::new();
    };
    if matches!(target.kind, NodeKind::Group) {
        return group_paths(target)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|path| Some((path.last()?.to_string(), path)))
            .collect();
    }
    let Some(path) = target.qualified_name() else {
        return Vec::new();
    };
    let short = node
        .option("as")
        .and_then(Node::qualified_name)
        .and_then(QualifiedName::last)
        .or_else(|| path.last());
    short
        .map(|short| (short.to_string(), path.clone()))
        .into_iter()
        .collect()
}

/// Scan `nodes` for qualified-name usages. Returns every short name that is
/// still collision-free, with its occurrence count, plus collided names
/// flagged as such.
pub fn scan_usages<'n>(
    nodes: impl IntoIterator<Item = &'n Node>,
    env: &AliasEnv,
    rules: &LiftRules,
) -> Vec<LiftCandidate> {
    let mut scanner = UsageScanner::new(env, rules);
    for node in nodes {
        scanner.scan(node);
    }
    let collided: Vec<LiftCandidate> = scanner
        .collided_names()
        .into_iter()
        .map(|short| LiftCandidate {
            path: QualifiedName::default(),
            short,
            count: 0,
            collided: true,
        })
        .collect();
    let mut all = scanner.into_candidates();
    all.extend(collided);
    all.sort_by(|a, b| a.short.cmp(&b.short));
    all
}

/// The candidates that pass every threshold and filter.
pub fn select_candidates<'n>(
    nodes: impl IntoIterator<Item = &'n Node>,
    env: &AliasEnv,
    rules: &LiftRules,
) -> Vec<LiftCandidate> {
    scan_usages(nodes, env, rules)
        .into_iter()
        .filter(|c| !c.collided && rules.qualifies(&c.path, c.count))
        .collect()
}

// ---------------------------------------------------------------------------
// Applying lifts
// ---------------------------------------------------------------------------

/// What a lifting pass did to one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiftReport {
    pub lifted: Vec<LiftCandidate>,
    /// Aliases synthesized (lifted names that had no alias yet).
    pub new_aliases: usize,
    pub rewritten: usize,
}

/// Lift qualifying names in a classified scope.
///
/// New aliases join the alias bucket, which is re-sorted when `sort` is set.
/// Usages are shortened in the categories ordered after `alias` and in the
/// other content; earlier categories keep full paths.
pub fn lift_aliases(
    buckets: &mut BTreeMap<Category, Vec<Node>>,
    content: &mut [Node],
    directives: &DirectivesConfig,
    rules: &LiftRules,
    sort: bool,
) -> Result<LiftReport, ShapeError> {
    let env = match buckets.get(&Category::Alias) {
        Some(aliases) => AliasEnv::new().define(aliases)?,
        None => AliasEnv::new(),
    };

    let ordered = directives.ordered_categories();
    let candidates = {
        let declarations = ordered
            .iter()
            .filter_map(|c| buckets.get(c))
            .flat_map(|nodes| nodes.iter());
        select_candidates(declarations.chain(content.iter()), &env, rules)
    };
    if candidates.is_empty() {
        return Ok(LiftReport::default());
    }

    let anchor_line = ordered
        .iter()
        .filter_map(|c| buckets.get(c))
        .flat_map(|nodes| nodes.first())
        .chain(content.first())
        .map(Node::line)
        .next()
        .unwrap_or(1);

    let aliases = buckets.entry(Category::Alias).or_default();
    let line = aliases.first().map(Node::line).unwrap_or(anchor_line);
    let mut new_aliases = 0;
    for candidate in &candidates {
        if env.get(&candidate.short) != Some(&candidate.path) {
            aliases.push(Node::directive(
                DirectiveKind::Alias,
                Node::from_name(candidate.path.clone(), line),
                line,
            ));
            new_aliases += 1;
        }
    }
    if sort && new_aliases > 0 {
        let (sorted, _) = sort_declarations(std::mem::take(aliases), directives.sort)?;
        *aliases = sorted;
    }

    let targets: HashMap<QualifiedName, String> = candidates
        .iter()
        .map(|c| (c.path.clone(), c.short.clone()))
        .collect();
    let alias_rank = directives.rank(Category::Alias);
    let mut rewritten = 0;
    for (category, nodes) in buckets.iter_mut() {
        if directives.rank(*category) > alias_rank {
            rewritten += nodes.iter_mut().map(|n| shorten(n, &targets)).sum::<usize>();
        }
    }
    rewritten += content.iter_mut().map(|n| shorten(n, &targets)).sum::<usize>();

    debug!(
        lifted = candidates.len(),
        new_aliases, rewritten, "lifted aliases"
    );

    Ok(LiftReport {
        lifted: candidates,
        new_aliases,
        rewritten,
    })
}

/// Replace every reference to a lifted path by its short name. Alias
/// declarations, groups, `as:` targets and nested modules are left alone.
fn shorten(node: &mut Node, targets: &HashMap<QualifiedName, String>) -> usize {
    match &node.kind {
        NodeKind::Name(name) => {
            if let Some(short) = targets.get(name) {
                node.kind = NodeKind::Name(QualifiedName::single(short));
                return 1;
            }
            return 0;
        }
        NodeKind::Module(_) | NodeKind::Group | NodeKind::Directive(DirectiveKind::Alias) => {
            return 0
        }
        NodeKind::Pair(key) if key == "as" => return 0,
        _ => {}
    }
    node.children
        .iter_mut()
        .map(|c| shorten(c, targets))
        .sum()
}
