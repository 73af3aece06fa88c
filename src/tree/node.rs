//! Node model for module bodies.
//!
//! Trees are produced upstream by a parser adaptor. Only declaration-shaped
//! nodes and qualified names are inspected here, so every other expression
//! collapses into a small set of generic kinds (`Call`, `Literal`, `Block`, ...).
//!
//! The [`fmt::Display`] rendering is canonical, single-line-per-node text. It
//! is what declarations are compared by when sorting, and what tests assert
//! against. It is not a pretty-printer.

use std::fmt;

// ---------------------------------------------------------------------------
// Qualified names
// ---------------------------------------------------------------------------

/// One dot-separated segment of a qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A plain capitalized segment (`Foo`).
    Literal(String),
    /// A segment only known at run time (`__MODULE__`, `unquote(mod)`).
    Computed(String),
}

impl Segment {
    /// Classify a raw segment: capitalized identifiers are literal, anything
    /// else is computed.
    pub fn parse(raw: &str) -> Self {
        let literal = raw.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && raw.chars().all(|c| c.is_alphanumeric() || c == '_');
        if literal {
            Segment::Literal(raw.to_string())
        } else {
            Segment::Computed(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Segment::Literal(s) | Segment::Computed(s) => s,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Segment::Literal(s) => Some(s),
            Segment::Computed(_) => None,
        }
    }
}

/// A qualified name such as `Foo.Bar.Baz`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    segments: Vec<Segment>,
}

impl QualifiedName {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a dotted path. Empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(Segment::parse)
                .collect(),
        }
    }

    /// A one-segment literal name.
    pub fn single(name: &str) -> Self {
        Self {
            segments: vec![Segment::Literal(name.to_string())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when every segment is literal.
    pub fn is_literal(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| s.as_literal().is_some())
    }

    /// The root segment, if it is literal.
    pub fn first(&self) -> Option<&str> {
        self.segments.first().and_then(Segment::as_literal)
    }

    /// The short name (last segment), if it is literal.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().and_then(Segment::as_literal)
    }

    /// `self` followed by all segments of `tail`.
    pub fn join(&self, tail: &QualifiedName) -> QualifiedName {
        let mut segments = self.segments.clone();
        segments.extend(tail.segments.iter().cloned());
        QualifiedName { segments }
    }

    /// Replace the root segment with `root` (`C.foo` with root `A.B.C` gives `A.B.C.foo`).
    pub fn with_root(&self, root: &QualifiedName) -> QualifiedName {
        let mut segments = root.segments.clone();
        segments.extend(self.segments.iter().skip(1).cloned());
        QualifiedName { segments }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metadata and comments
// ---------------------------------------------------------------------------

/// Source-position metadata carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Meta {
    /// 1-based line the node starts on.
    pub line: usize,
    /// Last line of a multi-line node (module bodies, blocks).
    pub end_line: Option<usize>,
    /// Blank lines following the node. Comment anchors after a node hang off this.
    pub newlines: usize,
}

impl Meta {
    pub fn at(line: usize) -> Self {
        Self {
            line,
            end_line: None,
            newlines: 0,
        }
    }
}

/// A source comment, threaded alongside the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub line: usize,
    pub text: String,
}

impl Comment {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// The directive keywords that introduce namespace declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Alias,
    Import,
    Require,
    Use,
}

impl DirectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Alias => "alias",
            DirectiveKind::Import => "import",
            DirectiveKind::Require => "require",
            DirectiveKind::Use => "use",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A nested scope. Children are the body.
    Module(QualifiedName),
    /// `alias`/`import`/`require`/`use`. `children[0]` is the target (`Name` or
    /// `Group`), an optional `children[1]` is a `Keywords` option list.
    Directive(DirectiveKind),
    /// `@name value`. Children hold the value, if any.
    Attribute(String),
    /// A qualified-name reference.
    Name(QualifiedName),
    /// `Prefix.{A, B}`: `children[0]` is the prefix `Name`, the rest are targets.
    Group,
    /// Local call; children are arguments.
    Call(String),
    /// `Receiver.fun(args)`: `children[0]` is the receiver.
    RemoteCall(String),
    /// Keyword list; children are `Pair`s.
    Keywords,
    /// `key: value`; `children[0]` is the value.
    Pair(String),
    Ident(String),
    Literal(String),
    /// Statement sequence.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub meta: Meta,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, meta: Meta, children: Vec<Node>) -> Self {
        Self {
            kind,
            meta,
            children,
        }
    }

    pub fn leaf(kind: NodeKind, line: usize) -> Self {
        Self::new(kind, Meta::at(line), Vec::new())
    }

    pub fn name(path: &str, line: usize) -> Self {
        Self::leaf(NodeKind::Name(QualifiedName::parse(path)), line)
    }

    pub fn from_name(name: QualifiedName, line: usize) -> Self {
        Self::leaf(NodeKind::Name(name), line)
    }

    /// `defmodule name do ... end` spanning `line..=end_line`.
    pub fn module(name: &str, line: usize, end_line: usize, body: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Module(QualifiedName::parse(name)),
            Meta {
                line,
                end_line: Some(end_line),
                newlines: 0,
            },
            body,
        )
    }

    pub fn directive(kind: DirectiveKind, target: Node, line: usize) -> Self {
        Self::new(NodeKind::Directive(kind), Meta::at(line), vec![target])
    }

    pub fn alias(path: &str, line: usize) -> Self {
        Self::directive(DirectiveKind::Alias, Self::name(path, line), line)
    }

    pub fn import(path: &str, line: usize) -> Self {
        Self::directive(DirectiveKind::Import, Self::name(path, line), line)
    }

    pub fn require(path: &str, line: usize) -> Self {
        Self::directive(DirectiveKind::Require, Self::name(path, line), line)
    }

    pub fn use_module(path: &str, line: usize) -> Self {
        Self::directive(DirectiveKind::Use, Self::name(path, line), line)
    }

    /// `kind prefix.{targets...}` with every target on its own line after `line`.
    pub fn grouped(kind: DirectiveKind, prefix: &str, targets: &[&str], line: usize) -> Self {
        let mut children = vec![Self::name(prefix, line)];
        children.extend(
            targets
                .iter()
                .enumerate()
                .map(|(i, t)| Self::name(t, line + i + 1)),
        );
        let group = Self::new(NodeKind::Group, Meta::at(line), children);
        Self::directive(kind, group, line)
    }

    /// Append a keyword option list (`as: Foo`, `only: [...]`).
    pub fn with_options(mut self, options: Vec<(&str, Node)>) -> Self {
        let line = self.meta.line;
        let pairs = options
            .into_iter()
            .map(|(key, value)| Self::new(NodeKind::Pair(key.to_string()), Meta::at(line), vec![value]))
            .collect();
        self.children
            .push(Self::new(NodeKind::Keywords, Meta::at(line), pairs));
        self
    }

    pub fn attribute(name: &str, value: Option<Node>, line: usize) -> Self {
        Self::new(
            NodeKind::Attribute(name.to_string()),
            Meta::at(line),
            value.into_iter().collect(),
        )
    }

    pub fn call(name: &str, args: Vec<Node>, line: usize) -> Self {
        Self::new(NodeKind::Call(name.to_string()), Meta::at(line), args)
    }

    pub fn remote_call(receiver: &str, fun: &str, args: Vec<Node>, line: usize) -> Self {
        let mut children = vec![Self::name(receiver, line)];
        children.extend(args);
        Self::new(NodeKind::RemoteCall(fun.to_string()), Meta::at(line), children)
    }

    pub fn ident(name: &str, line: usize) -> Self {
        Self::leaf(NodeKind::Ident(name.to_string()), line)
    }

    pub fn literal(text: &str, line: usize) -> Self {
        Self::leaf(NodeKind::Literal(text.to_string()), line)
    }

    pub fn block(children: Vec<Node>, line: usize) -> Self {
        Self::new(NodeKind::Block, Meta::at(line), children)
    }

    pub fn with_newlines(mut self, newlines: usize) -> Self {
        self.meta.newlines = newlines;
        self
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.meta.end_line = Some(end_line);
        self
    }

    pub fn line(&self) -> usize {
        self.meta.line
    }

    pub fn directive_kind(&self) -> Option<DirectiveKind> {
        match self.kind {
            NodeKind::Directive(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Attribute(name) => Some(name),
            _ => None,
        }
    }

    pub fn qualified_name(&self) -> Option<&QualifiedName> {
        match &self.kind {
            NodeKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Directive target (`children[0]`).
    pub fn target(&self) -> Option<&Node> {
        match self.kind {
            NodeKind::Directive(_) => self.children.first(),
            _ => None,
        }
    }

    /// Value of a directive keyword option such as `as:`.
    pub fn option(&self, key: &str) -> Option<&Node> {
        let options = self.children.get(1)?;
        if options.kind != NodeKind::Keywords {
            return None;
        }
        options
            .children
            .iter()
            .find(|pair| matches!(&pair.kind, NodeKind::Pair(k) if k == key))
            .and_then(|pair| pair.children.first())
    }

    pub fn is_struct_definition(&self) -> bool {
        matches!(&self.kind, NodeKind::Call(name)
            if matches!(name.as_str(), "defstruct" | "schema" | "embedded_schema"))
    }

    pub fn is_derive(&self) -> bool {
        self.attribute_name() == Some("derive")
    }

    /// Pre-order visit of this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Move this node and its whole subtree `delta` lines up.
    pub fn shift_lines_up(&mut self, delta: usize) {
        self.meta.line = self.meta.line.saturating_sub(delta);
        if let Some(end) = self.meta.end_line.as_mut() {
            *end = end.saturating_sub(delta);
        }
        for child in &mut self.children {
            child.shift_lines_up(delta);
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[Node], sep: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Module(name) => {
                writeln!(f, "defmodule {} do", name)?;
                for child in &self.children {
                    for line in child.to_string().lines() {
                        writeln!(f, "  {}", line)?;
                    }
                }
                f.write_str("end")
            }
            NodeKind::Directive(kind) => {
                write!(f, "{} ", kind.as_str())?;
                write_joined(f, &self.children, ", ")
            }
            NodeKind::Attribute(name) => {
                write!(f, "@{}", name)?;
                for child in &self.children {
                    write!(f, " {}", child)?;
                }
                Ok(())
            }
            NodeKind::Name(name) => write!(f, "{}", name),
            NodeKind::Group => match self.children.split_first() {
                Some((prefix, targets)) => {
                    write!(f, "{}.{{", prefix)?;
                    write_joined(f, targets, ", ")?;
                    f.write_str("}")
                }
                None => f.write_str("{}"),
            },
            NodeKind::Call(name) => {
                write!(f, "{}(", name)?;
                write_joined(f, &self.children, ", ")?;
                f.write_str(")")
            }
            NodeKind::RemoteCall(fun) => match self.children.split_first() {
                Some((receiver, args)) => {
                    write!(f, "{}.{}(", receiver, fun)?;
                    write_joined(f, args, ", ")?;
                    f.write_str(")")
                }
                None => write!(f, "{}()", fun),
            },
            NodeKind::Keywords => write_joined(f, &self.children, ", "),
            NodeKind::Pair(key) => {
                write!(f, "{}: ", key)?;
                write_joined(f, &self.children, ", ")
            }
            NodeKind::Ident(text) | NodeKind::Literal(text) => f.write_str(text),
            NodeKind::Block => write_joined(f, &self.children, "\n"),
        }
    }
}
