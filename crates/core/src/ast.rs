//! Syntax tree for schema source text.
//!
//! These types are produced by the parser and consumed by the resolver, the
//! formatter, and the JSON converter. They may also be built by hand: nothing
//! here requires source positions.
//!
//! Every node embeds a [`Comments`] record so that the formatter can put each
//! comment back where it was found. Comments never influence resolution.

use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// Trivia
// ──────────────────────────────────────────────

/// Comments attached to a node. Text is verbatim, delimiters included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    /// Comment lines immediately preceding the node
    pub before: Vec<String>,
    /// A comment starting on the same line as the node's last token
    pub inline: Option<String>,
    /// Comments before the closing delimiter of a container node
    pub remaining: Vec<String>,
}

// ──────────────────────────────────────────────
// Annotations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub key: String,
    /// `None` for a bare `@key`
    pub value: Option<String>,
}

/// Annotations in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations(pub Vec<Annotation>);

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    /// Key to value, with an empty string recorded for bare annotations.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|a| (a.key.clone(), a.value.clone().unwrap_or_default()))
            .collect()
    }
}

// ──────────────────────────────────────────────
// Paths and types
// ──────────────────────────────────────────────

/// A `::`-separated name such as `User` or `PhotoApp::Accounts::User`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    pub segments: Vec<String>,
}

impl Path {
    pub fn new(segments: Vec<String>) -> Self {
        Path { segments }
    }

    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }

    /// Last segment.
    pub fn basename(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Every segment but the last, joined with `::`.
    pub fn namespace(&self) -> String {
        match self.segments.split_last() {
            Some((_, init)) => init.join("::"),
            None => String::new(),
        }
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path {
            segments: s.split("::").map(str::to_owned).collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("::"))
    }
}

/// A type expression as written, before any name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Reference to a primitive, extension, common, enum, or entity type
    Path(Path),
    /// Reference that may only name an entity or enum type. The text syntax
    /// has no spelling for this; it comes from `{"type": "Entity"}` in JSON.
    Entity(Path),
    Set(Box<Type>),
    Record(RecordType),
}

impl Type {
    pub fn path(name: &str) -> Self {
        Type::Path(Path::from(name))
    }

    pub fn set(element: Type) -> Self {
        Type::Set(Box::new(element))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordType {
    pub attributes: Vec<Attribute>,
    pub comments: Comments,
}

impl RecordType {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        RecordType {
            attributes,
            comments: Comments::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub ty: Type,
    pub required: bool,
    pub annotations: Annotations,
    pub comments: Comments,
}

impl Attribute {
    pub fn new(name: &str, ty: Type, required: bool) -> Self {
        Attribute {
            name: name.to_owned(),
            ty,
            required,
            annotations: Annotations::default(),
            comments: Comments::default(),
        }
    }
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    pub names: Vec<String>,
    pub member_of: Vec<Path>,
    pub shape: Option<RecordType>,
    pub tags: Option<Type>,
    pub annotations: Annotations,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub names: Vec<String>,
    pub values: Vec<String>,
    pub annotations: Annotations,
    pub comments: Comments,
}

/// A parent action reference: `view`, `"view"`, or `NS::Action::"view"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    /// Explicit entity type; `None` means the `Action` type of the
    /// referring action's namespace
    pub ty: Option<Path>,
    pub id: String,
}

impl ActionRef {
    pub fn bare(id: &str) -> Self {
        ActionRef {
            ty: None,
            id: id.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliesTo {
    pub principals: Option<Vec<Path>>,
    pub resources: Option<Vec<Path>>,
    pub context: Option<Type>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDecl {
    pub names: Vec<String>,
    pub member_of: Vec<ActionRef>,
    pub applies_to: Option<AppliesTo>,
    pub annotations: Annotations,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonTypeDecl {
    pub name: String,
    pub ty: Type,
    pub annotations: Annotations,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Entity(EntityDecl),
    Enum(EnumDecl),
    Action(ActionDecl),
    CommonType(CommonTypeDecl),
}

impl Declaration {
    pub fn annotations(&self) -> &Annotations {
        match self {
            Declaration::Entity(d) => &d.annotations,
            Declaration::Enum(d) => &d.annotations,
            Declaration::Action(d) => &d.annotations,
            Declaration::CommonType(d) => &d.annotations,
        }
    }

    pub fn comments(&self) -> &Comments {
        match self {
            Declaration::Entity(d) => &d.comments,
            Declaration::Enum(d) => &d.comments,
            Declaration::Action(d) => &d.comments,
            Declaration::CommonType(d) => &d.comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub path: Path,
    pub decls: Vec<Declaration>,
    pub annotations: Annotations,
    pub comments: Comments,
}

/// A top-level item of a schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Namespace(Namespace),
    Decl(Declaration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Items in source order
    pub items: Vec<Item>,
    /// Comments after the last item
    pub remaining: Vec<String>,
}

impl Schema {
    /// Group declarations by namespace (`""` for the root), merging blocks
    /// that share a path. Declarations keep their source order.
    pub fn namespaces(&self) -> BTreeMap<String, Vec<&Declaration>> {
        let mut out: BTreeMap<String, Vec<&Declaration>> = BTreeMap::new();
        for item in &self.items {
            match item {
                Item::Namespace(ns) => out
                    .entry(ns.path.to_string())
                    .or_default()
                    .extend(ns.decls.iter()),
                Item::Decl(d) => out.entry(String::new()).or_default().push(d),
            }
        }
        out
    }
}
