// File: src/ast.rs
//
// Abstract Syntax Tree (AST) definitions for the Omelet templating language.
// Defines the structure of parsed Omelet documents.
//
// The evaluator walks this tree; it never mutates it. Every node carries a
// byte-range span into the originating source so evaluation-time errors can
// point back at the offending template text.

/// Byte range into the originating source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// One step of a dotted name: `.field` or `[index]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Field(String),
    Index(i64),
}

impl Accessor {
    /// Renders the accessor the way error messages spell traversal paths,
    /// e.g. `person["name"]` or `items[0]`.
    pub fn render(&self) -> String {
        match self {
            Accessor::Field(name) => format!("[\"{}\"]", name),
            Accessor::Index(index) => format!("[{}]", index),
        }
    }
}

/// One stage of a post-processing filter pipeline: `| name(arg, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Node>,
    pub span: Span,
}

/// One `elif` branch of an if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ElifCase {
    pub predicate: Node,
    pub then_case: Vec<Node>,
}

/// Represents a node in an Omelet template.
///
/// `Array` and `Range` only occur in documents aimed at the Dust target;
/// the HTML target rejects them at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Numeric literal, kept as source text. Omelet numbers are integers;
    /// a fractional literal evaluates to its leading integer part.
    Number { value: String, span: Span },
    Boolean { value: bool, span: Span },
    String { value: String, span: Span },
    /// A name reference. Unbound identifiers evaluate to their own text,
    /// which is how bare words work in attribute values.
    Identifier { value: String, accessors: Vec<Accessor>, span: Span },
    /// `name="value"` inside a tag. Both sides are expression nodes.
    Attribute { name: Box<Node>, value: Box<Node>, span: Span },
    Tag {
        name: Box<Node>,
        attributes: Vec<Node>,
        inner: Vec<Node>,
        filters: Vec<FilterCall>,
        span: Span,
    },
    /// Grouping construct: evaluates its contents and applies filters
    /// without emitting any markup of its own.
    Parenthetical { inner: Vec<Node>, filters: Vec<FilterCall>, span: Span },
    /// `name = expr`. The right-hand side is stored unevaluated and only
    /// evaluated when the name is referenced.
    Assignment { name: String, value: Box<Node>, span: Span },
    IfStatement {
        predicate: Box<Node>,
        then_case: Vec<Node>,
        elif_cases: Vec<ElifCase>,
        else_case: Option<Vec<Node>>,
        span: Span,
    },
    ForEach { iterator: String, data: Box<Node>, body: Vec<Node>, span: Span },
    /// Call site of a macro or variable: `{name.mod(arg, ...)|filter}`.
    Interpolation {
        name: String,
        accessors: Vec<Accessor>,
        arguments: Vec<Node>,
        filters: Vec<FilterCall>,
        span: Span,
    },
    MacroDefinition { name: String, params: Vec<String>, body: Box<Node>, span: Span },
    /// Verbatim text, emitted without evaluation or escaping.
    Raw { value: String, span: Span },
    Include { file: String, span: Span },
    Import { file: String, span: Span },
    Extend { file: String, span: Span },
    Comment { span: Span },
    /// Doctype shorthand, e.g. `html5` or `xhtml_strict`.
    Doctype { value: String, span: Span },
    /// Array literal (Dust target only).
    Array { elements: Vec<Node>, span: Span },
    /// Inclusive integer range (Dust target only).
    Range { start: Box<Node>, end: Box<Node>, span: Span },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Number { span, .. }
            | Node::Boolean { span, .. }
            | Node::String { span, .. }
            | Node::Identifier { span, .. }
            | Node::Attribute { span, .. }
            | Node::Tag { span, .. }
            | Node::Parenthetical { span, .. }
            | Node::Assignment { span, .. }
            | Node::IfStatement { span, .. }
            | Node::ForEach { span, .. }
            | Node::Interpolation { span, .. }
            | Node::MacroDefinition { span, .. }
            | Node::Raw { span, .. }
            | Node::Include { span, .. }
            | Node::Import { span, .. }
            | Node::Extend { span, .. }
            | Node::Comment { span }
            | Node::Doctype { span, .. }
            | Node::Array { span, .. }
            | Node::Range { span, .. } => *span,
        }
    }

    /// Human-readable kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Number { .. } => "Number",
            Node::Boolean { .. } => "Boolean",
            Node::String { .. } => "String",
            Node::Identifier { .. } => "Identifier",
            Node::Attribute { .. } => "Attribute",
            Node::Tag { .. } => "Tag",
            Node::Parenthetical { .. } => "Parenthetical",
            Node::Assignment { .. } => "Assignment",
            Node::IfStatement { .. } => "IfStatement",
            Node::ForEach { .. } => "ForEach",
            Node::Interpolation { .. } => "Interpolation",
            Node::MacroDefinition { .. } => "MacroDefinition",
            Node::Raw { .. } => "Raw",
            Node::Include { .. } => "Include",
            Node::Import { .. } => "Import",
            Node::Extend { .. } => "Extend",
            Node::Comment { .. } => "Comment",
            Node::Doctype { .. } => "Doctype",
            Node::Array { .. } => "Array",
            Node::Range { .. } => "Range",
        }
    }

    /// True for the definition forms that Import and Extend keep from a
    /// document: macro definitions and assignments.
    pub fn is_definition(&self) -> bool {
        matches!(self, Node::Assignment { .. } | Node::MacroDefinition { .. })
    }
}

/// Root of a parsed template. The parser hoists `Import` nodes into
/// `imports` so they can be evaluated before the document body, and a
/// document carries at most one `Extend`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub contents: Vec<Node>,
    pub imports: Vec<Node>,
    pub extend: Option<Node>,
}

impl Document {
    pub fn new(contents: Vec<Node>) -> Self {
        Document { contents, imports: Vec::new(), extend: None }
    }
}
