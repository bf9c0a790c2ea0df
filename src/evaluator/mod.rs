// File: src/evaluator/mod.rs
//
// Tree-walking evaluator for Omelet templates.
// Produces the output text by traversing the Abstract Syntax Tree (AST).
//
// The evaluator maintains a scope (chained frames) for variables and
// macros, evaluates expression nodes to values, and string-coerces values
// into the output. It supports:
// - Nested lexical scoping with single-assignment frames and shadowing
// - Cross-file composition: include, import and extend, with cycle guards
// - First-class macros with lazy, call-by-name argument binding
// - Left-to-right filter pipelines on tags, groups and interpolations
// - HTML structural rules: void elements, class-attribute merging,
//   doctype shorthands, target-specific escaping
//
// One Scope and one inheritance chain exist per top-level `evaluate` call;
// nothing is shared between calls, so concurrent renders are independent.

// Module structure
mod scope;
mod value;

pub use scope::{Binding, Scope};
pub use value::Value;

use crate::ast::{Accessor, Document, ElifCase, FilterCall, Node, Span};
use crate::errors::{find_closest_match, ErrorKind, OmeletError, SourceLocation};
use crate::filters::FilterRegistry;
use crate::loader::{CompositionKind, TemplateLoader};
use crate::target::{self, RenderConfig};
use ahash::AHashMap;
use std::path::PathBuf;

/// The attribute name whose repeated occurrences merge into one.
const MERGED_ATTRIBUTE: &str = "class";

/// Evaluates a parsed document to its output string.
///
/// `source` is the original template text, used for error locations.
/// `context` seeds the outermost scope frame. The render config selects
/// the target policy; the filter registry and loader are the external
/// collaborators for filter lookup and file composition.
pub fn evaluate(
    document: &Document,
    source: &str,
    context: &AHashMap<String, Value>,
    config: &RenderConfig,
    filters: &FilterRegistry,
    loader: &mut TemplateLoader,
) -> Result<String, OmeletError> {
    let mut evaluator = Evaluator::new(source, config, filters, loader);
    evaluator.scope.add_all(context)?;
    evaluator.render_document(document)
}

struct Evaluator<'a> {
    source: &'a str,
    config: &'a RenderConfig,
    filters: &'a FilterRegistry,
    loader: &'a mut TemplateLoader,
    scope: Scope,
    /// Files visited via Extend, for inheritance-loop detection.
    extends_chain: Vec<PathBuf>,
    /// Files currently being included, for include-cycle detection.
    include_chain: Vec<PathBuf>,
}

impl<'a> Evaluator<'a> {
    fn new(
        source: &'a str,
        config: &'a RenderConfig,
        filters: &'a FilterRegistry,
        loader: &'a mut TemplateLoader,
    ) -> Self {
        Evaluator {
            source,
            config,
            filters,
            loader,
            scope: Scope::new(),
            extends_chain: Vec::new(),
            include_chain: Vec::new(),
        }
    }

    /// Top-level entry: an extending document delegates entirely to the
    /// inheritance logic; otherwise hoisted imports run first, then the
    /// content nodes concatenate in document order.
    fn render_document(&mut self, document: &Document) -> Result<String, OmeletError> {
        if let Some(extend) = &document.extend {
            return self.eval_extend(document, extend);
        }
        for import in &document.imports {
            self.eval_node(import)?;
        }
        self.concat(&document.contents)
    }

    /// Evaluates nodes in order and joins their string-coerced outputs.
    fn concat(&mut self, nodes: &[Node]) -> Result<String, OmeletError> {
        let mut output = String::new();
        for node in nodes {
            output.push_str(&self.eval_node(node)?.to_string());
        }
        Ok(output)
    }

    fn eval_node(&mut self, node: &Node) -> Result<Value, OmeletError> {
        if !self.config.target.supports(node) {
            return Err(self.err_at(
                ErrorKind::Eval,
                format!(
                    "{} nodes are not supported by the {} target.",
                    node.kind_name(),
                    self.config.target
                ),
                node.span().start,
            ));
        }

        match node {
            Node::Number { value, span } => self.eval_number(value, *span),
            Node::Boolean { value, .. } => Ok(Value::Bool(*value)),
            Node::String { value, .. } => Ok(Value::Str(value.clone())),
            Node::Identifier { value, .. } => self.eval_identifier(value),
            Node::Attribute { name, value, .. } => {
                let name = self.eval_node(name)?;
                let value = self.eval_node(value)?;
                Ok(Value::Str(format!("{}=\"{}\"", name, value)))
            }
            Node::Tag { name, attributes, inner, filters, span } => {
                self.scope.open();
                let result = self.eval_tag(name, attributes, inner, filters, *span);
                self.scope.close();
                result
            }
            Node::Parenthetical { inner, filters, .. } => {
                let output = self.concat(inner)?;
                Ok(Value::Str(self.apply_filters(filters, output)?))
            }
            Node::Assignment { name, value, span } => {
                self.scope
                    .add(name, Binding::Lazy((**value).clone()))
                    .map_err(|err| self.locate(err, span.start))?;
                Ok(Value::Str(String::new()))
            }
            Node::MacroDefinition { name, params, body, span } => {
                let binding =
                    Binding::Value(Value::Macro { params: params.clone(), body: body.clone() });
                self.scope.add(name, binding).map_err(|err| self.locate(err, span.start))?;
                Ok(Value::Str(String::new()))
            }
            Node::IfStatement { predicate, then_case, elif_cases, else_case, .. } => {
                self.eval_if(predicate, then_case, elif_cases, else_case.as_deref())
            }
            Node::ForEach { iterator, data, body, span } => {
                self.eval_foreach(iterator, data, body, *span)
            }
            Node::Interpolation { name, accessors, arguments, filters, span } => {
                self.eval_interpolation(name, accessors, arguments, filters, *span)
            }
            Node::Raw { value, .. } => Ok(Value::Str(value.clone())),
            Node::Comment { .. } => Ok(Value::Str(String::new())),
            Node::Doctype { value, .. } => Ok(Value::Str(target::doctype(value))),
            Node::Include { file, span } => self.eval_include(file, *span),
            Node::Import { file, span } => self.eval_import(file, *span),
            Node::Extend { span, .. } => Err(self.err_at(
                ErrorKind::Eval,
                "Extend is only valid at the top of a document.".to_string(),
                span.start,
            )),
            Node::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval_node(element)?);
                }
                Ok(Value::List(items))
            }
            Node::Range { start, end, .. } => self.eval_range(start, end),
        }
    }

    /// Numbers evaluate by integer parsing of the literal text; a
    /// fractional literal keeps its leading integer part.
    fn eval_number(&self, text: &str, span: Span) -> Result<Value, OmeletError> {
        let trimmed = text.trim();
        let (sign, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
        match leading.parse::<i64>() {
            Ok(n) => Ok(Value::Number(sign * n)),
            Err(_) => Err(self.err_at(
                ErrorKind::Type,
                format!("Could not parse number literal '{}'.", text),
                span.start,
            )),
        }
    }

    /// Lenient lookup: an unbound identifier evaluates to its own text,
    /// which is how bare words in attribute values work.
    fn eval_identifier(&mut self, name: &str) -> Result<Value, OmeletError> {
        match self.scope.find(name) {
            Some(Binding::Value(value)) => Ok(value),
            Some(Binding::Lazy(node)) => self.eval_node(&node),
            None => Ok(Value::Str(name.to_string())),
        }
    }

    fn eval_tag(
        &mut self,
        name: &Node,
        attributes: &[Node],
        inner: &[Node],
        filters: &[FilterCall],
        span: Span,
    ) -> Result<Value, OmeletError> {
        let tag_name = self.eval_node(name)?.to_string();

        let mut output = format!("<{}", tag_name);
        for attribute in self.render_attributes(attributes)? {
            output.push(' ');
            output.push_str(&attribute);
        }

        if target::is_void_element(&tag_name) {
            let contents = self.concat(inner)?;
            if !contents.is_empty() {
                let offset = inner.first().map(|n| n.span().start).unwrap_or(span.start);
                return Err(self.err_at(
                    ErrorKind::Syntax,
                    format!(
                        "'{}' is a void (self-closing) tag and cannot have any contents.",
                        tag_name
                    ),
                    offset,
                ));
            }
            output.push_str("/>");
            return Ok(Value::Str(output));
        }

        output.push('>');

        let mut contents = String::new();
        for node in inner {
            let fragment = self.eval_node(node)?.to_string();
            if self.config.target.escapes_strings() && matches!(node, Node::String { .. }) {
                contents.push_str(&target::escape_html(&fragment));
            } else {
                contents.push_str(&fragment);
            }
        }
        let contents = self.apply_filters(filters, contents)?;

        output.push_str(&contents);
        output.push_str("</");
        output.push_str(&tag_name);
        output.push('>');
        Ok(Value::Str(output))
    }

    /// Renders a tag's attribute list, collapsing every occurrence of the
    /// merge-target attribute into the first occurrence's position with
    /// space-joined values. Other attribute names are never merged.
    fn render_attributes(&mut self, attributes: &[Node]) -> Result<Vec<String>, OmeletError> {
        let mut rendered: Vec<String> = Vec::with_capacity(attributes.len());
        let mut merge_slot: Option<usize> = None;
        let mut merge_values: Vec<String> = Vec::new();

        for attribute in attributes {
            if let Node::Attribute { name, value, .. } = attribute {
                let attr_name = self.eval_node(name)?.to_string();
                if attr_name == MERGED_ATTRIBUTE {
                    merge_values.push(self.eval_node(value)?.to_string());
                    if merge_slot.is_none() {
                        merge_slot = Some(rendered.len());
                        rendered.push(String::new());
                    }
                    continue;
                }
                let attr_value = self.eval_node(value)?.to_string();
                rendered.push(format!("{}=\"{}\"", attr_name, attr_value));
            } else {
                rendered.push(self.eval_node(attribute)?.to_string());
            }
        }

        if let Some(slot) = merge_slot {
            rendered[slot] =
                format!("{}=\"{}\"", MERGED_ATTRIBUTE, merge_values.join(" ").trim());
        }
        Ok(rendered)
    }

    fn eval_if(
        &mut self,
        predicate: &Node,
        then_case: &[Node],
        elif_cases: &[ElifCase],
        else_case: Option<&[Node]>,
    ) -> Result<Value, OmeletError> {
        if self.eval_predicate(predicate)? {
            return self.concat(then_case).map(Value::Str);
        }
        for elif in elif_cases {
            if self.eval_predicate(&elif.predicate)? {
                return self.concat(&elif.then_case).map(Value::Str);
            }
        }
        match else_case {
            Some(nodes) => self.concat(nodes).map(Value::Str),
            None => Ok(Value::Str(String::new())),
        }
    }

    /// A predicate must come out boolean; the strings "true" and "false"
    /// coerce, anything else is a type error.
    fn eval_predicate(&mut self, predicate: &Node) -> Result<bool, OmeletError> {
        match self.eval_node(predicate)? {
            Value::Bool(b) => Ok(b),
            Value::Str(s) if s == "true" => Ok(true),
            Value::Str(s) if s == "false" => Ok(false),
            other => Err(self.err_at(
                ErrorKind::Type,
                format!(
                    "Condition in if statement must evaluate to a boolean, found {}.",
                    other.type_name()
                ),
                predicate.span().start,
            )),
        }
    }

    fn eval_foreach(
        &mut self,
        iterator: &str,
        data: &Node,
        body: &[Node],
        span: Span,
    ) -> Result<Value, OmeletError> {
        // A bare name that is not in scope means an empty loop, not an
        // error; any other non-sequence value is a type error.
        let resolved = match data {
            Node::Identifier { value, .. } => match self.scope.find(value) {
                None => Value::List(Vec::new()),
                Some(Binding::Value(v)) => v,
                Some(Binding::Lazy(node)) => self.eval_node(&node)?,
            },
            other => self.eval_node(other)?,
        };

        let items = match resolved {
            Value::List(items) => items,
            other => {
                return Err(self.err_at(
                    ErrorKind::Type,
                    format!("Loop data must evaluate to a list, found {}.", other.type_name()),
                    data.span().start,
                ))
            }
        };

        let mut output = String::new();
        for item in items {
            self.scope.open();
            let result = self.eval_loop_iteration(iterator, item, body, span);
            self.scope.close();
            output.push_str(&result?);
        }
        Ok(Value::Str(output))
    }

    fn eval_loop_iteration(
        &mut self,
        iterator: &str,
        item: Value,
        body: &[Node],
        span: Span,
    ) -> Result<String, OmeletError> {
        self.scope
            .add(iterator, Binding::Value(item))
            .map_err(|err| self.locate(err, span.start))?;
        self.concat(body)
    }

    fn eval_interpolation(
        &mut self,
        name: &str,
        accessors: &[Accessor],
        arguments: &[Node],
        filters: &[FilterCall],
        span: Span,
    ) -> Result<Value, OmeletError> {
        let binding = match self.scope.find(name) {
            Some(binding) => binding,
            None => {
                let (kind, what) = if arguments.is_empty() {
                    (ErrorKind::UndefinedVariable, "variable")
                } else {
                    (ErrorKind::UndefinedMacro, "macro")
                };
                let mut err = self.err_at(
                    kind,
                    format!("Could not evaluate undefined {} '{}'.", what, name),
                    span.start,
                );
                if let Some(closest) = find_closest_match(name, &self.scope.names()) {
                    err = err.with_suggestion(closest.to_string());
                }
                return Err(err);
            }
        };

        let mut value = match binding {
            Binding::Value(value) => value,
            Binding::Lazy(node) => self.eval_node(&node)?,
        };

        // Accessor traversal, e.g. person.name resolves person first and
        // then steps through the object.
        let mut path = name.to_string();
        for accessor in accessors {
            path.push_str(&accessor.render());
            let next = match (&value, accessor) {
                (Value::Object(map), Accessor::Field(field)) => map.get(field).cloned(),
                (Value::List(items), Accessor::Index(index)) => {
                    usize::try_from(*index).ok().and_then(|i| items.get(i).cloned())
                }
                _ => None,
            };
            value = next.ok_or_else(|| {
                self.err_at(
                    ErrorKind::UndefinedVariable,
                    format!("Object '{}' is not defined.", path),
                    span.start,
                )
            })?;
        }

        let output = match value {
            Value::Macro { params, body } => {
                if params.len() != arguments.len() {
                    return Err(self.err_at(
                        ErrorKind::Type,
                        format!(
                            "Incorrect number of arguments given to macro '{}'. \
                             Expected {} but got {}.",
                            name,
                            params.len(),
                            arguments.len()
                        ),
                        span.start,
                    ));
                }
                self.scope.open();
                let result = self.eval_macro_call(&params, arguments, &body, span);
                self.scope.close();
                result?
            }
            other => other,
        };

        if filters.is_empty() {
            Ok(output)
        } else {
            let filtered = self.apply_filters(filters, output.to_string())?;
            Ok(Value::Str(filtered))
        }
    }

    /// Arguments bind lazily: each parameter holds the unevaluated
    /// call-site node and is only evaluated where the body references it.
    fn eval_macro_call(
        &mut self,
        params: &[String],
        arguments: &[Node],
        body: &Node,
        span: Span,
    ) -> Result<Value, OmeletError> {
        for (param, argument) in params.iter().zip(arguments) {
            self.scope
                .add(param, Binding::Lazy(argument.clone()))
                .map_err(|err| self.locate(err, span.start))?;
        }
        self.eval_node(body)
    }

    fn eval_range(&mut self, start: &Node, end: &Node) -> Result<Value, OmeletError> {
        let from = match self.eval_node(start)? {
            Value::Number(n) => n,
            _ => {
                return Err(self.err_at(
                    ErrorKind::Type,
                    "Start index of range must evaluate to a number.".to_string(),
                    start.span().start,
                ))
            }
        };
        let to = match self.eval_node(end)? {
            Value::Number(n) => n,
            _ => {
                return Err(self.err_at(
                    ErrorKind::Type,
                    "End index of range must evaluate to a number.".to_string(),
                    end.span().start,
                ))
            }
        };

        let items: Vec<Value> = if from <= to {
            (from..=to).map(Value::Number).collect()
        } else {
            (to..=from).rev().map(Value::Number).collect()
        };
        Ok(Value::List(items))
    }

    /// Include: splice the included document's rendered contents into the
    /// current position. Definitions made by the included file stay inside
    /// the include's own frame.
    fn eval_include(&mut self, file: &str, span: Span) -> Result<Value, OmeletError> {
        let path = self.loader.resolve(file);
        if self.include_chain.contains(&path) {
            return Err(self.err_at(
                ErrorKind::Eval,
                format!(
                    "Include cycle detected. File '{}' is already being included.",
                    path.display()
                ),
                span.start,
            ));
        }

        let document = self
            .loader
            .load(file, CompositionKind::Include)
            .map_err(|err| self.locate(err, span.start))?;

        self.include_chain.push(path);
        self.scope.open();
        let result = self.render_included(&document);
        self.scope.close();
        self.include_chain.pop();
        result.map(Value::Str)
    }

    fn render_included(&mut self, document: &Document) -> Result<String, OmeletError> {
        for import in &document.imports {
            self.eval_node(import)?;
        }
        self.concat(&document.contents)
    }

    /// Import: evaluate only the imported document's definitions, into the
    /// current frame, so they stay visible to the rest of this document.
    /// Produces no output.
    fn eval_import(&mut self, file: &str, span: Span) -> Result<Value, OmeletError> {
        let document = self
            .loader
            .load(file, CompositionKind::Import)
            .map_err(|err| self.locate(err, span.start))?;

        for node in &document.contents {
            if node.is_definition() {
                self.eval_node(node)?;
            }
        }
        Ok(Value::Str(String::new()))
    }

    /// Extend: template inheritance. The child's definitions are kept and
    /// the parent's contents become the whole output; the child's own
    /// non-definition contents are discarded.
    fn eval_extend(&mut self, root: &Document, extend: &Node) -> Result<String, OmeletError> {
        let (file, span) = match extend {
            Node::Extend { file, span } => (file.as_str(), *span),
            other => {
                return Err(self.err_at(
                    ErrorKind::Eval,
                    format!("Expected an Extend node, found {}.", other.kind_name()),
                    other.span().start,
                ))
            }
        };

        let path = self.loader.resolve(file);
        if self.extends_chain.contains(&path) {
            return Err(self.err_at(
                ErrorKind::Eval,
                format!(
                    "Template inheritance loop detected. File '{}' has already been \
                     extended earlier in the inheritance chain.",
                    path.display()
                ),
                span.start,
            ));
        }

        for node in &root.contents {
            if node.is_definition() {
                self.eval_node(node)?;
            }
        }

        self.extends_chain.push(path);
        let parent = self
            .loader
            .load(file, CompositionKind::Extend)
            .map_err(|err| self.locate(err, span.start))?;

        if let Some(parent_extend) = &parent.extend {
            return self.eval_extend(&parent, parent_extend);
        }
        for import in &parent.imports {
            self.eval_node(import)?;
        }
        self.concat(&parent.contents)
    }

    fn apply_filters(
        &mut self,
        filters: &[FilterCall],
        input: String,
    ) -> Result<String, OmeletError> {
        let mut output = input;
        for filter in filters {
            let function = match self.filters.lookup(&filter.name) {
                Some(function) => function,
                None => {
                    let mut err = self.err_at(
                        ErrorKind::Syntax,
                        format!("Cannot apply undefined filter '{}'.", filter.name),
                        filter.span.start,
                    );
                    if let Some(closest) = find_closest_match(&filter.name, &self.filters.names()) {
                        err = err.with_suggestion(closest.to_string());
                    }
                    return Err(err);
                }
            };
            let mut args = Vec::with_capacity(filter.args.len());
            for arg in &filter.args {
                args.push(self.eval_node(arg)?.to_string());
            }
            output = function(&output, &args);
        }
        Ok(output)
    }

    fn err_at(&self, kind: ErrorKind, message: String, offset: usize) -> OmeletError {
        self.locate(OmeletError::new(kind, message, SourceLocation::unknown()), offset)
    }

    /// Attaches a location in the current source to an error that does not
    /// have one yet. Errors arriving from composed files keep theirs, even
    /// when only the file name is known.
    fn locate(&self, mut err: OmeletError, offset: usize) -> OmeletError {
        if err.location.is_unknown() && err.location.file.is_none() {
            let location = SourceLocation::from_offset(self.source, offset);
            err.source_line = self.source.lines().nth(location.line.saturating_sub(1)).map(String::from);
            err.location = location;
            err.location.file = self.config.file.clone();
        }
        err
    }
}
