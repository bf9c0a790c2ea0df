// File: src/evaluator/scope.rs
//
// Lexical scoping environment for the Omelet evaluator.
// Implements a stack of frames where inner frames shadow outer frames.

use super::value::Value;
use crate::ast::Node;
use crate::errors::{ErrorKind, OmeletError, SourceLocation};
use ahash::AHashMap;

/// What a frame stores for a name: an already-evaluated value, or an
/// unevaluated AST node. Assignments and macro arguments bind lazily and
/// are evaluated on each lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Lazy(Node),
}

/// Variable storage using lexical scoping
///
/// The Scope maintains a stack of frames (Vec of maps). Lookup searches
/// from the innermost frame (end of the Vec) outward, so an inner binding
/// shadows an outer one. Within a single frame a name binds at most once;
/// rebinding is an error rather than an overwrite, because Omelet
/// assignments are single-assignment.
///
/// Callers must pair every `open` with exactly one `close`, including on
/// error exits.
#[derive(Clone, Debug)]
pub struct Scope {
    frames: Vec<AHashMap<String, Binding>>,
}

impl Scope {
    /// Create a new scope with a single outermost frame
    pub fn new() -> Self {
        Scope { frames: vec![AHashMap::new()] }
    }

    /// Push a new empty frame (e.g. entering a tag body or a loop
    /// iteration)
    pub fn open(&mut self) {
        self.frames.push(AHashMap::new());
    }

    /// Pop the innermost frame. The outermost frame is never popped.
    pub fn close(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind a name in the innermost frame. Fails if the name is already
    /// bound there; shadowing an outer frame is allowed.
    pub fn add(&mut self, name: &str, binding: Binding) -> Result<(), OmeletError> {
        if let Some(frame) = self.frames.last_mut() {
            if frame.contains_key(name) {
                return Err(OmeletError::new(
                    ErrorKind::DuplicateBinding,
                    format!("Variable '{}' is already defined in this scope.", name),
                    SourceLocation::unknown(),
                ));
            }
            frame.insert(name.to_string(), binding);
        }
        Ok(())
    }

    /// Bulk `add`, used to seed the outermost frame from the external
    /// context object.
    pub fn add_all(&mut self, context: &AHashMap<String, Value>) -> Result<(), OmeletError> {
        for (name, value) in context {
            self.add(name, Binding::Value(value.clone()))?;
        }
        Ok(())
    }

    /// Look a name up, searching from the innermost frame outward.
    /// Returns a cloned binding if found; performs no evaluation itself.
    pub fn find(&self, name: &str) -> Option<Binding> {
        for frame in self.frames.iter().rev() {
            if let Some(binding) = frame.get(name) {
                return Some(binding.clone());
            }
        }
        None
    }

    /// Every name currently visible, innermost first. Used for
    /// "did you mean" suggestions on undefined references.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for frame in self.frames.iter().rev() {
            for name in frame.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
