// File: src/lib.rs
//
// Omelet is a small templating language that compiles to HTML (and, for a
// subset of the language, to Dust templates). This crate is the evaluator:
// it takes a parsed template document, a context object and a render
// target, and produces the output text or a structured error.

pub mod ast;
pub mod errors;
pub mod evaluator;
pub mod filters;
pub mod loader;
pub mod target;

pub use ast::{Document, Node};
pub use errors::{ErrorKind, OmeletError, SourceLocation};
pub use evaluator::{evaluate, Value};
pub use filters::FilterRegistry;
pub use loader::{TemplateLoader, TemplateParser};
pub use target::{RenderConfig, RenderTarget};
