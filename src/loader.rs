// File: src/loader.rs
//
// Template file loading for include/import/extend composition.
//
// The loader resolves a template path against a base directory, reads the
// file, hands the text to the external parser, and caches the parsed
// document so a partial included from many places is parsed once. Loading
// errors distinguish a missing file, a directory, and an unreadable file,
// phrased per composition form; the caller attaches the source location of
// the composing node.

use crate::ast::Document;
use crate::errors::{ErrorKind, OmeletError, SourceLocation};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The external parser collaborator. The evaluator never parses source
/// itself; composed files go through this trait, and parse failures are
/// surfaced unmodified (kind `Parse`, furthest-error location).
pub trait TemplateParser {
    fn parse(&self, source: &str) -> Result<Document, OmeletError>;
}

/// Which composition form requested a load, for error phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    Include,
    Import,
    Extend,
}

impl CompositionKind {
    fn label(&self) -> &'static str {
        match self {
            CompositionKind::Include => "Included",
            CompositionKind::Import => "Imported",
            CompositionKind::Extend => "Extended",
        }
    }
}

/// Resolves, reads, parses and caches composed template files.
pub struct TemplateLoader {
    base_dir: PathBuf,
    parser: Box<dyn TemplateParser>,
    /// Parsed documents keyed by resolved path, so repeated composition of
    /// the same partial parses it once.
    cache: HashMap<PathBuf, Document>,
}

impl TemplateLoader {
    pub fn new<P: AsRef<Path>>(base_dir: P, parser: Box<dyn TemplateParser>) -> Self {
        TemplateLoader { base_dir: base_dir.as_ref().to_path_buf(), parser, cache: HashMap::new() }
    }

    /// Resolves a template path against the configured base directory.
    /// This is also the canonical identifier used by the evaluator's
    /// inheritance and include chains.
    pub fn resolve(&self, file: &str) -> PathBuf {
        self.base_dir.join(file)
    }

    /// Loads and parses a composed file. Errors carry no location; the
    /// evaluator attaches the composing node's span in the current source.
    pub fn load(&mut self, file: &str, kind: CompositionKind) -> Result<Document, OmeletError> {
        let path = self.resolve(file);

        if let Some(document) = self.cache.get(&path) {
            return Ok(document.clone());
        }

        let metadata = fs::metadata(&path).map_err(|_| {
            OmeletError::eval_error(
                format!("{} file '{}' could not be found.", kind.label(), path.display()),
                SourceLocation::unknown(),
            )
        })?;

        if metadata.is_dir() {
            return Err(OmeletError::eval_error(
                format!("{} file '{}' is a directory.", kind.label(), path.display()),
                SourceLocation::unknown(),
            ));
        }

        let text = fs::read_to_string(&path).map_err(|_| {
            OmeletError::eval_error(
                format!("{} file '{}' could not be read.", kind.label(), path.display()),
                SourceLocation::unknown(),
            )
        })?;

        let document = self.parser.parse(&text).map_err(|mut err| {
            if err.kind == ErrorKind::Parse && err.location.file.is_none() {
                err.location.file = Some(path.display().to_string());
            }
            err
        })?;

        self.cache.insert(path, document.clone());
        Ok(document)
    }
}
