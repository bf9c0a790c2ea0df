// File: src/errors.rs
//
// Error handling and reporting for the Omelet template evaluator.
// Provides structured error types with source location information
// and pretty-printed error messages.
//
// Every error is fatal: the evaluator never recovers or produces partial
// output. Errors carry enough context (kind, location, source excerpt) for
// a caller to render a user-facing diagnostic.

use colored::Colorize;
use std::fmt;

/// Source location information for tracking where template text appears
/// in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub file: Option<String>,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column, file: None }
    }

    pub fn unknown() -> Self {
        Self { line: 0, column: 0, file: None }
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.column == 0
    }

    /// Computes a 1-based line/column location from a byte offset into the
    /// source. Offsets past the end of the source clamp to the last line.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
        Self { line, column, file: None }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Types of errors that can occur while evaluating a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed source in a composed file.
    Parse,
    /// Inheritance cycle, missing or unreadable composed file, or a node
    /// kind the active render target does not accept.
    Eval,
    /// Structural violation discoverable only at evaluation time, such as
    /// a void element with contents or an unknown filter.
    Syntax,
    /// Non-boolean predicate, non-numeric range bound, macro arity
    /// mismatch, or a loop over a non-sequence.
    Type,
    UndefinedVariable,
    UndefinedMacro,
    /// Rebinding of a name in the frame where it is already bound.
    DuplicateBinding,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "Parse Error"),
            ErrorKind::Eval => write!(f, "Evaluation Error"),
            ErrorKind::Syntax => write!(f, "Syntax Error"),
            ErrorKind::Type => write!(f, "Type Error"),
            ErrorKind::UndefinedVariable => write!(f, "Undefined Variable"),
            ErrorKind::UndefinedMacro => write!(f, "Undefined Macro"),
            ErrorKind::DuplicateBinding => write!(f, "Duplicate Binding"),
        }
    }
}

/// A structured error with location information
#[derive(Debug, Clone)]
pub struct OmeletError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: SourceLocation,
    pub source_line: Option<String>,
    pub suggestion: Option<String>,
    pub note: Option<String>,
}

impl OmeletError {
    pub fn new(kind: ErrorKind, message: String, location: SourceLocation) -> Self {
        Self { kind, message, location, source_line: None, suggestion: None, note: None }
    }

    pub fn with_source(mut self, source_line: String) -> Self {
        self.source_line = Some(source_line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }

    /// Create a parse error
    pub fn parse_error(message: String, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Parse, message, location)
    }

    /// Create an evaluation error
    pub fn eval_error(message: String, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Eval, message, location)
    }
}

impl fmt::Display for OmeletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind_str = format!("{}", self.kind);
        writeln!(f, "{}: {}", kind_str.red().bold(), self.message.bold())?;

        let location_str = format!("  --> {}", self.location);
        writeln!(f, "{}", location_str.bright_blue())?;

        if let Some(ref source) = self.source_line {
            let line_num = self.location.line;
            let col_num = self.location.column;

            writeln!(f, "   {}", "|".bright_blue())?;
            writeln!(
                f,
                "{} {} {}",
                format!("{:3}", line_num).bright_blue(),
                "|".bright_blue(),
                source
            )?;
            writeln!(
                f,
                "   {} {}{}",
                "|".bright_blue(),
                " ".repeat(col_num.saturating_sub(1)),
                "^".red().bold()
            )?;
            writeln!(f, "   {}", "|".bright_blue())?;
        }

        if let Some(ref suggestion) = self.suggestion {
            writeln!(
                f,
                "   {} {}",
                "=".bright_green(),
                format!("Did you mean '{}'?", suggestion).bright_green()
            )?;
        }

        if let Some(ref note) = self.note {
            writeln!(f, "   {} {}", "=".bright_cyan(), format!("note: {}", note).bright_cyan())?;
        }

        Ok(())
    }
}

impl std::error::Error for OmeletError {}

/// Computes the Levenshtein distance between two strings.
/// Used for "Did you mean?" suggestions.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (prev[j + 1] + 1).min(current[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// Find the closest match from a list of candidates using Levenshtein
/// distance. Returns None if no good match is found (distance > 3).
pub fn find_closest_match<'a>(target: &str, candidates: &'a [String]) -> Option<&'a str> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = levenshtein_distance(target, candidate);
        if distance <= 3 && distance < best_distance {
            best_distance = distance;
            best_match = Some(candidate.as_str());
        }
    }

    best_match
}
