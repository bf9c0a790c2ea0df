// File: src/filters.rs
//
// Filter registry for the Omelet evaluator.
//
// A filter is a named post-processing transform applied to a rendered
// string fragment, with optional extra arguments. Tags, parentheticals and
// interpolations each carry an ordered filter pipeline; the evaluator looks
// filters up here by name and chains them left to right.
//
// The registry is an explicit value passed into each render rather than a
// process-wide table, so independent renders can carry different filter
// sets.

use ahash::AHashMap;

/// A filter function: rendered input plus already-evaluated argument
/// strings, producing the replacement fragment.
pub type FilterFn = fn(&str, &[String]) -> String;

pub struct FilterRegistry {
    filters: AHashMap<String, FilterFn>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        FilterRegistry { filters: AHashMap::new() }
    }

    /// Creates a registry preloaded with the built-in filter set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("uppercase", uppercase);
        registry.register("lowercase", lowercase);
        registry.register("trim", trim);
        registry.register("reverse", reverse);
        registry.register("truncate", truncate);
        registry.register("replace", replace);
        registry
    }

    pub fn register(&mut self, name: &str, filter: FilterFn) {
        self.filters.insert(name.to_string(), filter);
    }

    pub fn lookup(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    /// Registered filter names, for "did you mean" suggestions.
    pub fn names(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn uppercase(input: &str, _args: &[String]) -> String {
    input.to_uppercase()
}

fn lowercase(input: &str, _args: &[String]) -> String {
    input.to_lowercase()
}

fn trim(input: &str, _args: &[String]) -> String {
    input.trim().to_string()
}

fn reverse(input: &str, _args: &[String]) -> String {
    input.chars().rev().collect()
}

/// Keeps the first N characters of the input; without a valid length
/// argument the input passes through unchanged.
fn truncate(input: &str, args: &[String]) -> String {
    match args.first().and_then(|arg| arg.trim().parse::<usize>().ok()) {
        Some(len) => input.chars().take(len).collect(),
        None => input.to_string(),
    }
}

fn replace(input: &str, args: &[String]) -> String {
    match (args.first(), args.get(1)) {
        (Some(from), Some(to)) => input.replace(from.as_str(), to),
        _ => input.to_string(),
    }
}
