// File: src/target.rs
//
// Render-target policy for the Omelet evaluator.
//
// One evaluator serves both output targets; everything target-specific is
// concentrated here: whether string literals inside tags are HTML-escaped,
// which node kinds the target accepts, the doctype shorthand table, and
// the set of void (self-closing) HTML elements.

use crate::ast::Node;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;

static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    "area,base,br,col,embed,hr,img,input,keygen,link,meta,param,source,track,wbr"
        .split(',')
        .collect()
});

/// The output language a single evaluation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Direct HTML rendering. String literals pass through unescaped.
    Html,
    /// Dust template output. String literals inside tags are escaped, and
    /// the larger node grammar (arrays, ranges) is accepted.
    Dust,
}

impl RenderTarget {
    /// Whether string-literal tag content is HTML-escaped before being
    /// concatenated into the tag body.
    pub fn escapes_strings(&self) -> bool {
        matches!(self, RenderTarget::Dust)
    }

    /// Whether this target's node grammar accepts the given node kind.
    pub fn supports(&self, node: &Node) -> bool {
        match node {
            Node::Array { .. } | Node::Range { .. } => matches!(self, RenderTarget::Dust),
            _ => true,
        }
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RenderTarget::Html => write!(f, "html"),
            RenderTarget::Dust => write!(f, "dust"),
        }
    }
}

/// Per-render configuration handed to the evaluator alongside the AST.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub target: RenderTarget,
    /// Name of the file being rendered, for error locations.
    pub file: Option<String>,
}

impl RenderConfig {
    pub fn new(target: RenderTarget) -> Self {
        RenderConfig { target, file: None }
    }

    pub fn with_file(mut self, file: String) -> Self {
        self.file = Some(file);
        self
    }
}

/// True if the tag name is a void element and must render self-closing.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(name)
}

/// Escapes the characters that are unsafe inside HTML text and attribute
/// values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Maps a doctype shorthand token (case-insensitive) to the full
/// `<!DOCTYPE ...>` string. Unrecognized tokens are echoed inside the
/// wrapper rather than rejected, so templates can spell out an exotic
/// doctype literally.
pub fn doctype(shorthand: &str) -> String {
    fn wrap(middle: &str) -> String {
        format!("<!DOCTYPE {}>", middle)
    }
    let token = shorthand.to_lowercase();
    match token.as_str() {
        "html5" | "html" | "5" => wrap("html"),
        "4.01" | "transitional" => wrap(
            "HTML PUBLIC \"-//W3C//DTD HTML 4.01 Transitional\
             //EN\" \"http://www.w3.org/TR/html4/loose.dtd\"",
        ),
        "frameset" => wrap(
            "HTML PUBLIC \"-//W3C//DTD HTML 4.01 Frameset\
             //EN\" \"http://www.w3.org/TR/html4/frameset.dtd\"",
        ),
        "xhtml_1.0" | "xhtml_1.0_strict" | "xhtml_strict" => wrap(
            "html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict\
             //EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\"",
        ),
        "xhtml_1.0_transitional" | "xhtml_transitional" => wrap(
            "html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional //EN\" \
             \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\"",
        ),
        "xhtml_1.0_frameset" | "xhtml_frameset" => wrap(
            "html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset //EN\" \
             \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd\"",
        ),
        "xhtml_1.1" => wrap(
            "html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \
             \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\"",
        ),
        _ => wrap(&token),
    }
}
