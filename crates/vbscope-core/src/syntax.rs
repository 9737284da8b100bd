//! Syntax element input model
//!
//! The parser front-end lives outside this crate. It hands over one
//! [`SyntaxTree`] per file: a flat, document-ordered stream of ranged
//! elements, each flagged with the analyses that apply to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::semantic::{AssignmentKind, ScopeKind};

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub const fn from_coords(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self {
            start: Position::new(start_line, start_char),
            end: Position::new(end_line, end_char),
        }
    }

    /// Both ends are inclusive.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.character, self.end.line, self.end.character
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub range: TextRange,
}

impl Identifier {
    pub fn new(name: impl Into<String>, range: TextRange) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

bitflags::bitflags! {
    /// Analyses that apply to an element besides scope participation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Capabilities: u8 {
        /// The element owns a diagnostic list.
        const DIAGNOSTIC = 1 << 0;
        const SEMANTIC_TOKEN = 1 << 1;
        const SYMBOL = 1 << 2;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::empty()
    }
}

/// How an element takes part in the scope graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeItem {
    pub kind: ScopeKind,
    #[serde(default)]
    pub assignment: AssignmentKind,
    /// `Public`/`Private` modifier written in source, if any.
    #[serde(default)]
    pub declared_public: Option<bool>,
    /// Set on module elements whose header carries `Option Explicit`.
    #[serde(default)]
    pub option_explicit: bool,
    /// Declared type from an `As` clause.
    #[serde(default)]
    pub type_name: Option<String>,
    /// Dotted access segments, e.g. `a`, `b`, `c` for `a.b.c`.
    #[serde(default)]
    pub member_access: Vec<Identifier>,
}

impl ScopeItem {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            assignment: AssignmentKind::empty(),
            declared_public: None,
            option_explicit: false,
            type_name: None,
            member_access: Vec::new(),
        }
    }

    pub fn with_assignment(mut self, assignment: AssignmentKind) -> Self {
        self.assignment = assignment;
        self
    }

    pub fn with_visibility(mut self, is_public: bool) -> Self {
        self.declared_public = Some(is_public);
        self
    }

    pub fn with_option_explicit(mut self) -> Self {
        self.option_explicit = true;
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_member_access(mut self, segments: Vec<Identifier>) -> Self {
        self.member_access = segments;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxElement {
    pub range: TextRange,
    #[serde(default)]
    pub identifier: Option<Identifier>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub scope: Option<ScopeItem>,
}

impl SyntaxElement {
    pub fn new(range: TextRange) -> Self {
        Self {
            range,
            identifier: None,
            capabilities: Capabilities::empty(),
            scope: None,
        }
    }

    pub fn with_identifier(mut self, name: impl Into<String>, range: TextRange) -> Self {
        self.identifier = Some(Identifier::new(name, range));
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities |= capabilities;
        self
    }

    pub fn with_scope(mut self, scope: ScopeItem) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn has_diagnostics(&self) -> bool {
        self.capabilities.contains(Capabilities::DIAGNOSTIC)
    }
}

/// One file's element stream, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub uri: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub line_count: usize,
    #[serde(default)]
    pub elements: Vec<SyntaxElement>,
}

impl SyntaxTree {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            version: 0,
            line_count: 0,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: SyntaxElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
