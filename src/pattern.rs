//! Pattern representation
//!
//! A pattern is a linear sequence of tag patterns, each an alternation of
//! tags with an optional quantifier, wrapped in `{...}` (chunking) or
//! `}...{` (chinking).

use std::fmt;

use crate::automaton::negate;

/// Which side of the bracketed pattern gets the rule's label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Tokens matched by the pattern form the labeled span
    Chunking,
    /// Tokens matched by the pattern are cut out; the tokens around them are labeled
    Chinking,
}

impl Mode {
    pub fn open(&self) -> char {
        match self {
            Mode::Chunking => '{',
            Mode::Chinking => '}',
        }
    }

    pub fn close(&self) -> char {
        match self {
            Mode::Chunking => '}',
            Mode::Chinking => '{',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Quantifier {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(Quantifier::One),
            "?" => Some(Quantifier::Optional),
            "*" => Some(Quantifier::ZeroOrMore),
            "+" => Some(Quantifier::OneOrMore),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Quantifier::One => "",
            Quantifier::Optional => "?",
            Quantifier::ZeroOrMore => "*",
            Quantifier::OneOrMore => "+",
        }
    }

    /// Whether the element may match zero tokens
    pub fn is_skippable(&self) -> bool {
        matches!(self, Quantifier::Optional | Quantifier::ZeroOrMore)
    }
}

/// One `<TAG1|TAG2>` element with its quantifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPattern {
    pub tags: Vec<String>,
    pub quantifier: Quantifier,
}

impl TagPattern {
    pub fn new<S: AsRef<str>>(tags: &[S], quantifier: Quantifier) -> Self {
        Self {
            tags: tags.iter().map(|t| t.as_ref().to_string()).collect(),
            quantifier,
        }
    }

    /// Human-readable state name, e.g. `JJ|JJR`
    pub fn name(&self) -> String {
        self.tags.join("|")
    }

    /// Negated symbol matching any tag outside this element
    pub fn negation(&self) -> String {
        negate(&self.tags)
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>{}", self.name(), self.quantifier.suffix())
    }
}

/// A complete grammar pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub mode: Mode,
    pub elements: Vec<TagPattern>,
}

impl Pattern {
    pub fn new(mode: Mode, elements: Vec<TagPattern>) -> Self {
        Self { mode, elements }
    }

    /// Distinct tags in order of first appearance
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for tag in self.elements.iter().flat_map(|e| e.tags.iter()) {
            if !tags.contains(&tag.as_str()) {
                tags.push(tag);
            }
        }
        tags
    }

    /// For each element, whether every element after it may match nothing
    pub fn skippable_suffixes(&self) -> Vec<bool> {
        let mut suffixes = vec![true; self.elements.len()];
        let mut all_skippable = true;
        for (i, element) in self.elements.iter().enumerate().rev() {
            suffixes[i] = all_skippable;
            all_skippable &= element.quantifier.is_skippable();
        }
        suffixes
    }

    /// Whether the whole pattern can match the empty sequence
    pub fn is_nullable(&self) -> bool {
        self.elements.iter().all(|e| e.quantifier.is_skippable())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode.open())?;
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        write!(f, "{}", self.mode.close())
    }
}
