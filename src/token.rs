//! Tagged tokens and output spans

use serde::Serialize;
use std::fmt;

/// A word with its part-of-speech tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaggedToken {
    pub word: String,
    pub tag: String,
}

impl TaggedToken {
    pub fn new(word: &str, tag: &str) -> Self {
        Self {
            word: word.to_string(),
            tag: tag.to_string(),
        }
    }
}

impl From<(&str, &str)> for TaggedToken {
    fn from((word, tag): (&str, &str)) -> Self {
        Self::new(word, tag)
    }
}

impl From<(String, String)> for TaggedToken {
    fn from((word, tag): (String, String)) -> Self {
        Self { word, tag }
    }
}

impl fmt::Display for TaggedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.word, self.tag)
    }
}

/// Build a token sequence from `(word, tag)` pairs
pub fn tokens<'a, I>(pairs: I) -> Vec<TaggedToken>
where
    I: IntoIterator<Item = &'a (&'a str, &'a str)>,
{
    pairs.into_iter().map(|&pair| TaggedToken::from(pair)).collect()
}

/// A contiguous group of tokens, labeled when a rule matched it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub label: Option<String>,
    pub tokens: Vec<TaggedToken>,
}

impl Span {
    pub fn new(label: Option<String>, tokens: Vec<TaggedToken>) -> Self {
        Self { label, tokens }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn words(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.word.as_str()).collect()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.tag.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// `NP -> [the, dog]`, or `-> [barked, at]` when unlabeled
impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{} ", label)?;
        }
        write!(f, "-> [{}]", self.words().join(", "))
    }
}
