//! Rule set matching over tagged token streams
//!
//! A `RuleSet` owns compiled grammar rules in priority order. Matching
//! state lives in a `Session`: one active-state set per rule, whether that
//! rule was accepting one token ago, and the buffer of tokens in the open
//! span. `RuleSet::parse` runs a fresh session per call.
//!
//! For every token, each rule's automaton is advanced by the token's tag.
//! The first rule (in priority order) that reports a boundary claims it:
//!
//! - a rule that was accepting and no longer is has just completed a
//!   match; the buffer becomes a span labeled with the rule's target
//! - a chinking rule that has just reached the end of its chink; the
//!   buffer (the chink itself) becomes an unlabeled span. A chink that
//!   falls back to `outside` before completing is not a boundary
//!
//! After a boundary all rules restart from their initial states on the
//! current token. When no rule is alive and none claimed the token, the
//! buffer can never complete: it is flushed unlabeled as soon as a fresh
//! start on some token is alive again.

use log::{trace, warn};
use std::mem;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::automaton::{Automaton, StateSet};
use crate::compiler::{CompileError, compile};
use crate::grammar::{parse_pattern, parse_rules};
use crate::pattern::{Mode, Pattern};
use crate::token::{Span, TaggedToken};

/// Error loading a rule set from a grammar file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read grammar file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// A compiled pattern with the label it assigns
#[derive(Debug)]
pub struct GrammarRule {
    label: String,
    pattern: Pattern,
    automaton: Automaton,
}

impl GrammarRule {
    /// Compile `pattern` text into a rule labeled `label`
    pub fn new(label: &str, pattern: &str) -> Result<Self, CompileError> {
        Self::from_pattern(label, parse_pattern(pattern)?)
    }

    pub fn from_pattern(label: &str, pattern: Pattern) -> Result<Self, CompileError> {
        let automaton = compile(&pattern)?;
        Ok(Self {
            label: label.to_string(),
            pattern,
            automaton,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mode(&self) -> Mode {
        self.pattern.mode
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    /// Whether `active` holds a final state other than the initial one
    ///
    /// For a chinking rule this means the chink has just been completed.
    fn has_left_chink(&self, active: &StateSet) -> bool {
        let initial = self.automaton.initial().index;
        active
            .iter()
            .any(|&state| state != initial && self.automaton.is_final(state))
    }

    /// Whether the rule labels a buffer left open at end of input
    ///
    /// End of input closes an open chink like a tag outside the pattern:
    /// a completed chink stays unlabeled, an unfinished one is labeled.
    fn accepts_at_end(&self, active: &StateSet) -> bool {
        if self.automaton.accepts(active) {
            return true;
        }
        match self.mode() {
            Mode::Chunking => false,
            Mode::Chinking => {
                let closed = self.automaton.advance_unseen(active);
                self.automaton.accepts(&closed) && !self.has_left_chink(&closed)
            }
        }
    }
}

/// Ordered grammar rules; earlier rules win ties
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<GrammarRule>,
}

impl RuleSet {
    /// Compile `(label, pattern)` pairs, aborting on the first bad rule
    pub fn new<L, P>(grammar: &[(L, P)]) -> Result<Self, CompileError>
    where
        L: AsRef<str>,
        P: AsRef<str>,
    {
        let rules = grammar
            .iter()
            .map(|(label, pattern)| GrammarRule::new(label.as_ref(), pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rules(rules))
    }

    pub fn from_rules(rules: Vec<GrammarRule>) -> Self {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.label == rule.label) {
                warn!("label {} is used by more than one rule", rule.label);
            }
        }
        Self { rules }
    }

    /// Compile every `LABEL: pattern` rule of a grammar text
    pub fn from_rules_text(text: &str) -> Result<Self, CompileError> {
        let rules = parse_rules(text)
            .map_err(CompileError::from)?
            .into_iter()
            .map(|(label, pattern)| GrammarRule::from_pattern(&label, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rules(rules))
    }

    /// Load a grammar file of `LABEL: pattern` rules
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_rules_text(&text)?)
    }

    /// Append a rule with the lowest priority
    pub fn push(&mut self, rule: GrammarRule) {
        if self.rules.iter().any(|r| r.label == rule.label) {
            warn!("label {} is used by more than one rule", rule.label);
        }
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Start a streaming session with every rule at its initial state
    pub fn session(&self) -> Session<'_> {
        Session::new(&self.rules)
    }

    /// Segment a token sequence into spans
    pub fn parse(&self, tokens: &[TaggedToken]) -> Vec<Span> {
        let mut session = self.session();
        let mut spans: Vec<Span> = tokens
            .iter()
            .filter_map(|token| session.feed(token.clone()))
            .collect();
        spans.extend(session.finish());
        spans
    }
}

#[derive(Debug, Clone)]
struct RuleProgress {
    active: StateSet,
    was_accepting: bool,
}

impl RuleProgress {
    fn start(automaton: &Automaton) -> Self {
        let active = automaton.start();
        Self {
            was_accepting: automaton.accepts(&active),
            active,
        }
    }
}

/// What the claiming rule saw on the current token
#[derive(Debug, Clone, Copy)]
enum Boundary {
    /// The rule stopped accepting: its match ended before this token
    Completed(usize),
    /// A chinking rule reached its end state: its chink ended before this token
    LeftChink(usize),
}

/// Matching state for one pass over a token stream
#[derive(Debug)]
pub struct Session<'a> {
    rules: &'a [GrammarRule],
    progress: Vec<RuleProgress>,
    buffer: Vec<TaggedToken>,
}

impl<'a> Session<'a> {
    fn new(rules: &'a [GrammarRule]) -> Self {
        Self {
            rules,
            progress: rules
                .iter()
                .map(|rule| RuleProgress::start(&rule.automaton))
                .collect(),
            buffer: Vec::new(),
        }
    }

    /// Tokens in the span that is still open
    pub fn pending(&self) -> &[TaggedToken] {
        &self.buffer
    }

    /// Consume one token, returning the span it closed, if any
    pub fn feed(&mut self, token: TaggedToken) -> Option<Span> {
        let mut boundary = None;
        let mut alive = false;

        for (index, (rule, progress)) in self.rules.iter().zip(self.progress.iter_mut()).enumerate() {
            progress.active = rule.automaton.advance(&progress.active, &token.tag);
            let accepting = rule.automaton.accepts(&progress.active);

            if boundary.is_none() {
                if progress.was_accepting && !accepting {
                    boundary = Some(Boundary::Completed(index));
                } else if rule.mode() == Mode::Chinking
                    && !progress.was_accepting
                    && rule.has_left_chink(&progress.active)
                {
                    boundary = Some(Boundary::LeftChink(index));
                }
            }

            alive |= !progress.active.is_empty();
            progress.was_accepting = accepting;
        }

        match boundary {
            Some(boundary) => {
                let (index, label) = match boundary {
                    Boundary::Completed(index) => (index, Some(self.rules[index].label.clone())),
                    Boundary::LeftChink(index) => (index, None),
                };
                trace!(
                    "rule {} {:?} at {} closes {} tokens",
                    self.rules[index].label,
                    boundary,
                    token,
                    self.buffer.len()
                );

                let span = self.take_span(label);
                self.restart(&token.tag);
                self.buffer.push(token);
                span
            }
            None if alive => {
                self.buffer.push(token);
                None
            }
            None => {
                // The open buffer can no longer complete; see whether the
                // token starts something on fresh automata
                self.restart(&token.tag);
                let span = if self.is_alive() {
                    trace!("{} restarts matching after {} dead tokens", token, self.buffer.len());
                    self.take_span(None)
                } else {
                    None
                };
                self.buffer.push(token);
                span
            }
        }
    }

    /// Flush the open span and return every rule to its initial state
    ///
    /// The span is labeled by the first rule whose automaton is accepting,
    /// counting a chinking rule that is inside an unfinished chink.
    pub fn finish(&mut self) -> Option<Span> {
        let label = self
            .rules
            .iter()
            .zip(&self.progress)
            .find(|(rule, progress)| rule.accepts_at_end(&progress.active))
            .map(|(rule, _)| rule.label.clone());

        let span = self.take_span(label);
        self.reset();
        span
    }

    fn reset(&mut self) {
        for (rule, progress) in self.rules.iter().zip(self.progress.iter_mut()) {
            *progress = RuleProgress::start(&rule.automaton);
        }
    }

    /// Reset every rule and feed it `tag`
    fn restart(&mut self, tag: &str) {
        for (rule, progress) in self.rules.iter().zip(self.progress.iter_mut()) {
            let active = rule.automaton.advance(&rule.automaton.start(), tag);
            *progress = RuleProgress {
                was_accepting: rule.automaton.accepts(&active),
                active,
            };
        }
    }

    fn is_alive(&self) -> bool {
        self.progress.iter().any(|p| !p.active.is_empty())
    }

    fn take_span(&mut self, label: Option<String>) -> Option<Span> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(Span::new(label, mem::take(&mut self.buffer)))
    }
}
