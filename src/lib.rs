//! Tagchunk: tag-pattern chunking and chinking
//!
//! Segments part-of-speech-tagged token sequences into labeled spans using
//! regular-expression-like patterns over tags. Each pattern is compiled to
//! a small NFA; a rule set runs all of them token by token.
//! Core implementation in Rust with optional Python bindings.

pub mod automaton; // NFA over tag symbols
pub mod compiler; // Pattern to automaton construction
pub mod grammar; // Grammar text parser
pub mod matcher; // Rule set segmentation
pub mod pattern; // Pattern AST
pub mod tagged; // word/TAG text reader
pub mod token; // Tokens and spans

// Python bindings
#[cfg(feature = "pyo3")]
pub mod python;

// Re-exports for convenience
pub use automaton::{Automaton, AutomatonError, State, StateId, StateSet};
pub use compiler::{CompileError, compile, compile_pattern};
pub use grammar::{GrammarError, parse_pattern, parse_rule, parse_rules};
pub use matcher::{GrammarRule, LoadError, RuleSet, Session};
pub use pattern::{Mode, Pattern, Quantifier, TagPattern};
pub use tagged::{TaggedReader, TaggedTextError};
pub use token::{Span, TaggedToken, tokens};
