//! Pattern compilation to automata
//!
//! Patterns are compiled left to right, one element at a time. The
//! builder keeps a *boundary*: the states from which the next element
//! may be entered. Every boundary state gets an edge into the entry of
//! the new element, so skippable elements (`?`, `*`) simply leave the old
//! boundary in place next to their own state.
//!
//! Chunking automata start from a plain `start` state. Chinking automata
//! start from an accepting `outside` sink that loops on anything that is
//! not part of the pattern, and finish with an accepting `end` state that
//! is reached as soon as the pattern has been left. Element states that
//! cannot yet finish the chink fall back to whatever `outside` would do,
//! so a chink that is started but not completed is not a chink.

use log::{debug, trace};
use std::mem;
use thiserror::Error;

use crate::automaton::{Automaton, AutomatonError, State, negate};
use crate::grammar::{GrammarError, parse_pattern};
use crate::pattern::{Mode, Pattern, Quantifier, TagPattern};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("Compile error: pattern has no elements")]
    EmptyPattern,

    #[error("Compile error: state construction reached a nil state")]
    NilState,

    #[error("Compile error: chinking must start from an empty automaton")]
    ChinkingInitialStateMustBeNil,

    #[error("Compile error: {0}")]
    Automaton(#[from] AutomatonError),
}

/// Compile a pattern string, returning the automaton and the detected mode
pub fn compile_pattern(text: &str) -> Result<(Automaton, Mode), CompileError> {
    let pattern = parse_pattern(text)?;
    let automaton = compile(&pattern)?;
    Ok((automaton, pattern.mode))
}

/// Compile a parsed pattern into an automaton
pub fn compile(pattern: &Pattern) -> Result<Automaton, CompileError> {
    let Some(last) = pattern.elements.last() else {
        return Err(CompileError::EmptyPattern);
    };

    let mut builder = NfaBuilder::new();
    match pattern.mode {
        Mode::Chunking => builder.begin_chunk(pattern.is_nullable())?,
        Mode::Chinking => builder.begin_chink(&pattern.tags())?,
    }

    // Chunk states are final when everything after them may be skipped;
    // chink finality belongs to the outside and end states only
    let suffixes = pattern.skippable_suffixes();
    for (element, skippable_suffix) in pattern.elements.iter().zip(suffixes) {
        let is_final = pattern.mode == Mode::Chunking && skippable_suffix;
        builder.push(element, is_final)?;
    }

    if pattern.mode == Mode::Chinking {
        builder.abort_chink(&pattern.tags())?;
        builder.end_chink(last)?;
    }

    let automaton = builder.finish()?;
    debug!("compiled {} into {} states", pattern, automaton.len());
    trace!("transition table for {}:\n{}", pattern, automaton);
    Ok(automaton)
}

struct NfaBuilder {
    automaton: Option<Automaton>,
    boundary: Vec<State>,
}

impl NfaBuilder {
    fn new() -> Self {
        Self {
            automaton: None,
            boundary: Vec::new(),
        }
    }

    fn begin_chunk(&mut self, is_final: bool) -> Result<(), CompileError> {
        let (automaton, start) = Automaton::new("start", is_final)?;
        self.automaton = Some(automaton);
        self.boundary = vec![start];
        Ok(())
    }

    /// Create the accepting sink that absorbs every token outside the chink
    fn begin_chink(&mut self, tags: &[&str]) -> Result<(), CompileError> {
        if self.automaton.is_some() {
            return Err(CompileError::ChinkingInitialStateMustBeNil);
        }

        let (mut automaton, outside) = Automaton::new("outside", true)?;
        for tag in tags {
            automaton.add_transition(outside.index, &negate(&[tag]), &[outside.clone()])?;
        }

        self.automaton = Some(automaton);
        self.boundary = vec![outside];
        Ok(())
    }

    fn automaton_mut(&mut self) -> Result<&mut Automaton, CompileError> {
        self.automaton.as_mut().ok_or(CompileError::NilState)
    }

    fn push(&mut self, element: &TagPattern, is_final: bool) -> Result<(), CompileError> {
        match element.quantifier {
            Quantifier::One => self.exactly_one(element, is_final),
            Quantifier::Optional => self.optional(element, is_final),
            Quantifier::ZeroOrMore => self.zero_or_more(element, is_final),
            Quantifier::OneOrMore => self.one_or_more(element, is_final),
        }
    }

    fn exactly_one(&mut self, element: &TagPattern, is_final: bool) -> Result<(), CompileError> {
        let state = self.automaton_mut()?.add_state(&element.name(), is_final)?;

        let previous = mem::take(&mut self.boundary);
        self.connect_all(&previous, &element.tags, &state)?;

        self.boundary = vec![state];
        Ok(())
    }

    fn optional(&mut self, element: &TagPattern, is_final: bool) -> Result<(), CompileError> {
        let state = self.automaton_mut()?.add_state(&element.name(), is_final)?;

        let previous = self.boundary.clone();
        self.connect_all(&previous, &element.tags, &state)?;

        self.boundary.push(state);
        Ok(())
    }

    fn zero_or_more(&mut self, element: &TagPattern, is_final: bool) -> Result<(), CompileError> {
        let state = self.automaton_mut()?.add_state(&element.name(), is_final)?;

        let previous = self.boundary.clone();
        self.connect_all(&previous, &element.tags, &state)?;
        self.connect_all(std::slice::from_ref(&state), &element.tags, &state)?;

        self.boundary.push(state);
        Ok(())
    }

    fn one_or_more(&mut self, element: &TagPattern, is_final: bool) -> Result<(), CompileError> {
        let name = element.name();
        let automaton = self.automaton_mut()?;
        let entry = automaton.add_state(&name, is_final)?;
        let repeat = automaton.add_state(&name, is_final)?;

        let previous = mem::take(&mut self.boundary);
        self.connect_all(&previous, &element.tags, &entry)?;
        self.connect_all(std::slice::from_ref(&entry), &element.tags, &repeat)?;
        self.connect_all(std::slice::from_ref(&repeat), &element.tags, &repeat)?;

        // A single occurrence already satisfies `+`
        self.boundary = vec![entry, repeat];
        Ok(())
    }

    /// Send element states that cannot finish the chink back through `outside`
    ///
    /// Each such state copies the exact edges of `outside` and returns to
    /// it on any tag that neither continues the chink nor starts a new one.
    fn abort_chink(&mut self, tags: &[&str]) -> Result<(), CompileError> {
        let automaton = self.automaton.as_ref().ok_or(CompileError::NilState)?;
        let outside = automaton.initial().clone();

        let mut restarts: Vec<(&str, Vec<State>)> = Vec::new();
        for &tag in tags {
            if let Some(dests) = automaton.destinations(outside.index, tag) {
                let dests = dests
                    .iter()
                    .filter_map(|&index| automaton.state(index).cloned())
                    .collect();
                restarts.push((tag, dests));
            }
        }
        let entry_tags: Vec<&str> = restarts.iter().map(|(tag, _)| *tag).collect();

        let pending: Vec<State> = automaton
            .states()
            .iter()
            .filter(|state| state.index != outside.index && !self.boundary.contains(state))
            .cloned()
            .collect();

        for source in &pending {
            for (tag, dests) in &restarts {
                for dest in dests {
                    self.connect(source, tag, dest)?;
                }
            }
            if !entry_tags.is_empty() {
                self.connect(source, &negate(&entry_tags), &outside)?;
            }
        }
        Ok(())
    }

    /// Append the accepting state reached once the chink has been left
    fn end_chink(&mut self, last: &TagPattern) -> Result<(), CompileError> {
        let end = self.automaton_mut()?.add_state("end", true)?;
        let symbol = last.negation();

        let previous = mem::take(&mut self.boundary);
        for source in previous.iter().chain(std::iter::once(&end)) {
            self.connect(source, &symbol, &end)?;
        }

        self.boundary = vec![end];
        Ok(())
    }

    fn connect_all(
        &mut self,
        sources: &[State],
        tags: &[String],
        dest: &State,
    ) -> Result<(), CompileError> {
        for source in sources {
            for tag in tags {
                self.connect(source, tag, dest)?;
            }
        }
        Ok(())
    }

    /// Add `source -symbol-> dest`, keeping any destinations the pair already has
    fn connect(&mut self, source: &State, symbol: &str, dest: &State) -> Result<(), CompileError> {
        let automaton = self.automaton_mut()?;

        let mut dests: Vec<State> = match automaton.destinations(source.index, symbol) {
            Some(existing) => existing
                .iter()
                .filter_map(|&index| automaton.state(index).cloned())
                .collect(),
            None => Vec::new(),
        };
        if !dests.contains(dest) {
            dests.push(dest.clone());
        }

        automaton.add_transition(source.index, symbol, &dests)?;
        Ok(())
    }

    fn finish(self) -> Result<Automaton, CompileError> {
        self.automaton.ok_or(CompileError::NilState)
    }
}
