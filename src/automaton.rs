//! Nondeterministic finite automata over tag symbols
//!
//! An automaton is a set of numbered states with one initial state, a
//! subset of final states and a transition relation from
//! `(state, symbol)` to a set of destination states. Simulation keeps the
//! whole set of active states (subset simulation) and never backtracks.
//!
//! A symbol starting with `!` is a negated symbol: `!VBD` matches any tag
//! except `VBD`, and `!RP|IN` any tag except `RP` and `IN`. A negated
//! transition only fires from a state that has no exact transition for
//! the incoming tag.

use lasso::{Rodeo, Spur};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Prefix marking a negated symbol
pub const NEGATE: char = '!';

/// Separator between the excluded tags of a negated symbol
pub const ALTERNATIVE: char = '|';

/// Index of a state within its automaton
pub type StateId = usize;

/// Set of simultaneously active states
pub type StateSet = BTreeSet<StateId>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    #[error("Automaton error: state name must not be empty")]
    EmptyStateName,

    #[error("Automaton error: unknown state {0}")]
    UnknownState(StateId),

    #[error("Automaton error: transition symbol must not be empty")]
    EmptySymbol,

    #[error("Automaton error: transition from state {0} has no destination")]
    NoDestination(StateId),
}

/// A state of an automaton
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    pub name: String,
    pub index: StateId,
}

/// Negated transition out of a single state
#[derive(Debug, Clone)]
struct NegatedTransition {
    excluded: Vec<Spur>,
    destinations: StateSet,
}

impl NegatedTransition {
    #[inline]
    fn fires_on(&self, tag: Option<Spur>) -> bool {
        match tag {
            Some(tag) => !self.excluded.contains(&tag),
            // A tag never seen by this automaton differs from every exclusion
            None => true,
        }
    }
}

/// Split a negated symbol into its excluded tags
///
/// Returns `None` for a plain symbol.
pub fn negated_tags(symbol: &str) -> Option<Vec<&str>> {
    symbol
        .strip_prefix(NEGATE)
        .map(|body| body.split(ALTERNATIVE).collect())
}

/// Build the negated symbol excluding all of `tags`
pub fn negate<S: AsRef<str>>(tags: &[S]) -> String {
    let body: Vec<&str> = tags.iter().map(|t| t.as_ref()).collect();
    let separator = ALTERNATIVE.to_string();
    format!("{}{}", NEGATE, body.join(separator.as_str()))
}

pub struct Automaton {
    states: Vec<State>,
    finals: Vec<bool>,
    /// Exact transitions keyed by source state and interned tag
    transitions: FxHashMap<(StateId, Spur), StateSet>,
    /// Negated transitions per source state, keyed by the interned symbol text
    negated: Vec<FxHashMap<Spur, NegatedTransition>>,
    /// Transition symbols in first-use order
    alphabet: Vec<Spur>,
    symbols: Rodeo,
    active: StateSet,
}

impl Automaton {
    /// Create a one-state automaton
    ///
    /// The initial state always has index 0.
    pub fn new(initial_state_name: &str, is_final: bool) -> Result<(Self, State), AutomatonError> {
        let mut automaton = Self {
            states: Vec::new(),
            finals: Vec::new(),
            transitions: FxHashMap::default(),
            negated: Vec::new(),
            alphabet: Vec::new(),
            symbols: Rodeo::default(),
            active: StateSet::new(),
        };
        let initial = automaton.add_state(initial_state_name, is_final)?;
        automaton.active.insert(initial.index);
        Ok((automaton, initial))
    }

    /// Append a state with the next sequential index
    pub fn add_state(&mut self, name: &str, is_final: bool) -> Result<State, AutomatonError> {
        if name.is_empty() {
            return Err(AutomatonError::EmptyStateName);
        }

        let state = State {
            name: name.to_string(),
            index: self.states.len(),
        };
        self.states.push(state.clone());
        self.finals.push(is_final);
        self.negated.push(FxHashMap::default());
        Ok(state)
    }

    /// Set the destinations of `(source, symbol)`
    ///
    /// A previous transition for the same pair is replaced, not merged.
    pub fn add_transition(
        &mut self,
        source: StateId,
        symbol: &str,
        destinations: &[State],
    ) -> Result<(), AutomatonError> {
        if source >= self.states.len() {
            return Err(AutomatonError::UnknownState(source));
        }
        if symbol.is_empty() {
            return Err(AutomatonError::EmptySymbol);
        }
        if destinations.is_empty() {
            return Err(AutomatonError::NoDestination(source));
        }

        let mut targets = StateSet::new();
        for dest in destinations {
            if dest.index >= self.states.len() {
                return Err(AutomatonError::UnknownState(dest.index));
            }
            targets.insert(dest.index);
        }

        match negated_tags(symbol) {
            Some(tags) => {
                if tags.iter().any(|t| t.is_empty()) {
                    return Err(AutomatonError::EmptySymbol);
                }
                let excluded = tags
                    .iter()
                    .map(|t| self.symbols.get_or_intern(t))
                    .collect();
                let key = self.intern_label(symbol);
                self.negated[source].insert(
                    key,
                    NegatedTransition {
                        excluded,
                        destinations: targets,
                    },
                );
            }
            None => {
                let key = self.intern_label(symbol);
                self.transitions.insert((source, key), targets);
            }
        }

        Ok(())
    }

    fn intern_label(&mut self, symbol: &str) -> Spur {
        let key = self.symbols.get_or_intern(symbol);
        if !self.alphabet.contains(&key) {
            self.alphabet.push(key);
        }
        key
    }

    /// The configuration before any input: just the initial state
    pub fn start(&self) -> StateSet {
        StateSet::from([0])
    }

    /// Compute the successor of `from` on `symbol` without touching the active set
    pub fn advance(&self, from: &StateSet, symbol: &str) -> StateSet {
        self.advance_tag(from, self.symbols.get(symbol))
    }

    /// Successor of `from` on a tag that no transition names
    ///
    /// Only negated transitions can fire.
    pub fn advance_unseen(&self, from: &StateSet) -> StateSet {
        self.advance_tag(from, None)
    }

    fn advance_tag(&self, from: &StateSet, tag: Option<Spur>) -> StateSet {
        let mut next = StateSet::new();

        for &state in from {
            let exact = tag.and_then(|t| self.transitions.get(&(state, t)));
            match exact {
                Some(dests) => next.extend(dests.iter().copied()),
                None => {
                    let Some(negated) = self.negated.get(state) else {
                        continue;
                    };
                    for neg in negated.values() {
                        if neg.fires_on(tag) {
                            next.extend(neg.destinations.iter().copied());
                        }
                    }
                }
            }
        }

        next
    }

    /// Whether `set` contains a final state
    pub fn accepts(&self, set: &StateSet) -> bool {
        set.iter().any(|&s| self.is_final(s))
    }

    /// Consume one symbol, replacing the active set
    pub fn step(&mut self, symbol: &str) -> &StateSet {
        self.active = self.advance(&self.active, symbol);
        &self.active
    }

    pub fn is_accepting(&self) -> bool {
        self.accepts(&self.active)
    }

    /// Consume `symbols` from the current configuration and report acceptance
    pub fn run<I, S>(&mut self, symbols: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for symbol in symbols {
            self.step(symbol.as_ref());
        }
        self.is_accepting()
    }

    /// Restore the active set to the initial state
    pub fn reset(&mut self) {
        self.active = self.start();
    }

    pub fn active(&self) -> &StateSet {
        &self.active
    }

    pub fn initial(&self) -> &State {
        &self.states[0]
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, index: StateId) -> Option<&State> {
        self.states.get(index)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_final(&self, index: StateId) -> bool {
        self.finals.get(index).copied().unwrap_or(false)
    }

    pub fn final_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter().filter(|s| self.finals[s.index])
    }

    /// Destinations of the transition stored for exactly `(source, symbol)`
    pub fn destinations(&self, source: StateId, symbol: &str) -> Option<&StateSet> {
        let key = self.symbols.get(symbol)?;
        if negated_tags(symbol).is_some() {
            self.negated
                .get(source)?
                .get(&key)
                .map(|neg| &neg.destinations)
        } else {
            self.transitions.get(&(source, key))
        }
    }

    /// Transition symbols in first-use order
    pub fn alphabet(&self) -> impl Iterator<Item = &str> + '_ {
        self.alphabet.iter().map(|key| self.symbols.resolve(key))
    }
}

impl fmt::Debug for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Automaton")
            .field("states", &self.states)
            .field("finals", &self.final_states().map(|s| s.index).collect::<Vec<_>>())
            .field("alphabet", &self.alphabet().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

/// Transition table, one row per state, `*` marks final states
impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.alphabet().collect();

        write!(f, "{:>16}|", "")?;
        for symbol in &symbols {
            write!(f, "{:>12}|", symbol)?;
        }
        writeln!(f)?;

        for state in &self.states {
            let marker = if self.finals[state.index] { '*' } else { ' ' };
            write!(f, "{}{:>4} {:>10}|", marker, state.index, state.name)?;
            for symbol in &symbols {
                let cell = match self.destinations(state.index, symbol) {
                    Some(dests) => dests
                        .iter()
                        .map(|d| d.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                    None => "-".to_string(),
                };
                write!(f, "{:>12}|", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -a-> {1, 2}, 1 -b-> {0, 2}, 2 final
    fn abc_automaton() -> Automaton {
        let (mut nfa, s0) = Automaton::new("State 0", false).unwrap();
        let s1 = nfa.add_state("State 1", false).unwrap();
        let s2 = nfa.add_state("State 2", true).unwrap();
        nfa.add_transition(s0.index, "a", &[s1.clone(), s2.clone()])
            .unwrap();
        nfa.add_transition(s1.index, "b", &[s0, s2]).unwrap();
        nfa
    }

    #[test]
    fn test_state_indices_are_sequential() {
        let (mut nfa, s0) = Automaton::new("start", false).unwrap();
        let s1 = nfa.add_state("one", false).unwrap();
        let s2 = nfa.add_state("two", true).unwrap();

        assert_eq!(s0.index, 0);
        assert_eq!(s1.index, 1);
        assert_eq!(s2.index, 2);
        assert_eq!(nfa.len(), 3);
        assert_eq!(nfa.initial().name, "start");
        assert_eq!(nfa.final_states().map(|s| s.index).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_empty_names_rejected() {
        assert_eq!(
            Automaton::new("", false).unwrap_err(),
            AutomatonError::EmptyStateName
        );

        let (mut nfa, _) = Automaton::new("start", false).unwrap();
        assert_eq!(
            nfa.add_state("", true).unwrap_err(),
            AutomatonError::EmptyStateName
        );
    }

    #[test]
    fn test_transition_errors() {
        let (mut nfa, s0) = Automaton::new("start", false).unwrap();

        assert_eq!(
            nfa.add_transition(7, "a", &[s0.clone()]).unwrap_err(),
            AutomatonError::UnknownState(7)
        );
        assert_eq!(
            nfa.add_transition(0, "", &[s0.clone()]).unwrap_err(),
            AutomatonError::EmptySymbol
        );
        assert_eq!(
            nfa.add_transition(0, "!", &[s0.clone()]).unwrap_err(),
            AutomatonError::EmptySymbol
        );
        assert_eq!(
            nfa.add_transition(0, "a", &[]).unwrap_err(),
            AutomatonError::NoDestination(0)
        );

        let stranger = State {
            name: "elsewhere".to_string(),
            index: 3,
        };
        assert_eq!(
            nfa.add_transition(0, "a", &[stranger]).unwrap_err(),
            AutomatonError::UnknownState(3)
        );
    }

    #[test]
    fn test_run_accepts() {
        let mut nfa = abc_automaton();
        assert!(nfa.run(["a", "b"]));

        nfa.reset();
        assert!(nfa.run(["a"]));

        nfa.reset();
        assert!(!nfa.run(["b"]));
    }

    #[test]
    fn test_step_tracks_every_active_state() {
        let mut nfa = abc_automaton();

        assert_eq!(nfa.step("a"), &StateSet::from([1, 2]));
        assert_eq!(nfa.step("b"), &StateSet::from([0, 2]));
        assert_eq!(nfa.step("a"), &StateSet::from([1, 2]));
    }

    #[test]
    fn test_dead_automaton_stays_dead_until_reset() {
        let mut nfa = abc_automaton();

        assert!(nfa.step("z").is_empty());
        assert!(nfa.step("a").is_empty());
        assert!(!nfa.is_accepting());

        nfa.reset();
        assert_eq!(nfa.active(), &StateSet::from([0]));
        assert!(nfa.run(["a"]));
    }

    #[test]
    fn test_reset_then_empty_run_reflects_initial_finality() {
        let mut rejecting = abc_automaton();
        rejecting.step("a");
        rejecting.reset();
        assert!(!rejecting.run(Vec::<&str>::new()));

        let (mut accepting, _) = Automaton::new("start", true).unwrap();
        accepting.reset();
        assert!(accepting.run(Vec::<&str>::new()));
    }

    #[test]
    fn test_last_transition_write_wins() {
        let (mut nfa, s0) = Automaton::new("start", false).unwrap();
        let s1 = nfa.add_state("one", true).unwrap();
        let s2 = nfa.add_state("two", false).unwrap();

        nfa.add_transition(s0.index, "NN", &[s1]).unwrap();
        nfa.add_transition(s0.index, "NN", &[s2]).unwrap();

        assert_eq!(nfa.destinations(0, "NN"), Some(&StateSet::from([2])));
        assert!(!nfa.run(["NN"]));
    }

    #[test]
    fn test_negated_transition_matches_everything_else() {
        let (mut nfa, s0) = Automaton::new("outside", true).unwrap();
        let s1 = nfa.add_state("VBD", false).unwrap();
        nfa.add_transition(s0.index, "!VBD", &[s0.clone()]).unwrap();
        nfa.add_transition(s0.index, "VBD", &[s1]).unwrap();

        assert_eq!(nfa.step("DT"), &StateSet::from([0]));
        assert_eq!(nfa.step("never-seen"), &StateSet::from([0]));
        assert_eq!(nfa.step("VBD"), &StateSet::from([1]));
    }

    #[test]
    fn test_negated_alternatives_exclude_all() {
        let (mut nfa, s0) = Automaton::new("start", false).unwrap();
        let s1 = nfa.add_state("end", true).unwrap();
        nfa.add_transition(s0.index, "!RP|IN", &[s1]).unwrap();

        assert!(nfa.run(["DT"]));
        nfa.reset();
        assert!(!nfa.run(["RP"]));
        nfa.reset();
        assert!(!nfa.run(["IN"]));
    }

    #[test]
    fn test_negated_fallback_is_per_state() {
        // State 1 owns the negated edge; state 0 has none and must not borrow it
        let (mut nfa, s0) = Automaton::new("start", false).unwrap();
        let s1 = nfa.add_state("middle", false).unwrap();
        let s2 = nfa.add_state("end", true).unwrap();
        nfa.add_transition(s0.index, "A", &[s1.clone()]).unwrap();
        nfa.add_transition(s1.index, "!A", &[s2]).unwrap();

        assert!(nfa.step("B").is_empty());

        nfa.reset();
        assert!(nfa.run(["A", "B"]));
    }

    #[test]
    fn test_advance_unseen_fires_negations_only() {
        let (mut nfa, s0) = Automaton::new("outside", true).unwrap();
        let s1 = nfa.add_state("VBD", false).unwrap();
        let s2 = nfa.add_state("end", true).unwrap();
        nfa.add_transition(s0.index, "VBD", &[s1.clone()]).unwrap();
        nfa.add_transition(s1.index, "!VBD", &[s2]).unwrap();

        assert!(nfa.advance_unseen(&nfa.start()).is_empty());
        assert_eq!(nfa.advance_unseen(&StateSet::from([1])), StateSet::from([2]));
    }

    #[test]
    fn test_negate_helpers() {
        assert_eq!(negate(&["RP"]), "!RP");
        assert_eq!(negate(&["RP", "IN"]), "!RP|IN");
        assert_eq!(negated_tags("!RP|IN"), Some(vec!["RP", "IN"]));
        assert_eq!(negated_tags("RP"), None);
    }

    #[test]
    fn test_display_transition_table() {
        let nfa = abc_automaton();
        let table = nfa.to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains('a') && lines[0].contains('b'));
        assert!(lines[1].contains("1,2"));
        assert!(lines[3].starts_with('*'));
    }
}
