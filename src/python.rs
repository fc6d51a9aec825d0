//! Python bindings for tagchunk
//!
//! This module provides PyO3-based Python bindings for the Rust core.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::compiler::{CompileError, compile_pattern};
use crate::matcher::{LoadError, RuleSet as RustRuleSet};
use crate::token::{Span, TaggedToken};

/// Convert LoadError to Python exception
impl From<LoadError> for PyErr {
    fn from(err: LoadError) -> PyErr {
        match err {
            LoadError::Io { .. } => PyIOError::new_err(err.to_string()),
            LoadError::Compile(e) => e.into(),
        }
    }
}

impl From<CompileError> for PyErr {
    fn from(err: CompileError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn span_to_tuple(span: Span) -> (Option<String>, Vec<(String, String)>) {
    let tokens = span.tokens.into_iter().map(|t| (t.word, t.tag)).collect();
    (span.label, tokens)
}

/// An ordered set of chunking and chinking rules.
///
/// Earlier rules win when several rules finish a span on the same token.
///
/// Args:
///     grammar: List of (label, pattern) tuples, e.g. [("NP", "{<DT>?<JJ>*<NN>}")]
///
/// Raises:
///     ValueError: If any pattern fails to parse or compile
#[pyclass(name = "RuleSet", unsendable)]
pub struct PyRuleSet {
    inner: RustRuleSet,
}

#[pymethods]
impl PyRuleSet {
    #[new]
    fn new(grammar: Vec<(String, String)>) -> PyResult<Self> {
        Ok(PyRuleSet {
            inner: RustRuleSet::new(&grammar)?,
        })
    }

    /// Load rules from a grammar file of `LABEL: pattern` lines.
    #[classmethod]
    fn from_file(_cls: &Bound<'_, pyo3::types::PyType>, file_path: &str) -> PyResult<Self> {
        Ok(PyRuleSet {
            inner: RustRuleSet::from_file(file_path)?,
        })
    }

    /// Segment a tagged sentence.
    ///
    /// Args:
    ///     tokens: List of (word, tag) tuples
    ///
    /// Returns:
    ///     List of (label, [(word, tag), ...]) tuples; label is None for
    ///     tokens no rule claimed
    fn parse(&self, tokens: Vec<(String, String)>) -> Vec<(Option<String>, Vec<(String, String)>)> {
        let tokens: Vec<TaggedToken> = tokens.into_iter().map(TaggedToken::from).collect();
        self.inner
            .parse(&tokens)
            .into_iter()
            .map(span_to_tuple)
            .collect()
    }

    /// Rule labels in priority order.
    #[getter]
    fn labels(&self) -> Vec<String> {
        self.inner
            .rules()
            .iter()
            .map(|rule| rule.label().to_string())
            .collect()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        let rules: Vec<String> = self
            .inner
            .rules()
            .iter()
            .map(|rule| format!("{}: {}", rule.label(), rule.pattern()))
            .collect();
        format!("RuleSet([{}])", rules.join(", "))
    }
}

/// Compile one pattern and return its transition table as text.
///
/// Useful for inspecting how a pattern was compiled.
#[pyfunction(name = "compile_pattern")]
fn py_compile_pattern(pattern: &str) -> PyResult<String> {
    let (automaton, _) = compile_pattern(pattern)?;
    Ok(automaton.to_string())
}

#[pyfunction]
fn __version__() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn tagchunk(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyRuleSet>()?;

    m.add_function(wrap_pyfunction!(py_compile_pattern, m)?)?;
    m.add_function(wrap_pyfunction!(__version__, m)?)?;

    Ok(())
}
