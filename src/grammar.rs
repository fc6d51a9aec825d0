//! Grammar text parser
//!
//! Parses chunk grammar text into Pattern ASTs using the pest grammar in
//! `grammar.pest`. Three entry points: a single pattern (`{<DT>?<NN>}`),
//! a single labeled rule (`NP: {<DT>?<NN>}`) and a rules file holding any
//! number of labeled rules with `//` comments.

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use thiserror::Error;

use crate::pattern::{Mode, Pattern, Quantifier, TagPattern};

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct GrammarParser;

/// Error type for grammar text failures
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("Grammar error: {0:?} is not wrapped in {{...}} or }}...{{")]
    InvalidGrammar(String),

    #[error("Grammar error: {0}")]
    ParseError(#[from] pest::error::Error<Rule>),

    #[error("Grammar error: empty tag in {0:?}")]
    EmptyTag(String),

    #[error("Grammar error: expected {0}")]
    Unexpected(&'static str),
}

/// Detect the matching mode from the outer bracket pair
pub fn detect_mode(text: &str) -> Result<Mode, GrammarError> {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('{') && text.ends_with('}') {
        Ok(Mode::Chunking)
    } else if text.len() >= 2 && text.starts_with('}') && text.ends_with('{') {
        Ok(Mode::Chinking)
    } else {
        Err(GrammarError::InvalidGrammar(text.to_string()))
    }
}

/// Parse a single bracketed pattern
pub fn parse_pattern(text: &str) -> Result<Pattern, GrammarError> {
    detect_mode(text)?;

    let mut pairs = GrammarParser::parse(Rule::pattern_text, text)?;
    let pattern_pair = next_pair(&mut pairs, "pattern")?;
    build_pattern(pattern_pair)
}

/// Parse a single `LABEL: pattern` rule
pub fn parse_rule(text: &str) -> Result<(String, Pattern), GrammarError> {
    let mut pairs = GrammarParser::parse(Rule::rule_text, text)?;
    let rule_pair = next_pair(&mut pairs, "rule")?;
    build_rule(rule_pair)
}

/// Parse a rules file: any number of `LABEL: pattern` rules
pub fn parse_rules(text: &str) -> Result<Vec<(String, Pattern)>, GrammarError> {
    let pairs = GrammarParser::parse(Rule::rules_text, text)?;

    let mut rules = Vec::new();
    for pair in pairs {
        match pair.as_rule() {
            Rule::rule => rules.push(build_rule(pair)?),
            Rule::EOI => {} // End of input
            _ => return Err(GrammarError::Unexpected("rule")),
        }
    }

    Ok(rules)
}

fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    what: &'static str,
) -> Result<Pair<'i, Rule>, GrammarError> {
    pairs.next().ok_or(GrammarError::Unexpected(what))
}

/// Build a rule from `label ~ ":" ~ pattern`
fn build_rule(pair: Pair<Rule>) -> Result<(String, Pattern), GrammarError> {
    let mut inner = pair.into_inner();

    let label = next_pair(&mut inner, "rule label")?.as_str().to_string();
    let body = next_pair(&mut inner, "rule pattern")?;
    let pattern = match body.as_rule() {
        Rule::pattern => build_pattern(body)?,
        _ => parse_pattern(body.as_str())?,
    };

    Ok((label, pattern))
}

/// Build a Pattern from a `pattern` pair (a chunk or a chink)
fn build_pattern(pair: Pair<Rule>) -> Result<Pattern, GrammarError> {
    let source = pair.as_str();
    let body = next_pair(&mut pair.into_inner(), "chunk or chink")?;

    let mode = match body.as_rule() {
        Rule::chunk => Mode::Chunking,
        Rule::chink => Mode::Chinking,
        _ => return Err(GrammarError::Unexpected("chunk or chink")),
    };

    let elements = body
        .into_inner()
        .map(|element| build_element(element, source))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pattern::new(mode, elements))
}

/// Build one `<TAG|TAG>?` element
fn build_element(pair: Pair<Rule>, source: &str) -> Result<TagPattern, GrammarError> {
    let mut inner = pair.into_inner();

    let alternation = next_pair(&mut inner, "tag alternation")?;
    let tags: Vec<&str> = alternation.into_inner().map(|tag| tag.as_str()).collect();
    if tags.iter().any(|tag| tag.is_empty()) {
        return Err(GrammarError::EmptyTag(source.to_string()));
    }

    let quantifier = match inner.next() {
        Some(q) => Quantifier::from_suffix(q.as_str()).ok_or(GrammarError::Unexpected("quantifier"))?,
        None => Quantifier::One,
    };

    Ok(TagPattern::new(&tags, quantifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_pattern() {
        let pattern = parse_pattern("{<DT>?<JJ>*<NN>}").unwrap();

        assert_eq!(pattern.mode, Mode::Chunking);
        assert_eq!(pattern.elements.len(), 3);
        assert_eq!(pattern.elements[0], TagPattern::new(&["DT"], Quantifier::Optional));
        assert_eq!(pattern.elements[1], TagPattern::new(&["JJ"], Quantifier::ZeroOrMore));
        assert_eq!(pattern.elements[2], TagPattern::new(&["NN"], Quantifier::One));
    }

    #[test]
    fn test_parse_chink_pattern() {
        let pattern = parse_pattern("}<VBD><RP>+{").unwrap();

        assert_eq!(pattern.mode, Mode::Chinking);
        assert_eq!(pattern.elements[0].tags, vec!["VBD"]);
        assert_eq!(pattern.elements[1].quantifier, Quantifier::OneOrMore);
    }

    #[test]
    fn test_parse_alternation() {
        let pattern = parse_pattern("{<NN|NNS|NNP>+}").unwrap();

        assert_eq!(pattern.elements.len(), 1);
        assert_eq!(pattern.elements[0].tags, vec!["NN", "NNS", "NNP"]);
    }

    #[test]
    fn test_parse_allows_space_between_elements() {
        let pattern = parse_pattern("{ <DT>? <NN> }").unwrap();
        assert_eq!(pattern.to_string(), "{<DT>?<NN>}");
    }

    #[test]
    fn test_parse_punctuation_tags() {
        let pattern = parse_pattern("{<$><CD>+<,>?}").unwrap();
        assert_eq!(pattern.tags(), vec!["$", "CD", ","]);
    }

    #[test]
    fn test_invalid_brackets() {
        for text in ["<DT><NN>", "{<DT><NN>", "<NN>}", "{", "[<NN>]"] {
            assert!(
                matches!(parse_pattern(text), Err(GrammarError::InvalidGrammar(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_tag() {
        assert!(matches!(
            parse_pattern("{<DT><>}"),
            Err(GrammarError::EmptyTag(_))
        ));
        assert!(matches!(
            parse_pattern("{<NN|>}"),
            Err(GrammarError::EmptyTag(_))
        ));
    }

    #[test]
    fn test_syntax_errors() {
        // Brackets are fine but the body is not
        for text in ["{}", "{<NN>?+}", "{<NN> ?}", "{DT}", "{<!NN>}"] {
            assert!(
                matches!(parse_pattern(text), Err(GrammarError::ParseError(_))),
                "{text} should be a syntax error"
            );
        }
    }

    #[test]
    fn test_parse_rule() {
        let (label, pattern) = parse_rule("NP: {<DT>?<NN>}").unwrap();
        assert_eq!(label, "NP");
        assert_eq!(pattern.mode, Mode::Chunking);
    }

    #[test]
    fn test_parse_rules_file() {
        let text = r#"
            // noun phrases first
            NP: {<DT>?<JJ>*<NN>}
            PP: {<IN><DT>?<NN>}   // then prepositional phrases

            VP: }<VBD><RP>{
        "#;
        let rules = parse_rules(text).unwrap();

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].0, "NP");
        assert_eq!(rules[1].0, "PP");
        assert_eq!(rules[1].1.elements.len(), 3);
        assert_eq!(rules[2].0, "VP");
        assert_eq!(rules[2].1.mode, Mode::Chinking);
    }

    #[test]
    fn test_rule_without_brackets() {
        assert!(matches!(
            parse_rule("NP: <DT><NN>"),
            Err(GrammarError::InvalidGrammar(_))
        ));
        assert!(matches!(
            parse_rules("NP: {<NN>}\nVP: <VB>  // no brackets\n"),
            Err(GrammarError::InvalidGrammar(_))
        ));
        // Bracketed but malformed is still a syntax error
        assert!(matches!(
            parse_rule("NP: {<NN>?+}"),
            Err(GrammarError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_rules_empty_file() {
        assert!(parse_rules("// nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rules_rejects_missing_label() {
        assert!(parse_rules("{<NN>}").is_err());
    }
}
