//! Event selector parsing.

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::runner::ds::error::{KernelError, KernelResult};

#[derive(Parser)]
#[grammar = "runner/std_lib/event_selector.pest"] // relative to src
pub struct SelectorParser;

/// One event name out of a selector, tagged with how it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventName {
    /// `@name`: used as written.
    Literal(String),
    /// `!name`: namespaced, catalog skipped.
    Raw(String),
    /// `name`: catalog lookup, then namespaced.
    Plain(String),
}

impl EventName {
    pub fn name(&self) -> &str {
        match self {
            EventName::Literal(n) | EventName::Raw(n) | EventName::Plain(n) => n,
        }
    }

    /// Classifies a single name by its prefix, without going through the grammar.
    pub fn classify(name: &str) -> EventName {
        if let Some(rest) = name.strip_prefix('@') {
            EventName::Literal(rest.to_string())
        } else if let Some(rest) = name.strip_prefix('!') {
            EventName::Raw(rest.to_string())
        } else {
            EventName::Plain(name.to_string())
        }
    }
}

/// Splits `selector` into its event names, in order.
pub fn parse_selector(selector: &str) -> KernelResult<Vec<EventName>> {
    let mut pairs = SelectorParser::parse(Rule::selector, selector).map_err(|e| {
        let (line, col) = match e.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        KernelError::InvalidEventSelector {
            selector: selector.to_string(),
            reason: format!("expected an event name at line {} column {}", line, col),
        }
    })?;
    let root = match pairs.next() {
        Some(p) => p,
        None => return Ok(vec![]),
    };
    Ok(root.into_inner().filter_map(build_event_name).collect())
}

fn build_event_name(pair: Pair<Rule>) -> Option<EventName> {
    let rule = pair.as_rule();
    let name = pair
        .into_inner()
        .next()
        .map(|n| n.as_str().to_string())
        .unwrap_or_default();
    match rule {
        Rule::literal => Some(EventName::Literal(name)),
        Rule::raw => Some(EventName::Raw(name)),
        Rule::plain => Some(EventName::Plain(name)),
        _ => None,
    }
}
