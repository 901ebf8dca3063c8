//! Boolean tree construction
//!
//! AND binds tighter than OR. A level is split at its first OR; without
//! one, the first term is split off and ANDed with the rest. Explicit AND
//! tokens carry no node of their own and are dropped after validation.

use std::sync::Arc;

use crate::registry::VirtualColumnDefinition;
use crate::search::{
    AggregatePredicateNode, BooleanOperator, ParsedTerm, PredicateNode, SearchError,
    SearchResult,
};

use super::resolver::SearchResolver;

/// Partial result of resolving a term sequence
#[derive(Debug, Clone, Default)]
pub(crate) struct Conditions {
    pub where_filter: Option<PredicateNode>,
    pub having_filter: Option<AggregatePredicateNode>,
    /// Virtual column definitions of every resolved term, in order
    pub contexts: Vec<Option<Arc<VirtualColumnDefinition>>>,
}

impl Conditions {
    /// Joins two sides with `operator`; a side without a node is passed
    /// through unwrapped
    fn combine(lhs: Conditions, rhs: Conditions, operator: BooleanOperator) -> Conditions {
        let where_filter = match (lhs.where_filter, rhs.where_filter) {
            (Some(left), Some(right)) => Some(match operator {
                BooleanOperator::And => PredicateNode::And(vec![left, right]),
                BooleanOperator::Or => PredicateNode::Or(vec![left, right]),
            }),
            (left, right) => left.or(right),
        };
        let having_filter = match (lhs.having_filter, rhs.having_filter) {
            (Some(left), Some(right)) => Some(match operator {
                BooleanOperator::And => AggregatePredicateNode::And(vec![left, right]),
                BooleanOperator::Or => AggregatePredicateNode::Or(vec![left, right]),
            }),
            (left, right) => left.or(right),
        };

        let mut contexts = lhs.contexts;
        contexts.extend(rhs.contexts);
        Conditions {
            where_filter,
            having_filter,
            contexts,
        }
    }
}

impl<'a> SearchResolver<'a> {
    /// Resolves one nesting level of terms into where/having trees
    pub(crate) fn resolve_boolean_conditions(
        &self,
        terms: &[&ParsedTerm],
    ) -> SearchResult<Conditions> {
        match terms {
            [] => return Ok(Conditions::default()),
            [term] => return self.resolve_boolean_condition(term),
            _ => {}
        }

        let mut filtered: Vec<&ParsedTerm> = Vec::with_capacity(terms.len());
        let mut previous: Option<&ParsedTerm> = None;
        for &term in terms {
            if let Some(operator) = term.connective() {
                match previous {
                    None => return Err(missing_left_side(operator)),
                    Some(previous) => {
                        if let Some(previous_operator) = previous.connective() {
                            return Err(SearchError::invalid(format!(
                                "Missing condition in between two condition operators: '{} {}'",
                                previous_operator.as_str(),
                                operator.as_str()
                            )));
                        }
                    }
                }
            }
            if term.connective() != Some(BooleanOperator::And) {
                filtered.push(term);
            }
            previous = Some(term);
        }
        if let Some(operator) = previous.and_then(ParsedTerm::connective) {
            return Err(SearchError::invalid(format!(
                "Condition is missing on the right side of '{}' operator",
                operator.as_str()
            )));
        }

        // Same right-nested shape as splitting at the first OR and
        // recursing into the tail
        let mut segments = Vec::new();
        for segment in filtered.split(|term| term.connective() == Some(BooleanOperator::Or)) {
            let mut conditions = Vec::with_capacity(segment.len());
            for term in segment {
                conditions.push(self.resolve_boolean_condition(term)?);
            }
            segments.push(fold_right(conditions, BooleanOperator::And));
        }
        Ok(fold_right(segments, BooleanOperator::Or))
    }

    /// Rejects queries holding more terms or deeper groups than configured
    pub(crate) fn check_query_limits(&self, terms: &[ParsedTerm]) -> SearchResult<()> {
        let max_terms = self.config.max_query_terms;
        let max_depth = self.config.max_nesting_depth;
        let mut count = 0usize;
        let mut pending: Vec<(&[ParsedTerm], usize)> = vec![(terms, 0)];

        while let Some((level, depth)) = pending.pop() {
            if depth > max_depth {
                return Err(SearchError::invalid(format!(
                    "Query is nested too deeply, can be a maximum of {} levels",
                    max_depth
                )));
            }
            count += level.len();
            if count > max_terms {
                return Err(SearchError::invalid(format!(
                    "Query has too many terms, can be a maximum of {} terms",
                    max_terms
                )));
            }
            for term in level {
                if let ParsedTerm::ParenGroup(children) = term {
                    pending.push((children, depth + 1));
                }
            }
        }
        Ok(())
    }

    fn resolve_boolean_condition(&self, term: &ParsedTerm) -> SearchResult<Conditions> {
        match term {
            ParsedTerm::ParenGroup(children) => {
                let children: Vec<&ParsedTerm> = children.iter().collect();
                self.resolve_boolean_conditions(&children)
            }
            ParsedTerm::Comparison(filter) => {
                let (node, context) = self.resolve_term(filter)?;
                Ok(Conditions {
                    where_filter: Some(node),
                    having_filter: None,
                    contexts: vec![context],
                })
            }
            ParsedTerm::AggregateComparison(filter) => {
                if !self.config.use_aggregate_conditions {
                    return Ok(Conditions::default());
                }
                Ok(Conditions {
                    where_filter: None,
                    having_filter: Some(self.resolve_aggregate_term(filter)?),
                    contexts: Vec::new(),
                })
            }
            ParsedTerm::Connective(operator) => Err(missing_left_side(*operator)),
        }
    }

    /// Implicit AND of a sequence without groups or connectives
    pub(crate) fn resolve_flat_conditions(&self, terms: &[ParsedTerm]) -> SearchResult<Conditions> {
        let mut where_filters = Vec::new();
        let mut having_filters = Vec::new();
        let mut contexts = Vec::new();

        for term in terms {
            let conditions = self.resolve_boolean_condition(term)?;
            where_filters.extend(conditions.where_filter);
            having_filters.extend(conditions.having_filter);
            contexts.extend(conditions.contexts);
        }

        Ok(Conditions {
            where_filter: PredicateNode::all(where_filters),
            having_filter: AggregatePredicateNode::all(having_filters),
            contexts,
        })
    }
}

/// `[a, b, c]` becomes `a op (b op c)`
fn fold_right(parts: Vec<Conditions>, operator: BooleanOperator) -> Conditions {
    let mut parts = parts.into_iter().rev();
    let last = parts.next().unwrap_or_default();
    parts.fold(last, |rhs, lhs| Conditions::combine(lhs, rhs, operator))
}

fn missing_left_side(operator: BooleanOperator) -> SearchError {
    SearchError::invalid(format!(
        "Condition is missing on the left side of '{}' operator",
        operator.as_str()
    ))
}
