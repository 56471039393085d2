use std::sync::Arc;

use rating_core::{
    PatternTerm, Result, SelectQuery, Term, TriplePattern, TripleStore, Vocabulary,
};
use tracing::debug;

const REVIEW_VAR: &str = "review";
const RATING_VAR: &str = "rating";

/// Numeric value of a rating term. Unparsable and non-finite values yield
/// `None`.
pub fn parse_rating(term: &Term) -> Option<f64> {
    term.value()
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let total: f64 = values.iter().sum();
    if total.is_finite() {
        return Some(total / n);
    }
    // Finite values whose sum overflows: scale before summing.
    Some(values.iter().map(|v| v / n).sum())
}

/// Computes the average rating of a target from the store's current state.
pub struct AggregateEngine {
    store: Arc<dyn TripleStore>,
    vocabulary: Arc<Vocabulary>,
}

impl AggregateEngine {
    pub fn new(store: Arc<dyn TripleStore>, vocabulary: Arc<Vocabulary>) -> Self {
        Self { store, vocabulary }
    }

    pub fn ratings_query(&self, target: &str) -> SelectQuery {
        SelectQuery::new(&self.vocabulary.graph)
            .select(RATING_VAR)
            .pattern(TriplePattern::new(
                PatternTerm::var(REVIEW_VAR),
                &self.vocabulary.about_predicate,
                PatternTerm::iri(target),
            ))
            .pattern(TriplePattern::new(
                PatternTerm::var(REVIEW_VAR),
                &self.vocabulary.rating_predicate,
                PatternTerm::var(RATING_VAR),
            ))
    }

    /// `Ok(None)` when the target has no usable ratings and should carry no
    /// average.
    pub async fn compute_aggregate(&self, target: &str) -> Result<Option<f64>> {
        let rows = self.store.query(&self.ratings_query(target)).await?;
        let total = rows.len();
        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(RATING_VAR))
            .filter_map(parse_rating)
            .collect();

        if values.len() < total {
            debug!(
                "Ignored {} unparsable ratings for {}",
                total - values.len(),
                target
            );
        }

        Ok(mean(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rating_core::Literal;

    #[test]
    fn parses_numeric_literals() {
        assert_eq!(parse_rating(&Term::literal("4")), Some(4.0));
        assert_eq!(parse_rating(&Term::literal(" 3.5 ")), Some(3.5));
        assert_eq!(
            parse_rating(&Term::Literal(Literal::decimal("-1.25"))),
            Some(-1.25)
        );
        assert_eq!(parse_rating(&Term::literal("abc")), None);
        assert_eq!(parse_rating(&Term::literal("")), None);
        assert_eq!(parse_rating(&Term::literal("NaN")), None);
        assert_eq!(parse_rating(&Term::literal("inf")), None);
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[2.0, 4.0]).unwrap(), 3.0);
        assert_relative_eq!(mean(&[0.1, 0.2, 0.3]).unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn mean_of_huge_values_stays_finite() {
        assert_eq!(mean(&[f64::MAX, f64::MAX]), Some(f64::MAX));
        assert_relative_eq!(mean(&[1e308, 1e308, 4e307]).unwrap(), 8e307, max_relative = 1e-12);
    }
}
