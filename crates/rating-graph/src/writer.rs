use std::sync::Arc;

use rating_core::{
    Fact, Literal, PatternTerm, Result, Term, TriplePattern, TripleStore, UpdateOperation,
    UpdateRequest, Vocabulary,
};
use tracing::debug;

/// Lexical `xsd:decimal` form of an average. Never uses exponent notation;
/// whole numbers carry no fractional part (`3.0` is written `3`).
pub fn format_decimal(value: f64) -> String {
    format!("{}", value)
}

/// Replaces the stored average of a target.
pub struct AggregateWriter {
    store: Arc<dyn TripleStore>,
    vocabulary: Arc<Vocabulary>,
}

impl AggregateWriter {
    pub fn new(store: Arc<dyn TripleStore>, vocabulary: Arc<Vocabulary>) -> Self {
        Self { store, vocabulary }
    }

    /// Delete any existing average, then insert `value` if there is one. Both
    /// steps go out as a single request.
    pub fn replacement_request(&self, target: &str, value: Option<f64>) -> UpdateRequest {
        let graph = self.vocabulary.graph.clone();
        let predicate = self.vocabulary.average_predicate.clone();

        let mut request = UpdateRequest::new().then(UpdateOperation::DeleteWhere {
            graph: graph.clone(),
            patterns: vec![TriplePattern::new(
                PatternTerm::iri(target),
                predicate.clone(),
                PatternTerm::var("old"),
            )],
        });

        if let Some(value) = value {
            request = request.then(UpdateOperation::InsertData {
                graph,
                facts: vec![Fact::new(
                    target,
                    predicate,
                    Term::Literal(Literal::decimal(format_decimal(value))),
                )],
            });
        }
        request
    }

    pub async fn write_aggregate(&self, target: &str, value: Option<f64>) -> Result<()> {
        self.store
            .update(&self.replacement_request(target, value))
            .await?;
        debug!("Stored average {:?} for {}", value, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn formats_decimals_without_exponent() {
        assert_eq!(format_decimal(3.0), "3");
        assert_eq!(format_decimal(2.5), "2.5");
        assert_eq!(format_decimal(1e-7), "0.0000001");
        assert_eq!(format_decimal(1e21), "1000000000000000000000");
    }

    #[test]
    fn absent_value_only_deletes() {
        let writer = AggregateWriter::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Vocabulary::default()),
        );
        let request = writer.replacement_request("http://b/1", None);
        assert_eq!(request.operations.len(), 1);
        assert!(matches!(
            request.operations[0],
            UpdateOperation::DeleteWhere { .. }
        ));

        let request = writer.replacement_request("http://b/1", Some(4.5));
        assert_eq!(request.operations.len(), 2);
        match &request.operations[1] {
            UpdateOperation::InsertData { facts, .. } => {
                assert_eq!(facts[0].object, Term::Literal(Literal::decimal("4.5")));
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn writing_twice_is_idempotent() {
        let vocab = Arc::new(Vocabulary::default());
        let store = Arc::new(MemoryStore::new());
        let writer = AggregateWriter::new(store.clone(), vocab.clone());

        writer.write_aggregate("http://b/1", Some(2.0)).await.unwrap();
        let once = store.facts();
        writer.write_aggregate("http://b/1", Some(2.0)).await.unwrap();
        assert_eq!(store.facts(), once);
        assert_eq!(
            store.objects(&vocab.graph, "http://b/1", &vocab.average_predicate),
            vec![Term::Literal(Literal::decimal("2"))]
        );

        writer.write_aggregate("http://b/1", None).await.unwrap();
        assert!(store
            .objects(&vocab.graph, "http://b/1", &vocab.average_predicate)
            .is_empty());
    }
}
