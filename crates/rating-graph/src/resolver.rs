use std::sync::Arc;

use rating_core::{
    PatternTerm, Result, SelectQuery, Term, TriplePattern, TripleStore, Vocabulary,
};
use tracing::debug;

const TARGET_VAR: &str = "target";

/// Finds the entity a review is about.
pub struct EntityResolver {
    store: Arc<dyn TripleStore>,
    vocabulary: Arc<Vocabulary>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn TripleStore>, vocabulary: Arc<Vocabulary>) -> Self {
        Self { store, vocabulary }
    }

    pub fn target_query(&self, review: &str) -> SelectQuery {
        SelectQuery::new(&self.vocabulary.graph)
            .select(TARGET_VAR)
            .pattern(TriplePattern::new(
                PatternTerm::iri(review),
                &self.vocabulary.about_predicate,
                PatternTerm::var(TARGET_VAR),
            ))
    }

    /// `Ok(None)` when the review is not associated with any entity. Literal
    /// objects are skipped; with more than one entity the first row returned
    /// by the store wins.
    pub async fn resolve_target(&self, review: &str) -> Result<Option<String>> {
        let rows = self.store.query(&self.target_query(review)).await?;
        let target = rows
            .into_iter()
            .find_map(|mut row| match row.remove(TARGET_VAR) {
                Some(Term::Iri(iri)) => Some(iri),
                _ => None,
            });
        debug!("Resolved review {} to {:?}", review, target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use rating_core::Fact;

    fn about(vocab: &Vocabulary, review: &str, object: Term) -> Fact {
        Fact::new(review, &vocab.about_predicate, object).in_graph(&vocab.graph)
    }

    fn resolver(vocab: &Vocabulary, facts: Vec<Fact>) -> EntityResolver {
        let store = Arc::new(MemoryStore::with_facts(facts));
        EntityResolver::new(store, Arc::new(vocab.clone()))
    }

    #[tokio::test]
    async fn literal_association_does_not_hide_entity() {
        let vocab = Vocabulary::default();
        let resolver = resolver(
            &vocab,
            vec![
                about(&vocab, "http://r/1", Term::literal("a note")),
                about(&vocab, "http://r/1", Term::iri("http://b/A")),
            ],
        );

        let target = resolver.resolve_target("http://r/1").await.unwrap();
        assert_eq!(target.as_deref(), Some("http://b/A"));
    }

    #[tokio::test]
    async fn only_literal_associations_resolve_to_none() {
        let vocab = Vocabulary::default();
        let resolver = resolver(
            &vocab,
            vec![about(&vocab, "http://r/1", Term::literal("a note"))],
        );

        assert_eq!(resolver.resolve_target("http://r/1").await.unwrap(), None);
        assert_eq!(resolver.resolve_target("http://r/2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn first_of_several_entities_wins() {
        let vocab = Vocabulary::default();
        let resolver = resolver(
            &vocab,
            vec![
                about(&vocab, "http://r/1", Term::iri("http://b/A")),
                about(&vocab, "http://r/1", Term::iri("http://b/B")),
            ],
        );

        let target = resolver.resolve_target("http://r/1").await.unwrap();
        assert_eq!(target.as_deref(), Some("http://b/A"));
    }
}
