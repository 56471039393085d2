use rating_core::{DeltaBatch, Fact, Vocabulary};

/// The facts of a batch that can change an average.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub added_ratings: Vec<Fact>,
    pub removed_associations: Vec<Fact>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.added_ratings.is_empty() && self.removed_associations.is_empty()
    }
}

/// Keep inserted rating facts and deleted association facts, in input order.
pub fn classify(batch: &DeltaBatch, vocabulary: &Vocabulary) -> Classification {
    let added_ratings = batch
        .inserts
        .iter()
        .filter(|fact| fact.predicate == vocabulary.rating_predicate)
        .cloned()
        .collect();
    let removed_associations = batch
        .deletes
        .iter()
        .filter(|fact| fact.predicate == vocabulary.about_predicate)
        .cloned()
        .collect();

    Classification {
        added_ratings,
        removed_associations,
    }
}
