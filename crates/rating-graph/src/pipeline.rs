//! Delta batch to average recompute pipeline.
//!
//! classify → resolve → recompute → write. Every distinct affected target is
//! recomputed once per batch from the store's current state, so replaying or
//! reordering batches converges on the same averages. Store failures are
//! contained per review lookup and per target; the rest of the batch still
//! runs.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rating_core::{DeltaBatch, Fact, TripleStore, Vocabulary};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{classify, AggregateEngine, AggregateWriter, EntityResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Resolve,
    Compute,
    Write,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// Review id for `Resolve`, target id otherwise.
    pub entity: String,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetOutcome {
    pub target: String,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub added_ratings: usize,
    pub removed_associations: usize,
    pub suppressed_removals: usize,
    pub recomputed: Vec<TargetOutcome>,
    pub failures: Vec<Failure>,
}

impl BatchReport {
    fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            added_ratings: 0,
            removed_associations: 0,
            suppressed_removals: 0,
            recomputed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Drop removed associations whose review also received a rating in the same
/// batch. Those reviews are resolved through their rating instead.
pub fn suppress_reassociated(removed_associations: &[Fact], added_ratings: &[Fact]) -> Vec<Fact> {
    let rated: HashSet<&str> = added_ratings.iter().map(|f| f.subject.as_str()).collect();
    removed_associations
        .iter()
        .filter(|f| !rated.contains(f.subject.as_str()))
        .cloned()
        .collect()
}

pub struct RatingPipeline {
    vocabulary: Arc<Vocabulary>,
    resolver: EntityResolver,
    engine: AggregateEngine,
    writer: AggregateWriter,
    max_concurrency: usize,
}

impl RatingPipeline {
    pub fn new(store: Arc<dyn TripleStore>, vocabulary: Vocabulary) -> Self {
        let vocabulary = Arc::new(vocabulary);
        Self {
            resolver: EntityResolver::new(store.clone(), vocabulary.clone()),
            engine: AggregateEngine::new(store.clone(), vocabulary.clone()),
            writer: AggregateWriter::new(store, vocabulary.clone()),
            vocabulary,
            max_concurrency: 1,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub async fn process(&self, batch: &DeltaBatch) -> BatchReport {
        let batch_id = Uuid::new_v4();
        self.process_batch(batch_id, batch)
            .instrument(info_span!("delta_batch", batch_id = %batch_id))
            .await
    }

    async fn process_batch(&self, batch_id: Uuid, batch: &DeltaBatch) -> BatchReport {
        let mut report = BatchReport::new(batch_id);
        let classification = classify(batch, &self.vocabulary);
        report.added_ratings = classification.added_ratings.len();
        report.removed_associations = classification.removed_associations.len();

        if classification.is_empty() {
            info!(
                "No rating changes in batch ({} inserts, {} deletes)",
                batch.inserts.len(),
                batch.deletes.len()
            );
            return report;
        }

        let mut dirty = BTreeSet::new();

        let mut seen_reviews = HashSet::new();
        for fact in &classification.added_ratings {
            let review = fact.subject.as_str();
            if !seen_reviews.insert(review) {
                continue;
            }
            match self.resolver.resolve_target(review).await {
                Ok(Some(target)) => {
                    dirty.insert(target);
                }
                Ok(None) => {
                    info!("Review {} is not about any entity, skipping", review);
                }
                Err(e) => {
                    error!(review = %review, error = %e, "Failed to resolve review target");
                    report.failures.push(Failure {
                        entity: review.to_string(),
                        stage: FailureStage::Resolve,
                        message: e.to_string(),
                    });
                }
            }
        }

        let removals = suppress_reassociated(
            &classification.removed_associations,
            &classification.added_ratings,
        );
        report.suppressed_removals = classification.removed_associations.len() - removals.len();
        if report.suppressed_removals > 0 {
            info!(
                "Suppressed {} association removals superseded by new ratings",
                report.suppressed_removals
            );
        }
        for fact in removals {
            dirty.insert(fact.object.value().to_string());
        }

        let outcomes: Vec<Result<TargetOutcome, Failure>> = stream::iter(dirty)
            .map(|target| async move { self.refresh_target(&target).await })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Ok(done) => report.recomputed.push(done),
                Err(failure) => report.failures.push(failure),
            }
        }

        if report.has_failures() {
            warn!(
                "Batch finished with {} failures, {} targets updated",
                report.failures.len(),
                report.recomputed.len()
            );
        } else {
            info!("Batch finished, {} targets updated", report.recomputed.len());
        }
        report
    }

    async fn refresh_target(&self, target: &str) -> Result<TargetOutcome, Failure> {
        let average = self.engine.compute_aggregate(target).await.map_err(|e| {
            error!(target_entity = %target, error = %e, "Error computing average");
            Failure {
                entity: target.to_string(),
                stage: FailureStage::Compute,
                message: e.to_string(),
            }
        })?;

        info!(
            "Recalculating average for {}: {}",
            target,
            average.map_or_else(|| "no ratings".to_string(), |v| v.to_string())
        );

        self.writer
            .write_aggregate(target, average)
            .await
            .map_err(|e| {
                error!(target_entity = %target, error = %e, "Error updating average");
                Failure {
                    entity: target.to_string(),
                    stage: FailureStage::Write,
                    message: e.to_string(),
                }
            })?;

        Ok(TargetOutcome {
            target: target.to_string(),
            average,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rating_core::Term;

    #[test]
    fn suppression_is_keyed_on_rated_reviews() {
        let vocab = Vocabulary::default();
        let removed = vec![
            Fact::new("http://r/1", &vocab.about_predicate, Term::iri("http://b/1")),
            Fact::new("http://r/2", &vocab.about_predicate, Term::iri("http://b/2")),
        ];
        let added = vec![Fact::new(
            "http://r/1",
            &vocab.rating_predicate,
            Term::literal("5"),
        )];

        let kept = suppress_reassociated(&removed, &added);
        assert_eq!(kept, vec![removed[1].clone()]);
        assert_eq!(suppress_reassociated(&removed, &[]), removed);
    }
}
