//! In-process triple store.
//!
//! Evaluates basic graph patterns with a nested-loop join over the stored
//! facts. Each update request holds the write lock for its whole duration, so
//! its operations are applied together.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rating_core::{
    Binding, Fact, PatternTerm, RatingError, Result, SelectQuery, Term, TriplePattern, TripleStore,
    UpdateOperation, UpdateRequest,
};
use tracing::debug;

#[derive(Default)]
pub struct MemoryStore {
    facts: RwLock<Vec<Fact>>,
    queries: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facts(facts: impl IntoIterator<Item = Fact>) -> Self {
        let store = Self::new();
        for fact in facts {
            store.insert(fact);
        }
        store
    }

    /// Add a fact. Facts without a graph tag are never matched by queries.
    pub fn insert(&self, fact: Fact) {
        let mut facts = self.facts.write();
        if !facts.contains(&fact) {
            facts.push(fact);
        }
    }

    pub fn remove(&self, fact: &Fact) -> bool {
        let mut facts = self.facts.write();
        let before = facts.len();
        facts.retain(|f| f != fact);
        facts.len() != before
    }

    pub fn facts(&self) -> Vec<Fact> {
        self.facts.read().clone()
    }

    /// Objects of every `(subject, predicate, ?o)` in `graph`.
    pub fn objects(&self, graph: &str, subject: &str, predicate: &str) -> Vec<Term> {
        self.facts
            .read()
            .iter()
            .filter(|f| {
                f.graph.as_deref() == Some(graph) && f.subject == subject && f.predicate == predicate
            })
            .map(|f| f.object.clone())
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }
}

fn bind(pattern: &PatternTerm, term: &Term, binding: &mut Binding) -> bool {
    match pattern {
        PatternTerm::Var(name) => match binding.get(name) {
            Some(bound) => bound == term,
            None => {
                binding.insert(name.clone(), term.clone());
                true
            }
        },
        PatternTerm::Iri(iri) => term.as_iri() == Some(iri.as_str()),
        PatternTerm::Literal(lit) => matches!(term, Term::Literal(l) if l == lit),
    }
}

fn match_fact(pattern: &TriplePattern, fact: &Fact, binding: &Binding) -> Option<Binding> {
    if pattern.predicate != fact.predicate {
        return None;
    }
    let mut extended = binding.clone();
    let subject = Term::Iri(fact.subject.clone());
    if bind(&pattern.subject, &subject, &mut extended)
        && bind(&pattern.object, &fact.object, &mut extended)
    {
        Some(extended)
    } else {
        None
    }
}

fn evaluate(facts: &[Fact], graph: &str, patterns: &[TriplePattern]) -> Vec<Binding> {
    let in_graph: Vec<&Fact> = facts
        .iter()
        .filter(|f| f.graph.as_deref() == Some(graph))
        .collect();

    let mut solutions = vec![Binding::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        for solution in &solutions {
            next.extend(
                in_graph
                    .iter()
                    .filter_map(|fact| match_fact(pattern, fact, solution)),
            );
        }
        solutions = next;
        if solutions.is_empty() {
            break;
        }
    }
    solutions
}

fn resolve(term: &PatternTerm, binding: &Binding) -> Result<Term> {
    match term {
        PatternTerm::Var(name) => binding
            .get(name)
            .cloned()
            .ok_or_else(|| RatingError::InvalidOperation(format!("unbound variable ?{}", name))),
        PatternTerm::Iri(iri) => Ok(Term::Iri(iri.clone())),
        PatternTerm::Literal(lit) => Ok(Term::Literal(lit.clone())),
    }
}

fn instantiate(pattern: &TriplePattern, binding: &Binding, graph: &str) -> Result<Fact> {
    let subject = match resolve(&pattern.subject, binding)? {
        Term::Iri(iri) => iri,
        Term::Literal(lit) => {
            return Err(RatingError::InvalidOperation(format!(
                "literal \"{}\" in subject position",
                lit.lexical
            )))
        }
    };
    let object = resolve(&pattern.object, binding)?;
    Ok(Fact::new(subject, pattern.predicate.clone(), object).in_graph(graph))
}

#[async_trait]
impl TripleStore for MemoryStore {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<Binding>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let facts = self.facts.read();
        let mut rows = evaluate(&facts, &query.graph, &query.patterns);
        if !query.variables.is_empty() {
            for row in &mut rows {
                row.retain(|name, _| query.variables.contains(name));
            }
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn update(&self, request: &UpdateRequest) -> Result<()> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let mut facts = self.facts.write();
        // Work on a copy so a failing operation leaves the store untouched.
        let mut staged = facts.clone();
        for operation in &request.operations {
            match operation {
                UpdateOperation::DeleteWhere { graph, patterns } => {
                    let mut doomed = Vec::new();
                    for solution in evaluate(&staged, graph, patterns) {
                        for pattern in patterns {
                            doomed.push(instantiate(pattern, &solution, graph)?);
                        }
                    }
                    staged.retain(|f| !doomed.contains(f));
                    debug!("Deleted {} facts from {}", doomed.len(), graph);
                }
                UpdateOperation::InsertData { graph, facts: new_facts } => {
                    for fact in new_facts {
                        let fact = fact.clone().in_graph(graph.clone());
                        if !staged.contains(&fact) {
                            staged.push(fact);
                        }
                    }
                }
            }
        }
        *facts = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: &str = "http://g";
    const ABOUT: &str = "http://schema.org/about";
    const RATING: &str = "http://schema.org/reviewRating";

    fn store() -> MemoryStore {
        MemoryStore::with_facts([
            Fact::new("http://r/1", ABOUT, Term::iri("http://b/1")).in_graph(G),
            Fact::new("http://r/1", RATING, Term::literal("4")).in_graph(G),
            Fact::new("http://r/2", ABOUT, Term::iri("http://b/1")).in_graph(G),
            Fact::new("http://r/2", RATING, Term::literal("2")).in_graph(G),
            Fact::new("http://r/3", ABOUT, Term::iri("http://b/2")).in_graph(G),
            Fact::new("http://r/3", RATING, Term::literal("5")).in_graph("http://other"),
        ])
    }

    #[tokio::test]
    async fn joins_patterns_within_graph() {
        let store = store();
        let query = SelectQuery::new(G)
            .select("rating")
            .pattern(TriplePattern::new(
                PatternTerm::var("review"),
                ABOUT,
                PatternTerm::iri("http://b/1"),
            ))
            .pattern(TriplePattern::new(
                PatternTerm::var("review"),
                RATING,
                PatternTerm::var("rating"),
            ));

        let rows = store.query(&query).await.unwrap();
        let mut ratings: Vec<&str> = rows.iter().map(|r| r["rating"].value()).collect();
        ratings.sort();
        assert_eq!(ratings, vec!["2", "4"]);
        assert!(rows.iter().all(|r| !r.contains_key("review")));

        // r/3's rating lives in another graph
        let query = SelectQuery::new(G)
            .pattern(TriplePattern::new(
                PatternTerm::var("review"),
                ABOUT,
                PatternTerm::iri("http://b/2"),
            ))
            .pattern(TriplePattern::new(
                PatternTerm::var("review"),
                RATING,
                PatternTerm::var("rating"),
            ));
        assert!(store.query(&query).await.unwrap().is_empty());
        assert_eq!(store.query_count(), 2);
    }

    #[tokio::test]
    async fn applies_limit() {
        let store = store();
        let query = SelectQuery::new(G)
            .select("review")
            .pattern(TriplePattern::new(
                PatternTerm::var("review"),
                ABOUT,
                PatternTerm::var("book"),
            ))
            .limit(1);
        assert_eq!(store.query(&query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_where_then_insert() {
        let store = store();
        let request = UpdateRequest::new()
            .then(UpdateOperation::DeleteWhere {
                graph: G.to_string(),
                patterns: vec![TriplePattern::new(
                    PatternTerm::var("review"),
                    RATING,
                    PatternTerm::var("rating"),
                )],
            })
            .then(UpdateOperation::InsertData {
                graph: G.to_string(),
                facts: vec![Fact::new("http://r/9", RATING, Term::literal("1"))],
            });

        store.update(&request).await.unwrap();
        assert!(store.objects(G, "http://r/1", RATING).is_empty());
        assert!(store.objects(G, "http://r/2", RATING).is_empty());
        assert_eq!(store.objects(G, "http://r/9", RATING), vec![Term::literal("1")]);
        // other graphs are untouched
        assert_eq!(
            store.objects("http://other", "http://r/3", RATING),
            vec![Term::literal("5")]
        );
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn delete_without_match_is_noop() {
        let store = store();
        let before = store.facts();
        let request = UpdateRequest::new().then(UpdateOperation::DeleteWhere {
            graph: G.to_string(),
            patterns: vec![TriplePattern::new(
                PatternTerm::iri("http://b/1"),
                "http://schema.org/averageRating",
                PatternTerm::var("old"),
            )],
        });

        store.update(&request).await.unwrap();
        store.update(&request).await.unwrap();
        assert_eq!(store.facts(), before);
    }
}
