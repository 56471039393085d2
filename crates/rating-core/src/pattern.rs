use std::collections::HashMap;

use crate::{Fact, Literal, Term};

/// One row of query results: variable name to bound term.
pub type Binding = HashMap<String, Term>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Var(String),
    Iri(String),
    Literal(Literal),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Var(name.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        PatternTerm::Iri(iri.into())
    }
}

impl From<Term> for PatternTerm {
    fn from(term: Term) -> Self {
        match term {
            Term::Iri(iri) => PatternTerm::Iri(iri),
            Term::Literal(lit) => PatternTerm::Literal(lit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: String,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: impl Into<String>, object: PatternTerm) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

/// Basic graph pattern evaluated inside a single named graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub graph: String,
    pub variables: Vec<String>,
    pub patterns: Vec<TriplePattern>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            variables: Vec::new(),
            patterns: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, variable: impl Into<String>) -> Self {
        self.variables.push(variable.into());
        self
    }

    pub fn pattern(mut self, pattern: TriplePattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOperation {
    /// Remove every instantiation of `patterns` that currently matches.
    DeleteWhere {
        graph: String,
        patterns: Vec<TriplePattern>,
    },
    InsertData { graph: String, facts: Vec<Fact> },
}

/// Operations sent to the store as one request and applied as one
/// transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    pub operations: Vec<UpdateOperation>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, operation: UpdateOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
