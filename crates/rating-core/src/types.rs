use std::fmt;

use serde::{Deserialize, Serialize};

pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

/// Literal value as it appears in the store: lexical form plus optional
/// datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn decimal(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, XSD_DECIMAL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(lexical))
    }

    /// The IRI or the lexical form, whichever this term carries.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Literal(lit) => &lit.lexical,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Literal(lit) => match (&lit.datatype, &lit.language) {
                (_, Some(lang)) => write!(f, "\"{}\"@{}", lit.lexical, lang),
                (Some(dt), None) => write!(f, "\"{}\"^^<{}>", lit.lexical, dt),
                (None, None) => write!(f, "\"{}\"", lit.lexical),
            },
        }
    }
}

/// A `(subject, predicate, object)` statement, optionally tagged with the
/// graph it was observed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
    pub graph: Option<String>,
}

impl Fact {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
            graph: None,
        }
    }

    pub fn in_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }
}

/// Added and removed facts of one change notification, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaBatch {
    pub inserts: Vec<Fact>,
    pub deletes: Vec<Fact>,
}

impl DeltaBatch {
    pub fn new(inserts: Vec<Fact>, deletes: Vec<Fact>) -> Self {
        Self { inserts, deletes }
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Vocabulary the pipeline watches and writes, plus the graph it works in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default = "Vocabulary::default_rating_predicate")]
    pub rating_predicate: String,
    #[serde(default = "Vocabulary::default_about_predicate")]
    pub about_predicate: String,
    #[serde(default = "Vocabulary::default_average_predicate")]
    pub average_predicate: String,
    #[serde(default = "Vocabulary::default_graph")]
    pub graph: String,
}

impl Vocabulary {
    fn default_rating_predicate() -> String {
        "http://schema.org/reviewRating".to_string()
    }

    fn default_about_predicate() -> String {
        "http://schema.org/about".to_string()
    }

    fn default_average_predicate() -> String {
        "http://schema.org/averageRating".to_string()
    }

    fn default_graph() -> String {
        "http://mu.semte.ch/graphs/public".to_string()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            rating_predicate: Self::default_rating_predicate(),
            about_predicate: Self::default_about_predicate(),
            average_predicate: Self::default_average_predicate(),
            graph: Self::default_graph(),
        }
    }
}
