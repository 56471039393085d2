//! SPARQL 1.1 protocol client for the backing triplestore.
//!
//! Queries and updates are rendered from the typed request model and sent as
//! form-encoded POSTs. An update request becomes a single SPARQL update
//! string with its operations separated by `;`, which the store applies as
//! one request.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use rating_core::{
    Binding, Fact, Literal, PatternTerm, RatingError, Result, SelectQuery, StoreConfig, Term,
    TriplePattern, TripleStore, UpdateOperation, UpdateRequest,
};
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, trace};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Escape an IRI for use inside `<...>`. Characters not allowed in an
/// IRIREF are percent-encoded.
pub fn escape_iri(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len() + 2);
    out.push('<');
    for c in iri.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                let _ = write!(out, "%{:02X}", c as u32);
            }
            c if (c as u32) <= 0x20 => {
                let _ = write!(out, "%{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('>');
    out
}

pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn render_literal(lit: &Literal) -> String {
    let lexical = escape_literal(&lit.lexical);
    match (&lit.language, &lit.datatype) {
        (Some(lang), _) => format!("{}@{}", lexical, lang),
        (None, Some(datatype)) => format!("{}^^{}", lexical, escape_iri(datatype)),
        (None, None) => lexical,
    }
}

fn render_pattern_term(term: &PatternTerm) -> String {
    match term {
        PatternTerm::Var(name) => format!("?{}", name),
        PatternTerm::Iri(iri) => escape_iri(iri),
        PatternTerm::Literal(lit) => render_literal(lit),
    }
}

fn render_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => escape_iri(iri),
        Term::Literal(lit) => render_literal(lit),
    }
}

fn render_patterns(out: &mut String, patterns: &[TriplePattern]) {
    for pattern in patterns {
        let _ = writeln!(
            out,
            "    {} {} {} .",
            render_pattern_term(&pattern.subject),
            escape_iri(&pattern.predicate),
            render_pattern_term(&pattern.object)
        );
    }
}

fn render_graph_block(graph: &str, patterns: &[TriplePattern]) -> String {
    let mut out = format!("{{\n  GRAPH {} {{\n", escape_iri(graph));
    render_patterns(&mut out, patterns);
    out.push_str("  }\n}");
    out
}

pub fn render_select(query: &SelectQuery) -> String {
    let projection = if query.variables.is_empty() {
        "*".to_string()
    } else {
        query
            .variables
            .iter()
            .map(|v| format!("?{}", v))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let mut out = format!(
        "SELECT {} WHERE {}",
        projection,
        render_graph_block(&query.graph, &query.patterns)
    );
    if let Some(limit) = query.limit {
        let _ = write!(out, " LIMIT {}", limit);
    }
    out
}

fn render_operation(operation: &UpdateOperation) -> String {
    match operation {
        UpdateOperation::DeleteWhere { graph, patterns } => {
            let block = render_graph_block(graph, patterns);
            format!("DELETE {} WHERE {}", block, block)
        }
        UpdateOperation::InsertData { graph, facts } => {
            let mut out = format!("INSERT DATA {{\n  GRAPH {} {{\n", escape_iri(graph));
            for Fact {
                subject,
                predicate,
                object,
                ..
            } in facts
            {
                let _ = writeln!(
                    out,
                    "    {} {} {} .",
                    escape_iri(subject),
                    escape_iri(predicate),
                    render_term(object)
                );
            }
            out.push_str("  }\n}");
            out
        }
    }
}

pub fn render_update(request: &UpdateRequest) -> String {
    request
        .operations
        .iter()
        .map(render_operation)
        .collect::<Vec<_>>()
        .join(" ;\n")
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlResultSet,
}

#[derive(Debug, Deserialize)]
struct SparqlResultSet {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    language: Option<String>,
}

impl SparqlValue {
    fn into_term(self) -> Term {
        match self.kind.as_str() {
            "uri" => Term::Iri(self.value),
            "bnode" => Term::Iri(format!("_:{}", self.value)),
            _ => Term::Literal(Literal {
                lexical: self.value,
                datatype: self.datatype,
                language: self.language,
            }),
        }
    }
}

/// Parse a `application/sparql-results+json` document into bindings.
pub fn parse_results(body: &[u8]) -> Result<Vec<Binding>> {
    let results: SparqlResults = serde_json::from_slice(body)
        .map_err(|e| RatingError::InvalidResponse(format!("malformed SPARQL results: {}", e)))?;
    Ok(results
        .results
        .bindings
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(name, value)| (name, value.into_term()))
                .collect()
        })
        .collect())
}

pub struct SparqlStore {
    client: Client,
    endpoint: String,
}

impl SparqlStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RatingError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_form(&self, field: &str, body: String) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[(field, body)])
            .send()
            .await
            .map_err(|e| RatingError::Http(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RatingError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(RatingError::Store(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TripleStore for SparqlStore {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<Binding>> {
        let sparql = render_select(query);
        trace!("SPARQL query:\n{}", sparql);
        let body = self.post_form("query", sparql).await?;
        let bindings = parse_results(&body)?;
        debug!("SPARQL query returned {} bindings", bindings.len());
        Ok(bindings)
    }

    async fn update(&self, request: &UpdateRequest) -> Result<()> {
        if request.is_empty() {
            return Ok(());
        }
        let sparql = render_update(request);
        trace!("SPARQL update:\n{}", sparql);
        self.post_form("update", sparql).await?;
        Ok(())
    }
}
