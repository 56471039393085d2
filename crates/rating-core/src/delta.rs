//! Decoding of delta notification payloads.
//!
//! Two shapes are accepted: a bare array of change sets, or an object with a
//! `delta` array. Anything missing or misshapen inside them decodes to empty
//! collections instead of failing the whole payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::{DeltaBatch, Fact, Literal, Result, Term};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChangeSet {
    #[serde(default, deserialize_with = "lenient_facts")]
    pub inserts: Vec<Fact>,
    #[serde(default, deserialize_with = "lenient_facts")]
    pub deletes: Vec<Fact>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeltaPayload {
    ChangeSets(Vec<ChangeSet>),
    Envelope { delta: Vec<ChangeSet> },
}

impl DeltaPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => DeltaPayload::ChangeSets(decode_change_sets(items)),
            Value::Object(mut fields) => {
                let delta = match fields.remove("delta") {
                    Some(Value::Array(items)) => decode_change_sets(items),
                    _ => Vec::new(),
                };
                DeltaPayload::Envelope { delta }
            }
            other => {
                debug!("Ignoring delta payload of unexpected shape: {}", other);
                DeltaPayload::ChangeSets(Vec::new())
            }
        }
    }

    pub fn change_sets(&self) -> &[ChangeSet] {
        match self {
            DeltaPayload::ChangeSets(sets) => sets,
            DeltaPayload::Envelope { delta } => delta,
        }
    }

    /// Flattens all change sets into one batch, keeping arrival order.
    pub fn into_batch(self) -> DeltaBatch {
        let sets = match self {
            DeltaPayload::ChangeSets(sets) => sets,
            DeltaPayload::Envelope { delta } => delta,
        };
        let mut batch = DeltaBatch::default();
        for set in sets {
            batch.inserts.extend(set.inserts);
            batch.deletes.extend(set.deletes);
        }
        batch
    }
}

fn decode_change_sets(items: Vec<Value>) -> Vec<ChangeSet> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ChangeSet>(item).ok())
        .collect()
}

#[derive(Debug, Deserialize)]
struct WireTerm {
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Option<String>,
    datatype: Option<String>,
    #[serde(rename = "xml:lang", alias = "lang")]
    language: Option<String>,
}

impl WireTerm {
    fn into_term(self) -> Option<Term> {
        let value = self.value?;
        let is_literal = match self.kind.as_deref() {
            Some("literal") | Some("typed-literal") => true,
            Some(_) => false,
            None => self.datatype.is_some() || self.language.is_some(),
        };
        if is_literal {
            Some(Term::Literal(Literal {
                lexical: value,
                datatype: self.datatype,
                language: self.language,
            }))
        } else {
            Some(Term::Iri(value))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireTriple {
    subject: Option<WireTerm>,
    predicate: Option<WireTerm>,
    object: Option<WireTerm>,
    graph: Option<WireTerm>,
}

impl WireTriple {
    fn into_fact(self) -> Option<Fact> {
        let subject = self.subject?.value?;
        let predicate = self.predicate?.value?;
        let object = self.object?.into_term()?;
        let graph = self.graph.and_then(|g| g.value);
        Some(Fact {
            subject,
            predicate,
            object,
            graph,
        })
    }
}

fn lenient_facts<'de, D>(deserializer: D) -> std::result::Result<Vec<Fact>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let facts = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<WireTriple>(item).ok())
            .filter_map(WireTriple::into_fact)
            .collect(),
        _ => Vec::new(),
    };
    Ok(facts)
}
