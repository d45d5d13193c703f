//! Wire payloads and their schema-validating parse functions.
//!
//! Every document type that crosses the service boundary lives here as a
//! serde derive; the `parse_*` functions are the single place a raw byte
//! payload becomes a typed document, so a mismatch always surfaces as a
//! [`SchemaError`] naming the document type.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Language;

/// A unit of input text with a caller-supplied identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub text: String,
}

/// One vocabulary entry. Multiple records may share a `name`; each record
/// produces its own output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub wikidata_id: String,
    pub category: String,
    #[serde(default)]
    pub additional_wikidata_ids: Vec<String>,
}

/// Provenance of an entity list, carried through to the output unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityListMetadata {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
}

/// An entity list plus its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityListDocument {
    pub metadata: EntityListMetadata,
    pub entity_list: Vec<EntityRecord>,
}

/// Where the entity list for a request comes from.
///
/// On the wire either `{"url": "..."}` or a full inline entity-list
/// document; an omitted field falls back to the per-language default URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityListSource {
    Url(UrlRef),
    Inline(EntityListDocument),
}

/// A remote reference to an entity list document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRef {
    pub url: String,
}

/// The extraction request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub segments: Vec<Segment>,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_list: Option<EntityListSource>,
}

/// One output row: an entity record plus where and how often it occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,
    /// Per-segment counts; only segments with a non-zero count appear.
    pub segment_frequencies: BTreeMap<String, u64>,
    pub overall_frequency: u64,
}

/// The extraction response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDocument {
    pub metadata: EntityListMetadata,
    pub entity_list: Vec<FrequencyRecord>,
}

/// A payload that does not match its document schema.
#[derive(Debug, Error)]
#[error("{document} does not match the expected schema: {source}")]
pub struct SchemaError {
    document: &'static str,
    #[source]
    source: serde_json::Error,
}

/// Parse and validate an entity list document.
pub fn parse_entity_list(bytes: &[u8]) -> Result<EntityListDocument, SchemaError> {
    serde_json::from_slice(bytes).map_err(|source| SchemaError {
        document: "entity list document",
        source,
    })
}

/// Parse and validate an extraction request document.
pub fn parse_request(bytes: &[u8]) -> Result<ExtractRequest, SchemaError> {
    serde_json::from_slice(bytes).map_err(|source| SchemaError {
        document: "request document",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITY_LIST: &str = r#"{
        "metadata": {"name": "Animals (de)", "description": "test list", "date": "2023-05-01"},
        "entity_list": [
            {"name": "Fuchs", "wikidata_id": "Q8331", "category": "animal"},
            {"name": "Eiche", "wikidata_id": "Q33036816", "category": "plant",
             "additional_wikidata_ids": ["Q12004"]}
        ]
    }"#;

    #[test]
    fn parses_entity_list_with_defaults() {
        let doc = parse_entity_list(ENTITY_LIST.as_bytes()).unwrap();
        assert_eq!(doc.metadata.date, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
        assert_eq!(doc.entity_list.len(), 2);
        assert!(doc.entity_list[0].additional_wikidata_ids.is_empty());
        assert_eq!(doc.entity_list[1].additional_wikidata_ids, vec!["Q12004"]);
    }

    #[test]
    fn rejects_entity_list_missing_fields() {
        let err = parse_entity_list(br#"{"entity_list": []}"#).unwrap_err();
        assert!(err.to_string().contains("entity list document"));
    }

    #[test]
    fn parses_request_with_url_source() {
        let body = br#"{
            "segments": [{"segment_id": "s1", "text": "Der Fuchs."}],
            "language": "de",
            "entity_list": {"url": "https://example.org/list.json"}
        }"#;
        let request = parse_request(body).unwrap();
        assert_eq!(request.language, Language::De);
        assert!(matches!(
            request.entity_list,
            Some(EntityListSource::Url(UrlRef { ref url })) if url == "https://example.org/list.json"
        ));
    }

    #[test]
    fn parses_request_with_inline_source() {
        let body = format!(
            r#"{{"segments": [], "language": "en", "entity_list": {ENTITY_LIST}}}"#
        );
        let request = parse_request(body.as_bytes()).unwrap();
        assert!(matches!(
            request.entity_list,
            Some(EntityListSource::Inline(ref doc)) if doc.entity_list.len() == 2
        ));
    }

    #[test]
    fn omitted_source_stays_none() {
        let body = br#"{"segments": [], "language": "en"}"#;
        let request = parse_request(body).unwrap();
        assert!(request.entity_list.is_none());
    }

    #[test]
    fn rejects_unsupported_language() {
        let body = br#"{"segments": [], "language": "fr"}"#;
        assert!(parse_request(body).is_err());
    }

    #[test]
    fn frequency_record_flattens_entity_fields() {
        let record = FrequencyRecord {
            entity: EntityRecord {
                name: "Fuchs".into(),
                wikidata_id: "Q8331".into(),
                category: "animal".into(),
                additional_wikidata_ids: vec![],
            },
            segment_frequencies: BTreeMap::from([("s1".to_string(), 2)]),
            overall_frequency: 2,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "Fuchs");
        assert_eq!(value["segment_frequencies"]["s1"], 2);
        assert_eq!(value["overall_frequency"], 2);
    }
}
