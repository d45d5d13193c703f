//! Resolving and loading the entity list for a request.
//!
//! Resolution is a pure two-step decision kept apart from the fetch: an
//! explicit source wins, otherwise the language's fixed default location is
//! used. Only resolved remote references touch the network.

use thiserror::Error;

use crate::models::Language;
use crate::schema::{self, EntityListDocument, EntityListSource, SchemaError};

/// A fully resolved entity-list source.
#[derive(Debug, Clone)]
pub enum ResolvedSource {
    /// The request carried the document itself; nothing to fetch.
    Inline(EntityListDocument),
    /// A remote document to fetch and validate.
    Remote(String),
}

/// Why an entity list could not be loaded. Both variants are request-level
/// failures; neither is retried.
#[derive(Debug, Error)]
pub enum EntityListError {
    #[error("entity list retrieval from {url} failed: {reason}")]
    Retrieval { url: String, reason: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Decide where the entity list comes from.
pub fn resolve(source: Option<EntityListSource>, language: Language) -> ResolvedSource {
    match source {
        Some(EntityListSource::Inline(doc)) => ResolvedSource::Inline(doc),
        Some(EntityListSource::Url(reference)) => ResolvedSource::Remote(reference.url),
        None => ResolvedSource::Remote(language.default_entity_list_url().to_string()),
    }
}

/// Load a resolved source, fetching and validating remote documents.
pub async fn load(
    client: &reqwest::Client,
    source: ResolvedSource,
) -> Result<EntityListDocument, EntityListError> {
    match source {
        ResolvedSource::Inline(doc) => Ok(doc),
        ResolvedSource::Remote(url) => fetch(client, &url).await,
    }
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
) -> Result<EntityListDocument, EntityListError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| EntityListError::Retrieval {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(EntityListError::Retrieval {
            url: url.to_string(),
            reason: format!("unexpected status {status}"),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| EntityListError::Retrieval {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(schema::parse_entity_list(&body)?)
}
