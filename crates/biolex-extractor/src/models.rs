//! Language bindings and the process-wide model cache.
//!
//! `Language` is the closed set of supported request languages; every
//! variant maps through fixed tables to one tagger model identifier and one
//! default entity-list location. Models are expensive to load, so
//! [`ModelCatalog`] memoises them per language for the process lifetime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use taglex_db::{Lexicon, LoadMode, LoadScope};
use taglex_tagger::Tagger;
use taglex_types::Token;
use tracing::info;

/// Supported request languages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
}

/// All supported languages, for startup preflight.
pub const SUPPORTED_LANGUAGES: [Language; 2] = [Language::En, Language::De];

impl Language {
    /// The tagger model bound to this language.
    pub fn model_id(self) -> &'static str {
        match self {
            Language::En => "en_core",
            Language::De => "de_core",
        }
    }

    /// Where the entity list comes from when the request names none.
    pub fn default_entity_list_url(self) -> &'static str {
        match self {
            Language::En => {
                "https://raw.githubusercontent.com/biolex/word-lists/main/english/animal_plant-en.json"
            }
            Language::De => {
                "https://raw.githubusercontent.com/biolex/word-lists/main/german/animal_plant-de.json"
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::De => "de",
        })
    }
}

/// A loaded tagger model: the lexicon plus the rule tables, wired together.
pub struct LanguageModel {
    lexicon: Lexicon,
    tagger: Tagger,
}

impl LanguageModel {
    /// Load a model directory. Only the tokenise/tag/lemmatise stages are
    /// materialised; the morphology table stays on disk.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let lexicon = Lexicon::load_with(model_dir, LoadMode::Mmap, LoadScope::Core)
            .with_context(|| format!("load lexicon from {}", model_dir.display()))?;
        let tagger = Tagger::load(model_dir)
            .with_context(|| format!("load tagger rules from {}", model_dir.display()))?;
        Ok(Self { lexicon, tagger })
    }

    /// Annotate a text with `(lemma, pos)` tokens in input order.
    pub fn annotate(&self, text: &str) -> Vec<Token> {
        self.tagger.tag_text(
            text,
            |surface| {
                self.lexicon
                    .first_sense(surface)
                    .map(|s| (s.lemma.to_string(), s.pos))
            },
            |pos, lemma| self.lexicon.lemma_exists(pos, lemma),
        )
    }

    /// Number of surface forms in the lexicon, for startup logging.
    pub fn entry_count(&self) -> usize {
        self.lexicon.entry_count()
    }
}

/// Lazily-populated language → model table shared by all requests.
///
/// First use of a language loads its model; concurrent first uses may race
/// to load equivalent instances, and the first insert wins.
pub struct ModelCatalog {
    root: PathBuf,
    cache: DashMap<Language, Arc<LanguageModel>>,
}

impl ModelCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: DashMap::new(),
        }
    }

    /// Verify that every supported language has a model directory.
    ///
    /// Called once at startup so a missing binding aborts the process
    /// instead of surfacing per request.
    pub fn preflight(&self) -> Result<()> {
        for language in SUPPORTED_LANGUAGES {
            let dir = self.model_dir(language);
            if !dir.is_dir() {
                bail!(
                    "no model directory for language {} at {}",
                    language,
                    dir.display()
                );
            }
        }
        Ok(())
    }

    /// The memoised model for a language, loading it on first use.
    pub fn get(&self, language: Language) -> Result<Arc<LanguageModel>> {
        if let Some(model) = self.cache.get(&language) {
            return Ok(Arc::clone(model.value()));
        }

        let dir = self.model_dir(language);
        let model = Arc::new(LanguageModel::load(&dir)?);
        info!(
            "loaded model {} ({} surface forms)",
            language.model_id(),
            model.entry_count()
        );
        // A racing loader may have inserted first; keep whichever won.
        let entry = self.cache.entry(language).or_insert(model);
        Ok(Arc::clone(entry.value()))
    }

    fn model_dir(&self, language: Language) -> PathBuf {
        self.root.join(language.model_id())
    }
}
