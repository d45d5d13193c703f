//! Load taglex tagger model directories with zero-copy text.
//!
//! A model directory holds plain tab-separated files:
//!
//! - `lexicon.tsv` (required): `surface<TAB>lemma<TAB>pos` rows. A surface
//!   form may appear on several rows; row order is sense priority.
//! - `morph.tsv` (optional): `surface<TAB>features` rows with fine-grained
//!   morphological features. Only read under [`LoadScope::Full`]; the
//!   frequency pipeline loads [`LoadScope::Core`] and skips it.
//!
//! Lemma and feature strings borrow from the backing buffer; callers choose
//! between memory-mapped files and owned buffers at runtime via
//! [`LoadMode`].
//!
//! # Example
//! ```no_run
//! use taglex_db::{Lexicon, LoadMode, LoadScope};
//! use taglex_types::PosTag;
//!
//! # fn main() -> anyhow::Result<()> {
//! let lex = Lexicon::load_with("/path/to/en_core", LoadMode::Mmap, LoadScope::Core)?;
//! if let Some(sense) = lex.first_sense("foxes") {
//!     println!("{} ({})", sense.lemma, sense.pos);
//! }
//! assert!(lex.lemma_exists(PosTag::Noun, "fox") || lex.entry_count() == 0);
//! # Ok(()) }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use taglex_types::{PosTag, Sense};

/// Strategy for loading model files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map each model file (fast, zero-copy).
    Mmap,
    /// Read each file into an owned buffer (portable fallback).
    Owned,
}

/// Which optional stages of the model to materialise.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadScope {
    /// Tokenise/tag/lemmatise only; `morph.tsv` is never opened.
    Core,
    /// Everything the directory offers, including morphological features.
    Full,
}

#[derive(Debug)]
enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum FileKind {
    Lexicon,
    Morph,
}

#[derive(Clone, Copy, Debug)]
struct TextRef {
    file: FileKind,
    start: usize,
    len: usize,
}

#[derive(Debug)]
struct ModelFiles {
    lexicon: Buffer,
    morph: Option<Buffer>,
}

impl ModelFiles {
    fn bytes(&self, file: FileKind) -> &[u8] {
        match file {
            FileKind::Lexicon => self.lexicon.as_slice(),
            FileKind::Morph => self.morph.as_ref().map(Buffer::as_slice).unwrap_or(&[]),
        }
    }

    fn text(&self, r: TextRef) -> &str {
        let bytes = self.bytes(r.file);
        let slice = &bytes[r.start..r.start + r.len];
        std::str::from_utf8(slice).expect("model text is valid utf-8")
    }
}

#[derive(Debug)]
struct SenseData {
    lemma: TextRef,
    pos: PosTag,
}

/// In-memory view of one tagger model, backed by mmap or owned buffers.
#[derive(Debug)]
pub struct Lexicon {
    files: ModelFiles,
    entries: HashMap<String, Vec<SenseData>>,
    lemmas: HashSet<(PosTag, String)>,
    morph: HashMap<String, TextRef>,
    scope: LoadScope,
}

impl Lexicon {
    /// Load a model directory with mmap backing and core scope.
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(model_dir, LoadMode::Mmap, LoadScope::Core)
    }

    /// Load a model directory with explicit backing and scope.
    pub fn load_with(
        model_dir: impl AsRef<Path>,
        mode: LoadMode,
        scope: LoadScope,
    ) -> Result<Self> {
        let dir = model_dir.as_ref();
        let lexicon = load_file(dir.join("lexicon.tsv"), mode)?;
        let morph_buf = match scope {
            LoadScope::Core => None,
            LoadScope::Full => load_optional_file(dir.join("morph.tsv"), mode)?,
        };

        let files = ModelFiles {
            lexicon,
            morph: morph_buf,
        };
        let (entries, lemmas) = parse_lexicon(files.bytes(FileKind::Lexicon))?;
        let morph = match files.morph {
            Some(_) => parse_morph(files.bytes(FileKind::Morph))?,
            None => HashMap::new(),
        };

        Ok(Self {
            files,
            entries,
            lemmas,
            morph,
            scope,
        })
    }

    /// All senses recorded for a surface form, in lexicon order.
    pub fn senses(&self, surface: &str) -> impl Iterator<Item = Sense<'_>> {
        self.entries
            .get(surface)
            .into_iter()
            .flatten()
            .map(|data| Sense {
                lemma: self.files.text(data.lemma),
                pos: data.pos,
            })
    }

    /// The highest-priority sense for a surface form, if any.
    pub fn first_sense(&self, surface: &str) -> Option<Sense<'_>> {
        self.senses(surface).next()
    }

    /// Whether `lemma` is recorded anywhere in the lexicon under `pos`.
    pub fn lemma_exists(&self, pos: PosTag, lemma: &str) -> bool {
        self.lemmas.contains(&(pos, lemma.to_string()))
    }

    /// Morphological features for a surface form. Always `None` under
    /// [`LoadScope::Core`].
    pub fn morph(&self, surface: &str) -> Option<&str> {
        self.morph.get(surface).map(|r| self.files.text(*r))
    }

    /// Number of distinct surface forms.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// The scope this lexicon was loaded with.
    pub fn scope(&self) -> LoadScope {
        self.scope
    }
}

fn load_file(path: std::path::PathBuf, mode: LoadMode) -> Result<Buffer> {
    let file = File::open(&path).with_context(|| format!("open model file {}", path.display()))?;
    match mode {
        LoadMode::Mmap => {
            let mmap = unsafe { Mmap::map(&file) }
                .with_context(|| format!("mmap model file {}", path.display()))?;
            Ok(Buffer::Mmap(mmap))
        }
        LoadMode::Owned => {
            let mut buf = Vec::new();
            let mut file = file;
            file.read_to_end(&mut buf)
                .with_context(|| format!("read model file {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn load_optional_file(path: std::path::PathBuf, mode: LoadMode) -> Result<Option<Buffer>> {
    if !path.exists() {
        return Ok(None);
    }
    load_file(path, mode).map(Some)
}

type ParsedLexicon = (HashMap<String, Vec<SenseData>>, HashSet<(PosTag, String)>);

fn parse_lexicon(bytes: &[u8]) -> Result<ParsedLexicon> {
    let text = std::str::from_utf8(bytes).context("lexicon.tsv is not valid utf-8")?;
    let base = text.as_ptr() as usize;

    let mut entries: HashMap<String, Vec<SenseData>> = HashMap::new();
    let mut lemmas = HashSet::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let surface = fields
            .next()
            .filter(|s| !s.is_empty())
            .with_context(|| format!("lexicon.tsv line {}: missing surface form", lineno + 1))?;
        let lemma = fields
            .next()
            .filter(|s| !s.is_empty())
            .with_context(|| format!("lexicon.tsv line {}: missing lemma", lineno + 1))?;
        let pos_field = fields
            .next()
            .with_context(|| format!("lexicon.tsv line {}: missing pos tag", lineno + 1))?;
        let mut pos_chars = pos_field.chars();
        let pos = match (pos_chars.next().and_then(PosTag::from_char), pos_chars.next()) {
            (Some(pos), None) => pos,
            _ => bail!(
                "lexicon.tsv line {}: invalid pos tag {:?}",
                lineno + 1,
                pos_field
            ),
        };

        let lemma_ref = TextRef {
            file: FileKind::Lexicon,
            start: lemma.as_ptr() as usize - base,
            len: lemma.len(),
        };
        entries.entry(surface.to_string()).or_default().push(SenseData {
            lemma: lemma_ref,
            pos,
        });
        lemmas.insert((pos, lemma.to_string()));
    }

    Ok((entries, lemmas))
}

fn parse_morph(bytes: &[u8]) -> Result<HashMap<String, TextRef>> {
    let text = std::str::from_utf8(bytes).context("morph.tsv is not valid utf-8")?;
    let base = text.as_ptr() as usize;

    let mut morph = HashMap::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (surface, features) = line
            .split_once('\t')
            .with_context(|| format!("morph.tsv line {}: expected two fields", lineno + 1))?;
        morph.insert(
            surface.to_string(),
            TextRef {
                file: FileKind::Morph,
                start: features.as_ptr() as usize - base,
                len: features.len(),
            },
        );
    }
    Ok(morph)
}
