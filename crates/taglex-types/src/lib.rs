//! Shared types for taglex tagger models.
//!
//! A taglex model annotates raw text with one coarse part-of-speech tag and
//! one lemma per token. This crate holds the pieces every consumer needs:
//! [`PosTag`] with its single-character file encoding, the borrowed
//! [`Sense`] a lexicon hands out, and the owned [`Token`] an annotation
//! pass produces.
//!
//! ```rust
//! use taglex_types::PosTag;
//!
//! let pos = PosTag::from_char('n').unwrap();
//! assert_eq!(pos, PosTag::Noun);
//! assert_eq!(pos.to_char(), 'n');
//! ```

use std::fmt;

/// Coarse part-of-speech tag as encoded in model files
/// (`n`, `v`, `a`, `r`, `x`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PosTag {
    Noun,
    Verb,
    Adj,
    Adv,
    /// Everything the lexicon does not classify: function words,
    /// interjections, stray tokens.
    Other,
}

impl PosTag {
    /// Parse the tag character used in `lexicon.tsv` and `suffix.rules`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'n' => Some(PosTag::Noun),
            'v' => Some(PosTag::Verb),
            'a' => Some(PosTag::Adj),
            'r' => Some(PosTag::Adv),
            'x' => Some(PosTag::Other),
            _ => None,
        }
    }

    /// Emit the tag character used in model files.
    pub fn to_char(self) -> char {
        match self {
            PosTag::Noun => 'n',
            PosTag::Verb => 'v',
            PosTag::Adj => 'a',
            PosTag::Adv => 'r',
            PosTag::Other => 'x',
        }
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PosTag::Noun => "noun",
            PosTag::Verb => "verb",
            PosTag::Adj => "adj",
            PosTag::Adv => "adv",
            PosTag::Other => "other",
        })
    }
}

/// One lexicon sense: a lemma borrowed from the backing buffer plus its tag.
///
/// Senses for a surface form are ordered by the lexicon; the first one is
/// the most frequent reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sense<'a> {
    pub lemma: &'a str,
    pub pos: PosTag,
}

/// An annotated token: the surface form as it appeared in the text, the
/// resolved lemma, and the coarse tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub surface: String,
    pub lemma: String,
    pub pos: PosTag,
}

impl Token {
    pub fn new(surface: impl Into<String>, lemma: impl Into<String>, pos: PosTag) -> Self {
        Self {
            surface: surface.into(),
            lemma: lemma.into(),
            pos,
        }
    }
}
