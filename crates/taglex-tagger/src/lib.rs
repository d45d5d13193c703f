//! Tokenisation and lemma resolution for taglex models.
//!
//! The tagger turns raw text into `(lemma, pos)` tokens. It owns the parts
//! of a model that are rules rather than data tables: per-POS exception
//! lists (`noun.exc`, `verb.exc`, `adj.exc`, `adv.exc`) and suffix rules
//! (`suffix.rules`), all optional files in the model directory. Candidate
//! lemmas are verified through caller-provided callbacks, so the crate
//! stays ignorant of any concrete lexicon layout.
//!
//! # How a token is resolved
//! 1. Exact surface form in the lexicon.
//! 2. Lowercased surface form (sentence-initial capitals).
//! 3. Exceptions, per POS in noun→verb→adj→adv order.
//! 4. Suffix rules, same POS order, candidates verified via the callback.
//! 5. Fallback: the lowercased form tagged [`PosTag::Other`].
//!
//! # Example
//! ```no_run
//! use taglex_db::Lexicon;
//! use taglex_tagger::Tagger;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = "/path/to/en_core";
//! let lex = Lexicon::load(dir)?;
//! let tagger = Tagger::load(dir)?;
//!
//! let tokens = tagger.tag_text(
//!     "The foxes ran.",
//!     |surface| lex.first_sense(surface).map(|s| (s.lemma.to_string(), s.pos)),
//!     |pos, lemma| lex.lemma_exists(pos, lemma),
//! );
//! for token in tokens {
//!     println!("{} -> {} ({})", token.surface, token.lemma, token.pos);
//! }
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use taglex_types::{PosTag, Token};

/// POS priority when guessing an unknown surface form.
const POS_ORDER: [PosTag; 4] = [PosTag::Noun, PosTag::Verb, PosTag::Adj, PosTag::Adv];

/// Exception lists and suffix rules for one model.
pub struct Tagger {
    exceptions: HashMap<PosTag, HashMap<String, Vec<String>>>,
    rules: HashMap<PosTag, Vec<(String, String)>>,
}

impl Tagger {
    /// Load exception lists and suffix rules from a model directory.
    ///
    /// All files are optional; missing ones are treated as empty.
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = model_dir.as_ref();
        Ok(Self {
            exceptions: HashMap::from([
                (PosTag::Noun, load_exc(dir.join("noun.exc"))?),
                (PosTag::Verb, load_exc(dir.join("verb.exc"))?),
                (PosTag::Adj, load_exc(dir.join("adj.exc"))?),
                (PosTag::Adv, load_exc(dir.join("adv.exc"))?),
            ]),
            rules: load_rules(dir.join("suffix.rules"))?,
        })
    }

    /// A tagger with no exceptions and no rules; lexicon hits only.
    pub fn empty() -> Self {
        Self {
            exceptions: HashMap::new(),
            rules: HashMap::new(),
        }
    }

    /// Annotate a whole text in token order.
    ///
    /// `first_sense` returns the highest-priority `(lemma, pos)` reading of
    /// a surface form; `lemma_exists` verifies rule-generated candidates.
    pub fn tag_text<L, E>(&self, text: &str, first_sense: L, lemma_exists: E) -> Vec<Token>
    where
        L: Fn(&str) -> Option<(String, PosTag)>,
        E: Fn(PosTag, &str) -> bool,
    {
        tokenize(text)
            .into_iter()
            .map(|surface| self.tag_token(surface, &first_sense, &lemma_exists))
            .collect()
    }

    /// Resolve a single surface form.
    pub fn tag_token<L, E>(&self, surface: &str, first_sense: &L, lemma_exists: &E) -> Token
    where
        L: Fn(&str) -> Option<(String, PosTag)>,
        E: Fn(PosTag, &str) -> bool,
    {
        if let Some((lemma, pos)) = first_sense(surface) {
            return Token::new(surface, lemma, pos);
        }

        let lower = surface.to_lowercase();
        if lower != surface
            && let Some((lemma, pos)) = first_sense(&lower)
        {
            return Token::new(surface, lemma, pos);
        }

        // Case matters for candidates: German noun lemmas keep their
        // capital, English sentence-initial forms need the lowered one.
        let bases: Vec<&str> = if lower == surface {
            vec![surface]
        } else {
            vec![surface, lower.as_str()]
        };

        for pos in POS_ORDER {
            if let Some(exc_map) = self.exceptions.get(&pos) {
                for base in &bases {
                    if let Some(entries) = exc_map.get(*base) {
                        for lemma in entries {
                            if lemma_exists(pos, lemma) {
                                return Token::new(surface, lemma.clone(), pos);
                            }
                        }
                    }
                }
            }

            if let Some(rules) = self.rules.get(&pos) {
                for (suffix, replacement) in rules {
                    for base in &bases {
                        if let Some(candidate) = apply_rule(base, suffix, replacement)
                            && lemma_exists(pos, &candidate)
                        {
                            return Token::new(surface, candidate, pos);
                        }
                    }
                }
            }
        }

        Token::new(surface, lower, PosTag::Other)
    }
}

/// Split text into word tokens: maximal runs of alphabetic characters.
///
/// Digits, punctuation, and whitespace separate tokens and are never
/// emitted themselves.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|t| !t.is_empty())
        .collect()
}

fn load_exc(path: PathBuf) -> Result<HashMap<String, Vec<String>>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file =
        File::open(&path).with_context(|| format!("open exception file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut map = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let mut parts = line.split_whitespace();
        let surface = match parts.next() {
            Some(s) => s.to_string(),
            None => continue,
        };
        let lemmas: Vec<String> = parts.map(str::to_string).collect();
        if !lemmas.is_empty() {
            map.insert(surface, lemmas);
        }
    }
    Ok(map)
}

fn load_rules(path: PathBuf) -> Result<HashMap<PosTag, Vec<(String, String)>>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file = File::open(&path).with_context(|| format!("open rule file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut rules: HashMap<PosTag, Vec<(String, String)>> = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let pos_field = fields.next().unwrap_or_default();
        let suffix = fields.next().unwrap_or_default();
        let replacement = fields.next().unwrap_or_default();

        let mut pos_chars = pos_field.chars();
        let pos = match (pos_chars.next().and_then(PosTag::from_char), pos_chars.next()) {
            (Some(pos), None) => pos,
            _ => bail!(
                "{} line {}: invalid pos tag {:?}",
                path.display(),
                lineno + 1,
                pos_field
            ),
        };
        if suffix.is_empty() {
            bail!("{} line {}: empty suffix", path.display(), lineno + 1);
        }
        rules
            .entry(pos)
            .or_default()
            .push((suffix.to_string(), replacement.to_string()));
    }
    Ok(rules)
}

fn apply_rule(surface: &str, suffix: &str, replacement: &str) -> Option<String> {
    surface.strip_suffix(suffix).map(|stem| {
        let mut candidate = if replacement.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}{replacement}")
        };

        // Handle doubled consonants from inflected forms ("running" -> "runn").
        if replacement.is_empty() && candidate.len() >= 2 {
            let mut chars = candidate.chars();
            let prev = chars.next_back();
            let last = chars.next_back();
            if let (Some(a), Some(b)) = (prev, last)
                && a == b
            {
                candidate.pop();
            }
        }

        candidate
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fake_lexicon(
        entries: &[(&str, &str, PosTag)],
    ) -> (
        impl Fn(&str) -> Option<(String, PosTag)>,
        impl Fn(PosTag, &str) -> bool,
    ) {
        let senses: Vec<(String, String, PosTag)> = entries
            .iter()
            .map(|(surface, lemma, pos)| (surface.to_string(), lemma.to_string(), *pos))
            .collect();
        let lemmas: HashSet<(PosTag, String)> = entries
            .iter()
            .map(|(_, lemma, pos)| (*pos, lemma.to_string()))
            .collect();
        let first_sense = move |surface: &str| {
            senses
                .iter()
                .find(|(s, _, _)| s == surface)
                .map(|(_, lemma, pos)| (lemma.clone(), *pos))
        };
        let lemma_exists = move |pos: PosTag, lemma: &str| lemmas.contains(&(pos, lemma.to_string()));
        (first_sense, lemma_exists)
    }

    #[test]
    fn tokenize_splits_on_non_alphabetic() {
        assert_eq!(
            tokenize("Der Fuchs lief. Der Fuchs schlief."),
            vec!["Der", "Fuchs", "lief", "Der", "Fuchs", "schlief"]
        );
        assert_eq!(tokenize("3 foxes, 2 dens"), vec!["foxes", "dens"]);
        assert_eq!(tokenize(""), Vec::<&str>::new());
    }

    #[test]
    fn exact_sense_wins() {
        let (first_sense, lemma_exists) = fake_lexicon(&[("Fuchs", "Fuchs", PosTag::Noun)]);
        let tagger = Tagger::empty();
        let token = tagger.tag_token("Fuchs", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "Fuchs");
        assert_eq!(token.pos, PosTag::Noun);
    }

    #[test]
    fn falls_back_to_lowercase_lookup() {
        let (first_sense, lemma_exists) = fake_lexicon(&[("the", "the", PosTag::Other)]);
        let tagger = Tagger::empty();
        let token = tagger.tag_token("The", &first_sense, &lemma_exists);
        assert_eq!(token.surface, "The");
        assert_eq!(token.lemma, "the");
        assert_eq!(token.pos, PosTag::Other);
    }

    #[test]
    fn uses_exceptions_before_rules() {
        let (first_sense, lemma_exists) = fake_lexicon(&[("child", "child", PosTag::Noun)]);
        let mut tagger = Tagger::empty();
        tagger.exceptions.insert(
            PosTag::Noun,
            HashMap::from([("children".to_string(), vec!["child".to_string()])]),
        );

        let token = tagger.tag_token("children", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "child");
        assert_eq!(token.pos, PosTag::Noun);
    }

    #[test]
    fn suffix_rules_verify_against_lexicon() {
        let (first_sense, lemma_exists) = fake_lexicon(&[("fox", "fox", PosTag::Noun)]);
        let mut tagger = Tagger::empty();
        tagger.rules.insert(
            PosTag::Noun,
            vec![("es".to_string(), String::new()), ("s".to_string(), String::new())],
        );

        let token = tagger.tag_token("foxes", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "fox");
        assert_eq!(token.pos, PosTag::Noun);

        // Unverifiable candidates never surface.
        let token = tagger.tag_token("axes", &first_sense, &lemma_exists);
        assert_eq!(token.pos, PosTag::Other);
    }

    #[test]
    fn rules_keep_capitalised_candidates() {
        let (first_sense, lemma_exists) = fake_lexicon(&[("Fuchs", "Fuchs", PosTag::Noun)]);
        let mut tagger = Tagger::empty();
        tagger
            .rules
            .insert(PosTag::Noun, vec![("es".to_string(), String::new())]);

        let token = tagger.tag_token("Fuchses", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "Fuchs");
        assert_eq!(token.pos, PosTag::Noun);
    }

    #[test]
    fn unknown_forms_tag_as_other() {
        let (first_sense, lemma_exists) = fake_lexicon(&[]);
        let tagger = Tagger::empty();
        let token = tagger.tag_token("Zyzzyva", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "zyzzyva");
        assert_eq!(token.pos, PosTag::Other);
    }

    #[test]
    fn loads_rules_and_exceptions_from_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("noun.exc"), "geese goose\n").unwrap();
        std::fs::write(dir.path().join("suffix.rules"), "# noun plurals\nn\ts\t\nn\ties\ty\n")
            .unwrap();

        let tagger = Tagger::load(dir.path()).unwrap();
        let (first_sense, lemma_exists) = fake_lexicon(&[
            ("goose", "goose", PosTag::Noun),
            ("berry", "berry", PosTag::Noun),
        ]);

        let token = tagger.tag_token("geese", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "goose");

        let token = tagger.tag_token("berries", &first_sense, &lemma_exists);
        assert_eq!(token.lemma, "berry");
        assert_eq!(token.pos, PosTag::Noun);
    }

    #[test]
    fn rejects_invalid_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("suffix.rules"), "q\ts\t\n").unwrap();
        assert!(Tagger::load(dir.path()).is_err());
    }
}
