//! Build the combined plant/animal entity list from tabular word sources.
//!
//! Reads every source file in a data directory and joins them into one
//! entity-list document the extractor can consume directly:
//!
//! - category sources: `*.json` arrays of `{"word": ..., "category": ...}`
//!   and `*.tsv` files with a `category` column — words with a category
//!   but no Wikidata id yet;
//! - lookup sources: `*.tsv` files with a `wikidata_id` column — the
//!   word → Wikidata id mapping used for the join.
//!
//! Both sides are deduplicated keeping the first occurrence, category rows
//! are left-joined against the lookups on `word`, multiple ids per word
//! collapse into `wikidata_id` plus `additional_wikidata_ids`, and the
//! result is sorted by word.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Parser;
use serde::Deserialize;

use biolex_extractor::schema::{EntityListDocument, EntityListMetadata, EntityRecord};

#[derive(Parser)]
#[command(name = "biolex-wordlist")]
#[command(about = "Join word sources into a combined entity list")]
struct Cli {
    /// Directory holding the *.json and *.tsv source files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Where to write the combined entity list document.
    #[arg(long, default_value = "combined_word_list.json")]
    out: PathBuf,
    /// Metadata name of the produced list.
    #[arg(long)]
    name: String,
    /// Metadata description of the produced list.
    #[arg(long)]
    description: String,
    /// Metadata date; defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryRow {
    word: String,
    category: String,
}

#[derive(Debug, Clone)]
struct LookupRow {
    word: String,
    wikidata_id: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (categories, lookups) = read_sources(&cli.data_dir)?;
    println!(
        "read {} category rows and {} lookup rows from {}",
        categories.len(),
        lookups.len(),
        cli.data_dir.display()
    );

    let entity_list = join(categories, lookups);
    let document = EntityListDocument {
        metadata: EntityListMetadata {
            name: cli.name,
            description: cli.description,
            date: cli.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        },
        entity_list,
    };

    let json = serde_json::to_string_pretty(&document)?;
    fs::write(&cli.out, json).with_context(|| format!("write {}", cli.out.display()))?;
    println!(
        "wrote {} entities to {}",
        document.entity_list.len(),
        cli.out.display()
    );
    Ok(())
}

/// Read every source file in the data directory, in path order.
fn read_sources(data_dir: &Path) -> Result<(Vec<CategoryRow>, Vec<LookupRow>)> {
    let mut paths: Vec<PathBuf> = fs::read_dir(data_dir)
        .with_context(|| format!("read data directory {}", data_dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    let mut categories = Vec::new();
    let mut lookups = Vec::new();
    for path in paths {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let bytes = fs::read(&path)
                    .with_context(|| format!("read source file {}", path.display()))?;
                let rows: Vec<CategoryRow> = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parse category source {}", path.display()))?;
                categories.extend(rows);
            }
            Some("tsv") => read_tsv(&path, &mut categories, &mut lookups)?,
            _ => {}
        }
    }
    Ok((categories, lookups))
}

/// Classify a TSV file by its header: a `category` column makes it a
/// category source, otherwise a `wikidata_id` column makes it a lookup.
fn read_tsv(
    path: &Path,
    categories: &mut Vec<CategoryRow>,
    lookups: &mut Vec<LookupRow>,
) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read source file {}", path.display()))?;
    let mut lines = text.lines();
    let header = match lines.next() {
        Some(header) => header.trim_end_matches('\r'),
        None => return Ok(()),
    };
    let columns: Vec<&str> = header.split('\t').collect();

    let word_idx = column_index(&columns, "word")
        .with_context(|| format!("{}: missing word column", path.display()))?;
    let category_idx = column_index(&columns, "category");
    let wikidata_idx = column_index(&columns, "wikidata_id");

    for (lineno, raw) in lines.enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |idx: usize| -> Result<&str> {
            fields.get(idx).copied().filter(|f| !f.is_empty()).with_context(|| {
                format!("{} line {}: missing field", path.display(), lineno + 2)
            })
        };

        if let Some(category_idx) = category_idx {
            categories.push(CategoryRow {
                word: field(word_idx)?.to_string(),
                category: field(category_idx)?.to_string(),
            });
        } else if let Some(wikidata_idx) = wikidata_idx {
            lookups.push(LookupRow {
                word: field(word_idx)?.to_string(),
                wikidata_id: field(wikidata_idx)?.to_string(),
            });
        } else {
            bail!(
                "{}: neither category nor wikidata_id column present",
                path.display()
            );
        }
    }
    Ok(())
}

fn column_index(columns: &[&str], name: &str) -> Option<usize> {
    columns.iter().position(|c| *c == name)
}

/// Left-join deduplicated category rows against the id lookups.
fn join(categories: Vec<CategoryRow>, lookups: Vec<LookupRow>) -> Vec<EntityRecord> {
    let mut seen_lookups = HashSet::new();
    let mut ids_by_word: HashMap<String, Vec<String>> = HashMap::new();
    for row in lookups {
        if seen_lookups.insert((row.word.clone(), row.wikidata_id.clone())) {
            ids_by_word.entry(row.word).or_default().push(row.wikidata_id);
        }
    }

    let mut seen_categories = HashSet::new();
    let mut records = Vec::new();
    for row in categories {
        if !seen_categories.insert((row.word.clone(), row.category.clone())) {
            continue;
        }
        let ids = ids_by_word.get(&row.word).map(Vec::as_slice).unwrap_or(&[]);
        records.push(EntityRecord {
            name: row.word,
            wikidata_id: ids.first().cloned().unwrap_or_default(),
            category: row.category,
            additional_wikidata_ids: ids.iter().skip(1).cloned().collect(),
        });
    }

    records.sort_by(|a, b| (&a.name, &a.category).cmp(&(&b.name, &b.category)));
    records
}
