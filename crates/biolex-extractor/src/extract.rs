//! The frequency-extraction pipeline: vocabulary index, per-segment
//! accumulation, and result assembly.
//!
//! The pipeline is a pure, single-pass batch computation: it never touches
//! the network or the filesystem, and identical inputs yield identical
//! output. Frequencies accumulate into ordered maps so the response is
//! reproducible regardless of hash seeding.

use std::collections::{BTreeMap, HashMap, HashSet};

use taglex_types::{PosTag, Token};

use crate::schema::{
    EntityListDocument, EntityListMetadata, EntityRecord, FrequencyRecord, ResultDocument, Segment,
};

/// Per-name, per-segment occurrence counts. Only names that occurred at
/// least once appear, and only segments with a non-zero count per name.
pub type SegmentFrequencies = BTreeMap<String, BTreeMap<String, u64>>;

/// Membership view of an entity list: the distinct names plus every record
/// registered under each name, in input order.
pub struct VocabIndex {
    names: HashSet<String>,
    by_name: HashMap<String, Vec<EntityRecord>>,
}

impl VocabIndex {
    /// Index an entity list. Records sharing a name all survive and keep
    /// their relative order.
    pub fn build(records: &[EntityRecord]) -> Self {
        let mut names = HashSet::with_capacity(records.len());
        let mut by_name: HashMap<String, Vec<EntityRecord>> = HashMap::new();
        for record in records {
            names.insert(record.name.clone());
            by_name
                .entry(record.name.clone())
                .or_default()
                .push(record.clone());
        }
        Self { names, by_name }
    }

    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    /// All records registered under a name, in entity-list order.
    pub fn records(&self, name: &str) -> &[EntityRecord] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Count noun occurrences of vocabulary names, segment by segment.
///
/// Each segment is annotated independently and in input order; only
/// noun-tagged lemmas count, and a `segment_id` key is written only for
/// names that occur in that segment. A repeated `segment_id` overwrites
/// earlier counts for the names it contains (last write wins).
pub fn accumulate<F>(segments: &[Segment], names: &HashSet<String>, annotate: F) -> SegmentFrequencies
where
    F: Fn(&str) -> Vec<Token>,
{
    let mut frequencies = SegmentFrequencies::new();

    for segment in segments {
        let tokens = annotate(&segment.text);

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for token in &tokens {
            if token.pos == PosTag::Noun {
                *counts.entry(token.lemma.as_str()).or_insert(0) += 1;
            }
        }

        for (lemma, count) in counts {
            if names.contains(lemma) {
                frequencies
                    .entry(lemma.to_string())
                    .or_default()
                    .insert(segment.segment_id.clone(), count);
            }
        }
    }

    frequencies
}

/// Merge per-segment counts into the final document.
///
/// Every record registered under an occurring name yields one output row
/// sharing that name's counts; names that never occurred are absent.
pub fn assemble(
    frequencies: SegmentFrequencies,
    index: &VocabIndex,
    metadata: EntityListMetadata,
) -> ResultDocument {
    let mut entity_list = Vec::new();
    for (name, segment_frequencies) in frequencies {
        let overall_frequency = segment_frequencies.values().sum();
        for record in index.records(&name) {
            entity_list.push(FrequencyRecord {
                entity: record.clone(),
                segment_frequencies: segment_frequencies.clone(),
                overall_frequency,
            });
        }
    }
    ResultDocument {
        metadata,
        entity_list,
    }
}

/// Run the whole pipeline over one request's segments and entity list.
pub fn extract_frequencies<F>(
    segments: &[Segment],
    entity_list: EntityListDocument,
    annotate: F,
) -> ResultDocument
where
    F: Fn(&str) -> Vec<Token>,
{
    let index = VocabIndex::build(&entity_list.entity_list);
    let frequencies = accumulate(segments, index.names(), annotate);
    assemble(frequencies, &index, entity_list.metadata)
}
