use super::types::{PracticeVerdicts, VerdictRecord};
use crate::practice::PracticeSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Merged verdicts for a run, keyed by file path then practice id
pub type MergedVerdicts = BTreeMap<String, PracticeVerdicts>;

/// Layers a file's contributions into the run: cached lists first, then the
/// lists computed in this run on top, so the newer list wins per practice.
pub fn merge_contributions(
    merged: &mut MergedVerdicts,
    path: &str,
    cached: PracticeVerdicts,
    computed: PracticeVerdicts,
) {
    let entry = merged.entry(path.to_string()).or_default();
    entry.extend(cached);
    entry.extend(computed);
}

/// Final report: file path (or repository key) → practice statement → violations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisReport {
    entries: BTreeMap<String, BTreeMap<String, Vec<VerdictRecord>>>,
}

impl AnalysisReport {
    /// Keeps only `Violated` records, and only practices that have one.
    /// Files left without any violation are omitted.
    pub fn finalize(merged: MergedVerdicts, catalog: &PracticeSet) -> Self {
        let mut entries = BTreeMap::new();

        for (path, verdicts) in merged {
            let mut by_statement: BTreeMap<String, Vec<VerdictRecord>> = BTreeMap::new();
            for (id, records) in verdicts {
                let violations: Vec<VerdictRecord> =
                    records.into_iter().filter(|r| r.is_violation()).collect();
                if violations.is_empty() {
                    continue;
                }
                let statement = catalog.statement_for(&id).unwrap_or(&id).to_string();
                by_statement.entry(statement).or_default().extend(violations);
            }
            if !by_statement.is_empty() {
                entries.insert(path, by_statement);
            }
        }

        Self { entries }
    }

    pub fn get(&self, path: &str, statement: &str) -> Option<&[VerdictRecord]> {
        self.entries
            .get(path)
            .and_then(|practices| practices.get(statement))
            .map(Vec::as_slice)
    }

    pub fn entries(&self) -> &BTreeMap<String, BTreeMap<String, Vec<VerdictRecord>>> {
        &self.entries
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(|practices| practices.values())
            .map(Vec::len)
            .sum()
    }
}
