//! VEX merging.
//!
//! VEX documents are folded into the vulnerability list of one SBOM. Unlike
//! the component merge, a later statement about a vulnerability and an
//! affected reference replaces the earlier one ([`NewerEntryWins`]).

use super::engine::{MergeEngine, MergeOutcome};
use super::policy::{ConflictPolicy, NewerEntryWins};
use super::warning::MergeWarning;
use crate::error::Result;
use crate::model::{Bom, Vulnerability};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Fold `vex` documents into the vulnerabilities of `sbom`, newest last.
pub fn merge_vex(sbom: &Bom, vex: &[Bom]) -> Result<MergeOutcome> {
    MergeEngine::new().merge_vex(sbom, vex)
}

/// Accumulates vulnerability statements, resolving overlaps with a policy.
///
/// Each statement is tagged with the index of the document it came from
/// (the SBOM is document 0). When two statements overlap the policy ranks
/// their documents; within one document the later statement wins.
#[derive(Debug)]
pub struct VexMerger<P = NewerEntryWins> {
    policy: P,
    known: HashSet<String>,
    entries: Vec<(usize, Vulnerability)>,
    warnings: Vec<MergeWarning>,
}

impl VexMerger<NewerEntryWins> {
    pub fn new(sbom: &Bom) -> Self {
        Self::with_policy(sbom, NewerEntryWins)
    }
}

impl<P: ConflictPolicy> VexMerger<P> {
    /// Start from the vulnerabilities already present in `sbom`
    pub fn with_policy(sbom: &Bom, policy: P) -> Self {
        Self {
            policy,
            known: sbom.declared_refs().map(str::to_string).collect(),
            entries: sbom
                .vulnerabilities
                .iter()
                .cloned()
                .map(|v| (0, v))
                .collect(),
            warnings: Vec::new(),
        }
    }

    pub fn add_document(&mut self, document: usize, vex: &Bom) {
        for vulnerability in &vex.vulnerabilities {
            self.add(document, vulnerability.clone());
        }
    }

    pub fn finish(self) -> (Vec<Vulnerability>, Vec<MergeWarning>) {
        let entries = self.entries.into_iter().map(|(_, v)| v).collect();
        (entries, self.warnings)
    }

    fn add(&mut self, document: usize, mut incoming: Vulnerability) {
        let label = incoming.id.clone().unwrap_or_else(|| "<no id>".to_string());

        let had_affects = !incoming.affects.is_empty();
        let (kept, dangling): (Vec<_>, Vec<_>) = incoming
            .affects
            .into_iter()
            .partition(|a| self.known.contains(&a.reference));
        incoming.affects = kept;
        for affects in dangling {
            self.warnings.push(MergeWarning::dangling(
                affects.reference,
                format!("VEX input #{document}: {label} affects a component the SBOM does not declare"),
            ));
        }
        if had_affects && incoming.affects.is_empty() {
            debug!(vulnerability = %label, input = document, "VEX entry has no known affects; skipped");
            return;
        }

        let ids: BTreeSet<String> = incoming
            .identifiers()
            .into_iter()
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            self.entries.push((document, incoming));
            return;
        }

        let mut keep_incoming = true;
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        for (origin, mut earlier) in std::mem::take(&mut self.entries) {
            let overlaps = earlier.identifiers().iter().any(|id| ids.contains(*id));
            if !overlaps || !keep_incoming {
                entries.push((origin, earlier));
                continue;
            }

            let (winner, _) = self.policy.rank(&origin, &document);
            if *winner == document {
                if supersede(&mut earlier, &incoming) {
                    debug!(
                        vulnerability = %label,
                        input = document,
                        superseded = origin,
                        policy = P::NAME,
                        "VEX entry superseded"
                    );
                } else {
                    entries.push((origin, earlier));
                }
            } else {
                keep_incoming = !supersede(&mut incoming, &earlier);
                entries.push((origin, earlier));
            }
        }
        if keep_incoming {
            entries.push((document, incoming));
        }
        self.entries = entries;
    }
}

/// Remove from `loser` every assertion `winner` makes. Returns whether
/// `loser` has nothing left.
fn supersede(loser: &mut Vulnerability, winner: &Vulnerability) -> bool {
    if winner.affects.is_empty() {
        return true;
    }
    if loser.affects.is_empty() {
        return false;
    }
    let replaced: HashSet<&str> = winner.affected_refs().collect();
    loser
        .affects
        .retain(|a| !replaced.contains(a.reference.as_str()));
    loser.affects.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::policy::FirstInputWins;
    use crate::merge::WarningKind;
    use crate::model::{Affects, Analysis, Component, SpecVersion};
    use indexmap::IndexMap;

    fn statement(id: &str, state: &str, refs: &[&str]) -> Vulnerability {
        let mut v = Vulnerability::new(id);
        v.analysis = Some(Analysis {
            state: Some(state.to_string()),
            response: Vec::new(),
            extensions: IndexMap::new(),
        });
        v.affects = refs.iter().map(|r| Affects::new(*r)).collect();
        v
    }

    fn sbom(vulnerabilities: Vec<Vulnerability>) -> Bom {
        let mut bom = Bom::new(SpecVersion::V1_5);
        bom.components = ["x", "y"]
            .iter()
            .map(|r| Component::new("library", *r).with_bom_ref(*r))
            .collect();
        bom.vulnerabilities = vulnerabilities;
        bom
    }

    fn vex(vulnerabilities: Vec<Vulnerability>) -> Bom {
        let mut bom = Bom::new(SpecVersion::V1_5);
        bom.vulnerabilities = vulnerabilities;
        bom
    }

    fn state_of<'a>(entries: &'a [Vulnerability], reference: &str) -> Vec<&'a str> {
        entries
            .iter()
            .filter(|v| v.affected_refs().any(|r| r == reference))
            .filter_map(Vulnerability::state)
            .collect()
    }

    #[test]
    fn test_newer_statement_replaces_older_for_same_ref() {
        let base = sbom(vec![statement("CVE-1", "in_triage", &["x", "y"])]);
        let update = vex(vec![statement("CVE-1", "not_affected", &["x"])]);
        let outcome = merge_vex(&base, &[update]).unwrap();
        let entries = &outcome.document.vulnerabilities;

        assert_eq!(entries.len(), 2);
        assert_eq!(state_of(entries, "x"), vec!["not_affected"]);
        assert_eq!(state_of(entries, "y"), vec!["in_triage"]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_earlier_entry_without_remaining_affects_is_removed() {
        let base = sbom(vec![statement("CVE-1", "in_triage", &["x"])]);
        let first = vex(vec![statement("CVE-1", "exploitable", &["x"])]);
        let second = vex(vec![statement("CVE-1", "resolved", &["x"])]);
        let outcome = merge_vex(&base, &[first, second]).unwrap();
        let entries = &outcome.document.vulnerabilities;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].state(), Some("resolved"));
    }

    #[test]
    fn test_statement_without_affects_supersedes_by_id() {
        let base = sbom(vec![
            statement("CVE-1", "in_triage", &["x"]),
            statement("CVE-2", "in_triage", &["y"]),
        ]);
        let update = vex(vec![statement("CVE-1", "false_positive", &[])]);
        let outcome = merge_vex(&base, &[update]).unwrap();
        let entries = &outcome.document.vulnerabilities;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id.as_deref(), Some("CVE-2"));
        assert_eq!(entries[1].state(), Some("false_positive"));
    }

    #[test]
    fn test_unknown_refs_are_dropped_with_warning() {
        let base = sbom(vec![]);
        let update = vex(vec![
            statement("CVE-1", "exploitable", &["x", "ghost"]),
            statement("CVE-2", "exploitable", &["phantom"]),
        ]);
        let outcome = merge_vex(&base, &[update]).unwrap();
        let entries = &outcome.document.vulnerabilities;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].affected_refs().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(outcome.warnings.len(), 2);
        assert!(outcome
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::DanglingReference));
    }

    #[test]
    fn test_first_input_policy_keeps_earlier_statement() {
        let base = sbom(vec![statement("CVE-1", "in_triage", &["x"])]);
        let update = vex(vec![statement("CVE-1", "not_affected", &["x", "y"])]);

        let mut merger = VexMerger::with_policy(&base, FirstInputWins);
        merger.add_document(1, &update);
        let (entries, _) = merger.finish();

        assert_eq!(state_of(&entries, "x"), vec!["in_triage"]);
        assert_eq!(state_of(&entries, "y"), vec!["not_affected"]);
    }

    #[test]
    fn test_vex_merge_upgrades_spec_version() {
        let base = sbom(vec![]);
        let mut update = vex(vec![statement("CVE-1", "exploitable", &["x"])]);
        update.spec_version = "1.6".into();
        let outcome = merge_vex(&base, &[update]).unwrap();
        assert_eq!(outcome.document.spec_version, "1.6");
        assert_eq!(outcome.stats.documents, 2);
        assert_eq!(outcome.stats.vulnerabilities, 1);
    }
}
