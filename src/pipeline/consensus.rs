//! Consensus aggregator - cross-references findings and scores agreement
//!
//! Each worker finding is broken into atomic claims; claims that describe
//! the same underlying event are clustered, and the cluster's confidence
//! tier follows from how many distinct roles corroborate it. The whole stage
//! is a pure function of the case record: no generation calls, deterministic
//! iteration order, identical output on repeated runs.
//!
//! Grouping is semantic-ish rather than exact-match: claims cluster when
//! they share concrete identifiers (hosts, addresses, processes, hour-level
//! time buckets) or share one identifier plus strongly overlapping wording.

use crate::types::{CaseRecord, ConfidenceTier, EvidenceExcerpt, Finding, ScoredFinding};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Counts surfaced with every aggregation, so eliminated findings are never
/// silently lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingTally {
    /// All clusters, before any elimination
    pub total: usize,
    /// High-tier clusters
    pub high: usize,
    /// Medium-tier clusters
    pub medium: usize,
    /// Low-tier clusters
    pub low: usize,
    /// Low-tier clusters removed for lacking any concrete identifier
    pub eliminated: usize,
}

/// Aggregation output: scored findings in presentation order plus the tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReport {
    /// Findings ordered High before Medium before Low, then by evidence
    /// specificity, then by originating slot
    pub findings: Vec<ScoredFinding>,
    /// Total and per-tier counts
    pub tally: FindingTally,
}

/// Kind of concrete identifier extracted from claim text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IdentKind {
    Timestamp,
    Host,
    Address,
    Process,
    Technique,
}

type Ident = (IdentKind, String);

#[derive(Debug, Clone)]
struct Claim {
    slot: usize,
    role: crate::roles::Role,
    text: String,
    idents: BTreeSet<Ident>,
    techniques: Vec<String>,
    tokens: BTreeSet<String>,
}

#[derive(Debug)]
struct Cluster {
    claims: Vec<Claim>,
    idents: BTreeSet<Ident>,
}

impl Cluster {
    fn seed(claim: Claim) -> Self {
        let idents = claim.idents.clone();
        Self {
            claims: vec![claim],
            idents,
        }
    }

    fn shared_idents(&self, claim: &Claim) -> usize {
        claim.idents.intersection(&self.idents).count()
    }

    /// A claim joins the cluster when it shares at least two identifiers
    /// with it, or one identifier plus strongly overlapping wording with
    /// some member claim.
    fn accepts(&self, claim: &Claim) -> bool {
        let shared = self.shared_idents(claim);
        if shared >= 2 {
            return true;
        }
        shared >= 1
            && self
                .claims
                .iter()
                .any(|member| token_jaccard(&member.tokens, &claim.tokens) >= 0.5)
    }

    fn add(&mut self, claim: Claim) {
        self.idents.extend(claim.idents.iter().cloned());
        self.claims.push(claim);
    }

    /// Concrete identifier count, the specificity measure. Technique ids are
    /// classification, not evidence.
    fn specificity(&self) -> usize {
        self.idents
            .iter()
            .filter(|(kind, _)| *kind != IdentKind::Technique)
            .count()
    }

    fn lead_slot(&self) -> usize {
        self.claims.iter().map(|c| c.slot).min().unwrap_or(usize::MAX)
    }
}

fn token_jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

struct Extractor {
    timestamp: Regex,
    ipv4: Regex,
    process: Regex,
    host: Regex,
    technique: Regex,
    command: Regex,
}

impl Extractor {
    fn new() -> Self {
        Self {
            timestamp: Regex::new(
                r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2})?(?:Z|[+-]\d{2}:?\d{2})?",
            )
            .expect("valid timestamp pattern"),
            ipv4: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("valid ipv4 pattern"),
            process: Regex::new(r"(?i)\b[\w.-]+\.(?:exe|dll|ps1|bat|vbs|sh|py)\b")
                .expect("valid process pattern"),
            host: Regex::new(r"\b[A-Z][A-Z0-9]*(?:-[A-Z0-9]+)+\b").expect("valid host pattern"),
            technique: Regex::new(r"\bT\d{4}(?:\.\d{3})?\b").expect("valid technique pattern"),
            command: Regex::new(r"`([^`\n]+)`").expect("valid command pattern"),
        }
    }

    fn identifiers(&self, text: &str) -> (BTreeSet<Ident>, Vec<String>) {
        let mut idents = BTreeSet::new();

        for m in self.timestamp.find_iter(text) {
            // Hour-level bucket, so claims about the same window match even
            // when the exact timestamps differ by minutes.
            let bucket: String = m.as_str().to_lowercase().chars().take(13).collect();
            idents.insert((IdentKind::Timestamp, bucket));
        }
        for m in self.ipv4.find_iter(text) {
            idents.insert((IdentKind::Address, m.as_str().to_string()));
        }
        for m in self.process.find_iter(text) {
            idents.insert((IdentKind::Process, m.as_str().to_lowercase()));
        }
        for m in self.host.find_iter(text) {
            idents.insert((IdentKind::Host, m.as_str().to_lowercase()));
        }

        let mut techniques = Vec::new();
        for m in self.technique.find_iter(text) {
            idents.insert((IdentKind::Technique, m.as_str().to_string()));
            if !techniques.contains(&m.as_str().to_string()) {
                techniques.push(m.as_str().to_string());
            }
        }

        (idents, techniques)
    }

    fn first_command(&self, text: &str) -> Option<String> {
        self.command
            .captures(text)
            .map(|caps| caps[1].trim().to_string())
    }
}

/// Section headers like `EVIDENCE:` or `ACTIONABLE COMMANDS:` carry no claim
fn is_section_header(line: &str) -> bool {
    let Some(body) = line.strip_suffix(':') else {
        return false;
    };
    !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || " &/()-".contains(c))
}

fn content_tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-' && c != '.')
        .map(str::to_lowercase)
        .filter(|t| t.len() >= 4)
        .collect()
}

fn extract_claims(finding: &Finding, extractor: &Extractor) -> Vec<Claim> {
    let mut claims = Vec::new();
    for line in finding.raw_text.lines() {
        let mut text = line.trim().trim_start_matches(['-', '*', '•']).trim();
        // Strip leading list numbering like "2. "
        if let Some(rest) = text
            .split_once(". ")
            .filter(|(n, _)| n.chars().all(|c| c.is_ascii_digit()) && !n.is_empty())
            .map(|(_, rest)| rest)
        {
            text = rest;
        }
        let text = text.trim();
        if text.len() < 12 || is_section_header(text) {
            continue;
        }
        let (idents, techniques) = extractor.identifiers(text);
        claims.push(Claim {
            slot: finding.slot,
            role: finding.source_role,
            text: text.to_string(),
            idents,
            techniques,
            tokens: content_tokens(text),
        });
    }
    claims
}

/// Consensus aggregator
///
/// `aggregate` is the only operation; see the module docs for the clustering
/// contract.
pub struct ConsensusAggregator {
    drop_weak_low: bool,
}

impl ConsensusAggregator {
    /// Create an aggregator that retains weak Low findings (the default)
    pub fn new() -> Self {
        Self {
            drop_weak_low: false,
        }
    }

    /// Configure elimination of Low-tier clusters lacking any concrete
    /// identifier. Eliminated clusters still appear in the tally.
    pub fn with_drop_weak_low(mut self, drop: bool) -> Self {
        self.drop_weak_low = drop;
        self
    }

    /// Cross-reference all findings in the case record and score agreement
    pub fn aggregate(&self, record: &CaseRecord) -> ConsensusReport {
        let extractor = Extractor::new();

        let mut clusters: Vec<Cluster> = Vec::new();
        for finding in record.findings() {
            if finding.is_sentinel() {
                tracing::debug!(slot = finding.slot, "skipping sentinel finding");
                continue;
            }
            for claim in extract_claims(finding, &extractor) {
                match clusters.iter_mut().find(|c| c.accepts(&claim)) {
                    Some(cluster) => cluster.add(claim),
                    None => clusters.push(Cluster::seed(claim)),
                }
            }
        }

        let mut scored: Vec<(ScoredFinding, usize, usize)> = Vec::new();
        let mut tally = FindingTally {
            total: clusters.len(),
            high: 0,
            medium: 0,
            low: 0,
            eliminated: 0,
        };

        for cluster in &clusters {
            let roles: BTreeSet<_> = cluster
                .claims
                .iter()
                .map(|c| c.role.canonical_name())
                .collect();
            let corroboration = roles.len();
            let tier = ConfidenceTier::from_corroboration(corroboration);
            match tier {
                ConfidenceTier::High => tally.high += 1,
                ConfidenceTier::Medium => tally.medium += 1,
                ConfidenceTier::Low => tally.low += 1,
            }

            let specificity = cluster.specificity();
            if self.drop_weak_low && tier == ConfidenceTier::Low && specificity == 0 {
                tally.eliminated += 1;
                continue;
            }

            // One excerpt per distinct role, in slot order (claims were
            // inserted in slot order).
            let mut seen_roles = BTreeSet::new();
            let supporting_evidence: Vec<EvidenceExcerpt> = cluster
                .claims
                .iter()
                .filter(|c| seen_roles.insert(c.role.canonical_name()))
                .map(|c| EvidenceExcerpt {
                    source_role: c.role,
                    excerpt: c.text.clone(),
                })
                .collect();

            let attack_technique = cluster
                .claims
                .iter()
                .flat_map(|c| c.techniques.iter())
                .next()
                .cloned();
            let recommended_action = cluster
                .claims
                .iter()
                .find_map(|c| extractor.first_command(&c.text));

            scored.push((
                ScoredFinding {
                    description: cluster.claims[0].text.clone(),
                    supporting_evidence,
                    corroboration_count: corroboration,
                    tier,
                    attack_technique,
                    recommended_action,
                },
                specificity,
                cluster.lead_slot(),
            ));
        }

        // High before Medium before Low, more specific evidence first inside
        // a tier, earliest slot breaking remaining ties.
        scored.sort_by_key(|(finding, specificity, lead_slot)| {
            (finding.tier, usize::MAX - specificity, *lead_slot)
        });

        ConsensusReport {
            findings: scored.into_iter().map(|(f, _, _)| f).collect(),
            tally,
        }
    }
}

impl Default for ConsensusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Plan;
    use crate::roles::Role;
    use crate::types::Finding;

    fn record(entries: Vec<(usize, Role, &str)>) -> CaseRecord {
        let plan = Plan {
            narrative: "test".to_string(),
            assignments: vec![],
        };
        let findings = entries
            .into_iter()
            .map(|(slot, role, text)| Finding::new(slot, role, text))
            .collect();
        CaseRecord::from_settled(plan, findings)
    }

    fn lateral_movement_record() -> CaseRecord {
        record(vec![
            (
                1,
                Role::LateralMovement,
                "SMB session from WS-01 to WS-02 at 2024-05-01T10:02:11Z",
            ),
            (
                2,
                Role::CredentialAccess,
                "Multiple failed logons for svc-backup from 10.0.0.9",
            ),
            (
                3,
                Role::Discovery,
                "Remote session WS-01 to WS-02 observed at 2024-05-01T10:05:40Z",
            ),
            (
                4,
                Role::Execution,
                "psexec.exe launched on WS-01 targeting WS-02 at 2024-05-01T10:07:02Z, technique T1021.002",
            ),
            (
                5,
                Role::DefenseEvasion,
                "Security event log cleared on DC-07 shortly afterwards",
            ),
        ])
    }

    #[test]
    fn test_corroborated_event_scores_high() {
        let report = ConsensusAggregator::new().aggregate(&lateral_movement_record());

        assert_eq!(report.tally.high, 1);
        assert_eq!(report.tally.total, 3);

        let top = &report.findings[0];
        assert_eq!(top.tier, ConfidenceTier::High);
        assert_eq!(top.corroboration_count, 3);
        assert_eq!(top.supporting_evidence.len(), 3);
        assert!(top.description.contains("WS-01"));
        assert_eq!(top.attack_technique.as_deref(), Some("T1021.002"));

        let low: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.tier == ConfidenceTier::Low)
            .collect();
        assert!(low.len() <= 2);
    }

    #[test]
    fn test_tiering_is_monotonic_in_corroboration() {
        let three = ConsensusAggregator::new().aggregate(&record(vec![
            (1, Role::Execution, "evil.exe ran on WS-09 at 2024-06-01T08:00:00Z"),
            (2, Role::Persistence, "WS-09 shows evil.exe in run key at 2024-06-01T08:01:00Z"),
            (3, Role::Discovery, "evil.exe enumerated shares from WS-09 at 2024-06-01T08:02:00Z"),
        ]));
        let two = ConsensusAggregator::new().aggregate(&record(vec![
            (1, Role::Execution, "evil.exe ran on WS-09 at 2024-06-01T08:00:00Z"),
            (2, Role::Persistence, "WS-09 shows evil.exe in run key at 2024-06-01T08:01:00Z"),
        ]));
        let one = ConsensusAggregator::new().aggregate(&record(vec![(
            1,
            Role::Execution,
            "evil.exe ran on WS-09 at 2024-06-01T08:00:00Z",
        )]));

        assert_eq!(three.findings[0].tier, ConfidenceTier::High);
        assert_eq!(two.findings[0].tier, ConfidenceTier::Medium);
        assert_eq!(one.findings[0].tier, ConfidenceTier::Low);
        assert!(three.findings[0].tier <= two.findings[0].tier);
        assert!(two.findings[0].tier <= one.findings[0].tier);
    }

    #[test]
    fn test_one_role_repeating_itself_stays_low() {
        let report = ConsensusAggregator::new().aggregate(&record(vec![(
            1,
            Role::Execution,
            "evil.exe ran on WS-09 at 2024-06-01T08:00:00Z\n\
             evil.exe observed again on WS-09 at 2024-06-01T08:10:00Z",
        )]));

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].corroboration_count, 1);
        assert_eq!(report.findings[0].tier, ConfidenceTier::Low);
        // Two claims, one role, one excerpt
        assert_eq!(report.findings[0].supporting_evidence.len(), 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let record = lateral_movement_record();
        let aggregator = ConsensusAggregator::new();
        let first = aggregator.aggregate(&record);
        let second = aggregator.aggregate(&record);
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_is_completion_order_independent() {
        let plan = Plan {
            narrative: "test".to_string(),
            assignments: vec![],
        };
        let entries = [
            (1, Role::LateralMovement, "SMB from WS-01 to WS-02 at 2024-05-01T10:02:11Z"),
            (2, Role::CredentialAccess, "failed logons from 10.0.0.9 for svc-backup"),
            (3, Role::Discovery, "session WS-01 to WS-02 seen 2024-05-01T10:05:40Z"),
        ];
        // Reversed arrival order still yields a slot-ordered record
        let reversed: Vec<Finding> = entries
            .iter()
            .rev()
            .map(|(slot, role, text)| Finding::new(*slot, *role, *text))
            .collect();
        let in_order: Vec<Finding> = entries
            .iter()
            .map(|(slot, role, text)| Finding::new(*slot, *role, *text))
            .collect();

        let record_a = CaseRecord::from_settled(plan.clone(), reversed);
        let record_b = CaseRecord::from_settled(plan, in_order);

        assert_eq!(record_a.findings().len(), record_b.findings().len());
        for (a, b) in record_a.findings().iter().zip(record_b.findings()) {
            assert_eq!(a.slot, b.slot);
            assert_eq!(a.raw_text, b.raw_text);
        }

        let aggregator = ConsensusAggregator::new();
        assert_eq!(aggregator.aggregate(&record_a), aggregator.aggregate(&record_b));
    }

    #[test]
    fn test_weak_low_findings_eliminated_but_tallied() {
        let entries = vec![
            (1, Role::Execution, "evil.exe ran on WS-09 at 2024-06-01T08:00:00Z"),
            (2, Role::Discovery, "something vaguely odd happened around noon somewhere"),
        ];

        let retained = ConsensusAggregator::new().aggregate(&record(entries.clone()));
        assert_eq!(retained.findings.len(), 2);
        assert_eq!(retained.tally.eliminated, 0);

        let dropped = ConsensusAggregator::new()
            .with_drop_weak_low(true)
            .aggregate(&record(entries));
        assert_eq!(dropped.findings.len(), 1);
        assert_eq!(dropped.tally.eliminated, 1);
        // The eliminated cluster still counts toward the totals
        assert_eq!(dropped.tally.total, 2);
        assert_eq!(dropped.tally.low, 2);
    }

    #[test]
    fn test_sentinel_findings_contribute_nothing() {
        let plan = Plan {
            narrative: "test".to_string(),
            assignments: vec![],
        };
        let findings = vec![
            Finding::new(1, Role::Execution, "evil.exe ran on WS-09 at 2024-06-01T08:00:00Z"),
            Finding::sentinel(2, Role::Persistence, "generation call failed"),
        ];
        let record = CaseRecord::from_settled(plan, findings);
        let report = ConsensusAggregator::new().aggregate(&record);

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].corroboration_count, 1);
    }

    #[test]
    fn test_recommended_action_extracted_from_backticks() {
        let report = ConsensusAggregator::new().aggregate(&record(vec![(
            1,
            Role::LateralMovement,
            "SMB session WS-01 to WS-02 at 2024-05-01T10:02:11Z, run `net session \\\\WS-02 /delete` to cut it",
        )]));
        assert_eq!(
            report.findings[0].recommended_action.as_deref(),
            Some("net session \\\\WS-02 /delete")
        );
    }

    #[test]
    fn test_specificity_orders_within_tier() {
        let report = ConsensusAggregator::new().aggregate(&record(vec![
            (1, Role::Execution, "a process acted strangely without details recorded"),
            (2, Role::Discovery, "nltest.exe queried DC-01 from WS-03 at 2024-06-02T09:00:00Z"),
        ]));

        // Both Low, but the identifier-rich finding leads
        assert_eq!(report.findings.len(), 2);
        assert!(report.findings[0].description.contains("nltest.exe"));
    }
}
