//! Tolerant extraction of structured plans from free-text planning output
//!
//! Planning responses follow a `PLAN: ... WORKERS: 1. Role: task ...` shape,
//! but generated text drifts. The parser degrades gracefully: missing markers
//! yield an empty plan plus warnings rather than an error, and callers decide
//! whether that is fatal.

use crate::roles::{Role, DEFAULT_ROLE};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Task placeholder used for unfilled worker slots
pub const PLACEHOLDER_TASK: &str = "none";

/// A single {role, task} assignment inside a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Resolved specialist role
    pub role: Role,
    /// Free-text scope description for the worker
    pub task: String,
}

impl RoleAssignment {
    /// Neutral assignment for a slot the plan left unfilled
    pub fn placeholder() -> Self {
        Self {
            role: DEFAULT_ROLE,
            task: PLACEHOLDER_TASK.to_string(),
        }
    }
}

/// Structured plan: narrative plus ordered role assignments
///
/// Produced exactly once per run by the planning stage, read-only after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Narrative investigation plan
    pub narrative: String,
    /// Ordered assignments, at most one per worker slot
    pub assignments: Vec<RoleAssignment>,
}

impl Plan {
    /// Assignment for a 1-based slot, falling back to the neutral placeholder
    pub fn assignment(&self, slot: usize) -> RoleAssignment {
        self.assignments
            .get(slot.wrapping_sub(1))
            .cloned()
            .unwrap_or_else(RoleAssignment::placeholder)
    }
}

/// Partial-success result of plan parsing
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    /// The recovered plan, possibly empty
    pub plan: Plan,
    /// Non-fatal anomalies observed while parsing
    pub warnings: Vec<String>,
}

/// Strip decorative markdown characters from role and task text
fn strip_markup(text: &str) -> String {
    text.replace(['*', '`', '#'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract a structured plan from raw planning-stage output
///
/// The narrative is the text between the `PLAN:` and `WORKERS:` markers.
/// Assignments are recovered from numbered `N. Role: task` lines, where the
/// task runs until the next numbered line or end of input. At most
/// `expected_slots` assignments are kept; the executor pads any shortfall.
pub fn parse_plan(raw: &str, expected_slots: usize) -> ParsedPlan {
    let mut warnings = Vec::new();

    let plan_idx = raw.find("PLAN:");
    let workers_idx = raw.find("WORKERS:");

    let (narrative, workers_raw) = match (plan_idx, workers_idx) {
        (Some(p), Some(w)) if p < w => {
            let narrative = raw[p + "PLAN:".len()..w].trim().to_string();
            let workers = &raw[w + "WORKERS:".len()..];
            (narrative, Some(workers))
        }
        _ => {
            warnings.push("PLAN/WORKERS markers missing or out of order".to_string());
            (String::new(), None)
        }
    };

    let mut assignments = Vec::new();
    if let Some(workers_raw) = workers_raw {
        // The regex crate has no lookahead, so match assignment headers and
        // slice task text between consecutive headers.
        let header = Regex::new(r"(?m)^\s*(\d+)\.\s*([^:\n]+):").expect("valid assignment header pattern");
        let matches: Vec<_> = header.captures_iter(workers_raw).collect();

        for (i, caps) in matches.iter().enumerate() {
            let whole = caps.get(0).expect("capture group 0 always present");
            let task_end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(workers_raw.len());

            let label = strip_markup(&caps[2]);
            let task = strip_markup(&workers_raw[whole.end()..task_end]);
            let role = Role::resolve(&label);
            if role.canonical_name() != label {
                warnings.push(format!("role label '{}' resolved to '{}'", label, role));
            }
            assignments.push(RoleAssignment { role, task });
        }

        if assignments.is_empty() {
            warnings.push("WORKERS section contained no numbered assignments".to_string());
        }
    }

    if assignments.len() > expected_slots {
        warnings.push(format!(
            "plan assigned {} workers but only {} slots exist, truncating",
            assignments.len(),
            expected_slots
        ));
        assignments.truncate(expected_slots);
    }

    ParsedPlan {
        plan: Plan {
            narrative,
            assignments,
        },
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_round_trip() {
        let raw = "PLAN: Review authentication and movement events.\n\n\
                   WORKERS:\n\
                   1. Credential Access Specialist: inspect failed logons\n\
                   2. Lateral Movement Specialist: trace SMB sessions between hosts";
        let parsed = parse_plan(raw, 5);

        assert_eq!(parsed.plan.narrative, "Review authentication and movement events.");
        assert_eq!(parsed.plan.assignments.len(), 2);
        assert_eq!(parsed.plan.assignments[0].role, Role::CredentialAccess);
        assert_eq!(parsed.plan.assignments[0].task, "inspect failed logons");
        assert_eq!(parsed.plan.assignments[1].role, Role::LateralMovement);
        assert_eq!(
            parsed.plan.assignments[1].task,
            "trace SMB sessions between hosts"
        );
    }

    #[test]
    fn test_multiline_task_runs_to_next_numbered_line() {
        let raw = "PLAN: p\nWORKERS:\n\
                   1. Execution Specialist: look for powershell\nand encoded commands\n\
                   2. Persistence Specialist: scheduled tasks";
        let parsed = parse_plan(raw, 5);
        assert_eq!(
            parsed.plan.assignments[0].task,
            "look for powershell and encoded commands"
        );
        assert_eq!(parsed.plan.assignments[1].role, Role::Persistence);
    }

    #[test]
    fn test_markdown_decoration_is_stripped() {
        let raw = "PLAN: p\nWORKERS:\n1. **Discovery Specialist**: check `net group` usage";
        let parsed = parse_plan(raw, 5);
        assert_eq!(parsed.plan.assignments[0].role, Role::Discovery);
        assert_eq!(parsed.plan.assignments[0].task, "check net group usage");
    }

    #[test]
    fn test_missing_markers_degrade_gracefully() {
        let parsed = parse_plan("no structure at all", 5);
        assert!(parsed.plan.narrative.is_empty());
        assert!(parsed.plan.assignments.is_empty());
        assert!(!parsed.warnings.is_empty());
    }

    #[test]
    fn test_excess_assignments_are_truncated() {
        let raw = "PLAN: p\nWORKERS:\n\
                   1. Execution Specialist: a\n\
                   2. Persistence Specialist: b\n\
                   3. Discovery Specialist: c";
        let parsed = parse_plan(raw, 2);
        assert_eq!(parsed.plan.assignments.len(), 2);
        assert!(parsed.warnings.iter().any(|w| w.contains("truncating")));
    }

    #[test]
    fn test_unknown_role_falls_back_with_warning() {
        let raw = "PLAN: p\nWORKERS:\n1. Astrology Specialist: read the stars";
        let parsed = parse_plan(raw, 5);
        assert_eq!(parsed.plan.assignments[0].role, DEFAULT_ROLE);
        assert!(parsed.warnings.iter().any(|w| w.contains("Astrology")));
    }

    #[test]
    fn test_placeholder_for_unfilled_slot() {
        let raw = "PLAN: p\nWORKERS:\n1. Execution Specialist: a";
        let parsed = parse_plan(raw, 3);
        let third = parsed.plan.assignment(3);
        assert_eq!(third.role, DEFAULT_ROLE);
        assert_eq!(third.task, PLACEHOLDER_TASK);
    }
}
