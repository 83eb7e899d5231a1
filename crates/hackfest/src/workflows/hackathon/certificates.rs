use chrono::{Datelike, NaiveDate};

use super::domain::{CertificateRecord, TeamId};

/// Longest acronym carried into a certificate id.
const ACRONYM_MAX: usize = 6;

/// Uppercase acronym of an event title: first letter of each word, capped at
/// six characters.
pub fn acronym(title: &str) -> String {
    title
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .filter(|ch| ch.is_alphanumeric())
        .take(ACRONYM_MAX)
        .flat_map(char::to_uppercase)
        .collect()
}

/// `CERT-{ACRONYM}{YEAR}-{NNN}` with a zero-padded 3-digit sequence.
pub fn format_certificate_id(title: &str, issued_on: NaiveDate, sequence: usize) -> String {
    format!(
        "CERT-{}{}-{:03}",
        acronym(title),
        issued_on.year(),
        sequence
    )
}

/// One planned allocation produced by [`plan_allocations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePlan {
    pub team_id: TeamId,
    pub certificate_id: String,
    pub sequence: usize,
}

/// Deterministic, idempotent allocation plan.
///
/// Subjects are visited in the fixed order given (shortlist rank order);
/// subjects already holding a certificate are skipped, and numbering
/// continues after the highest existing sequence. Re-running the plan never
/// reissues or renumbers existing certificates.
pub fn plan_allocations(
    title: &str,
    issued_on: NaiveDate,
    ordered_subjects: &[TeamId],
    existing: &[CertificateRecord],
) -> Vec<CertificatePlan> {
    let mut next_sequence = existing
        .iter()
        .map(|record| record.sequence)
        .max()
        .unwrap_or(0)
        + 1;

    let mut plans = Vec::new();
    for team_id in ordered_subjects {
        if existing.iter().any(|record| &record.team_id == team_id) {
            continue;
        }

        plans.push(CertificatePlan {
            team_id: team_id.clone(),
            certificate_id: format_certificate_id(title, issued_on, next_sequence),
            sequence: next_sequence,
        });
        next_sequence += 1;
    }

    plans
}
