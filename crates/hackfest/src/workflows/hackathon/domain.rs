use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for competition events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Identifier wrapper for competing teams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub String);

/// Identifier wrapper for participants, evaluators, and gate staff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle stage of an event, derived from milestone dates except at the
/// frozen endpoints which only move by explicit admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    Draft,
    RegistrationOpen,
    ProposalSubmission,
    Shortlisting,
    ExecutionActive,
    Judging,
    Completed,
}

impl EventPhase {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Draft,
            Self::RegistrationOpen,
            Self::ProposalSubmission,
            Self::Shortlisting,
            Self::ExecutionActive,
            Self::Judging,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::RegistrationOpen => "Registration Open",
            Self::ProposalSubmission => "Proposal Submission",
            Self::Shortlisting => "Shortlisting",
            Self::ExecutionActive => "Execution Active",
            Self::Judging => "Judging",
            Self::Completed => "Completed",
        }
    }

    /// Frozen phases are never overwritten by the date comparator.
    pub const fn is_frozen(self) -> bool {
        matches!(self, Self::Draft | Self::Completed)
    }
}

/// Ordered milestone dates owned by the event organizer.
///
/// Comparisons against these dates happen at day granularity, so phase
/// transitions occur once per calendar day rather than mid-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSchedule {
    pub registration_deadline: NaiveDate,
    pub proposal_deadline: Option<NaiveDate>,
    pub execution_start: NaiveDate,
    pub execution_end: NaiveDate,
}

impl MilestoneSchedule {
    /// Milestones must be monotonically non-decreasing in calendar order,
    /// with the proposal deadline optional.
    pub fn is_ordered(&self) -> bool {
        let mut previous = self.registration_deadline;
        if let Some(proposal) = self.proposal_deadline {
            if proposal < previous {
                return false;
            }
            previous = proposal;
        }
        if self.execution_start < previous {
            return false;
        }
        self.execution_end >= self.execution_start
    }
}

/// A competition event. `phase` is the only derived mutable field; everything
/// else is edited by the organizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub schedule: MilestoneSchedule,
    pub phase: EventPhase,
    pub shortlist_target_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    Pending,
    Confirmed,
}

impl TeamStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
        }
    }
}

/// A registered team. Members are ordered; the first member is the leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub event_id: EventId,
    pub members: Vec<UserId>,
    pub status: TeamStatus,
}

impl Team {
    pub fn leader(&self) -> Option<&UserId> {
        self.members.first()
    }
}

/// Which evaluation round a score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRound {
    Screening,
    Judging,
}

impl ScoreRound {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Screening => "Screening",
            Self::Judging => "Judging",
        }
    }

    /// The event phase during which scores for this round are accepted.
    pub const fn required_phase(self) -> EventPhase {
        match self {
            Self::Screening => EventPhase::Shortlisting,
            Self::Judging => EventPhase::Judging,
        }
    }
}

/// One evaluator's rubric sheet for one team, unique per
/// (event, evaluator, subject, round).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub event_id: EventId,
    pub evaluator_id: UserId,
    pub subject_id: TeamId,
    pub round: ScoreRound,
    pub dimensions: [f64; 5],
    pub weights: [u32; 5],
    pub total: f64,
    pub locked: bool,
}

/// One row of a confirmed shortlist snapshot. Snapshots are replaced
/// wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub event_id: EventId,
    pub team_id: TeamId,
    pub rank: usize,
}

/// What a single-use credential admits its holder to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPurpose {
    Entry,
    Meal(String),
}

impl CredentialPurpose {
    pub fn as_token_tag(&self) -> String {
        match self {
            Self::Entry => "entry".to_string(),
            Self::Meal(kind) => format!("meal:{kind}"),
        }
    }

    /// Parse the wire form: `entry` or `meal:<kind>`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "entry" {
            return Some(Self::Entry);
        }
        let kind = raw.strip_prefix("meal:")?;
        if kind.is_empty() {
            return None;
        }
        Some(Self::Meal(kind.to_string()))
    }
}

impl fmt::Display for CredentialPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token_tag())
    }
}

/// A single-use QR token bound to (event, subject, purpose), where the
/// subject is the individual holder and `team_id` is the group whose
/// attendance an entry redemption counts toward. Once `used` is set the
/// record is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub event_id: EventId,
    pub subject_id: UserId,
    pub team_id: TeamId,
    pub purpose: CredentialPurpose,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<UserId>,
}

/// Per-team check-in tally, mutated only by entry-credential redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceAggregate {
    pub event_id: EventId,
    pub team_id: TeamId,
    pub total_members: usize,
    pub members_scanned: usize,
}

impl AttendanceAggregate {
    /// Derived: the whole team has checked in.
    pub const fn reported(&self) -> bool {
        self.members_scanned >= self.total_members
    }
}

/// A completion certificate allocated to one team for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub event_id: EventId,
    pub team_id: TeamId,
    pub certificate_id: String,
    pub sequence: usize,
    pub artifact_ref: String,
    pub issued_on: NaiveDate,
}
