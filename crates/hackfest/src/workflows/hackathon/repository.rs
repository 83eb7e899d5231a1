use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AttendanceAggregate, CertificateRecord, Credential, CredentialPurpose, Event, EventId,
    EventPhase, ScoreRecord, ScoreRound, ShortlistEntry, Team, TeamId, UserId,
};

/// Storage abstraction for the coordination workflow.
///
/// The contract deliberately exposes conditional and atomic primitives for
/// the three fields that need write-conflict protection: an event's `phase`
/// (conditional update), a credential's `used` flag (compare-and-set), and
/// the attendance counter (atomic increment). A naive read-then-write on any
/// of them loses updates under concurrent requests.
pub trait HackathonStore: Send + Sync {
    fn insert_event(&self, event: Event) -> Result<Event, StoreError>;
    fn fetch_event(&self, id: &EventId) -> Result<Option<Event>, StoreError>;

    /// Persist a phase transition only if the stored phase still equals
    /// `from`; returns [`StoreError::VersionConflict`] when another writer
    /// moved the phase first.
    fn update_phase(
        &self,
        id: &EventId,
        from: EventPhase,
        to: EventPhase,
    ) -> Result<Event, StoreError>;

    fn insert_team(&self, team: Team) -> Result<Team, StoreError>;
    fn fetch_team(&self, event_id: &EventId, team_id: &TeamId) -> Result<Option<Team>, StoreError>;
    fn update_team(&self, team: Team) -> Result<(), StoreError>;
    fn teams_for_event(&self, event_id: &EventId) -> Result<Vec<Team>, StoreError>;

    fn upsert_score(&self, record: ScoreRecord) -> Result<ScoreRecord, StoreError>;
    fn fetch_score(
        &self,
        event_id: &EventId,
        evaluator_id: &UserId,
        subject_id: &TeamId,
        round: ScoreRound,
    ) -> Result<Option<ScoreRecord>, StoreError>;
    /// Scores for one event and round, in insertion order. Leaderboard
    /// stability depends on this order being reproducible between calls.
    fn scores_for_event(
        &self,
        event_id: &EventId,
        round: ScoreRound,
    ) -> Result<Vec<ScoreRecord>, StoreError>;

    /// Replace the full shortlist snapshot for an event. Readers observe
    /// either the old set or the new set, never a mix.
    fn replace_shortlist(
        &self,
        event_id: &EventId,
        entries: Vec<ShortlistEntry>,
    ) -> Result<(), StoreError>;
    fn shortlist_for_event(&self, event_id: &EventId) -> Result<Vec<ShortlistEntry>, StoreError>;

    /// Insert a credential; fails with [`StoreError::Conflict`] when one
    /// already exists for the same (event, subject, purpose) binding or the
    /// same token.
    fn insert_credential(&self, credential: Credential) -> Result<Credential, StoreError>;
    fn credential_by_token(&self, token: &str) -> Result<Option<Credential>, StoreError>;
    fn credential_by_binding(
        &self,
        event_id: &EventId,
        subject_id: &UserId,
        purpose: &CredentialPurpose,
    ) -> Result<Option<Credential>, StoreError>;

    /// Compare-and-set: mark the credential used only if it is still unused
    /// at write time. Exactly one of any number of concurrent callers wins;
    /// the rest get [`StoreError::VersionConflict`].
    fn mark_credential_used(
        &self,
        token: &str,
        used_by: &UserId,
        used_at: DateTime<Utc>,
    ) -> Result<Credential, StoreError>;

    /// Atomically bump the team's scanned counter by one, initializing the
    /// aggregate from the team roster on first use.
    fn increment_attendance(
        &self,
        event_id: &EventId,
        team_id: &TeamId,
    ) -> Result<AttendanceAggregate, StoreError>;
    fn attendance_for_team(
        &self,
        event_id: &EventId,
        team_id: &TeamId,
    ) -> Result<Option<AttendanceAggregate>, StoreError>;

    fn insert_certificate(&self, record: CertificateRecord) -> Result<(), StoreError>;
    fn certificates_for_event(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<CertificateRecord>, StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("conditional write lost to a concurrent update")]
    VersionConflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification payload. Delivery transports (email, push) live
/// behind the sink; the workflow only shapes the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PhaseChange,
    ShortlistResult,
}

/// Fire-and-forget notification hook. Failures must never roll back the
/// domain operation that triggered the fan-out.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, user_id: &UserId, notification: Notification) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Turns a certificate's structured fields into an opaque artifact reference
/// (URL or path). The workflow never inspects the artifact itself.
pub trait CertificateRenderer: Send + Sync {
    fn render(
        &self,
        certificate_id: &str,
        event_title: &str,
        team: &Team,
    ) -> Result<String, RenderError>;
}

/// Certificate rendering error.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized event representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub event_id: EventId,
    pub title: String,
    pub phase: EventPhase,
    pub phase_label: &'static str,
    pub shortlist_target_count: usize,
}

impl EventView {
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_id: event.id.clone(),
            title: event.title.clone(),
            phase: event.phase,
            phase_label: event.phase.label(),
            shortlist_target_count: event.shortlist_target_count,
        }
    }
}

/// Redemption outcome returned to the gate scanner.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionReceipt {
    pub token: String,
    pub event_id: EventId,
    pub subject_id: UserId,
    pub team_id: TeamId,
    pub purpose: String,
    pub redeemed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceView>,
}

/// Attendance tally included in entry-redemption receipts.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    pub total_members: usize,
    pub members_scanned: usize,
    pub reported: bool,
}

impl AttendanceView {
    pub fn from_aggregate(aggregate: &AttendanceAggregate) -> Self {
        Self {
            total_members: aggregate.total_members,
            members_scanned: aggregate.members_scanned,
            reported: aggregate.reported(),
        }
    }
}
