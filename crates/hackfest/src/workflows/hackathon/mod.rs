//! Hackathon lifecycle coordination: phase state machine, weighted scoring
//! and ranking, single-use credential redemption, and certificate ids.
//!
//! The three mechanisms with hard correctness requirements live here: the
//! date-driven phase machine (sole mutator of an event's `phase`), the
//! deterministic scoring/ranking pipeline shared by screening and judging,
//! and the at-most-once credential redemption ledger with its attendance
//! counter. Everything else (accounts, storage, delivery, rendering) sits
//! behind the traits in [`repository`].

pub mod certificates;
pub mod credentials;
pub mod domain;
pub mod phase;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AttendanceAggregate, CertificateRecord, Credential, CredentialPurpose, Event, EventId,
    EventPhase, MilestoneSchedule, ScoreRecord, ScoreRound, ShortlistEntry, Team, TeamId,
    TeamStatus, UserId,
};
pub use phase::{target_phase, PhaseEngine};
pub use ranking::{LeaderboardEntry, RankingSelector};
pub use repository::{
    AttendanceView, CertificateRenderer, EventView, HackathonStore, Notification,
    NotificationKind, NotificationSink, NotifyError, RedemptionReceipt, RenderError, StoreError,
};
pub use router::hackathon_router;
pub use scoring::{ScoreSubmission, ScoringEngine, ScoringError};
pub use service::{HackathonService, HackathonServiceError, NewEvent, NewTeam};
