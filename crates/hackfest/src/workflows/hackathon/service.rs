use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::certificates;
use super::credentials;
use super::domain::{
    CertificateRecord, Credential, CredentialPurpose, Event, EventId, EventPhase, MilestoneSchedule,
    ScoreRecord, ScoreRound, ShortlistEntry, Team, TeamId, TeamStatus, UserId,
};
use super::phase::PhaseEngine;
use super::ranking::{LeaderboardEntry, RankingSelector};
use super::repository::{
    AttendanceView, CertificateRenderer, HackathonStore, Notification, NotificationKind,
    NotificationSink, RedemptionReceipt, RenderError, StoreError,
};
use super::scoring::{ScoreSubmission, ScoringEngine, ScoringError};

/// Organizer payload for creating an event. The phase always starts at
/// `Draft` and only `open_registration` moves it from there.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub id: EventId,
    pub title: String,
    pub schedule: MilestoneSchedule,
    pub shortlist_target_count: usize,
}

/// Leader payload for registering a team. The first member is the leader.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub id: TeamId,
    pub members: Vec<UserId>,
}

/// Service composing the phase engine, scoring engine, ranking selector, and
/// credential ledger over the storage and notification traits.
pub struct HackathonService<S, N, C> {
    store: Arc<S>,
    notifier: Arc<N>,
    renderer: Arc<C>,
    phase: PhaseEngine<S, N>,
    scoring: ScoringEngine,
    ranking: RankingSelector,
}

impl<S, N, C> HackathonService<S, N, C>
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, renderer: Arc<C>) -> Self {
        let phase = PhaseEngine::new(store.clone(), notifier.clone());
        Self {
            store,
            notifier,
            renderer,
            phase,
            scoring: ScoringEngine::new(),
            ranking: RankingSelector::new(),
        }
    }

    /// Create an event in `Draft`. Milestones must be non-decreasing and the
    /// shortlist target positive.
    pub fn create_event(&self, new_event: NewEvent) -> Result<Event, HackathonServiceError> {
        if !new_event.schedule.is_ordered() {
            return Err(HackathonServiceError::MilestoneOrder);
        }
        if new_event.shortlist_target_count == 0 {
            return Err(HackathonServiceError::ShortlistTarget);
        }

        let event = Event {
            id: new_event.id,
            title: new_event.title,
            schedule: new_event.schedule,
            phase: EventPhase::Draft,
            shortlist_target_count: new_event.shortlist_target_count,
        };

        match self.store.insert_event(event) {
            Ok(stored) => Ok(stored),
            Err(StoreError::Conflict) => Err(HackathonServiceError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch an event with its phase brought current for `today`. This is the
    /// opportunistic sync invoked on every read path; it never fails on
    /// account of the sync itself.
    pub fn sync_event(
        &self,
        event_id: &EventId,
        today: NaiveDate,
    ) -> Result<Event, HackathonServiceError> {
        let event = self.fetch_event(event_id)?;
        Ok(self.phase.sync(event, today))
    }

    /// Explicit admin edge out of the frozen `Draft` phase.
    pub fn open_registration(&self, event_id: &EventId) -> Result<Event, HackathonServiceError> {
        let event = self.fetch_event(event_id)?;
        if event.phase != EventPhase::Draft {
            return Err(HackathonServiceError::Phase {
                required: EventPhase::Draft,
                actual: event.phase,
            });
        }
        self.transition(event_id, EventPhase::Draft, EventPhase::RegistrationOpen)
    }

    /// Explicit judge edge into the frozen `Completed` phase.
    pub fn complete_event(
        &self,
        event_id: &EventId,
        today: NaiveDate,
    ) -> Result<Event, HackathonServiceError> {
        let event = self.sync_event(event_id, today)?;
        if event.phase != EventPhase::Judging {
            return Err(HackathonServiceError::Phase {
                required: EventPhase::Judging,
                actual: event.phase,
            });
        }
        self.transition(event_id, EventPhase::Judging, EventPhase::Completed)
    }

    /// Register a team while registration is open. Teams start `Pending` and
    /// are confirmed by the organizer.
    pub fn register_team(
        &self,
        event_id: &EventId,
        new_team: NewTeam,
        today: NaiveDate,
    ) -> Result<Team, HackathonServiceError> {
        if new_team.members.is_empty() {
            return Err(HackathonServiceError::EmptyTeam);
        }

        let event = self.sync_event(event_id, today)?;
        if event.phase != EventPhase::RegistrationOpen {
            return Err(HackathonServiceError::Phase {
                required: EventPhase::RegistrationOpen,
                actual: event.phase,
            });
        }

        let team = Team {
            id: new_team.id,
            event_id: event.id,
            members: new_team.members,
            status: TeamStatus::Pending,
        };

        match self.store.insert_team(team) {
            Ok(stored) => Ok(stored),
            Err(StoreError::Conflict) => Err(HackathonServiceError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    /// Organizer confirmation of a pending team.
    pub fn confirm_team(
        &self,
        event_id: &EventId,
        team_id: &TeamId,
    ) -> Result<Team, HackathonServiceError> {
        let mut team = self
            .store
            .fetch_team(event_id, team_id)?
            .ok_or(HackathonServiceError::NotFound)?;
        team.status = TeamStatus::Confirmed;
        self.store.update_team(team.clone())?;
        Ok(team)
    }

    /// Upsert one evaluator's rubric sheet for one team. Screening sheets are
    /// accepted only during `Shortlisting`, judging sheets only during
    /// `Judging`; locked sheets reject re-scoring permanently.
    pub fn submit_score(
        &self,
        event_id: &EventId,
        submission: ScoreSubmission,
        today: NaiveDate,
    ) -> Result<ScoreRecord, HackathonServiceError> {
        let event = self.sync_event(event_id, today)?;
        let required = submission.round.required_phase();
        if event.phase != required {
            return Err(HackathonServiceError::Phase {
                required,
                actual: event.phase,
            });
        }

        self.store
            .fetch_team(event_id, &submission.subject_id)?
            .ok_or(HackathonServiceError::NotFound)?;

        let total = self.scoring.score(&submission.dimensions, &submission.weights)?;

        if let Some(existing) = self.store.fetch_score(
            event_id,
            &submission.evaluator_id,
            &submission.subject_id,
            submission.round,
        )? {
            if existing.locked {
                return Err(HackathonServiceError::Locked);
            }
        }

        let record = ScoreRecord {
            event_id: event.id,
            evaluator_id: submission.evaluator_id,
            subject_id: submission.subject_id,
            round: submission.round,
            dimensions: submission.dimensions,
            weights: submission.weights,
            total,
            locked: submission.lock,
        };

        Ok(self.store.upsert_score(record)?)
    }

    /// Ordered leaderboard for one round, phase kept current as a side
    /// effect of the read.
    pub fn leaderboard(
        &self,
        event_id: &EventId,
        round: ScoreRound,
        today: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, HackathonServiceError> {
        self.sync_event(event_id, today)?;
        let records = self.store.scores_for_event(event_id, round)?;
        let entries = match round {
            ScoreRound::Screening => self.ranking.screening_leaderboard(&records),
            ScoreRound::Judging => self.ranking.judging_leaderboard(&records),
        };
        Ok(entries)
    }

    /// Confirm the screening cut: snapshot the top N teams, advance the
    /// event into `ExecutionActive`, and notify every member of every scored
    /// team of the outcome.
    pub fn confirm_shortlist(
        &self,
        event_id: &EventId,
        today: NaiveDate,
    ) -> Result<Vec<ShortlistEntry>, HackathonServiceError> {
        let event = self.sync_event(event_id, today)?;
        if event.phase != EventPhase::Shortlisting {
            return Err(HackathonServiceError::Phase {
                required: EventPhase::Shortlisting,
                actual: event.phase,
            });
        }

        let records = self
            .store
            .scores_for_event(event_id, ScoreRound::Screening)?;
        if records.is_empty() {
            return Err(HackathonServiceError::NoScores);
        }

        let leaderboard = self.ranking.screening_leaderboard(&records);
        let entries =
            self.ranking
                .select_top(event_id, &leaderboard, event.shortlist_target_count);

        self.store.replace_shortlist(event_id, entries.clone())?;

        let event = self.transition(
            event_id,
            EventPhase::Shortlisting,
            EventPhase::ExecutionActive,
        )?;

        self.announce_shortlist(&event, &leaderboard, &entries);

        Ok(entries)
    }

    /// Mint a single-use credential for one (event, subject, purpose)
    /// binding. The subject is an individual member; the owning team is
    /// resolved from the roster so entry redemptions know whose attendance
    /// to count. A second issue request for the same binding conflicts
    /// rather than producing two live tokens.
    pub fn issue_credential(
        &self,
        event_id: &EventId,
        subject_id: &UserId,
        purpose: CredentialPurpose,
    ) -> Result<Credential, HackathonServiceError> {
        self.fetch_event(event_id)?;

        let teams = self.store.teams_for_event(event_id)?;
        let team = teams
            .into_iter()
            .find(|team| team.members.contains(subject_id))
            .ok_or(HackathonServiceError::NotFound)?;

        if self
            .store
            .credential_by_binding(event_id, subject_id, &purpose)?
            .is_some()
        {
            return Err(HackathonServiceError::AlreadyIssued);
        }

        let credential = Credential {
            token: credentials::mint_token(event_id, subject_id, &purpose),
            event_id: event_id.clone(),
            subject_id: subject_id.clone(),
            team_id: team.id,
            purpose,
            used: false,
            used_at: None,
            used_by: None,
        };

        match self.store.insert_credential(credential) {
            Ok(stored) => Ok(stored),
            // Lost the issuance race; the binding already holds a token.
            Err(StoreError::Conflict) => Err(HackathonServiceError::AlreadyIssued),
            Err(err) => Err(err.into()),
        }
    }

    /// Redeem a credential at most once. Concurrent attempts on one token
    /// resolve so that exactly one caller wins; all others observe the
    /// duplicate path with the winning redemption's metadata. Entry
    /// redemptions additionally bump the team's attendance counter by
    /// exactly one.
    pub fn redeem_credential(
        &self,
        token: &str,
        purpose: &CredentialPurpose,
        redeemer_id: &UserId,
    ) -> Result<RedemptionReceipt, HackathonServiceError> {
        let credential = self
            .store
            .credential_by_token(token)?
            .ok_or(HackathonServiceError::InvalidCredential)?;

        if &credential.purpose != purpose {
            return Err(HackathonServiceError::InvalidCredential);
        }

        if credential.used {
            return Err(HackathonServiceError::DuplicateRedemption {
                used_by: credential.used_by,
                used_at: credential.used_at,
            });
        }

        let now = Utc::now();
        let redeemed = match self.store.mark_credential_used(token, redeemer_id, now) {
            Ok(credential) => credential,
            Err(StoreError::VersionConflict) => {
                // Lost the compare-and-set race; report who actually won.
                let winner = self
                    .store
                    .credential_by_token(token)?
                    .ok_or(HackathonServiceError::InvalidCredential)?;
                return Err(HackathonServiceError::DuplicateRedemption {
                    used_by: winner.used_by,
                    used_at: winner.used_at,
                });
            }
            Err(StoreError::NotFound) => return Err(HackathonServiceError::InvalidCredential),
            Err(err) => return Err(err.into()),
        };

        let attendance = match &redeemed.purpose {
            CredentialPurpose::Entry => {
                let aggregate = self
                    .store
                    .increment_attendance(&redeemed.event_id, &redeemed.team_id)?;
                Some(AttendanceView::from_aggregate(&aggregate))
            }
            CredentialPurpose::Meal(_) => None,
        };

        Ok(RedemptionReceipt {
            token: redeemed.token,
            event_id: redeemed.event_id,
            subject_id: redeemed.subject_id,
            team_id: redeemed.team_id,
            purpose: redeemed.purpose.as_token_tag(),
            redeemed_at: now,
            attendance,
        })
    }

    /// Allocate completion certificates for the shortlisted teams of a
    /// completed event. Idempotent: reruns only fill in missing subjects and
    /// continue the existing sequence.
    pub fn allocate_certificates(
        &self,
        event_id: &EventId,
        issued_on: NaiveDate,
    ) -> Result<Vec<CertificateRecord>, HackathonServiceError> {
        let event = self.fetch_event(event_id)?;
        if event.phase != EventPhase::Completed {
            return Err(HackathonServiceError::Phase {
                required: EventPhase::Completed,
                actual: event.phase,
            });
        }

        let mut shortlist = self.store.shortlist_for_event(event_id)?;
        shortlist.sort_by(|a, b| a.rank.cmp(&b.rank));
        let subjects: Vec<TeamId> = shortlist.into_iter().map(|entry| entry.team_id).collect();

        let existing = self.store.certificates_for_event(event_id)?;
        let plans = certificates::plan_allocations(&event.title, issued_on, &subjects, &existing);

        let mut issued = Vec::with_capacity(plans.len());
        for plan in plans {
            let team = self
                .store
                .fetch_team(event_id, &plan.team_id)?
                .ok_or(HackathonServiceError::NotFound)?;

            let artifact_ref =
                self.renderer
                    .render(&plan.certificate_id, &event.title, &team)?;

            let record = CertificateRecord {
                event_id: event_id.clone(),
                team_id: plan.team_id,
                certificate_id: plan.certificate_id,
                sequence: plan.sequence,
                artifact_ref,
                issued_on,
            };

            self.store.insert_certificate(record.clone())?;
            issued.push(record);
        }

        Ok(issued)
    }

    fn fetch_event(&self, event_id: &EventId) -> Result<Event, HackathonServiceError> {
        self.store
            .fetch_event(event_id)?
            .ok_or(HackathonServiceError::NotFound)
    }

    fn transition(
        &self,
        event_id: &EventId,
        from: EventPhase,
        to: EventPhase,
    ) -> Result<Event, HackathonServiceError> {
        match self.store.update_phase(event_id, from, to) {
            Ok(event) => Ok(event),
            Err(StoreError::VersionConflict) => Err(HackathonServiceError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    fn announce_shortlist(
        &self,
        event: &Event,
        leaderboard: &[LeaderboardEntry],
        entries: &[ShortlistEntry],
    ) {
        let teams = match self.store.teams_for_event(&event.id) {
            Ok(teams) => teams,
            Err(err) => {
                warn!(event = %event.id, %err, "shortlist fan-out skipped");
                return;
            }
        };

        // Every scored team hears back, not only the winners.
        for row in leaderboard {
            let shortlisted = entries.iter().any(|entry| entry.team_id == row.team_id);
            let Some(team) = teams.iter().find(|team| team.id == row.team_id) else {
                continue;
            };

            let notification = Notification {
                title: format!("{}: shortlist decision", event.title),
                message: if shortlisted {
                    "Congratulations, your team is shortlisted for the execution round.".to_string()
                } else {
                    "Your team was not shortlisted this time.".to_string()
                },
                kind: NotificationKind::ShortlistResult,
                payload: json!({
                    "event_id": event.id.0,
                    "team_id": row.team_id.0,
                    "shortlisted": shortlisted,
                }),
            };

            for member in &team.members {
                if let Err(err) = self.notifier.notify(member, notification.clone()) {
                    warn!(user = %member, %err, "shortlist notification dropped");
                }
            }
        }
    }
}

/// Error raised by the coordination service.
#[derive(Debug, thiserror::Error)]
pub enum HackathonServiceError {
    #[error(transparent)]
    Validation(#[from] ScoringError),
    #[error("milestone dates must be monotonically non-decreasing")]
    MilestoneOrder,
    #[error("shortlist target count must be a positive integer")]
    ShortlistTarget,
    #[error("a team needs at least one member")]
    EmptyTeam,
    #[error("operation requires phase '{}', event is in '{}'", required.label(), actual.label())]
    Phase {
        required: EventPhase,
        actual: EventPhase,
    },
    #[error("score sheet is locked and can no longer be changed")]
    Locked,
    #[error("no screening scores recorded for this event")]
    NoScores,
    #[error("a credential already exists for this subject and purpose")]
    AlreadyIssued,
    #[error("credential not recognized")]
    InvalidCredential,
    #[error("credential was already redeemed")]
    DuplicateRedemption {
        used_by: Option<UserId>,
        used_at: Option<DateTime<Utc>>,
    },
    #[error("lost a concurrent update race; retry the operation")]
    Conflict,
    #[error("referenced entity not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<StoreError> for HackathonServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            StoreError::VersionConflict => Self::Conflict,
            other => Self::Store(other),
        }
    }
}
