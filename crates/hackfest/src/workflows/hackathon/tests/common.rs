use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::hackathon::domain::{
    AttendanceAggregate, CertificateRecord, Credential, CredentialPurpose, Event, EventId,
    EventPhase, MilestoneSchedule, ScoreRecord, ScoreRound, ShortlistEntry, Team, TeamId,
    TeamStatus, UserId,
};
use crate::workflows::hackathon::repository::{
    CertificateRenderer, HackathonStore, Notification, NotificationSink, NotifyError, RenderError,
    StoreError,
};
use crate::workflows::hackathon::service::{HackathonService, NewEvent, NewTeam};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn schedule() -> MilestoneSchedule {
    MilestoneSchedule {
        registration_deadline: date(2026, 3, 1),
        proposal_deadline: Some(date(2026, 3, 8)),
        execution_start: date(2026, 3, 20),
        execution_end: date(2026, 3, 22),
    }
}

pub(super) fn new_event() -> NewEvent {
    NewEvent {
        id: EventId("ev-1".to_string()),
        title: "Great Plains Build Night".to_string(),
        schedule: schedule(),
        shortlist_target_count: 3,
    }
}

pub(super) fn event_id() -> EventId {
    EventId("ev-1".to_string())
}

pub(super) fn team(suffix: &str, member_count: usize) -> NewTeam {
    NewTeam {
        id: TeamId(format!("team-{suffix}")),
        members: (0..member_count)
            .map(|index| UserId(format!("user-{suffix}-{index}")))
            .collect(),
    }
}

pub(super) fn even_weights() -> [u32; 5] {
    [20, 20, 20, 20, 20]
}

pub(super) type TestService = HackathonService<MemoryStore, MemorySink, StubRenderer>;

pub(super) fn build_service() -> (TestService, Arc<MemoryStore>, Arc<MemorySink>) {
    let store = Arc::new(MemoryStore::default());
    let sink = Arc::new(MemorySink::default());
    let renderer = Arc::new(StubRenderer);
    let service = HackathonService::new(store.clone(), sink.clone(), renderer);
    (service, store, sink)
}

/// Seed an event with `teams` confirmed teams and move it to `phase`,
/// bypassing the date ladder so tests can start mid-lifecycle.
pub(super) fn seeded_service(
    phase: EventPhase,
    teams: &[(&str, usize)],
) -> (TestService, Arc<MemoryStore>, Arc<MemorySink>) {
    let (service, store, sink) = build_service();
    let created = service.create_event(new_event()).expect("event created");

    for (suffix, member_count) in teams {
        let team = team(suffix, *member_count);
        store
            .insert_team(Team {
                id: team.id,
                event_id: created.id.clone(),
                members: team.members,
                status: TeamStatus::Confirmed,
            })
            .expect("team seeded");
    }

    store.force_phase(&created.id, phase);
    (service, store, sink)
}

#[derive(Default)]
pub(super) struct MemoryStore {
    events: Mutex<HashMap<EventId, Event>>,
    teams: Mutex<BTreeMap<(EventId, TeamId), Team>>,
    scores: Mutex<Vec<ScoreRecord>>,
    shortlists: Mutex<HashMap<EventId, Vec<ShortlistEntry>>>,
    credentials: Mutex<HashMap<String, Credential>>,
    attendance: Mutex<HashMap<(EventId, TeamId), AttendanceAggregate>>,
    certificates: Mutex<Vec<CertificateRecord>>,
    /// When set, `update_phase` pretends the store is down.
    pub(super) fail_phase_updates: Mutex<bool>,
}

impl MemoryStore {
    pub(super) fn force_phase(&self, event_id: &EventId, phase: EventPhase) {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        if let Some(event) = guard.get_mut(event_id) {
            event.phase = phase;
        }
    }

    pub(super) fn set_phase_update_failure(&self, fail: bool) {
        *self
            .fail_phase_updates
            .lock()
            .expect("flag mutex poisoned") = fail;
    }

    pub(super) fn stored_scores(&self, round: ScoreRound) -> Vec<ScoreRecord> {
        self.scores
            .lock()
            .expect("score mutex poisoned")
            .iter()
            .filter(|record| record.round == round)
            .cloned()
            .collect()
    }
}

impl HackathonStore for MemoryStore {
    fn insert_event(&self, event: Event) -> Result<Event, StoreError> {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        if guard.contains_key(&event.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<Event>, StoreError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_phase(
        &self,
        id: &EventId,
        from: EventPhase,
        to: EventPhase,
    ) -> Result<Event, StoreError> {
        if *self
            .fail_phase_updates
            .lock()
            .expect("flag mutex poisoned")
        {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }

        let mut guard = self.events.lock().expect("event mutex poisoned");
        let event = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if event.phase != from {
            return Err(StoreError::VersionConflict);
        }
        event.phase = to;
        Ok(event.clone())
    }

    fn insert_team(&self, team: Team) -> Result<Team, StoreError> {
        let mut guard = self.teams.lock().expect("team mutex poisoned");
        let key = (team.event_id.clone(), team.id.clone());
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(key, team.clone());
        Ok(team)
    }

    fn fetch_team(&self, event_id: &EventId, team_id: &TeamId) -> Result<Option<Team>, StoreError> {
        let guard = self.teams.lock().expect("team mutex poisoned");
        Ok(guard.get(&(event_id.clone(), team_id.clone())).cloned())
    }

    fn update_team(&self, team: Team) -> Result<(), StoreError> {
        let mut guard = self.teams.lock().expect("team mutex poisoned");
        let key = (team.event_id.clone(), team.id.clone());
        if !guard.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        guard.insert(key, team);
        Ok(())
    }

    fn teams_for_event(&self, event_id: &EventId) -> Result<Vec<Team>, StoreError> {
        let guard = self.teams.lock().expect("team mutex poisoned");
        Ok(guard
            .values()
            .filter(|team| &team.event_id == event_id)
            .cloned()
            .collect())
    }

    fn upsert_score(&self, record: ScoreRecord) -> Result<ScoreRecord, StoreError> {
        let mut guard = self.scores.lock().expect("score mutex poisoned");
        match guard.iter_mut().find(|existing| {
            existing.event_id == record.event_id
                && existing.evaluator_id == record.evaluator_id
                && existing.subject_id == record.subject_id
                && existing.round == record.round
        }) {
            Some(existing) => *existing = record.clone(),
            None => guard.push(record.clone()),
        }
        Ok(record)
    }

    fn fetch_score(
        &self,
        event_id: &EventId,
        evaluator_id: &UserId,
        subject_id: &TeamId,
        round: ScoreRound,
    ) -> Result<Option<ScoreRecord>, StoreError> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| {
                &record.event_id == event_id
                    && &record.evaluator_id == evaluator_id
                    && &record.subject_id == subject_id
                    && record.round == round
            })
            .cloned())
    }

    fn scores_for_event(
        &self,
        event_id: &EventId,
        round: ScoreRound,
    ) -> Result<Vec<ScoreRecord>, StoreError> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.event_id == event_id && record.round == round)
            .cloned()
            .collect())
    }

    fn replace_shortlist(
        &self,
        event_id: &EventId,
        entries: Vec<ShortlistEntry>,
    ) -> Result<(), StoreError> {
        let mut guard = self.shortlists.lock().expect("shortlist mutex poisoned");
        guard.insert(event_id.clone(), entries);
        Ok(())
    }

    fn shortlist_for_event(&self, event_id: &EventId) -> Result<Vec<ShortlistEntry>, StoreError> {
        let guard = self.shortlists.lock().expect("shortlist mutex poisoned");
        Ok(guard.get(event_id).cloned().unwrap_or_default())
    }

    fn insert_credential(&self, credential: Credential) -> Result<Credential, StoreError> {
        let mut guard = self.credentials.lock().expect("credential mutex poisoned");
        let duplicate_binding = guard.values().any(|existing| {
            existing.event_id == credential.event_id
                && existing.subject_id == credential.subject_id
                && existing.purpose == credential.purpose
        });
        if duplicate_binding || guard.contains_key(&credential.token) {
            return Err(StoreError::Conflict);
        }
        guard.insert(credential.token.clone(), credential.clone());
        Ok(credential)
    }

    fn credential_by_token(&self, token: &str) -> Result<Option<Credential>, StoreError> {
        let guard = self.credentials.lock().expect("credential mutex poisoned");
        Ok(guard.get(token).cloned())
    }

    fn credential_by_binding(
        &self,
        event_id: &EventId,
        subject_id: &UserId,
        purpose: &CredentialPurpose,
    ) -> Result<Option<Credential>, StoreError> {
        let guard = self.credentials.lock().expect("credential mutex poisoned");
        Ok(guard
            .values()
            .find(|credential| {
                &credential.event_id == event_id
                    && &credential.subject_id == subject_id
                    && &credential.purpose == purpose
            })
            .cloned())
    }

    fn mark_credential_used(
        &self,
        token: &str,
        used_by: &UserId,
        used_at: DateTime<Utc>,
    ) -> Result<Credential, StoreError> {
        let mut guard = self.credentials.lock().expect("credential mutex poisoned");
        let credential = guard.get_mut(token).ok_or(StoreError::NotFound)?;
        if credential.used {
            return Err(StoreError::VersionConflict);
        }
        credential.used = true;
        credential.used_at = Some(used_at);
        credential.used_by = Some(used_by.clone());
        Ok(credential.clone())
    }

    fn increment_attendance(
        &self,
        event_id: &EventId,
        team_id: &TeamId,
    ) -> Result<AttendanceAggregate, StoreError> {
        let total_members = {
            let teams = self.teams.lock().expect("team mutex poisoned");
            teams
                .get(&(event_id.clone(), team_id.clone()))
                .ok_or(StoreError::NotFound)?
                .members
                .len()
        };

        let mut guard = self.attendance.lock().expect("attendance mutex poisoned");
        let aggregate = guard
            .entry((event_id.clone(), team_id.clone()))
            .or_insert_with(|| AttendanceAggregate {
                event_id: event_id.clone(),
                team_id: team_id.clone(),
                total_members,
                members_scanned: 0,
            });
        aggregate.members_scanned += 1;
        Ok(aggregate.clone())
    }

    fn attendance_for_team(
        &self,
        event_id: &EventId,
        team_id: &TeamId,
    ) -> Result<Option<AttendanceAggregate>, StoreError> {
        let guard = self.attendance.lock().expect("attendance mutex poisoned");
        Ok(guard.get(&(event_id.clone(), team_id.clone())).cloned())
    }

    fn insert_certificate(&self, record: CertificateRecord) -> Result<(), StoreError> {
        let mut guard = self.certificates.lock().expect("certificate mutex poisoned");
        if guard.iter().any(|existing| {
            existing.event_id == record.event_id && existing.team_id == record.team_id
        }) {
            return Err(StoreError::Conflict);
        }
        guard.push(record);
        Ok(())
    }

    fn certificates_for_event(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<CertificateRecord>, StoreError> {
        let guard = self.certificates.lock().expect("certificate mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    events: Mutex<Vec<(UserId, Notification)>>,
}

impl MemorySink {
    pub(super) fn delivered(&self) -> Vec<(UserId, Notification)> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, user_id: &UserId, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("sink mutex poisoned")
            .push((user_id.clone(), notification));
        Ok(())
    }
}

pub(super) struct StubRenderer;

impl CertificateRenderer for StubRenderer {
    fn render(
        &self,
        certificate_id: &str,
        _event_title: &str,
        team: &Team,
    ) -> Result<String, RenderError> {
        Ok(format!("artifacts/{}/{certificate_id}.png", team.id.0))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
