use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use hackfest::workflows::hackathon::{
    AttendanceAggregate, CertificateRecord, CertificateRenderer, Credential, CredentialPurpose,
    Event, EventId, EventPhase, HackathonStore, Notification, NotificationSink, NotifyError,
    RenderError, ScoreRecord, ScoreRound, ShortlistEntry, StoreError, Team, TeamId, UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store used by the serve and demo commands. Every mutation
/// holds one mutex at a time, which gives the conditional primitives of
/// [`HackathonStore`] their required atomicity within this process.
#[derive(Default)]
pub(crate) struct InMemoryHackathonStore {
    events: Mutex<HashMap<EventId, Event>>,
    teams: Mutex<BTreeMap<(EventId, TeamId), Team>>,
    scores: Mutex<Vec<ScoreRecord>>,
    shortlists: Mutex<HashMap<EventId, Vec<ShortlistEntry>>>,
    credentials: Mutex<HashMap<String, Credential>>,
    attendance: Mutex<HashMap<(EventId, TeamId), AttendanceAggregate>>,
    certificates: Mutex<Vec<CertificateRecord>>,
}

impl HackathonStore for InMemoryHackathonStore {
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

/// Delivery stub: notifications land in the log and a replayable buffer.
#[derive(Default)]
pub(crate) struct LoggingNotificationSink {
    delivered: Mutex<Vec<(UserId, Notification)>>,
}

impl LoggingNotificationSink {
    pub(crate) fn delivered(&self) -> Vec<(UserId, Notification)> {
        self.delivered.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, user_id: &UserId, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(user = %user_id, kind = ?notification.kind, title = %notification.title, "notification dispatched");
        self.delivered
            .lock()
            .expect("sink mutex poisoned")
            .push((user_id.clone(), notification));
        Ok(())
    }
}

/// Renderer stub that maps certificates onto artifact paths without touching
/// a drawing backend.
pub(crate) struct PathCertificateRenderer;

impl CertificateRenderer for PathCertificateRenderer {
    fn render(
        &self,
        certificate_id: &str,
        _event_title: &str,
        team: &Team,
    ) -> Result<String, RenderError> {
        Ok(format!("artifacts/{}/{certificate_id}.pdf", team.id.0))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
