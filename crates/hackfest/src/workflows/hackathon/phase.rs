use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::warn;

use super::domain::{Event, EventPhase, MilestoneSchedule, TeamStatus};
use super::repository::{HackathonStore, Notification, NotificationKind, NotificationSink};

/// Map a calendar day onto the phase the milestone schedule calls for.
///
/// Pure function of its inputs so the transition ladder is testable without
/// a store. Never returns a frozen phase; callers skip frozen events before
/// asking. Once a shortlist snapshot exists, targets earlier than
/// `ExecutionActive` clamp to `ExecutionActive` so milestone edits cannot
/// rewind an event past its confirmed cohort.
pub fn target_phase(
    today: NaiveDate,
    schedule: &MilestoneSchedule,
    shortlist_confirmed: bool,
) -> EventPhase {
    let by_dates = if today < schedule.registration_deadline {
        EventPhase::RegistrationOpen
    } else if schedule
        .proposal_deadline
        .is_some_and(|deadline| today < deadline)
    {
        EventPhase::ProposalSubmission
    } else if today < schedule.execution_start {
        EventPhase::Shortlisting
    } else if today <= schedule.execution_end {
        EventPhase::ExecutionActive
    } else {
        EventPhase::Judging
    };

    if shortlist_confirmed && by_dates < EventPhase::ExecutionActive {
        EventPhase::ExecutionActive
    } else {
        by_dates
    }
}

/// Applies the date comparator to stored events and persists transitions.
///
/// `sync` is the sole mutator of `phase` and is safe to call on every read
/// path: it is a no-op when nothing changed, and a persistence failure
/// degrades to returning the stale event rather than faulting the read.
pub struct PhaseEngine<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> PhaseEngine<S, N>
where
    S: HackathonStore,
    N: NotificationSink,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Bring `event.phase` up to date for `today`, returning the persisted
    /// event. On the transition edge into `ProposalSubmission` every member
    /// of every confirmed team is notified exactly once; repeated calls in
    /// the same phase never re-fire the fan-out.
    pub fn sync(&self, event: Event, today: NaiveDate) -> Event {
        if event.phase.is_frozen() {
            return event;
        }

        let shortlist_confirmed = match self.store.shortlist_for_event(&event.id) {
            Ok(entries) => !entries.is_empty(),
            Err(err) => {
                warn!(event = %event.id, %err, "phase sync skipped: shortlist lookup failed");
                return event;
            }
        };

        let target = target_phase(today, &event.schedule, shortlist_confirmed);
        if target == event.phase {
            return event;
        }

        match self.store.update_phase(&event.id, event.phase, target) {
            Ok(updated) => {
                if target == EventPhase::ProposalSubmission {
                    self.announce_proposal_window(&updated);
                }
                updated
            }
            Err(err) => {
                // Staleness is preferred over a thrown fault on a read path.
                warn!(event = %event.id, %err, "phase transition not persisted");
                event
            }
        }
    }

    fn announce_proposal_window(&self, event: &Event) {
        let teams = match self.store.teams_for_event(&event.id) {
            Ok(teams) => teams,
            Err(err) => {
                warn!(event = %event.id, %err, "proposal window fan-out skipped");
                return;
            }
        };

        let notification = Notification {
            title: format!("{}: proposal submissions are open", event.title),
            message: "Your team can now submit its project proposal.".to_string(),
            kind: NotificationKind::PhaseChange,
            payload: json!({
                "event_id": event.id.0,
                "phase": EventPhase::ProposalSubmission,
            }),
        };

        for team in teams
            .iter()
            .filter(|team| team.status == TeamStatus::Confirmed)
        {
            for member in &team.members {
                if let Err(err) = self.notifier.notify(member, notification.clone()) {
                    warn!(user = %member, %err, "proposal window notification dropped");
                }
            }
        }
    }
}
