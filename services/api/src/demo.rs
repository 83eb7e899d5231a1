use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

use crate::infra::{
    parse_date, InMemoryHackathonStore, LoggingNotificationSink, PathCertificateRenderer,
};
use hackfest::error::AppError;
use hackfest::workflows::hackathon::{
    CredentialPurpose, EventId, HackathonService, HackathonServiceError, MilestoneSchedule,
    NewEvent, NewTeam, ScoreRound, ScoreSubmission, TeamId, UserId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Anchor date for the demo calendar (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
}

type DemoService =
    HackathonService<InMemoryHackathonStore, LoggingNotificationSink, PathCertificateRenderer>;

/// Walk one event through its whole lifecycle on a compressed calendar,
/// printing each stage to stdout.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let anchor = args.start.unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(InMemoryHackathonStore::default());
    let notifier = Arc::new(LoggingNotificationSink::default());
    let service: DemoService =
        HackathonService::new(store, notifier.clone(), Arc::new(PathCertificateRenderer));

    let event_id = EventId("demo-hackfest".to_string());
    let schedule = MilestoneSchedule {
        registration_deadline: anchor + Duration::days(7),
        proposal_deadline: Some(anchor + Duration::days(14)),
        execution_start: anchor + Duration::days(21),
        execution_end: anchor + Duration::days(23),
    };

    println!("Hackfest coordination demo");
    println!("  anchor date: {anchor}");

    service.create_event(NewEvent {
        id: event_id.clone(),
        title: "Hackfest Demo Sprint".to_string(),
        schedule,
        shortlist_target_count: 2,
    })?;
    let event = service.open_registration(&event_id)?;
    println!("  event created, phase: {}", event.phase.label());

    for suffix in ["ember", "quartz", "willow"] {
        let team = service.register_team(
            &event_id,
            NewTeam {
                id: TeamId(format!("team-{suffix}")),
                members: (0..3).map(|i| UserId(format!("{suffix}-{i}"))).collect(),
            },
            anchor,
        )?;
        service.confirm_team(&event_id, &team.id)?;
        println!("  registered and confirmed {}", team.id);
    }

    let event = service.sync_event(&event_id, anchor + Duration::days(7))?;
    println!(
        "  day 7 sync, phase: {} ({} members notified)",
        event.phase.label(),
        notifier.delivered().len()
    );

    let screening_day = anchor + Duration::days(14);
    for (suffix, dimensions) in [
        ("ember", [9.0, 8.5, 9.0, 8.0, 9.5]),
        ("quartz", [6.0, 6.5, 7.0, 5.5, 6.0]),
        ("willow", [8.0, 8.0, 7.5, 8.5, 8.0]),
    ] {
        let record = service.submit_score(
            &event_id,
            ScoreSubmission {
                evaluator_id: UserId("judge-screening".to_string()),
                subject_id: TeamId(format!("team-{suffix}")),
                round: ScoreRound::Screening,
                dimensions,
                weights: [25, 25, 20, 15, 15],
                lock: true,
            },
            screening_day,
        )?;
        println!("  screening team-{suffix}: {:.2}", record.total);
    }

    let shortlist = service.confirm_shortlist(&event_id, screening_day)?;
    for entry in &shortlist {
        println!("  shortlisted #{} {}", entry.rank, entry.team_id);
    }

    let gate = UserId("gate-staff".to_string());
    let holder = UserId("ember-0".to_string());
    let credential = service.issue_credential(&event_id, &holder, CredentialPurpose::Entry)?;
    let receipt = service.redeem_credential(&credential.token, &CredentialPurpose::Entry, &gate)?;
    if let Some(attendance) = receipt.attendance {
        println!(
            "  {} checked in ({}/{} of {})",
            holder, attendance.members_scanned, attendance.total_members, receipt.team_id
        );
    }
    match service.redeem_credential(&credential.token, &CredentialPurpose::Entry, &gate) {
        Err(HackathonServiceError::DuplicateRedemption { used_by, .. }) => {
            println!(
                "  replayed token rejected (already used by {})",
                used_by.map(|user| user.0).unwrap_or_default()
            );
        }
        other => {
            other?;
        }
    }

    let judging_day = anchor + Duration::days(24);
    for (suffix, fill) in [("ember", 8.5), ("willow", 9.0)] {
        service.submit_score(
            &event_id,
            ScoreSubmission {
                evaluator_id: UserId("judge-final".to_string()),
                subject_id: TeamId(format!("team-{suffix}")),
                round: ScoreRound::Judging,
                dimensions: [fill; 5],
                weights: [25, 25, 20, 15, 15],
                lock: true,
            },
            judging_day,
        )?;
    }
    let board = service.leaderboard(&event_id, ScoreRound::Judging, judging_day)?;
    for entry in &board {
        println!(
            "  judging #{} {} {:.2} ({} sheet(s))",
            entry.rank, entry.team_id, entry.total, entry.score_count
        );
    }

    service.complete_event(&event_id, judging_day)?;
    let certificates = service.allocate_certificates(&event_id, judging_day)?;
    for record in &certificates {
        println!("  issued {} -> {}", record.certificate_id, record.artifact_ref);
    }

    println!("Demo complete.");
    Ok(())
}
