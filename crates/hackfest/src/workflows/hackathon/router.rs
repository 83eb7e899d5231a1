use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CredentialPurpose, EventId, ScoreRound, TeamId, UserId};
use super::repository::{CertificateRenderer, EventView, HackathonStore, NotificationSink};
use super::scoring::ScoreSubmission;
use super::service::{HackathonService, HackathonServiceError, NewEvent, NewTeam};

/// Router builder exposing the coordination endpoints.
pub fn hackathon_router<S, N, C>(service: Arc<HackathonService<S, N, C>>) -> Router
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    Router::new()
        .route("/api/v1/events", post(create_event_handler::<S, N, C>))
        .route(
            "/api/v1/events/:event_id/sync",
            post(sync_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/open",
            post(open_registration_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/complete",
            post(complete_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/teams",
            post(register_team_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/teams/:team_id/confirm",
            post(confirm_team_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/scores",
            post(submit_score_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/leaderboard/:round",
            get(leaderboard_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/shortlist",
            post(confirm_shortlist_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/credentials",
            post(issue_credential_handler::<S, N, C>),
        )
        .route(
            "/api/v1/credentials/redeem",
            post(redeem_handler::<S, N, C>),
        )
        .route(
            "/api/v1/events/:event_id/certificates",
            post(allocate_certificates_handler::<S, N, C>),
        )
        .with_state(service)
}

/// Optional date override used by scheduling-sensitive endpoints so demos
/// and tests can pin the calendar; production callers send `{}` or no body
/// at all.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DayRequest {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

impl DayRequest {
    fn resolve(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    #[serde(flatten)]
    pub(crate) submission: ScoreSubmission,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterTeamRequest {
    #[serde(flatten)]
    pub(crate) team: NewTeam,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueCredentialRequest {
    pub(crate) subject_id: UserId,
    /// Wire form: `entry` or `meal:<kind>`.
    pub(crate) purpose: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RedeemRequest {
    pub(crate) token: String,
    pub(crate) purpose: String,
    pub(crate) redeemer_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AllocateCertificatesRequest {
    #[serde(default)]
    pub(crate) issued_on: Option<NaiveDate>,
}

pub(crate) async fn create_event_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Json(new_event): Json<NewEvent>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    match service.create_event(new_event) {
        Ok(event) => (StatusCode::CREATED, Json(EventView::from_event(&event))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn sync_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    body: Option<Json<DayRequest>>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let request = body.map(|Json(request)| request).unwrap_or_default();
    match service.sync_event(&EventId(event_id), request.resolve()) {
        Ok(event) => (StatusCode::OK, Json(EventView::from_event(&event))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn open_registration_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    match service.open_registration(&EventId(event_id)) {
        Ok(event) => (StatusCode::OK, Json(EventView::from_event(&event))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn complete_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    body: Option<Json<DayRequest>>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let request = body.map(|Json(request)| request).unwrap_or_default();
    match service.complete_event(&EventId(event_id), request.resolve()) {
        Ok(event) => (StatusCode::OK, Json(EventView::from_event(&event))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_team_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    Json(request): Json<RegisterTeamRequest>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let today = request
        .today
        .unwrap_or_else(|| Local::now().date_naive());
    match service.register_team(&EventId(event_id), request.team, today) {
        Ok(team) => (StatusCode::CREATED, Json(team)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_team_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path((event_id, team_id)): Path<(String, String)>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    match service.confirm_team(&EventId(event_id), &TeamId(team_id)) {
        Ok(team) => (StatusCode::OK, Json(team)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_score_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let today = request
        .today
        .unwrap_or_else(|| Local::now().date_naive());
    match service.submit_score(&EventId(event_id), request.submission, today) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn leaderboard_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path((event_id, round)): Path<(String, String)>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let round = match round.as_str() {
        "screening" => ScoreRound::Screening,
        "judging" => ScoreRound::Judging,
        other => {
            let payload = json!({ "error": format!("unknown round '{other}'") });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    let today = Local::now().date_naive();
    match service.leaderboard(&EventId(event_id), round, today) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_shortlist_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    body: Option<Json<DayRequest>>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let request = body.map(|Json(request)| request).unwrap_or_default();
    match service.confirm_shortlist(&EventId(event_id), request.resolve()) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn issue_credential_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    Json(request): Json<IssueCredentialRequest>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let Some(purpose) = CredentialPurpose::parse(&request.purpose) else {
        let payload = json!({ "error": format!("unknown purpose '{}'", request.purpose) });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    };

    match service.issue_credential(&EventId(event_id), &request.subject_id, purpose) {
        Ok(credential) => (StatusCode::CREATED, Json(credential)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn redeem_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Json(request): Json<RedeemRequest>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let Some(purpose) = CredentialPurpose::parse(&request.purpose) else {
        let payload = json!({ "error": format!("unknown purpose '{}'", request.purpose) });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    };

    match service.redeem_credential(&request.token, &purpose, &request.redeemer_id) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn allocate_certificates_handler<S, N, C>(
    State(service): State<Arc<HackathonService<S, N, C>>>,
    Path(event_id): Path<String>,
    body: Option<Json<AllocateCertificatesRequest>>,
) -> Response
where
    S: HackathonStore + 'static,
    N: NotificationSink + 'static,
    C: CertificateRenderer + 'static,
{
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let issued_on = request
        .issued_on
        .unwrap_or_else(|| Local::now().date_naive());
    match service.allocate_certificates(&EventId(event_id), issued_on) {
        Ok(records) => (StatusCode::CREATED, Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(error: HackathonServiceError) -> Response {
    let status = match &error {
        HackathonServiceError::Validation(_)
        | HackathonServiceError::MilestoneOrder
        | HackathonServiceError::ShortlistTarget
        | HackathonServiceError::EmptyTeam => StatusCode::UNPROCESSABLE_ENTITY,
        HackathonServiceError::Phase { .. }
        | HackathonServiceError::Locked
        | HackathonServiceError::NoScores
        | HackathonServiceError::AlreadyIssued
        | HackathonServiceError::Conflict => StatusCode::CONFLICT,
        HackathonServiceError::DuplicateRedemption { .. } => StatusCode::CONFLICT,
        HackathonServiceError::InvalidCredential | HackathonServiceError::NotFound => {
            StatusCode::NOT_FOUND
        }
        HackathonServiceError::Store(_) | HackathonServiceError::Render(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let body = match &error {
        // The duplicate path is an expected condition; hand the caller the
        // original redemption metadata for an "already used" display.
        HackathonServiceError::DuplicateRedemption { used_by, used_at } => json!({
            "error": error.to_string(),
            "used_by": used_by.as_ref().map(|user| user.0.clone()),
            "used_at": used_at,
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, Json(body)).into_response()
}
