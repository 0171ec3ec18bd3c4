//! Request handlers. Each one authenticates (where required), hands the
//! request to `TripService` and serialises the result.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Expense, ExpenseChanges, ExpenseDraft, ExpenseId, Participant, ParticipantChanges,
    ParticipantDraft, ParticipantId, Registration, Trip, TripChanges, TripDraft, TripId,
    TripSettlement, TripSummary, UserProfile,
};

use super::AppState;
use super::error::ErrorResponse;
use super::extract::{CurrentUser, JsonBody, PathParams};

type ApiResult<T> = Result<T, ErrorResponse>;

// ============ Request / Response Types ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

// ============ Health ============

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============ Auth ============

pub async fn register(
    State(state): State<AppState>,
    JsonBody(registration): JsonBody<Registration>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let user = state.service.register(registration).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let result = state.service.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        token: result.token,
        user: result.user,
    }))
}

// ============ Trips ============

pub async fn list_trips(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Trip>>> {
    Ok(Json(state.service.list_trips(user.id).await?))
}

pub async fn create_trip(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(draft): JsonBody<TripDraft>,
) -> ApiResult<(StatusCode, Json<Trip>)> {
    let trip = state.service.create_trip(user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn get_trip(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
) -> ApiResult<Json<Trip>> {
    Ok(Json(state.service.get_trip(user.id, trip_id).await?))
}

pub async fn update_trip(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
    JsonBody(changes): JsonBody<TripChanges>,
) -> ApiResult<Json<Trip>> {
    Ok(Json(state.service.update_trip(user.id, trip_id, changes).await?))
}

pub async fn delete_trip(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
) -> ApiResult<StatusCode> {
    state.service.delete_trip(user.id, trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn trip_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
) -> ApiResult<Json<TripSummary>> {
    Ok(Json(state.service.summary(user.id, trip_id).await?))
}

pub async fn trip_settlement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
) -> ApiResult<Json<TripSettlement>> {
    Ok(Json(state.service.settlement(user.id, trip_id).await?))
}

// ============ Participants ============

pub async fn list_participants(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
) -> ApiResult<Json<Vec<Participant>>> {
    Ok(Json(state.service.list_participants(user.id, trip_id).await?))
}

pub async fn add_participant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
    JsonBody(draft): JsonBody<ParticipantDraft>,
) -> ApiResult<(StatusCode, Json<Participant>)> {
    let participant = state.service.add_participant(user.id, trip_id, draft).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn update_participant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams((trip_id, participant_id)): PathParams<(TripId, ParticipantId)>,
    JsonBody(changes): JsonBody<ParticipantChanges>,
) -> ApiResult<Json<Participant>> {
    let participant = state
        .service
        .update_participant(user.id, trip_id, participant_id, changes)
        .await?;
    Ok(Json(participant))
}

// ============ Expenses ============

pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
) -> ApiResult<Json<Vec<Expense>>> {
    Ok(Json(state.service.list_expenses(user.id, trip_id).await?))
}

pub async fn add_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams(trip_id): PathParams<TripId>,
    JsonBody(draft): JsonBody<ExpenseDraft>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let expense = state.service.add_expense(user.id, trip_id, draft).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams((trip_id, expense_id)): PathParams<(TripId, ExpenseId)>,
    JsonBody(changes): JsonBody<ExpenseChanges>,
) -> ApiResult<Json<Expense>> {
    let expense = state
        .service
        .update_expense(user.id, trip_id, expense_id, changes)
        .await?;
    Ok(Json(expense))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParams((trip_id, expense_id)): PathParams<(TripId, ExpenseId)>,
) -> ApiResult<StatusCode> {
    state
        .service
        .delete_expense(user.id, trip_id, expense_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
