//! Typed HTTP client for the trip-ledger API.
//!
//! Every call returns `Result<_, ApiError>`. An `Auth` failure from any call
//! discards the stored credential, and calls that need a credential fail
//! without touching the network when none is stored.

mod error;
mod session;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::{
    Expense, ExpenseChanges, ExpenseDraft, ExpenseId, Participant, ParticipantChanges,
    ParticipantDraft, ParticipantId, Registration, Trip, TripChanges, TripDraft, TripId,
    TripSettlement, TripSummary, UserProfile,
};
use crate::server::handlers::{LoginRequest, LoginResponse};

pub use error::{ApiError, decode_error};
pub use session::Session;

/// Summary and settlement of one trip, fetched together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripDetail {
    pub summary: TripSummary,
    pub settlement: TripSettlement,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ========================
    // Auth
    // ========================

    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ApiError> {
        let req = self.request(Method::POST, "/api/auth/register").json(registration);
        self.fetch(req, "Registration failed").await
    }

    /// Log in and store the issued token in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let req = self.request(Method::POST, "/api/auth/login").json(&body);
        let resp: LoginResponse = self.fetch(req, "Login failed").await?;

        self.session
            .set_token(resp.token)
            .map_err(|e| ApiError::Unknown(format!("Could not store session: {e:#}")))?;
        Ok(resp.user)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.session
            .clear()
            .map_err(|e| ApiError::Unknown(format!("Could not clear session: {e:#}")))
    }

    // ========================
    // Trips
    // ========================

    pub async fn list_trips(&self) -> Result<Vec<Trip>, ApiError> {
        let req = self.authed(Method::GET, "/api/trips")?;
        self.fetch(req, "Could not load trips").await
    }

    pub async fn create_trip(&self, draft: &TripDraft) -> Result<Trip, ApiError> {
        let req = self.authed(Method::POST, "/api/trips")?.json(draft);
        self.fetch(req, "Could not create trip").await
    }

    pub async fn get_trip(&self, trip_id: TripId) -> Result<Trip, ApiError> {
        let req = self.authed(Method::GET, &format!("/api/trips/{trip_id}"))?;
        self.fetch(req, "Could not load trip").await
    }

    pub async fn update_trip(
        &self,
        trip_id: TripId,
        changes: &TripChanges,
    ) -> Result<Trip, ApiError> {
        let req = self
            .authed(Method::PUT, &format!("/api/trips/{trip_id}"))?
            .json(changes);
        self.fetch(req, "Could not update trip").await
    }

    pub async fn delete_trip(&self, trip_id: TripId) -> Result<(), ApiError> {
        let req = self.authed(Method::DELETE, &format!("/api/trips/{trip_id}"))?;
        self.execute(req, "Could not delete trip").await.map(drop)
    }

    pub async fn summary(&self, trip_id: TripId) -> Result<TripSummary, ApiError> {
        let req = self.authed(Method::GET, &format!("/api/trips/{trip_id}/summary"))?;
        self.fetch(req, "Could not load trip summary").await
    }

    pub async fn settlement(&self, trip_id: TripId) -> Result<TripSettlement, ApiError> {
        let req = self.authed(Method::GET, &format!("/api/trips/{trip_id}/settlement"))?;
        self.fetch(req, "Could not load settlement").await
    }

    /// Summary and settlement requested concurrently; fails if either fails.
    pub async fn trip_detail(&self, trip_id: TripId) -> Result<TripDetail, ApiError> {
        let (summary, settlement) =
            tokio::try_join!(self.summary(trip_id), self.settlement(trip_id))?;
        Ok(TripDetail {
            summary,
            settlement,
        })
    }

    // ========================
    // Participants
    // ========================

    pub async fn list_participants(&self, trip_id: TripId) -> Result<Vec<Participant>, ApiError> {
        let req = self.authed(Method::GET, &format!("/api/trips/{trip_id}/participants"))?;
        self.fetch(req, "Could not load participants").await
    }

    pub async fn add_participant(
        &self,
        trip_id: TripId,
        draft: &ParticipantDraft,
    ) -> Result<Participant, ApiError> {
        let req = self
            .authed(Method::POST, &format!("/api/trips/{trip_id}/participants"))?
            .json(draft);
        self.fetch(req, "Could not add participant").await
    }

    pub async fn update_participant(
        &self,
        trip_id: TripId,
        participant_id: ParticipantId,
        changes: &ParticipantChanges,
    ) -> Result<Participant, ApiError> {
        let path = format!("/api/trips/{trip_id}/participants/{participant_id}");
        let req = self.authed(Method::PUT, &path)?.json(changes);
        self.fetch(req, "Could not update participant").await
    }

    // ========================
    // Expenses
    // ========================

    pub async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, ApiError> {
        let req = self.authed(Method::GET, &format!("/api/trips/{trip_id}/expenses"))?;
        self.fetch(req, "Could not load expenses").await
    }

    pub async fn add_expense(
        &self,
        trip_id: TripId,
        draft: &ExpenseDraft,
    ) -> Result<Expense, ApiError> {
        let req = self
            .authed(Method::POST, &format!("/api/trips/{trip_id}/expenses"))?
            .json(draft);
        self.fetch(req, "Could not add expense").await
    }

    pub async fn update_expense(
        &self,
        trip_id: TripId,
        expense_id: ExpenseId,
        changes: &ExpenseChanges,
    ) -> Result<Expense, ApiError> {
        let path = format!("/api/trips/{trip_id}/expenses/{expense_id}");
        let req = self.authed(Method::PUT, &path)?.json(changes);
        self.fetch(req, "Could not update expense").await
    }

    pub async fn delete_expense(
        &self,
        trip_id: TripId,
        expense_id: ExpenseId,
    ) -> Result<(), ApiError> {
        let path = format!("/api/trips/{trip_id}/expenses/{expense_id}");
        let req = self.authed(Method::DELETE, &path)?;
        self.execute(req, "Could not delete expense").await.map(drop)
    }

    // ========================
    // Plumbing
    // ========================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self
            .session
            .token()
            .ok_or_else(|| ApiError::Auth("Not logged in".into()))?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let resp = self.execute(req, fallback).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn execute(&self, req: RequestBuilder, fallback: &str) -> Result<Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        debug!(url = %resp.url(), %status, "API response");
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let err = decode_error(status.as_u16(), &body, fallback);
        if err.is_auth() {
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "could not clear session after auth failure");
            }
        }
        Err(err)
    }
}

