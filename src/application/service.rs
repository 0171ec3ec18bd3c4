use tracing::{debug, info, warn};

use crate::domain::{
    Expense, ExpenseChanges, ExpenseDraft, ExpenseId, Participant, ParticipantChanges,
    ParticipantDraft, ParticipantId, Registration, Trip, TripChanges, TripDraft, TripId,
    TripSettlement, TripSummary, User, UserId, UserProfile, compute_summary, settle,
};
use crate::storage::{Repository, is_unique_violation};

use super::AppError;
use super::auth::{TokenSigner, hash_password, verify_password};

/// Application service for the trip ledger.
/// This is the primary interface for any client (HTTP server, tests, tooling).
///
/// Every trip-scoped operation takes the id of the calling user and fails with
/// [`AppError::Forbidden`] when that user does not own the trip.
#[derive(Clone)]
pub struct TripService {
    repo: Repository,
    signer: TokenSigner,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub user: UserProfile,
}

impl TripService {
    /// Create a new service with the given repository and token signer.
    pub fn new(repo: Repository, signer: TokenSigner) -> Self {
        Self { repo, signer }
    }

    /// Open (creating if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str, signer: TokenSigner) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, signer))
    }

    // ========================
    // Account operations
    // ========================

    /// Register a new user. Emails are unique regardless of case.
    pub async fn register(&self, registration: Registration) -> Result<UserProfile, AppError> {
        let registration = registration.validate()?;

        if self
            .repo
            .get_user_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AppError::EmailInUse(registration.email));
        }

        let password_hash = hash_password(&registration.password);
        let user = User::new(registration, password_hash);
        // A concurrent registration can win between the lookup and the insert.
        if let Err(e) = self.repo.save_user(&user).await {
            if is_unique_violation(&e) {
                return Err(AppError::EmailInUse(user.email));
            }
            return Err(e.into());
        }

        info!(user_id = %user.id, "registered user");
        Ok(user.profile())
    }

    /// Check credentials and issue a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let user = match self.repo.get_user_by_email(email.trim()).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                debug!("rejected login attempt");
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = self
            .signer
            .issue(&user)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        info!(user_id = %user.id, "user logged in");
        Ok(LoginResult {
            token,
            user: user.profile(),
        })
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<UserProfile, AppError> {
        let claims = self
            .signer
            .verify(token)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        match self.repo.get_user(claims.sub).await? {
            Some(user) => Ok(user.profile()),
            None => {
                warn!(user_id = %claims.sub, "token for unknown user");
                Err(AppError::Unauthorized("user no longer exists".into()))
            }
        }
    }

    // ========================
    // Trip operations
    // ========================

    /// Load a trip and check that `user_id` owns it.
    async fn owned_trip(&self, user_id: UserId, trip_id: TripId) -> Result<Trip, AppError> {
        let trip = self
            .repo
            .get_trip(trip_id)
            .await?
            .ok_or(AppError::TripNotFound(trip_id))?;

        if !trip.is_owned_by(user_id) {
            warn!(%user_id, %trip_id, "access to foreign trip denied");
            return Err(AppError::Forbidden(trip_id));
        }
        Ok(trip)
    }

    pub async fn create_trip(&self, user_id: UserId, draft: TripDraft) -> Result<Trip, AppError> {
        let trip = Trip::new(user_id, draft)?;
        self.repo.save_trip(&trip).await?;

        info!(trip_id = %trip.id, %user_id, "created trip");
        Ok(trip)
    }

    /// Trips owned by the user.
    pub async fn list_trips(&self, user_id: UserId) -> Result<Vec<Trip>, AppError> {
        Ok(self.repo.list_trips_by_owner(user_id).await?)
    }

    pub async fn get_trip(&self, user_id: UserId, trip_id: TripId) -> Result<Trip, AppError> {
        self.owned_trip(user_id, trip_id).await
    }

    /// Apply a partial update to a trip.
    ///
    /// Narrowing the date range does not revisit expenses already recorded, so
    /// some may fall outside the new range. Only new or edited expenses are
    /// checked against the trip dates.
    pub async fn update_trip(
        &self,
        user_id: UserId,
        trip_id: TripId,
        changes: TripChanges,
    ) -> Result<Trip, AppError> {
        let mut trip = self.owned_trip(user_id, trip_id).await?;
        trip.apply(changes)?;
        self.repo.update_trip(&trip).await?;

        info!(%trip_id, "updated trip");
        Ok(trip)
    }

    /// Delete a trip and everything recorded under it.
    pub async fn delete_trip(&self, user_id: UserId, trip_id: TripId) -> Result<(), AppError> {
        self.owned_trip(user_id, trip_id).await?;
        self.repo.delete_trip(trip_id).await?;

        info!(%trip_id, "deleted trip");
        Ok(())
    }

    // ========================
    // Participant operations
    // ========================

    pub async fn add_participant(
        &self,
        user_id: UserId,
        trip_id: TripId,
        draft: ParticipantDraft,
    ) -> Result<Participant, AppError> {
        let trip = self.owned_trip(user_id, trip_id).await?;
        let participant = Participant::new(trip.id, draft)?;
        self.repo.save_participant(&participant).await?;

        info!(%trip_id, participant_id = %participant.id, "added participant");
        Ok(participant)
    }

    pub async fn list_participants(
        &self,
        user_id: UserId,
        trip_id: TripId,
    ) -> Result<Vec<Participant>, AppError> {
        self.owned_trip(user_id, trip_id).await?;
        Ok(self.repo.list_participants(trip_id).await?)
    }

    pub async fn update_participant(
        &self,
        user_id: UserId,
        trip_id: TripId,
        participant_id: ParticipantId,
        changes: ParticipantChanges,
    ) -> Result<Participant, AppError> {
        self.owned_trip(user_id, trip_id).await?;
        let mut participant = self
            .repo
            .get_participant(participant_id)
            .await?
            .filter(|p| p.trip_id == trip_id)
            .ok_or(AppError::ParticipantNotFound(participant_id))?;

        participant.apply(changes)?;
        self.repo.update_participant(&participant).await?;
        Ok(participant)
    }

    // ========================
    // Expense operations
    // ========================

    /// Record an expense. Nothing is written unless the amount is positive, the
    /// date falls within the trip and the payer is a participant of the trip.
    pub async fn add_expense(
        &self,
        user_id: UserId,
        trip_id: TripId,
        draft: ExpenseDraft,
    ) -> Result<Expense, AppError> {
        let trip = self.owned_trip(user_id, trip_id).await?;
        let participants = self.repo.list_participants(trip_id).await?;
        let expense = Expense::new(&trip, &participants, draft)?;
        self.repo.save_expense(&expense).await?;

        info!(
            %trip_id,
            expense_id = %expense.id,
            amount_cents = expense.amount_cents,
            "recorded expense"
        );
        Ok(expense)
    }

    pub async fn list_expenses(
        &self,
        user_id: UserId,
        trip_id: TripId,
    ) -> Result<Vec<Expense>, AppError> {
        self.owned_trip(user_id, trip_id).await?;
        Ok(self.repo.list_expenses(trip_id).await?)
    }

    async fn trip_expense(&self, trip_id: TripId, expense_id: ExpenseId) -> Result<Expense, AppError> {
        self.repo
            .get_expense(expense_id)
            .await?
            .filter(|e| e.trip_id == trip_id)
            .ok_or(AppError::ExpenseNotFound(expense_id))
    }

    pub async fn update_expense(
        &self,
        user_id: UserId,
        trip_id: TripId,
        expense_id: ExpenseId,
        changes: ExpenseChanges,
    ) -> Result<Expense, AppError> {
        let trip = self.owned_trip(user_id, trip_id).await?;
        let mut expense = self.trip_expense(trip_id, expense_id).await?;
        let participants = self.repo.list_participants(trip_id).await?;

        expense.apply(&trip, &participants, changes)?;
        self.repo.update_expense(&expense).await?;

        info!(%trip_id, %expense_id, "updated expense");
        Ok(expense)
    }

    pub async fn delete_expense(
        &self,
        user_id: UserId,
        trip_id: TripId,
        expense_id: ExpenseId,
    ) -> Result<(), AppError> {
        self.owned_trip(user_id, trip_id).await?;
        self.trip_expense(trip_id, expense_id).await?;
        self.repo.delete_expense(expense_id).await?;

        info!(%trip_id, %expense_id, "deleted expense");
        Ok(())
    }

    // ========================
    // Balances
    // ========================

    /// Totals and equal-split balances for a trip.
    pub async fn summary(&self, user_id: UserId, trip_id: TripId) -> Result<TripSummary, AppError> {
        let trip = self.owned_trip(user_id, trip_id).await?;
        let participants = self.repo.list_participants(trip_id).await?;
        let expenses = self.repo.list_expenses(trip_id).await?;

        let summary = compute_summary(&trip, &participants, &expenses)?;
        debug!(
            %trip_id,
            total_cents = summary.total_amount,
            participants = summary.participants.len(),
            "computed summary"
        );
        Ok(summary)
    }

    /// Payments that settle every balance of the trip.
    pub async fn settlement(
        &self,
        user_id: UserId,
        trip_id: TripId,
    ) -> Result<TripSettlement, AppError> {
        let summary = self.summary(user_id, trip_id).await?;
        let settlement = settle(&summary);
        debug!(%trip_id, payments = settlement.payments.len(), "computed settlement");
        Ok(settlement)
    }
}
