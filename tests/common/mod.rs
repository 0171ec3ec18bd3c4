// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::TempDir;
use tokio::net::TcpListener;
use trip_ledger::application::{TokenSigner, TripService};
use trip_ledger::client::{ApiClient, Session};
use trip_ledger::domain::{
    Cents, ExpenseDraft, Participant, ParticipantDraft, ParticipantId, Registration, Trip,
    TripDraft, UserProfile,
};
use trip_ledger::server::{AppState, router};

pub const TEST_SECRET: &str = "test-secret";
pub const PASSWORD: &str = "secret123";

pub fn signer() -> TokenSigner {
    TokenSigner::new(TEST_SECRET, chrono::Duration::hours(1))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TripService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = TripService::init(db_path.to_str().unwrap(), signer()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn registration(name: &str, email: &str) -> Registration {
    Registration {
        name: name.into(),
        email: email.into(),
        password: PASSWORD.into(),
    }
}

pub fn trip_draft(name: &str) -> TripDraft {
    TripDraft {
        name: name.into(),
        destination: "Lisbon".into(),
        description: None,
        currency: "EUR".into(),
        start_date: Some(date("2024-06-01")),
        end_date: Some(date("2024-06-10")),
    }
}

pub fn expense(amount: Cents, on: &str, payer: ParticipantId) -> ExpenseDraft {
    ExpenseDraft {
        amount: Some(amount),
        date: Some(date(on)),
        payer_id: Some(payer),
        description: None,
    }
}

/// Test fixture: a registered owner with one trip and named participants
pub struct TripFixture {
    pub owner: UserProfile,
    pub trip: Trip,
    pub participants: Vec<Participant>,
}

impl TripFixture {
    pub async fn create(service: &TripService, names: &[&str]) -> Result<Self> {
        let owner = service
            .register(registration("Owner", "owner@example.com"))
            .await?;
        let trip = service.create_trip(owner.id, trip_draft("Lisbon 2024")).await?;

        let mut participants = Vec::new();
        for name in names {
            participants.push(
                service
                    .add_participant(
                        owner.id,
                        trip.id,
                        ParticipantDraft {
                            name: name.to_string(),
                            email: None,
                        },
                    )
                    .await?,
            );
        }

        Ok(Self {
            owner,
            trip,
            participants,
        })
    }

    pub fn id(&self, index: usize) -> ParticipantId {
        self.participants[index].id
    }
}

/// A server bound to an ephemeral port, backed by a temporary database
pub struct TestServer {
    pub base_url: String,
    pub service: TripService,
    _temp: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let (service, temp) = test_service().await?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(AppState::new(service.clone()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            service,
            _temp: temp,
        })
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url, Session::in_memory())
    }
}
