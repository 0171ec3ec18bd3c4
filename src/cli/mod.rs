use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use uuid::Uuid;

use crate::client::{ApiClient, ApiError, Session};
use crate::config::{ClientConfig, ServerConfig};
use crate::domain::{
    ExpenseDraft, Participant, ParticipantDraft, ParticipantId, Registration, TripDraft, TripId,
    format_cents, parse_cents,
};
use crate::{server, telemetry};

/// Trip Ledger - shared trip expenses and settlements
#[derive(Parser)]
#[command(name = "trip-ledger")]
#[command(about = "Track shared trip expenses and work out who pays whom")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(ServerConfig),

    /// Create an account
    Register {
        /// Display name
        name: String,

        /// Email address used to log in
        email: String,

        /// Password (6 to 100 characters)
        #[arg(long)]
        password: String,
    },

    /// Log in and remember the session
    Login {
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Trip management commands
    #[command(subcommand)]
    Trip(TripCommands),

    /// Participant management commands
    #[command(subcommand)]
    Participant(ParticipantCommands),

    /// Expense management commands
    #[command(subcommand)]
    Expense(ExpenseCommands),
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// List your trips
    List,

    /// Create a trip
    Create {
        /// Trip name
        name: String,

        #[arg(long)]
        destination: String,

        /// First day of the trip (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the trip (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Three-letter currency code
        #[arg(long, default_value = "EUR")]
        currency: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show a trip with its balances and settlement
    Show { id: TripId },

    /// Delete a trip with its participants and expenses
    Delete { id: TripId },
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant to a trip
    Add {
        trip: TripId,

        name: String,

        #[arg(long)]
        email: Option<String>,
    },

    /// List the participants of a trip
    List { trip: TripId },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        trip: TripId,

        /// Amount paid (e.g., "50.00" or "50")
        amount: String,

        /// Participant who paid, by name or id
        #[arg(long)]
        payer: String,

        /// Date of the expense (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List the expenses of a trip
    List { trip: TripId },

    /// Delete an expense
    Delete { trip: TripId, id: Uuid },
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else if matches!(self.command, Commands::Serve(_)) {
            LevelFilter::INFO
        } else {
            LevelFilter::WARN
        }
    }

    pub async fn run(self) -> Result<()> {
        telemetry::init(self.log_level());

        let command = match self.command {
            Commands::Serve(config) => return server::serve(&config).await,
            other => other,
        };

        let session = Session::load(self.client.session_path())?;
        let client = ApiClient::new(&self.client.api_url, session);

        let result = run_client_command(&client, command).await;
        if let Err(e) = &result {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_auth) {
                eprintln!("Session expired or missing. Log in again with `trip-ledger login`.");
            }
        }
        result
    }
}

async fn run_client_command(client: &ApiClient, command: Commands) -> Result<()> {
    match command {
        Commands::Serve(_) => bail!("serve does not talk to a remote API"),

        Commands::Register {
            name,
            email,
            password,
        } => {
            let user = client
                .register(&Registration {
                    name,
                    email,
                    password,
                })
                .await?;
            println!("Registered {} <{}>", user.name, user.email);
        }

        Commands::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }

        Commands::Logout => {
            client.logout()?;
            println!("Logged out");
        }

        Commands::Trip(cmd) => run_trip_command(client, cmd).await?,
        Commands::Participant(cmd) => run_participant_command(client, cmd).await?,
        Commands::Expense(cmd) => run_expense_command(client, cmd).await?,
    }
    Ok(())
}

async fn run_trip_command(client: &ApiClient, cmd: TripCommands) -> Result<()> {
    match cmd {
        TripCommands::List => {
            let trips = client.list_trips().await?;
            if trips.is_empty() {
                println!("No trips found.");
            } else {
                println!(
                    "{:<36}  {:<20} {:<16} {:<23} {:<4}",
                    "ID", "NAME", "DESTINATION", "DATES", "CUR"
                );
                println!("{}", "-".repeat(103));
                for trip in trips {
                    println!(
                        "{:<36}  {:<20} {:<16} {} - {} {:<4}",
                        trip.id,
                        truncate(&trip.name, 20),
                        truncate(&trip.destination, 16),
                        trip.start_date,
                        trip.end_date,
                        trip.currency
                    );
                }
            }
        }

        TripCommands::Create {
            name,
            destination,
            start,
            end,
            currency,
            description,
        } => {
            let trip = client
                .create_trip(&TripDraft {
                    name,
                    destination,
                    description,
                    currency,
                    start_date: Some(start),
                    end_date: Some(end),
                })
                .await?;
            println!("Created trip: {} ({})", trip.name, trip.id);
        }

        TripCommands::Show { id } => {
            let trip = client.get_trip(id).await?;
            let detail = client.trip_detail(id).await?;
            let currency = &trip.currency;

            println!("Trip: {}", trip.name);
            println!("  ID:          {}", trip.id);
            println!("  Destination: {}", trip.destination);
            println!("  Dates:       {} - {}", trip.start_date, trip.end_date);
            if let Some(desc) = &trip.description {
                println!("  Description: {}", desc);
            }
            println!(
                "  Total:       {} {}",
                format_cents(detail.summary.total_amount),
                currency
            );

            println!();
            if detail.summary.participants.is_empty() {
                println!("No participants yet.");
                return Ok(());
            }
            println!("{:<24} {:>12} {:>12}", "PARTICIPANT", "PAID", "BALANCE");
            println!("{}", "-".repeat(50));
            for p in &detail.summary.participants {
                println!(
                    "{:<24} {:>12} {:>12}",
                    truncate(&p.name, 24),
                    format_cents(p.total_paid),
                    format_cents(p.balance)
                );
            }

            println!();
            if detail.settlement.payments.is_empty() {
                println!("Everyone is settled up.");
            } else {
                println!("Settlement:");
                for payment in &detail.settlement.payments {
                    println!(
                        "  {} pays {} {} {}",
                        payment.payer_name,
                        payment.receiver_name,
                        format_cents(payment.amount),
                        currency
                    );
                }
            }
        }

        TripCommands::Delete { id } => {
            client.delete_trip(id).await?;
            println!("Deleted trip: {}", id);
        }
    }
    Ok(())
}

async fn run_participant_command(client: &ApiClient, cmd: ParticipantCommands) -> Result<()> {
    match cmd {
        ParticipantCommands::Add { trip, name, email } => {
            let participant = client
                .add_participant(trip, &ParticipantDraft { name, email })
                .await?;
            println!("Added participant: {} ({})", participant.name, participant.id);
        }

        ParticipantCommands::List { trip } => {
            let participants = client.list_participants(trip).await?;
            if participants.is_empty() {
                println!("No participants found.");
            } else {
                println!("{:<36}  {:<24} {}", "ID", "NAME", "EMAIL");
                println!("{}", "-".repeat(80));
                for p in participants {
                    println!(
                        "{:<36}  {:<24} {}",
                        p.id,
                        truncate(&p.name, 24),
                        p.email.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_expense_command(client: &ApiClient, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            trip,
            amount,
            payer,
            date,
            description,
        } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let participants = client.list_participants(trip).await?;
            let payer_id = resolve_participant(&participants, &payer)?;

            let expense = client
                .add_expense(
                    trip,
                    &ExpenseDraft {
                        amount: Some(amount_cents),
                        date: Some(date),
                        payer_id: Some(payer_id),
                        description,
                    },
                )
                .await?;
            println!(
                "Recorded expense: {} paid by {} ({})",
                format_cents(expense.amount_cents),
                payer,
                expense.id
            );
        }

        ExpenseCommands::List { trip } => {
            let (participants, expenses) = tokio::try_join!(
                client.list_participants(trip),
                client.list_expenses(trip)
            )?;
            if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<36}  {:<10} {:>12} {:<20} {}",
                    "ID", "DATE", "AMOUNT", "PAID BY", "DESCRIPTION"
                );
                println!("{}", "-".repeat(100));
                for expense in expenses {
                    let payer = participants
                        .iter()
                        .find(|p| p.id == expense.payer_id)
                        .map(|p| p.name.as_str())
                        .unwrap_or("?");
                    println!(
                        "{:<36}  {:<10} {:>12} {:<20} {}",
                        expense.id,
                        expense.date,
                        format_cents(expense.amount_cents),
                        truncate(payer, 20),
                        expense.description.as_deref().unwrap_or("")
                    );
                }
            }
        }

        ExpenseCommands::Delete { trip, id } => {
            client.delete_expense(trip, id).await?;
            println!("Deleted expense: {}", id);
        }
    }
    Ok(())
}

/// Find a participant by id or, failing that, by case-insensitive name.
fn resolve_participant(participants: &[Participant], key: &str) -> Result<ParticipantId> {
    if let Ok(id) = key.parse::<Uuid>() {
        if participants.iter().any(|p| p.id == id) {
            return Ok(id);
        }
    }

    let matches: Vec<&Participant> = participants
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(key.trim()))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id),
        [] => bail!("No participant named '{}' in this trip", key),
        _ => bail!("Several participants are named '{}'; use the participant id", key),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}
