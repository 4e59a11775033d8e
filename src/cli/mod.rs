//! Command-line interface for Eventful.
//!
//! - `login` / `logout` / `whoami` - Manage the persisted session
//! - `events list|show|search` - Browse events
//! - `events create|update|delete` - Organize events (admin)
//! - `events rate` - Rate an event (member)
//! - `book` - Verify a payment and book a ticket (member)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::models::{Event, EventCategory, EventPatch, NewEvent, PaymentDetails};
use crate::query::events::EventFilter;
use crate::view::{self, CurrencyFormat, EventActions};
use crate::AppState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "eventful")]
#[command(author, version, about = "Browse, organize and book events", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "eventful.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Backend base URL (overrides [api].base_url)
    #[arg(long, env = "EVENTFUL_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the persisted session (overrides [session].data_dir)
    #[arg(long, env = "EVENTFUL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.session.data_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with credentials or an already-issued token
    Login(LoginArgs),

    /// Forget the current session
    Logout,

    /// Show the current session
    Whoami,

    /// Event commands
    #[command(subcommand)]
    Events(EventsCommands),

    /// Verify a payment, then book a ticket
    Book(BookArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct LoginArgs {
    /// Token issued by the backend
    #[arg(long, conflicts_with_all = ["email", "password"])]
    pub token: Option<String>,

    #[arg(long, requires = "password")]
    pub email: Option<String>,

    #[arg(long, requires = "email")]
    pub password: Option<String>,
}

/// Events subcommands
#[derive(Subcommand, Debug)]
pub enum EventsCommands {
    /// List events
    List {
        /// Only events you organize (admin) or booked (member)
        #[arg(long)]
        mine: bool,
    },
    /// Show details for an event
    Show { id: String },
    /// Find events by keyword, category, city or date
    Search(SearchArgs),
    /// Create an event
    Create(CreateArgs),
    /// Change fields of an event
    Update {
        id: String,
        #[command(flatten)]
        fields: UpdateArgs,
    },
    /// Delete an event
    Delete { id: String },
    /// Rate an event from 1 to 5
    Rate { id: String, rating: u8 },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SearchArgs {
    #[arg(long)]
    pub keyword: Option<String>,
    /// SPORTS, CONFERENCE or CONCERT
    #[arg(long)]
    pub category: Option<EventCategory>,
    #[arg(long)]
    pub city: Option<String>,
    /// Events after this date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<NaiveDate>,
}

impl SearchArgs {
    fn filter(&self) -> Option<EventFilter> {
        if let Some(keyword) = &self.keyword {
            Some(EventFilter::Keyword(keyword.clone()))
        } else if let Some(category) = self.category {
            Some(EventFilter::Category(category))
        } else if let Some(city) = &self.city {
            Some(EventFilter::City(city.clone()))
        } else {
            self.after.map(EventFilter::After)
        }
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    /// Event date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
    /// Start time (HH:MM)
    #[arg(long)]
    pub start: String,
    /// End time (HH:MM)
    #[arg(long)]
    pub end: String,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub category: EventCategory,
    /// Maximum number of participants
    #[arg(long)]
    pub capacity: u32,
    #[arg(long)]
    pub price: f64,
}

impl From<&CreateArgs> for NewEvent {
    fn from(args: &CreateArgs) -> Self {
        Self {
            title: args.title.clone(),
            description: args.description.clone(),
            event_date: args.date,
            start_time: args.start.clone(),
            end_time: args.end.clone(),
            city: args.city.clone(),
            location: args.location.clone(),
            category: args.category,
            max_participants: args.capacity,
            price: args.price,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub category: Option<EventCategory>,
    #[arg(long)]
    pub capacity: Option<u32>,
    #[arg(long)]
    pub price: Option<f64>,
}

impl From<&UpdateArgs> for EventPatch {
    fn from(args: &UpdateArgs) -> Self {
        Self {
            title: args.title.clone(),
            description: args.description.clone(),
            event_date: args.date,
            start_time: args.start.clone(),
            end_time: args.end.clone(),
            city: args.city.clone(),
            location: args.location.clone(),
            category: args.category,
            max_participants: args.capacity,
            price: args.price,
        }
    }
}

#[derive(Args, Debug)]
pub struct BookArgs {
    /// Event ID
    pub id: String,
    #[arg(long)]
    pub full_name: String,
    /// 16-digit card number
    #[arg(long)]
    pub card_number: String,
    #[arg(long)]
    pub expiration_date: String,
    #[arg(long)]
    pub cvv: String,
}

impl From<&BookArgs> for PaymentDetails {
    fn from(args: &BookArgs) -> Self {
        Self {
            full_name: args.full_name.clone(),
            card_number: args.card_number.clone(),
            expiration_date: args.expiration_date.clone(),
            cvv: args.cvv.clone(),
        }
    }
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// Run a CLI command
pub async fn run_command(state: &AppState, command: &Commands) -> Result<()> {
    match command {
        Commands::Login(args) => cmd_login(state, args).await,
        Commands::Logout => cmd_logout(state),
        Commands::Whoami => cmd_whoami(state),
        Commands::Events(EventsCommands::List { mine }) => cmd_events_list(state, *mine).await,
        Commands::Events(EventsCommands::Show { id }) => cmd_events_show(state, id).await,
        Commands::Events(EventsCommands::Search(args)) => cmd_events_search(state, args).await,
        Commands::Events(EventsCommands::Create(args)) => cmd_events_create(state, args).await,
        Commands::Events(EventsCommands::Update { id, fields }) => {
            cmd_events_update(state, id, fields).await
        }
        Commands::Events(EventsCommands::Delete { id }) => cmd_events_delete(state, id).await,
        Commands::Events(EventsCommands::Rate { id, rating }) => {
            cmd_events_rate(state, id, *rating).await
        }
        Commands::Book(args) => cmd_book(state, args).await,
    }
}

async fn cmd_login(state: &AppState, args: &LoginArgs) -> Result<()> {
    let token = match (&args.token, &args.email, &args.password) {
        (Some(token), _, _) => token.clone(),
        (None, Some(email), Some(password)) => {
            println!("Connecting to {}...", state.api.base_url());
            state
                .api
                .login(email, password)
                .await
                .context("Login failed")?
        }
        _ => anyhow::bail!("Provide --token, or both --email and --password"),
    };

    let session = state
        .auth
        .login(&token)
        .context("The backend returned an unusable token")?;

    println!(
        "Logged in as {} ({})",
        session.user_id().unwrap_or("-"),
        session.role().map(|r| r.as_str()).unwrap_or("-")
    );
    Ok(())
}

fn cmd_logout(state: &AppState) -> Result<()> {
    state.auth.logout().context("Failed to clear the saved session")?;
    println!("Logged out.");
    Ok(())
}

fn cmd_whoami(state: &AppState) -> Result<()> {
    let session = state.auth.session();
    match (session.user_id(), session.role()) {
        (Some(user_id), Some(role)) => {
            println!("User:  {}", user_id);
            println!("Role:  {}", role);
        }
        _ => println!("Not logged in. Run `eventful login` first."),
    }
    Ok(())
}

async fn cmd_events_list(state: &AppState, mine: bool) -> Result<()> {
    let result = if mine {
        state.events.my_events().await
    } else {
        state.events.all_events().await
    };
    let events = result.into_result().context("Failed to load events")?;
    print_events(state, &events);
    Ok(())
}

async fn cmd_events_search(state: &AppState, args: &SearchArgs) -> Result<()> {
    let filter = args
        .filter()
        .context("Provide one of --keyword, --category, --city or --after")?;
    let events = state
        .events
        .filtered(filter)
        .await
        .into_result()
        .context("Failed to search events")?;
    print_events(state, &events);
    Ok(())
}

async fn cmd_events_show(state: &AppState, id: &str) -> Result<()> {
    let event = state
        .events
        .event(id)
        .await
        .into_result()
        .with_context(|| format!("Failed to load event {}", id))?;

    let session = state.auth.session();
    let format = CurrencyFormat::from(&state.config.display);

    println!();
    println!("=== {} ===", event.title);
    println!();
    if !event.description.is_empty() {
        println!("{}", event.description);
        println!();
    }
    println!("When:       {} {} - {}", event.event_date, event.start_time, event.end_time);
    println!("Where:      {}, {}", event.location, event.city);
    println!("Category:   {}", event.category);
    println!(
        "Seats:      {} of {} left",
        event.seats_left(),
        event.max_participants
    );
    println!("Tickets:    {} / Person", format.format(event.price));
    println!("Rating:     {}", view::render_stars(event.average_rating));
    if let Some(organizer) = &event.organizer {
        let name = if organizer.full_name.is_empty() {
            &organizer.id
        } else {
            &organizer.full_name
        };
        println!("Organizer:  {}", name);
    }

    if session.is_member() {
        let action = view::booking_action(&session, &event);
        let hint = if action.enabled {
            format!("  (eventful book {} ...)", event.id)
        } else {
            String::new()
        };
        println!();
        println!("[{}]{}", action.label, hint);
    }

    println!();
    Ok(())
}

async fn cmd_events_create(state: &AppState, args: &CreateArgs) -> Result<()> {
    let created = state
        .events
        .create_event(&NewEvent::from(args))
        .await
        .context("Failed to create event")?;
    println!("Created event {} ({})", created.title, created.id);
    Ok(())
}

async fn cmd_events_update(state: &AppState, id: &str, fields: &UpdateArgs) -> Result<()> {
    let updated = state
        .events
        .update_event(id, EventPatch::from(fields))
        .await
        .with_context(|| format!("Failed to update event {}", id))?;
    println!("Updated event {} ({})", updated.title, updated.id);
    Ok(())
}

async fn cmd_events_delete(state: &AppState, id: &str) -> Result<()> {
    state
        .events
        .delete_event(id)
        .await
        .with_context(|| format!("Failed to delete event {}", id))?;
    println!("Deleted event {}", id);
    Ok(())
}

async fn cmd_events_rate(state: &AppState, id: &str, rating: u8) -> Result<()> {
    state
        .events
        .rate_event(id, rating)
        .await
        .with_context(|| format!("Failed to rate event {}", id))?;
    println!("Rated event {} with {}", id, view::render_stars(rating as f64));
    Ok(())
}

async fn cmd_book(state: &AppState, args: &BookArgs) -> Result<()> {
    let event = state
        .events
        .event(&args.id)
        .await
        .into_result()
        .with_context(|| format!("Failed to load event {}", args.id))?;

    let summary = view::checkout_summary(&event, &state.config.display);
    let payment = PaymentDetails::from(args);

    println!();
    println!("Event:          {}", event.title);
    println!("Price:          {}", summary.price);
    println!(
        "Included tax:   {} ({}%)",
        summary.included_tax, state.config.display.tax_rate_percent
    );
    println!("Card:           {}", payment.masked_card_number());
    println!();

    state.events.checkout(&event.id, &payment).await?;

    println!("Booked! See you at {}.", event.location);
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_events(state: &AppState, events: &[Event]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    let session = state.auth.session();
    let actions = EventActions::for_viewer(&session);
    let format = CurrencyFormat::from(&state.config.display);

    println!();
    println!(
        "{:<24}  {:<28}  {:<10}  {:<14}  {:<10}  {:>10}  {:<6}  {:<12}",
        "ID", "TITLE", "DATE", "CITY", "CATEGORY", "PRICE", "RATING", "ACTIONS"
    );
    println!("{}", "-".repeat(130));

    for event in events {
        println!(
            "{:<24}  {:<28}  {:<10}  {:<14}  {:<10}  {:>10}  {:<6}  {:<12}",
            truncate(&event.id, 24),
            truncate(&event.title, 28),
            event.event_date,
            truncate(&event.city, 14),
            event.category,
            format.format(event.price),
            view::render_stars(event.average_rating),
            action_labels(&actions, &session, event),
        );
    }

    println!();
}

fn action_labels(
    actions: &EventActions,
    session: &crate::auth::Session,
    event: &Event,
) -> String {
    let mut labels = Vec::new();
    if actions.can_rate {
        labels.push("rate");
        if view::booking_action(session, event).enabled {
            labels.push("book");
        } else {
            labels.push("booked");
        }
    }
    if actions.can_edit {
        labels.push("edit");
    }
    if actions.can_delete {
        labels.push("delete");
    }
    if labels.is_empty() {
        "-".to_string()
    } else {
        labels.join(",")
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Oslo", 10), "Oslo");
        assert_eq!(truncate("Festa de São João", 10), "Festa d...");
    }

    #[test]
    fn test_parse_book_command() {
        let cli = Cli::try_parse_from([
            "eventful",
            "book",
            "e1",
            "--full-name",
            "Ana Silva",
            "--card-number",
            "1234567812345678",
            "--expiration-date",
            "12/27",
            "--cvv",
            "123",
        ])
        .unwrap();

        match cli.command {
            Commands::Book(args) => {
                let payment = PaymentDetails::from(&args);
                assert_eq!(args.id, "e1");
                assert_eq!(payment.card_number, "1234567812345678");
            }
            other => panic!("Expected book command, got {:?}", other),
        }
    }

    #[test]
    fn test_search_takes_exactly_one_filter() {
        let cli = Cli::try_parse_from(["eventful", "events", "search", "--category", "sports"]).unwrap();
        match cli.command {
            Commands::Events(EventsCommands::Search(args)) => {
                assert_eq!(args.filter(), Some(EventFilter::Category(EventCategory::Sports)));
            }
            other => panic!("Expected search command, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["eventful", "events", "search"]).is_err());
        assert!(Cli::try_parse_from([
            "eventful", "events", "search", "--city", "Porto", "--keyword", "jazz"
        ])
        .is_err());
    }

    #[test]
    fn test_login_requires_token_or_credentials() {
        assert!(Cli::try_parse_from(["eventful", "login", "--token", "abc"]).is_ok());
        assert!(Cli::try_parse_from([
            "eventful", "login", "--email", "a@b.c", "--password", "pw"
        ])
        .is_ok());
        assert!(Cli::try_parse_from(["eventful", "login", "--email", "a@b.c"]).is_err());
        assert!(Cli::try_parse_from(["eventful", "login"]).is_err());
        assert!(Cli::try_parse_from([
            "eventful", "login", "--token", "abc", "--email", "a@b.c", "--password", "pw"
        ])
        .is_err());
    }

    #[test]
    fn test_update_fields_become_patch() {
        let cli = Cli::try_parse_from([
            "eventful", "events", "update", "e1", "--title", "Renamed", "--capacity", "40",
        ])
        .unwrap();
        match cli.command {
            Commands::Events(EventsCommands::Update { id, fields }) => {
                let patch = EventPatch::from(&fields);
                assert_eq!(id, "e1");
                assert_eq!(patch.title.as_deref(), Some("Renamed"));
                assert_eq!(patch.max_participants, Some(40));
                assert!(patch.city.is_none());
            }
            other => panic!("Expected update command, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "eventful",
            "--api-url",
            "http://backend:9000",
            "--data-dir",
            "/tmp/eventful",
            "whoami",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.api.base_url, "http://backend:9000");
        assert_eq!(config.session.data_dir, PathBuf::from("/tmp/eventful"));
    }
}
