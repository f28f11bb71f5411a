//! Rating CLI
//!
//! The `rating` command talks to a running `ratingd` over HTTP.
//!
//! ## Commands
//!
//! - `health`: Check that the server is up and which backend it uses
//! - `list`: Show all sessions, newest first
//! - `create`: Open a rating session for a presenter
//! - `show`: Print a session with its evaluations
//! - `summary`: Print class averages for a session
//! - `rate`: Submit an evaluation
//! - `delete`: Remove a session and its evaluations

mod client;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rating_core::{
    preview_overall_score, round_for_display, CreateSessionRequest, Criterion, Ratings, Score,
    Session, SessionSummary, SubmitEvaluationRequest,
};
use serde::Serialize;
use tracing::debug;

use client::RatingClient;

#[derive(Parser)]
#[command(name = "rating")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classroom rating client", long_about = None)]
struct Cli {
    /// Base URL of the rating service
    #[arg(
        long,
        global = true,
        env = "RATING_SERVER",
        default_value = "http://localhost:3000"
    )]
    server: String,

    /// Print raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the server and report its storage backend
    Health,

    /// List sessions, newest first
    List,

    /// Create a rating session
    Create {
        /// Presenter being rated
        presenter: String,

        /// Name of the session creator (default: Teacher)
        #[arg(long = "by")]
        created_by: Option<String>,

        /// JSON file with a criteria array (default: built-in criteria)
        #[arg(long)]
        criteria: Option<PathBuf>,
    },

    /// Show a session with its evaluations
    Show {
        /// Session id
        id: String,
    },

    /// Show per-criterion class averages
    Summary {
        /// Session id
        id: String,
    },

    /// Submit an evaluation
    Rate {
        /// Session id
        id: String,

        /// Evaluator name (default: Anonymous)
        #[arg(short, long)]
        evaluator: Option<String>,

        /// Score for one criterion, e.g. `--score clarity=4` (repeatable)
        #[arg(short, long = "score", value_parser = parse_score, required = true)]
        scores: Vec<(String, Score)>,
    },

    /// Delete a session and all of its evaluations
    Delete {
        /// Session id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    rating_core::init_tracing(false, rating_core::level_for(cli.verbose));

    let client = RatingClient::new(&cli.server);
    debug!(server = %cli.server, "using rating server");

    match cli.command {
        Commands::Health => cmd_health(&client, cli.json).await,
        Commands::List => cmd_list(&client, cli.json).await,
        Commands::Create {
            presenter,
            created_by,
            criteria,
        } => cmd_create(&client, presenter, created_by, criteria.as_deref(), cli.json).await,
        Commands::Show { id } => cmd_show(&client, &id, cli.json).await,
        Commands::Summary { id } => cmd_summary(&client, &id, cli.json).await,
        Commands::Rate {
            id,
            evaluator,
            scores,
        } => cmd_rate(&client, &id, evaluator, scores, cli.json).await,
        Commands::Delete { id } => cmd_delete(&client, &id).await,
    }
}

fn parse_score(raw: &str) -> std::result::Result<(String, Score), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected criterion=score, got '{raw}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing criterion id in '{raw}'"));
    }
    let score: Score = value
        .trim()
        .parse()
        .map_err(|_| format!("score for '{id}' must be a whole number, got '{value}'"))?;
    Ok((id.to_string(), score))
}

fn read_criteria(path: &Path) -> Result<Vec<Criterion>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read criteria file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse criteria file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.2}", round_for_display(s)),
        None => "-".to_string(),
    }
}

async fn cmd_health(client: &RatingClient, json: bool) -> Result<()> {
    let health = client.health().await?;
    if json {
        return print_json(&health);
    }

    let status = health["status"].as_str().unwrap_or("unknown");
    let backend = health["backend"].as_str().unwrap_or("unknown");
    println!("{status} (backend: {backend})");
    Ok(())
}

async fn cmd_list(client: &RatingClient, json: bool) -> Result<()> {
    let sessions = client.list_sessions().await?;
    if json {
        return print_json(&sessions);
    }

    if sessions.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }

    for session in &sessions {
        let summary = SessionSummary::from_session(session);
        println!(
            "{}  {:<24}  {:>3} evaluations  avg {}  {}",
            session.id,
            session.presenter,
            summary.evaluation_count,
            format_score(summary.average_overall),
            session.created_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(())
}

async fn cmd_create(
    client: &RatingClient,
    presenter: String,
    created_by: Option<String>,
    criteria_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let criteria = criteria_file.map(read_criteria).transpose()?;
    let session = client
        .create_session(&CreateSessionRequest {
            presenter,
            created_by,
            criteria,
        })
        .await?;

    if json {
        return print_json(&session);
    }

    println!("Created session {} for {}", session.id, session.presenter);
    println!("Share: /session/{}", session.id);
    Ok(())
}

fn print_session(session: &Session) {
    println!("Session:   {}", session.id);
    println!("Presenter: {}", session.presenter);
    println!(
        "Created:   {} by {}",
        session.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        session.created_by
    );
    println!();
    println!("Criteria:");
    for c in &session.criteria {
        println!("  {:<16} {:<20} weight {}", c.id, c.label, c.weight);
    }
    println!();

    if session.evaluations.is_empty() {
        println!("No evaluations yet.");
        return;
    }

    println!("Evaluations ({}):", session.evaluations.len());
    for e in &session.evaluations {
        let ratings: Vec<String> = e.ratings.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!(
            "  {:<16} {}  [{}]",
            e.evaluator,
            format_score(Some(e.overall_score)),
            ratings.join(", ")
        );
    }
}

async fn cmd_show(client: &RatingClient, id: &str, json: bool) -> Result<()> {
    let session = client.get_session(id).await?;
    if json {
        return print_json(&session);
    }
    print_session(&session);
    Ok(())
}

async fn cmd_summary(client: &RatingClient, id: &str, json: bool) -> Result<()> {
    let summary = client.session_summary(id).await?;
    if json {
        return print_json(&summary);
    }

    println!(
        "{} ({} evaluations)",
        summary.presenter, summary.evaluation_count
    );
    println!("Overall: {}", format_score(summary.average_overall));
    println!();
    for c in &summary.criteria {
        println!(
            "  {:<20} {:>5}  ({} ratings)",
            c.label,
            format_score(c.average),
            c.rating_count
        );
    }
    Ok(())
}

async fn cmd_rate(
    client: &RatingClient,
    id: &str,
    evaluator: Option<String>,
    scores: Vec<(String, Score)>,
    json: bool,
) -> Result<()> {
    let ratings: Ratings = scores.into_iter().collect();
    let session = client.get_session(id).await?;

    let missing: Vec<&str> = session
        .criteria
        .iter()
        .filter(|c| !ratings.contains_key(&c.id))
        .map(|c| c.id.as_str())
        .collect();
    if !missing.is_empty() {
        bail!("missing scores for: {}", missing.join(", "));
    }

    let preview = preview_overall_score(&session.criteria, &ratings);
    let updated = client
        .submit_evaluation(&SubmitEvaluationRequest {
            session_id: id.to_string(),
            evaluator,
            ratings,
            overall_score: preview,
        })
        .await?;

    if json {
        return print_json(&updated);
    }

    let recorded = updated
        .evaluations
        .last()
        .context("server returned a session without the new evaluation")?;
    println!(
        "Recorded evaluation by {} for {}: {}",
        recorded.evaluator,
        updated.presenter,
        format_score(Some(recorded.overall_score))
    );
    Ok(())
}

async fn cmd_delete(client: &RatingClient, id: &str) -> Result<()> {
    client.delete_session(id).await?;
    println!("Deleted session {id}");
    Ok(())
}
