//! # dg-trainer CLI
//!
//! Asks an LLM coach for a disc golf putting practice session.
//!
//! Usage:
//!   dg-trainer [--minutes N] [--putters N] [--distances 15,20,30] [--environment indoor|outdoor]
//!   dg-trainer --request request.json
//!   dg-trainer --show-prompt
//!
//! Examples:
//!   dg-trainer
//!   dg-trainer --minutes 20 --putters 4 --distances 10,18,25 --environment outdoor
//!   dg-trainer --no-distances --json
//!   dg-trainer --model openai:gpt-4o -v

use clap::{ArgAction, Parser};
use dgtrainer_agent::{
    plan_session, AgentConfig, Environment, PracticeConstraints, PracticePrompt, PracticeRequest,
    PracticeSession,
};
use dgtrainer_error::{Error, Result};
use dgtrainer_llm::config::{DEFAULT_MODEL, ENV_MODEL};
use dgtrainer_llm::{load_dotenv, log_dotenv, AnyProvider, ModelSpec, ProviderConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Upper bound for --retries
const MAX_RETRIES: i64 = 10;

#[derive(Parser, Debug)]
#[command(name = "dg-trainer")]
#[command(author, version, about = "dg-trainer - putting practice sessions from an LLM coach")]
struct Cli {
    /// Practice time in minutes
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    minutes: u32,

    /// Number of putters you have
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    putters: u32,

    /// Comma-separated distances in feet; "" lets the coach choose
    #[arg(long, default_value = "15,20,30", value_parser = parse_distances)]
    distances: DistanceList,

    /// Let the coach choose distances (same as --distances "")
    #[arg(long, conflicts_with = "distances")]
    no_distances: bool,

    /// Where you practice: indoor or outdoor
    #[arg(long, default_value = "indoor", value_parser = parse_environment)]
    environment: Environment,

    /// Read the practice request from a JSON file instead of the flags above
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["minutes", "putters", "distances", "no_distances", "environment"]
    )]
    request: Option<PathBuf>,

    /// Model as provider:model (anthropic or openai)
    #[arg(long, env = ENV_MODEL, default_value = DEFAULT_MODEL, value_parser = parse_model)]
    model: ModelSpec,

    /// How many times a rejected session is sent back to the model
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(..=MAX_RETRIES))]
    retries: u8,

    /// Print the session as JSON
    #[arg(long)]
    json: bool,

    /// Print the prompt and exit without calling a model
    #[arg(long)]
    show_prompt: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

/// Distances in feet, in the order given
#[derive(Debug, Clone, PartialEq, Eq)]
struct DistanceList(Vec<u32>);

fn parse_distances(s: &str) -> std::result::Result<DistanceList, String> {
    if s.trim().is_empty() {
        return Ok(DistanceList(Vec::new()));
    }

    s.split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<u32>() {
                Ok(0) => Err("distances must be at least 1 ft".to_string()),
                Ok(feet) => Ok(feet),
                Err(_) => Err(format!("'{}' is not a distance in whole feet", part)),
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(DistanceList)
}

fn parse_environment(s: &str) -> std::result::Result<Environment, String> {
    s.parse::<Environment>().map_err(|e| e.message().to_string())
}

fn parse_model(s: &str) -> std::result::Result<ModelSpec, String> {
    s.parse::<ModelSpec>().map_err(|e| e.message().to_string())
}

impl Cli {
    fn practice_request(&self) -> Result<PracticeRequest> {
        if let Some(path) = &self.request {
            return PracticeRequest::from_file(path);
        }

        let distances = if self.no_distances {
            Vec::new()
        } else {
            self.distances.0.clone()
        };
        Ok(PracticeRequest::new(
            PracticeConstraints::new(self.minutes, self.putters, distances)
                .with_environment(self.environment),
        ))
    }

    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Logs go to stderr so stdout carries only the session
fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_session(session: &PracticeSession, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(session).map_err(|e| {
            Error::serialization_failed("failed to render session as JSON")
                .with_operation("cli::print_session")
                .set_source(e)
        })?;
        println!("{}", text);
    } else {
        print!("{}", session);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may set DG_TRAINER_MODEL, so it is read before the flags
    let dotenv = load_dotenv();
    let cli = Cli::parse();
    init_logging(cli.log_filter());
    log_dotenv(&dotenv);

    let request = cli.practice_request()?;

    if cli.show_prompt {
        println!("{}", PracticePrompt::new(&request)?.render());
        return Ok(());
    }

    let config = ProviderConfig::from_env(&cli.model)?;
    let provider = AnyProvider::from_config(config)?;

    info!(model = %cli.model, minutes = request.constraints.minutes, "planning practice session");
    let run = plan_session(
        &provider,
        &request,
        AgentConfig::default().with_max_retries(usize::from(cli.retries)),
    )
    .await?;
    info!(
        attempts = run.attempts,
        total_tokens = run.usage.total_tokens,
        model = %run.model,
        "session ready"
    );

    print_session(&run.output, cli.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use dgtrainer_llm::ProviderType;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_example_request() {
        let cli = Cli::try_parse_from(["dg-trainer"]).unwrap();
        let request = cli.practice_request().unwrap();
        assert_eq!(
            request,
            PracticeRequest::new(PracticeConstraints::new(10, 10, vec![15, 20, 30]))
        );
        assert_eq!(cli.retries, 1);
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_flags_build_request() {
        let cli = Cli::try_parse_from([
            "dg-trainer",
            "--minutes",
            "25",
            "--putters",
            "3",
            "--distances",
            "12, 21,33",
            "--environment",
            "Outdoor",
        ])
        .unwrap();
        let constraints = cli.practice_request().unwrap().constraints;
        assert_eq!(constraints.minutes, 25);
        assert_eq!(constraints.putters, 3);
        assert_eq!(constraints.distances, vec![12, 21, 33]);
        assert_eq!(constraints.environment, Environment::Outdoor);
    }

    #[test]
    fn test_empty_distances() {
        let cli = Cli::try_parse_from(["dg-trainer", "--distances", ""]).unwrap();
        assert!(cli.practice_request().unwrap().constraints.distances.is_empty());

        let cli = Cli::try_parse_from(["dg-trainer", "--no-distances"]).unwrap();
        assert!(cli.practice_request().unwrap().constraints.distances.is_empty());

        assert!(Cli::try_parse_from(["dg-trainer", "--no-distances", "--distances", "15"]).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["dg-trainer", "--minutes", "0"]).is_err());
        assert!(Cli::try_parse_from(["dg-trainer", "--distances", "15,far"]).is_err());
        assert!(Cli::try_parse_from(["dg-trainer", "--distances", "0,10"]).is_err());
        assert!(Cli::try_parse_from(["dg-trainer", "--environment", "garage"]).is_err());
        assert!(Cli::try_parse_from(["dg-trainer", "--model", "gemini:pro"]).is_err());
        assert!(Cli::try_parse_from(["dg-trainer", "--retries", "11"]).is_err());
        assert!(Cli::try_parse_from(["dg-trainer", "--retries", "18446744073709551615"]).is_err());
        let cli = Cli::try_parse_from(["dg-trainer", "--retries", "10"]).unwrap();
        assert_eq!(cli.retries, 10);
    }

    #[test]
    fn test_request_file_conflicts_with_flags() {
        assert!(Cli::try_parse_from(["dg-trainer", "--request", "r.json", "--minutes", "5"]).is_err());
        let cli = Cli::try_parse_from(["dg-trainer", "--request", "r.json"]).unwrap();
        assert_eq!(cli.request, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn test_model_and_verbosity() {
        let cli = Cli::try_parse_from(["dg-trainer", "--model", "openai:gpt-4o-mini", "-vv"]).unwrap();
        assert_eq!(cli.model.provider, ProviderType::OpenAI);
        assert_eq!(cli.model.model, "gpt-4o-mini");
        assert_eq!(cli.log_filter(), "debug");

        let cli = Cli::try_parse_from(["dg-trainer", "-q"]).unwrap();
        assert_eq!(cli.log_filter(), "error");
        assert!(Cli::try_parse_from(["dg-trainer", "-q", "-v"]).is_err());
    }
}
