//! x1quest - command-line runner for the X1 EcoChain testnet quests.
//!
//! Each subcommand prints a JSON envelope (`{"ok": true, "data": ...}` or
//! `{"ok": false, "error": "..."}`) on stdout and exits non-zero on failure.
//! Logs go to stderr and to a daily log file in the cache directory.

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use x1quest_core::auth::{token, CredentialStore, Signer, TokenStore, WalletSigner};
use x1quest_core::models::{BatchResult, BatchSummary};
use x1quest_core::utils::{format_remaining, short_address, truncate_string};
use x1quest_core::{ApiError, Config, Outcome, QuestClient};

/// Environment variable holding the wallet private key
const PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "x1quest";

const USAGE: &str = "\
Usage: x1quest <command>

Commands:
  profile            Show the wallet profile
  quests             List all quests
  complete <id>      Complete one quest
  faucet             Claim testnet X1T from the faucet
  daily [--run]      List pending daily quests, or complete them all
  social [--run]     List pending social quests, or complete them all
  balance            Show the wallet's X1T balance
  status             Show the cached session token
  logout             Remove the cached session token
  key set            Store the wallet private key in the OS keychain
  key delete         Remove the wallet private key from the OS keychain
  config show        Show the effective configuration
  config init        Write the effective configuration to the config file

The private key is read from WALLET_PRIVATE_KEY, then the OS keychain.
Set RUST_LOG=info (or debug) for more log output.";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Profile,
    Quests,
    Complete(String),
    Faucet,
    Daily { run: bool },
    Social { run: bool },
    Balance,
    Status,
    Logout,
    KeySet,
    KeyDelete,
    ConfigShow,
    ConfigInit,
    Help,
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] | ["help"] | ["--help"] | ["-h"] => Ok(Command::Help),
        ["profile"] => Ok(Command::Profile),
        ["quests"] => Ok(Command::Quests),
        ["complete", id] => Ok(Command::Complete(id.to_string())),
        ["complete"] => Err("complete needs a quest id".to_string()),
        ["faucet"] => Ok(Command::Faucet),
        ["daily"] => Ok(Command::Daily { run: false }),
        ["daily", "--run"] => Ok(Command::Daily { run: true }),
        ["social"] => Ok(Command::Social { run: false }),
        ["social", "--run"] => Ok(Command::Social { run: true }),
        ["balance"] => Ok(Command::Balance),
        ["status"] => Ok(Command::Status),
        ["logout"] => Ok(Command::Logout),
        ["key", "set"] => Ok(Command::KeySet),
        ["key", "delete"] => Ok(Command::KeyDelete),
        ["config", "show"] => Ok(Command::ConfigShow),
        ["config", "init"] => Ok(Command::ConfigInit),
        other => Err(format!("Unknown command: {}", other.join(" "))),
    }
}

/// Batch run output: per-quest results and their totals
#[derive(Debug, Serialize)]
struct BatchReport {
    results: Vec<BatchResult>,
    summary: BatchSummary,
}

impl BatchReport {
    fn new(results: Vec<BatchResult>) -> Self {
        let summary = BatchSummary::from_results(&results);
        Self { results, summary }
    }
}

/// Cached session as shown by `x1quest status`
#[derive(Debug, Serialize)]
struct SessionStatus {
    tokens_file: String,
    wallet: String,
    wallet_short: String,
    token: String,
    issued_at: DateTime<Utc>,
    age_minutes: i64,
    expires_in: String,
    usable: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(dir)
            .ok()
    });

    let (file_layer, guard) = match file_appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(stderr_filter))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return Ok(ExitCode::from(2));
        }
    };
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load().context("Failed to load configuration")?;
    let log_dir = config.cache_dir().ok().filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _guard = init_tracing(log_dir.as_deref());
    info!(command = ?command, "x1quest starting");

    match command {
        Command::Status => print_outcome(&session_status(&config)),
        Command::Logout => print_outcome(&logout(&config)),
        Command::KeySet => print_outcome(&key_set()),
        Command::KeyDelete => print_outcome(&key_delete()),
        Command::ConfigShow => print_outcome(&Outcome::Success(config)),
        Command::ConfigInit => print_outcome(&config_init(&config)),
        command => run_api_command(config, command).await,
    }
}

/// Print the JSON envelope and map it to the process exit code
fn print_outcome<T: Serialize>(outcome: &Outcome<T>) -> Result<ExitCode> {
    let rendered = serde_json::to_string_pretty(outcome).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn failure<T>(e: anyhow::Error) -> Outcome<T> {
    Outcome::Failure(format!("{:#}", e))
}

async fn run_api_command(config: Config, command: Command) -> Result<ExitCode> {
    let mut client = match build_client(config) {
        Ok(client) => client,
        Err(e) => return print_outcome(&failure::<()>(e)),
    };
    info!(wallet = %short_address(&client.address()), "Using wallet");

    match command {
        Command::Profile => print_outcome(&Outcome::from(client.get_profile().await)),
        Command::Quests => print_outcome(&Outcome::from(client.list_quests().await)),
        Command::Complete(id) => print_outcome(&Outcome::from(client.complete_quest(&id).await)),
        Command::Faucet => print_outcome(&Outcome::from(client.claim_faucet().await)),
        Command::Daily { run: false } => {
            print_outcome(&Outcome::from(client.list_daily_pending().await))
        }
        Command::Daily { run: true } => print_batch(client.complete_all_daily().await),
        Command::Social { run: false } => {
            print_outcome(&Outcome::from(client.list_social_pending().await))
        }
        Command::Social { run: true } => print_batch(client.complete_all_social().await),
        Command::Balance => print_outcome(&Outcome::from(client.get_balance().await)),
        other => {
            warn!(command = ?other, "Command does not use the API");
            print_outcome(&Outcome::<()>::Failure(format!("Unsupported command: {:?}", other)))
        }
    }
}

fn print_batch(result: Result<Vec<BatchResult>, ApiError>) -> Result<ExitCode> {
    let outcome = Outcome::from(result.map(BatchReport::new));
    if let Outcome::Success(ref report) = outcome {
        info!(
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            total_reward = report.summary.total_reward,
            "Batch finished"
        );
        for failed in report.results.iter().filter(|r| !r.is_success()) {
            info!(quest_id = %failed.quest_id, title = %truncate_string(&failed.title, 40), "Not completed");
        }
    }
    print_outcome(&outcome)
}

fn build_client(config: Config) -> Result<QuestClient> {
    let private_key = load_private_key()?;
    let signer = WalletSigner::from_hex(&private_key).context("Wallet private key is invalid")?;
    QuestClient::new(config, Arc::new(signer))
}

/// Private key from the environment, falling back to the OS keychain
fn load_private_key() -> Result<String> {
    if let Ok(key) = std::env::var(PRIVATE_KEY_ENV) {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }
    CredentialStore::get_key().with_context(|| {
        format!(
            "No wallet key found: set {} or run `x1quest key set`",
            PRIVATE_KEY_ENV
        )
    })
}

fn session_status(config: &Config) -> Outcome<SessionStatus> {
    let path = match config.tokens_path() {
        Ok(path) => path,
        Err(e) => return failure(e),
    };
    let store = TokenStore::new(path);
    let Some(credential) = store.load() else {
        return Outcome::Failure(format!("No cached session in {}", store.path().display()));
    };

    // The key is optional here; without it the identity check is skipped
    let usable = match load_private_key().and_then(|key| Ok(WalletSigner::from_hex(&key)?)) {
        Ok(signer) => token::is_usable(&credential, &signer.address()),
        Err(_) => !token::is_expired(&credential.token),
    };

    Outcome::Success(SessionStatus {
        tokens_file: store.path().display().to_string(),
        wallet_short: short_address(&credential.identity),
        wallet: credential.identity.clone(),
        token: truncate_string(&credential.token, 24),
        issued_at: credential.issued_at,
        age_minutes: credential.age_minutes(),
        expires_in: token::expires_in(&credential.token)
            .map(format_remaining)
            .unwrap_or_else(|| "unknown".to_string()),
        usable,
    })
}

fn logout(config: &Config) -> Outcome<String> {
    let result = config
        .tokens_path()
        .and_then(|path| {
            let store = TokenStore::new(path);
            store.clear()?;
            Ok(store.path().display().to_string())
        });
    match result {
        Ok(path) => Outcome::Success(format!("Removed cached session {}", path)),
        Err(e) => failure(e),
    }
}

/// Write the effective settings, never replacing an existing file
fn config_init(config: &Config) -> Outcome<String> {
    let path = match Config::config_path() {
        Ok(path) => path,
        Err(e) => return failure(e),
    };
    if path.exists() {
        return Outcome::Failure(format!("Config file already exists: {}", path.display()));
    }
    match config.save() {
        Ok(path) => Outcome::Success(format!("Wrote {}", path.display())),
        Err(e) => failure(e),
    }
}

fn key_set() -> Outcome<String> {
    let result = rpassword::prompt_password("Wallet private key: ")
        .context("Failed to read private key")
        .and_then(|key| {
            let signer = WalletSigner::from_hex(&key).context("Wallet private key is invalid")?;
            CredentialStore::store_key(&key)?;
            Ok(signer.address())
        });
    match result {
        Ok(address) => Outcome::Success(format!("Stored key for {}", address)),
        Err(e) => failure(e),
    }
}

fn key_delete() -> Outcome<String> {
    if !CredentialStore::has_key() {
        return Outcome::Failure("No wallet key stored in the keychain".to_string());
    }
    match CredentialStore::delete_key() {
        Ok(()) => Outcome::Success("Wallet key removed from the keychain".to_string()),
        Err(e) => failure(e),
    }
}
