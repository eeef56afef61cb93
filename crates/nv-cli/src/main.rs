//! nv: notevault command-line client
//!
//! Commands:
//!   status                      - marker guess, vault status, storage health
//!   init [--force]              - create the vault and print the recovery key
//!   list [--recovery]           - list decrypted notes
//!   show <id> [--recovery]      - print one note
//!   add --title T --text X      - add a text note (or --item I ... for a checklist)
//!   edit <id> [--title T] ...   - replace a note's title and/or body
//!   rm <id>                     - delete a note (no credential needed)
//!   config show                 - display current configuration

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nv_core::config::{expand_tilde, NvConfig};
use nv_core::{ChecklistItem, Note, NoteBody, NvError, VaultStatus};
use nv_storage::{build_operator, check_health, KvStore};
use nv_vault::{NoteStore, VaultSession};

const ENV_PASSPHRASE: &str = "NV_PASSPHRASE";
const ENV_RECOVERY_KEY: &str = "NV_RECOVERY_KEY";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "nv",
    version,
    about = "End-to-end encrypted notes",
    long_about = "nv: keep notes encrypted at rest under a passphrase, with a one-time recovery key"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "NV_CONFIG",
        default_value = "~/.config/notevault/config.toml"
    )]
    config: PathBuf,

    /// Log level (overrides [log] level)
    #[arg(long, env = "NV_LOG")]
    log: Option<String>,

    /// Log format (overrides [log] format)
    #[arg(long, env = "NV_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show vault and storage status
    Status,

    /// Create a new vault
    ///
    /// Prompts for a passphrase (or reads NV_PASSPHRASE) and prints the
    /// recovery key. The recovery key is shown once and never stored.
    Init {
        /// Replace an existing vault; its notes become unreadable
        #[arg(long)]
        force: bool,
    },

    /// List notes, most recently edited first
    List {
        #[command(flatten)]
        unlock: UnlockArgs,
    },

    /// Print one note
    Show {
        id: String,
        #[command(flatten)]
        unlock: UnlockArgs,
    },

    /// Add a note
    Add {
        #[arg(long, short = 't', default_value = "")]
        title: String,
        #[command(flatten)]
        body: BodyArgs,
        #[command(flatten)]
        unlock: UnlockArgs,
    },

    /// Replace a note's title and/or body
    Edit {
        id: String,
        #[arg(long, short = 't')]
        title: Option<String>,
        #[command(flatten)]
        body: BodyArgs,
        #[command(flatten)]
        unlock: UnlockArgs,
    },

    /// Delete a note
    Rm { id: String },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Args, Debug, Default)]
struct UnlockArgs {
    /// Unlock with the recovery key instead of the passphrase
    #[arg(long)]
    recovery: bool,
}

#[derive(Args, Debug, Default)]
struct BodyArgs {
    /// Plain text body
    #[arg(long, short = 'x', conflicts_with = "items")]
    text: Option<String>,

    /// Checklist item (repeatable); makes the note a checklist
    #[arg(long = "item", short = 'i')]
    items: Vec<String>,
}

impl BodyArgs {
    /// `None` when neither --text nor --item was given.
    fn to_body(&self) -> Option<NoteBody> {
        if !self.items.is_empty() {
            let items = self.items.iter().map(ChecklistItem::new).collect();
            return Some(NoteBody::Checklist(items));
        }
        self.text.clone().map(NoteBody::Text)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = NvConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = match cli.log_format {
        Some(format) => format,
        None if config.log.format == "json" => LogFormat::Json,
        None => LogFormat::Text,
    };
    init_logging(level, &format);

    match cli.command {
        Commands::Status => {
            let (store, mut session, _) = open_vault(&config)?;
            cmd_status(&config, &store, &mut session).await
        }
        Commands::Init { force } => {
            let (_, mut session, _) = open_vault(&config)?;
            cmd_init(&mut session, force).await
        }
        Commands::List { unlock } => {
            let (_, mut session, notes) = open_vault(&config)?;
            cmd_list(&mut session, &notes, &unlock).await
        }
        Commands::Show { id, unlock } => {
            let (_, mut session, notes) = open_vault(&config)?;
            cmd_show(&mut session, &notes, &id, &unlock).await
        }
        Commands::Add { title, body, unlock } => {
            let (_, mut session, notes) = open_vault(&config)?;
            cmd_add(&mut session, &notes, &title, &body, &unlock).await
        }
        Commands::Edit { id, title, body, unlock } => {
            let (_, mut session, notes) = open_vault(&config)?;
            cmd_edit(&mut session, &notes, &id, title.as_deref(), &body, &unlock).await
        }
        Commands::Rm { id } => {
            let (_, _, notes) = open_vault(&config)?;
            cmd_rm(&notes, &id).await
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn open_vault(config: &NvConfig) -> Result<(KvStore, VaultSession, NoteStore)> {
    let store = KvStore::new(build_operator(&config.storage).context("opening storage")?);
    let (session, notes) = nv_vault::open_store(store.clone(), &config.vault);
    Ok((store, session, notes))
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Credentials ───────────────────────────────────────────────────────────────

/// Read a secret from `env_var`, or prompt without echo.
fn read_secret(env_var: &str, prompt: &str) -> Result<SecretString> {
    if let Ok(value) = std::env::var(env_var) {
        tracing::debug!(env_var, "credential taken from environment");
        return Ok(SecretString::from(value));
    }
    let entered = rpassword::prompt_password(prompt).context("reading from terminal")?;
    Ok(SecretString::from(entered))
}

fn read_new_passphrase() -> Result<SecretString> {
    if let Ok(value) = std::env::var(ENV_PASSPHRASE) {
        if value.is_empty() {
            bail!("{ENV_PASSPHRASE} is set but empty");
        }
        return Ok(SecretString::from(value));
    }

    let first = rpassword::prompt_password("New passphrase: ").context("reading from terminal")?;
    if first.is_empty() {
        bail!("passphrase must not be empty");
    }
    let second = rpassword::prompt_password("Repeat passphrase: ").context("reading from terminal")?;
    let first = SecretString::from(first);
    let second = SecretString::from(second);
    if first.expose_secret() != second.expose_secret() {
        bail!("passphrases do not match");
    }
    Ok(first)
}

/// Run the authoritative check, then unlock with the chosen credential.
async fn unlock(session: &mut VaultSession, args: &UnlockArgs) -> Result<()> {
    if session.refresh().await? == VaultStatus::NeedsSetup {
        bail!("no vault found; run `nv init` first");
    }

    let result = if args.recovery {
        let key = read_secret(ENV_RECOVERY_KEY, "Recovery key: ")?;
        let spinner = make_spinner("unlock");
        spinner.set_message("deriving key...");
        let result = session.unlock_with_recovery_key(&key).await;
        spinner.finish_and_clear();
        result
    } else {
        let passphrase = read_secret(ENV_PASSPHRASE, "Passphrase: ")?;
        let spinner = make_spinner("unlock");
        spinner.set_message("deriving key...");
        let result = session.unlock_with_passphrase(&passphrase).await;
        spinner.finish_and_clear();
        result
    };

    match result {
        Ok(()) => Ok(()),
        Err(NvError::Authentication) => bail!("unlock failed: wrong passphrase or recovery key"),
        Err(e) => Err(e.into()),
    }
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `nv status` ───────────────────────────────────────────────────────────────

async fn cmd_status(config: &NvConfig, store: &KvStore, session: &mut VaultSession) -> Result<()> {
    let guess = session.initial_guess().await;
    println!("marker guess:  {guess}");

    match session.refresh().await {
        Ok(status) => println!("vault status:  {status}"),
        Err(e) => println!("vault status:  unknown ({e})"),
    }

    let location = match config.storage.backend.as_str() {
        "fs" => format!("fs at {}", expand_tilde(&config.storage.root).display()),
        other => other.to_string(),
    };
    match check_health(store.operator()).await {
        Ok(()) => println!("storage:       ok ({location})"),
        Err(e) => println!("storage:       unreachable ({location}): {e}"),
    }
    Ok(())
}

// ── `nv init` ─────────────────────────────────────────────────────────────────

async fn cmd_init(session: &mut VaultSession, force: bool) -> Result<()> {
    let status = session.refresh().await?;
    if status != VaultStatus::NeedsSetup && !force {
        bail!("a vault already exists; pass --force to replace it (existing notes become unreadable)");
    }

    let passphrase = read_new_passphrase()?;
    let spinner = make_spinner("init");
    spinner.set_message("deriving keys...");
    let recovery = session.setup_vault(&passphrase).await;
    spinner.finish_and_clear();
    let recovery = recovery?;

    println!("Vault created.");
    println!();
    println!("Recovery key (shown once, store it somewhere safe):");
    println!();
    println!("    {}", recovery.expose_secret());
    println!();
    println!("It unlocks the vault if you forget your passphrase. It cannot be shown again.");
    Ok(())
}

// ── `nv list` / `nv show` ─────────────────────────────────────────────────────

async fn cmd_list(session: &mut VaultSession, notes: &NoteStore, args: &UnlockArgs) -> Result<()> {
    unlock(session, args).await?;
    let listing = notes.list_notes(session.master_key()?).await?;

    if listing.notes.is_empty() && listing.unreadable.is_empty() {
        println!("No notes.");
    }
    for note in &listing.notes {
        println!("{}  {}", note.id, summary(note));
    }
    if !listing.unreadable.is_empty() {
        eprintln!();
        eprintln!("{} note(s) could not be decrypted:", listing.unreadable.len());
        for entry in &listing.unreadable {
            eprintln!("  {}: {}", entry.id, entry.error);
        }
    }
    Ok(())
}

async fn cmd_show(
    session: &mut VaultSession,
    notes: &NoteStore,
    id: &str,
    args: &UnlockArgs,
) -> Result<()> {
    unlock(session, args).await?;
    let Some(note) = notes.get_note(session.master_key()?, id).await? else {
        bail!("no note with id {id}");
    };
    print!("{}", render(&note));
    Ok(())
}

fn display_title(note: &Note) -> &str {
    if note.title.trim().is_empty() {
        "(untitled)"
    } else {
        &note.title
    }
}

/// One-line listing entry: title plus a short hint of the body.
fn summary(note: &Note) -> String {
    let hint = match note.body() {
        NoteBody::Text(text) => text.lines().next().unwrap_or_default().to_string(),
        NoteBody::Checklist(items) => {
            let done = items.iter().filter(|it| it.checked).count();
            format!("[{done}/{} done]", items.len())
        }
    };
    let hint: String = hint.chars().take(48).collect();
    if hint.is_empty() {
        display_title(note).to_string()
    } else {
        format!("{}  {hint}", display_title(note))
    }
}

fn render(note: &Note) -> String {
    let mut out = format!("{}\n\n", display_title(note));
    let body = note.body();
    match &body {
        NoteBody::Text(text) => {
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
        NoteBody::Checklist(_) => {
            for item in body.display_order() {
                let mark = if item.checked { "x" } else { " " };
                out.push_str(&format!("[{mark}] {}\n", item.text));
            }
        }
    }
    out
}

// ── `nv add` / `nv edit` / `nv rm` ────────────────────────────────────────────

async fn cmd_add(
    session: &mut VaultSession,
    notes: &NoteStore,
    title: &str,
    body: &BodyArgs,
    args: &UnlockArgs,
) -> Result<()> {
    let body = body.to_body().unwrap_or_else(|| NoteBody::Text(String::new()));
    if title.trim().is_empty() && body.is_blank() {
        bail!("refusing to save an empty note; give --title, --text or --item");
    }

    unlock(session, args).await?;
    let note = notes
        .add_note(session.master_key()?, title, &body.encode())
        .await?;
    println!("{}", note.id);
    Ok(())
}

async fn cmd_edit(
    session: &mut VaultSession,
    notes: &NoteStore,
    id: &str,
    title: Option<&str>,
    body: &BodyArgs,
    args: &UnlockArgs,
) -> Result<()> {
    let new_body = body.to_body();
    if title.is_none() && new_body.is_none() {
        bail!("nothing to change; give --title, --text or --item");
    }

    unlock(session, args).await?;
    let key = session.master_key()?;
    let Some(current) = notes.get_note(key, id).await? else {
        bail!("no note with id {id}");
    };

    let title = title.unwrap_or(&current.title);
    let text = match &new_body {
        Some(body) => body.encode(),
        None => current.text.clone(),
    };
    if title.trim().is_empty() && NoteBody::decode(&text).is_blank() {
        bail!("refusing to save an empty note");
    }

    match notes.update_note(key, id, title, &text).await? {
        Some(note) => println!("{}", note.id),
        None => bail!("no note with id {id}"),
    }
    Ok(())
}

async fn cmd_rm(notes: &NoteStore, id: &str) -> Result<()> {
    notes.delete_note(id).await?;
    println!("deleted {id}");
    Ok(())
}

// ── `nv config show` ──────────────────────────────────────────────────────────

fn cmd_config_show(config: &NvConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
