//! Sanctum CLI - private, encrypted wellbeing records
//!
//! Usage:
//!   sanctum init              - Create the device key and data directory
//!   sanctum mood add 7        - Record a mood check-in
//!   sanctum journal list      - Show journal entries
//!   sanctum export --out f    - Export everything, decrypted
//!   sanctum wipe --yes        - Delete all data and the device key
//!   sanctum report            - Privacy report

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sanctum_core::{EncryptionLevel, PrivacySettingsUpdate, Sanctum, SanctumConfig, SensitiveDataScanner};
use sanctum_memory::{BulkOutcome, JournalEntry, MoodEntry, Session, SpeakerRole};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sanctum")]
#[command(author = "HeyBattle1")]
#[command(version)]
#[command(about = "Encrypted local storage for journals, moods and sessions", long_about = None)]
struct Cli {
    /// Config file (default: ~/.sanctum/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and device key
    Init,

    /// Mood check-ins
    Mood {
        #[command(subcommand)]
        action: MoodAction,
    },

    /// Journal entries
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },

    /// Conversation sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Print one record as JSON
    Get {
        /// Record key, e.g. mood_<id>
        key: String,
    },

    /// Delete one record
    Delete {
        /// Record key, e.g. mood_<id>
        key: String,
    },

    /// Export all data, decrypted, as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Delete every record, setting and the device key
    Wipe {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },

    /// Privacy and compliance report
    Report,

    /// Privacy settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Retention policy
    Retention {
        #[command(subcommand)]
        action: RetentionAction,
    },

    /// Cache inspection
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check text for identifiers and credentials
    Validate {
        text: String,
    },
}

#[derive(Subcommand)]
enum MoodAction {
    /// Record a mood from 1 to 10
    Add {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=10))]
        score: u8,
        /// Emotion label (repeatable)
        #[arg(short, long)]
        emotion: Vec<String>,
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List mood check-ins
    List,
}

#[derive(Subcommand)]
enum JournalAction {
    /// Write a journal entry
    Add {
        title: String,
        content: String,
        /// Tag (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// List journal entries
    List,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start a session with an opening message
    Add {
        message: String,
        /// Close the session with this summary
        #[arg(long)]
        summary: Option<String>,
    },

    /// List sessions
    List,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show current settings
    Show,

    /// Change settings
    Set {
        #[arg(long)]
        retention_days: Option<u32>,
        #[arg(long)]
        auto_delete: Option<bool>,
        #[arg(long, value_enum)]
        encryption_level: Option<Level>,
        #[arg(long)]
        analytics: Option<bool>,
        #[arg(long)]
        crash_reporting: Option<bool>,
        #[arg(long)]
        export: Option<bool>,
        #[arg(long)]
        import: Option<bool>,
    },
}

#[derive(Subcommand)]
enum RetentionAction {
    /// Delete records outside the retention window now
    Enforce,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Cache statistics
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Standard,
    High,
    Maximum,
}

impl From<Level> for EncryptionLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Standard => EncryptionLevel::Standard,
            Level::High => EncryptionLevel::High,
            Level::Maximum => EncryptionLevel::Maximum,
        }
    }
}

/// Print per-item failures of a bulk operation to stderr.
fn report_failures<T>(outcome: &BulkOutcome<T>) {
    for failure in outcome.failures() {
        eprintln!("⚠️  {}: {}", failure.item, failure.error);
    }
}

async fn open(config_path: Option<PathBuf>) -> anyhow::Result<Sanctum> {
    let path = match config_path {
        Some(path) => path,
        None => SanctumConfig::default_path()?,
    };
    let config = SanctumConfig::load(&path)?;
    let app = Sanctum::open(config).context("Failed to open storage")?;
    app.init().await.context("Failed to initialize")?;
    Ok(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        // no storage needed
        Commands::Validate { text } => {
            let report = SensitiveDataScanner::new()?.validate_text(&text);
            if report.valid {
                println!("✅ Nothing sensitive found");
            } else {
                for error in &report.errors {
                    println!("⚠️  {}", error);
                }
            }
            return Ok(());
        }
        command => command,
    };

    let app = open(cli.config).await?;

    match command {
        Commands::Init => {
            println!("🔐 Sanctum is ready");
            println!("  Data directory: {}", app.config().data_dir.display());
            println!("  Record store:   {}", app.store().store_name());
            println!("  Device key:     {}", if app.key_manager().has_key() { "loaded" } else { "missing" });
        }

        Commands::Mood { action } => match action {
            MoodAction::Add { score, emotion, note } => {
                let mut mood = MoodEntry::new(score).with_emotions(emotion);
                if let Some(note) = note {
                    mood = mood.with_note(note);
                }
                app.save_mood(&mood).await?;
                println!("✅ Saved mood_{}", mood.id);
            }
            MoodAction::List => {
                let outcome = app.store().get_all_moods().await;
                report_failures(&outcome);
                let mut moods = outcome.into_value().unwrap_or_default();
                moods.sort_by_key(|m| m.recorded_at);
                for mood in moods {
                    println!(
                        "{}  {:>2}/10  {}  {}",
                        mood.recorded_at.format("%Y-%m-%d %H:%M"),
                        mood.mood,
                        mood.emotions.join(", "),
                        mood.note.unwrap_or_default()
                    );
                }
            }
        },

        Commands::Journal { action } => match action {
            JournalAction::Add { title, content, tag } => {
                let entry = JournalEntry::new(title, content).with_tags(tag);
                let check = app.privacy().validate_data_for_storage(&entry)?;
                for error in &check.errors {
                    eprintln!("⚠️  {}", error);
                }
                app.save_journal(&entry).await?;
                println!("✅ Saved journal_{}", entry.id);
            }
            JournalAction::List => {
                let outcome = app.store().get_all_journals().await;
                report_failures(&outcome);
                let mut entries = outcome.into_value().unwrap_or_default();
                entries.sort_by_key(|e| e.created_at);
                for entry in entries {
                    println!("{}  {}  [{}]", entry.created_at.format("%Y-%m-%d"), entry.title, entry.tags.join(", "));
                }
            }
        },

        Commands::Session { action } => match action {
            SessionAction::Add { message, summary } => {
                let mut session = Session::new();
                session.add_message(SpeakerRole::User, message);
                if summary.is_some() {
                    session.end(summary);
                }
                app.save_session(&session).await?;
                println!("✅ Saved session_{}", session.id);
            }
            SessionAction::List => {
                let outcome = app.store().get_all_sessions().await;
                report_failures(&outcome);
                let mut sessions = outcome.into_value().unwrap_or_default();
                sessions.sort_by_key(|s| s.started_at);
                for session in sessions {
                    println!(
                        "{}  {}  {} messages  {}",
                        session.started_at.format("%Y-%m-%d %H:%M"),
                        if session.is_active() { "open  " } else { "closed" },
                        session.messages.len(),
                        session.summary.unwrap_or_default()
                    );
                }
            }
        },

        Commands::Get { key } => match app.load_value::<serde_json::Value>(&key).await {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("No record {}", key),
        },

        Commands::Delete { key } => {
            if app.delete_value(&key).await? {
                println!("🗑️  Deleted {}", key);
            } else {
                println!("No record {}", key);
            }
        }

        Commands::Export { out } => {
            let outcome = app.privacy().export_user_data().await?;
            report_failures(&outcome);
            let export = outcome
                .into_value()
                .context("Nothing could be exported")?;
            let json = serde_json::to_string_pretty(&export)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✅ Exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Wipe { yes } => {
            if !yes {
                println!("This deletes every record, your settings and the device key.");
                println!("Nothing can be recovered afterwards. Re-run with --yes to continue.");
                return Ok(());
            }
            let outcome = app.privacy().delete_all_user_data().await;
            report_failures(&outcome);
            match outcome.value() {
                Some(summary) => {
                    println!("🗑️  Deleted {} records", summary.records_deleted);
                    println!("  Cleared: {}", summary.stores_cleared.join(", "));
                    for path in &summary.files_removed {
                        println!("  Removed: {}", path.display());
                    }
                }
                None => anyhow::bail!("Nothing could be deleted"),
            }
        }

        Commands::Report => {
            let report = app.privacy().generate_privacy_report().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", serde_json::to_string_pretty(&app.privacy().get_privacy_settings())?);
            }
            SettingsAction::Set {
                retention_days,
                auto_delete,
                encryption_level,
                analytics,
                crash_reporting,
                export,
                import,
            } => {
                let update = PrivacySettingsUpdate {
                    data_retention_days: retention_days,
                    auto_delete,
                    encryption_level: encryption_level.map(Into::into),
                    analytics_opt_in: analytics,
                    crash_reporting,
                    data_export: export,
                    data_import: import,
                };
                if update.is_empty() {
                    println!("Nothing to change");
                } else {
                    let settings = app.privacy().update_privacy_settings(&update)?;
                    println!("{}", serde_json::to_string_pretty(&settings)?);
                }
            }
        },

        Commands::Retention { action } => match action {
            RetentionAction::Enforce => {
                let outcome = app.privacy().enforce_retention().await;
                report_failures(&outcome);
                let purged = outcome.value().copied().unwrap_or(0);
                println!("Purged {} records", purged);
            }
        },

        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                let stats = app.cache().get_stats().await;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        },

        Commands::Validate { .. } => {}
    }

    app.destroy();
    Ok(())
}
