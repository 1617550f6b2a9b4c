//! triage CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triage::{
    api::TriageApi,
    config::Config,
    error::{Error, Result},
    models::{ChatTurn, QuestionTurn},
    store::TriageDb,
    upstream::UpstreamClient,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(version, about = "Physiotherapy triage workflow backend", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize triage configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Add a local user row (production user provisioning belongs to the
    /// account service; this seeds local setups)
    AddUser {
        /// Display name
        name: String,
        /// Email address (must be unique)
        email: String,
        /// Password value stored as given
        password: String,
    },

    /// Create a new assessment for a user
    Create {
        /// User ID the assessment belongs to
        #[arg(long)]
        user_id: i64,

        /// Anatomy region identifier
        #[arg(long)]
        anatomy_id: i64,

        /// Assessment type label (e.g. PAIN)
        #[arg(long, default_value = "PAIN")]
        assessment_type: String,
    },

    /// Fetch an assessment with its decoded chat history
    Get {
        /// Assessment ID
        assessment_id: i64,
    },

    /// Move an assessment to a new lifecycle status
    SetStatus {
        /// Assessment ID
        assessment_id: i64,

        /// One of: started, in_progress, completed, abandoned
        status: String,
    },

    /// Mark an assessment completed
    Complete {
        /// Assessment ID
        assessment_id: i64,
    },

    /// Submit chat turns to the intake bot
    Chat {
        /// Assessment ID
        assessment_id: i64,

        /// Turn history as JSON, e.g. '[{"user":"my knee hurts"}]'
        turns: String,
    },

    /// Submit questionnaire turns to the questionnaire bot
    Questionnaire {
        /// Assessment ID
        assessment_id: i64,

        /// Turn history as JSON, e.g. '[{"user":"...","assistant":"..."}]'
        turns: String,

        /// Optional video reference for body-part identification
        #[arg(long)]
        video: Option<String>,
    },

    /// Range-of-motion readings
    Rom {
        #[command(subcommand)]
        action: RomAction,
    },

    /// Build the diagnostic dashboard and complete the assessment
    Dashboard {
        /// Assessment ID
        assessment_id: i64,
    },

    /// Show the latest diagnostic analysis for an assessment
    Analysis {
        /// Assessment ID
        assessment_id: i64,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RomAction {
    /// Record a range-of-motion reading
    Submit {
        /// Assessment ID
        assessment_id: i64,

        /// Minimum angle, as a decimal string
        minimum: String,

        /// Maximum angle, as a decimal string
        maximum: String,
    },

    /// Show the latest reading for an assessment
    Latest {
        /// Assessment ID
        assessment_id: i64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if matches!(cli.command, Commands::Init { .. }) {
        return handle_init(cli).await;
    }

    // Handle completions command (doesn't need config/db)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "triage", &mut std::io::stdout());
        return Ok(());
    }

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    // Initialize components
    let db = TriageDb::connect(&config).await?;
    let upstream = UpstreamClient::new(&config.upstream)?;

    // add-user touches the store directly; everything else goes through
    // the envelope surface
    if let Commands::AddUser {
        name,
        email,
        password,
    } = &cli.command
    {
        return handle_add_user(&db, name, email, password).await;
    }

    let api = TriageApi::new(db, upstream);

    let envelope = match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } | Commands::AddUser { .. } => {
            unreachable!()
        }

        Commands::Create {
            user_id,
            anatomy_id,
            assessment_type,
        } => api.create_assessment(user_id, anatomy_id, &assessment_type).await,

        Commands::Get { assessment_id } => api.get_assessment(assessment_id).await,

        Commands::SetStatus {
            assessment_id,
            status,
        } => api.update_status(assessment_id, &status).await,

        Commands::Complete { assessment_id } => api.complete_assessment(assessment_id).await,

        Commands::Chat {
            assessment_id,
            turns,
        } => {
            let turns: Vec<ChatTurn> = serde_json::from_str(&turns)?;
            api.submit_chat(assessment_id, turns).await
        }

        Commands::Questionnaire {
            assessment_id,
            turns,
            video,
        } => {
            let turns: Vec<QuestionTurn> = serde_json::from_str(&turns)?;
            api.submit_questionnaire(assessment_id, turns, video).await
        }

        Commands::Rom { action } => match action {
            RomAction::Submit {
                assessment_id,
                minimum,
                maximum,
            } => api.submit_rom(assessment_id, &minimum, &maximum).await,

            RomAction::Latest { assessment_id } => api.latest_rom(assessment_id).await,
        },

        Commands::Dashboard { assessment_id } => api.build_dashboard(assessment_id).await,

        Commands::Analysis { assessment_id } => api.latest_analysis(assessment_id).await,
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn handle_init(cli: Cli) -> Result<()> {
    let Commands::Init { force } = cli.command else {
        unreachable!()
    };

    // If the user specifies a config file, its parent is the base directory
    let base_dir = match &cli.config {
        Some(path) => path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir),
        None => Config::default_base_dir(),
    };

    let config = Config::load_from(Some(base_dir))?;
    if config.paths.config_file.exists() && !force {
        eprintln!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            config.paths.config_file.display()
        );
        std::process::exit(1);
    }

    config.save()?;
    let db = TriageDb::new(&config.paths.db_file).await?;
    db.init_schema().await?;

    println!("✓ triage initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Database: {}", config.paths.db_file.display());
    println!("\nNext steps:");
    println!("  1. Edit the config file to point at your AI endpoints");
    println!("  2. Add a user: triage add-user 'Pat' pat@example.com <password>");
    println!("  3. Create an assessment: triage create --user-id 1 --anatomy-id 3");

    Ok(())
}

async fn handle_add_user(db: &TriageDb, name: &str, email: &str, password: &str) -> Result<()> {
    if db.user_by_email(email).await?.is_some() {
        return Err(Error::Config(format!("user already exists: {}", email)));
    }

    let user_id = db.insert_user(name, email, password).await?;
    println!("✓ Added user '{}' (id {})", name, user_id);
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(config_path) => {
            if !config_path.exists() {
                eprintln!(
                    "Config file not found: {}\nRun 'triage init' first.",
                    config_path.display()
                );
                std::process::exit(1);
            }
            Config::load(config_path)
        }
        None => Config::load_from(None),
    }
}
