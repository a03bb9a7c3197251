//! SleepInsight: Sleep-disorder screening
//!
//! Command-line entry point for registration, login and prediction.

use std::io::{BufRead, IsTerminal};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::Zeroizing;

use sleepinsight::adapters::sanitize::SanitizingMakeWriter;
use sleepinsight::adapters::sqlite::SqliteCredentialStore;
use sleepinsight::config::Config;
use sleepinsight::domain::{Page, RegistrationForm, DISCLAIMER};
use sleepinsight::{
    AuthService, InferenceService, PredictionRequest, Registry, Session, SleepInsightError,
};

#[derive(Parser)]
#[command(name = "sleepinsight")]
#[command(about = "Sleep-disorder screening with pre-trained tree models")]
struct Cli {
    /// User database (overrides SLEEPINSIGHT_DB_PATH)
    #[arg(long)]
    db: Option<String>,

    /// Artifact directory (overrides SLEEPINSIGHT_MODEL_PATH)
    #[arg(long)]
    models: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available models with their held-out scores
    Models,

    /// Create an account. Reads the password and its confirmation from stdin.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Check credentials. Reads the password from stdin.
    Login {
        #[arg(long)]
        username: String,
    },

    /// Log in and run a prediction. Reads the password from stdin.
    Predict {
        #[arg(long)]
        username: String,

        #[arg(long, default_value = "Random Forest")]
        model: String,

        #[command(flatten)]
        input: PredictArgs,
    },
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long, default_value = "Male")]
    gender: String,
    #[arg(long, default_value_t = 30)]
    age: u32,
    #[arg(long, default_value = "Software Engineer")]
    occupation: String,
    /// Hours per day
    #[arg(long, default_value_t = 7.0)]
    sleep_duration: f64,
    #[arg(long, default_value_t = 7)]
    quality_of_sleep: u32,
    /// Minutes per day
    #[arg(long, default_value_t = 45)]
    physical_activity_level: u32,
    #[arg(long, default_value_t = 5)]
    stress_level: u32,
    #[arg(long, default_value = "Normal")]
    bmi_category: String,
    #[arg(long, default_value_t = 72)]
    heart_rate: u32,
    #[arg(long, default_value_t = 7500)]
    daily_steps: u32,
    #[arg(long, default_value_t = 120)]
    systolic_bp: u32,
    #[arg(long, default_value_t = 80)]
    diastolic_bp: u32,
}

impl From<PredictArgs> for PredictionRequest {
    fn from(a: PredictArgs) -> Self {
        Self {
            gender: a.gender,
            age: a.age,
            occupation: a.occupation,
            sleep_duration: a.sleep_duration,
            quality_of_sleep: a.quality_of_sleep,
            physical_activity_level: a.physical_activity_level,
            stress_level: a.stress_level,
            bmi_category: a.bmi_category,
            heart_rate: a.heart_rate,
            daily_steps: a.daily_steps,
            systolic_bp: a.systolic_bp,
            diastolic_bp: a.diastolic_bp,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db.into();
    }
    if let Some(models) = cli.models {
        config.model_path = models.into();
    }

    // Initialize logging.
    //
    // Command output goes to stdout, so an interactive terminal gets a log
    // file unless SLEEPINSIGHT_LOG_MODE says otherwise.
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = if config.log_mode.use_file(interactive) {
        if let Some(parent) = config
            .log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("opening log file {}", config.log_file.display()))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting SleepInsight...");

    match run(cli.command, &config) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_recoverable() => {
            eprintln!("{e}");
            Ok(ExitCode::from(1))
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Service error: {e}");
            Ok(ExitCode::from(2))
        }
    }
}

fn run(command: Command, config: &Config) -> sleepinsight::Result<()> {
    match command {
        Command::Models => {
            let registry = Registry::load(&config.model_path)?;
            for model in registry.models().models() {
                let info = model.info();
                println!("{}", info.name);
                if !info.summary.is_empty() {
                    println!("  {}", info.summary);
                }
                if !info.strengths.is_empty() {
                    println!("  Strengths: {}", info.strengths);
                }
                if !info.best_for.is_empty() {
                    println!("  Best for: {}", info.best_for);
                }
                if let Some(m) = info.metrics {
                    println!(
                        "  Accuracy {:.0}%  Precision {:.0}%  Recall {:.0}%  F1 {:.0}%",
                        m.accuracy * 100.0,
                        m.precision * 100.0,
                        m.recall * 100.0,
                        m.f1 * 100.0
                    );
                }
            }
            Ok(())
        }
        Command::Register {
            username,
            name,
            email,
        } => {
            let auth = open_auth(&config.db_path)?;
            let mut lines = std::io::stdin().lock();
            let password = read_secret(&mut lines)?;
            let confirm = read_secret(&mut lines)?;

            let form = RegistrationForm {
                name,
                username,
                email,
                password: password.to_string(),
                confirm_password: confirm.to_string(),
            };
            auth.register(&form)?;
            println!("Registration successful! Please login.");
            Ok(())
        }
        Command::Login { username } => {
            let auth = open_auth(&config.db_path)?;
            let mut session = Session::new();
            login(&auth, &mut session, &username)?;

            if let Some(user) = auth.find_user(&username)? {
                println!("Welcome back, {}!", user.display_name);
                println!("Member since {}", user.created_at_text());
            }
            auth.logout(&mut session);
            Ok(())
        }
        Command::Predict {
            username,
            model,
            input,
        } => {
            let auth = open_auth(&config.db_path)?;
            let mut session = Session::new();
            login(&auth, &mut session, &username)?;
            session.navigate(Page::Predict);

            let registry = Arc::new(Registry::load(&config.model_path)?);
            let inference = InferenceService::new(registry);
            let result = inference.predict_for(&session, &input.into(), &model)?;

            let heading = format!("Prediction ({}): {}", result.model_name, result.label);
            match result.disorder() {
                Some(disorder) if std::io::stdout().is_terminal() => {
                    let (r, g, b) = disorder.color();
                    println!("\x1b[1;38;2;{r};{g};{b}m{heading}\x1b[0m");
                }
                _ => println!("{heading}"),
            }
            if let Some(disorder) = result.disorder() {
                println!();
                println!("{}", disorder.description());
                println!("Next steps: {}", disorder.next_steps());
            }
            println!();
            println!("{DISCLAIMER}");

            auth.logout(&mut session);
            Ok(())
        }
    }
}

fn open_auth(db_path: &Path) -> sleepinsight::Result<AuthService<SqliteCredentialStore>> {
    let store = SqliteCredentialStore::new(db_path)?;
    Ok(AuthService::new(Arc::new(store)))
}

fn login(
    auth: &AuthService<SqliteCredentialStore>,
    session: &mut Session,
    username: &str,
) -> sleepinsight::Result<()> {
    session.navigate(Page::Login);
    let password = read_secret(&mut std::io::stdin().lock())?;
    auth.login(session, username, &password)
}

/// Read one line from `input` without its line ending.
fn read_secret(input: &mut impl BufRead) -> Result<Zeroizing<String>, SleepInsightError> {
    let mut line = Zeroizing::new(String::new());
    input.read_line(&mut line)?;
    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(line)
}
