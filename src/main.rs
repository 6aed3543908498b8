mod ai;
mod app;
mod config;
mod dashboard;
mod extract;
mod models;
mod tui;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai::{CompletionProvider, GeminiProvider};
use app::{AppState, Step};
use config::Config;
use extract::{LibraryExtractor, Upload};
use models::{ExperienceLevel, ROLES};

#[derive(Parser)]
#[command(name = "atscore")]
#[command(about = "Score a resume against a target role with a hosted AI model")]
struct Cli {
    /// Model to use (flash, pro, 2.5-flash, 2.5-pro); overrides config
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct TargetArgs {
    /// Target role, by catalog id or title (see `atscore roles`)
    #[arg(short, long)]
    role: Option<String>,

    /// Free-text role; overrides --role when non-empty
    #[arg(short, long)]
    custom_role: Option<String>,

    /// Experience level (fresher, junior, mid, senior)
    #[arg(short, long, default_value = "fresher")]
    level: ExperienceLevel,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive scorer (default)
    Ui {
        /// Resume file to load on start
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Analyze a resume once and print the dashboard
    Analyze {
        /// Resume file (PDF, DOCX, TXT, MD)
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Resume text; read from stdin when neither --file nor --text is given
        #[arg(short, long)]
        text: Option<String>,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the analysis as JSON instead of the dashboard
        #[arg(long)]
        json: bool,
    },

    /// Print the text extracted from a resume file
    Extract {
        /// Path to resume file
        file: PathBuf,
    },

    /// List target roles and experience levels
    Roles,

    /// Print the response schema sent to the model
    Schema,

    /// Show configuration
    Config,
}

fn init_logging(verbose: bool, to_file: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), default_level)));

    if to_file {
        let path = Config::log_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn build_state(model_name: &str, target: &TargetArgs) -> Result<AppState> {
    let mut state = AppState::new(model_name);
    if let Some(role) = &target.role {
        state.role_index = models::find_role(role).ok_or_else(|| {
            anyhow!("Unknown role '{}'. Run 'atscore roles' to list them, or use --custom-role.", role)
        })?;
    }
    if let Some(custom) = &target.custom_role {
        state.custom_role = custom.clone();
    }
    state.level = target.level;
    Ok(state)
}

fn build_provider(config: &Config) -> Result<GeminiProvider> {
    let provider = GeminiProvider::from_config(config)?;
    info!("Analysis client ready (model: {})", provider.model_name());
    Ok(provider)
}

/// Dashboard width for printed reports; falls back to 100 columns off a terminal.
fn report_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(100)
        .clamp(40, 100)
}

fn read_resume(file: Option<PathBuf>, text: Option<String>, state: &mut AppState) -> Result<()> {
    match (file, text) {
        (Some(path), _) => {
            let upload = Upload::from_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            state.load_file(&LibraryExtractor, &upload);
            if let Some(err) = state.error.take() {
                return Err(anyhow!(err));
            }
        }
        (None, Some(text)) => state.resume_text = text,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read resume text from stdin")?;
            state.resume_text = text;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Ui {
        file: None,
        target: TargetArgs::default(),
    });
    init_logging(cli.verbose, matches!(command, Commands::Ui { .. }))?;

    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = model;
    }

    match command {
        Commands::Ui { file, target } => {
            let provider = build_provider(&config)?;
            let state = build_state(provider.model_name(), &target)?;
            tui::run(state, Arc::new(provider), file)?;
        }

        Commands::Analyze {
            file,
            text,
            target,
            json,
        } => {
            let provider = build_provider(&config)?;
            let mut state = build_state(provider.model_name(), &target)?;
            read_resume(file, text, &mut state)?;

            state.run_analysis(&provider)?;
            match (state.step, state.analysis.take()) {
                (Step::Result, Some(analysis)) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&analysis)?);
                    } else {
                        print!(
                            "{}",
                            dashboard::to_plain(&dashboard::render(&analysis, report_width()))
                        );
                    }
                }
                _ => {
                    let message = state.error.unwrap_or_else(|| "Analysis failed.".to_string());
                    return Err(anyhow!(message));
                }
            }
        }

        Commands::Extract { file } => {
            let upload = Upload::from_path(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let text = extract::extract_text(&LibraryExtractor, &upload)?;
            print!("{}", text);
        }

        Commands::Roles => {
            println!("{:<12} {}", "ID", "ROLE");
            println!("{}", "-".repeat(36));
            for role in ROLES {
                println!("{:<12} {}", role.id, role.title);
            }
            println!("\n{:<12} {}", "LEVEL", "LABEL");
            println!("{}", "-".repeat(36));
            for level in ExperienceLevel::ALL {
                println!("{:<12} {}", level.short_name(), level.label());
            }
        }

        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&ai::response_schema())?);
        }

        Commands::Config => {
            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!(
                    "Config file: {} (not found, using defaults)",
                    Config::default_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "-".to_string())
                ),
            }
            match ai::resolve_model(&config.model) {
                Ok(spec) => println!("Model: {} ({})", spec.short_name, spec.model_id),
                Err(e) => println!("Model: {} (invalid: {})", config.model, e),
            }
            println!("Endpoint: {}", config.endpoint);
            println!("Timeout: {}s", config.timeout.as_secs());
            println!("API key: {}", config.redacted_key());
            println!("Log file: {}", Config::log_path().display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_width_bounds() {
        let width = report_width();
        assert!((40..=100).contains(&width));
    }

    #[test]
    fn test_cli_parses_analyze_target() {
        let cli = Cli::try_parse_from([
            "atscore", "analyze", "--text", "Go", "--role", "backend", "--level", "senior", "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Analyze { text, target, json, .. }) => {
                assert_eq!(text.as_deref(), Some("Go"));
                assert_eq!(target.role.as_deref(), Some("backend"));
                assert_eq!(target.level, ExperienceLevel::Senior);
                assert!(json);
            }
            _ => panic!("expected analyze"),
        }
    }
}
