use anyhow::{bail, Context, Result};
use chat_host::ChatTurnController;
use clap::{Parser, Subcommand};
use providers::GeminiClient;
use services::audio::AudioContext;
use services::{export, LocalStore, NewsDesk, SpeakOutcome};
use shared::chat::GeoLocation;
use shared::news::NewsArticle;
use shared::settings::AppSettings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod chat;
mod config;

#[derive(Parser)]
#[command(name = "daily-drip", version, about = "Your daily drip of world news")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Brew today's five stories
    Brew,
    /// Show today's brew
    News,
    /// Star or unstar story <n> from today's brew
    Star { n: usize },
    /// List saved brews
    Starred,
    /// Write today's brew to a text file
    Export {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Read story <n> aloud
    Speak { n: usize },
    /// Toggle dark mode
    DarkMode,
    /// Chat with the assistant
    Chat {
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("DAILY_DRIP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_articles(articles: &[NewsArticle]) {
    for (i, article) in articles.iter().enumerate() {
        let star = if article.is_starred { "★" } else { " " };
        println!("{} {}. {}  {}", star, i + 1, article.headline, article.tags.join(" "));
        println!("     {}", article.summary);
        println!("     {}", article.source);
    }
}

fn pick<'a>(desk: &'a NewsDesk, n: usize) -> Result<&'a NewsArticle> {
    if desk.news().is_empty() {
        bail!("nothing brewed today yet; run `daily-drip brew` first");
    }
    n.checked_sub(1)
        .and_then(|i| desk.news().get(i))
        .with_context(|| format!("pick a story between 1 and {}", desk.news().len()))
}

fn client(settings: &AppSettings) -> Result<GeminiClient> {
    GeminiClient::from_settings(&settings.gemini)
        .context("set gemini.auth.api_key in settings.json or export GEMINI_API_KEY")
}

async fn run(cli: Cli) -> Result<()> {
    let (settings, loaded) = match &cli.config {
        Some(path) => config::load_settings_from(path),
        None => config::load_settings_or_default(),
    };
    tracing::debug!(loaded, "settings");

    let store = LocalStore::open_default(settings.data_dir.as_deref())?;
    let today = chrono::Local::now().date_naive();
    let mut desk = NewsDesk::open(store, today);

    match cli.command {
        Command::Brew => {
            println!("Brewing your daily drip...");
            let client = client(&settings)?;
            match desk.brew(&client).await {
                Ok(_) => print_articles(desk.news()),
                Err(_) => println!("{}", desk.error().unwrap_or_default()),
            }
        }
        Command::News => {
            if desk.brewed_today() {
                print_articles(desk.news());
            } else {
                println!("Nothing brewed today. Run `daily-drip brew`.");
            }
        }
        Command::Star { n } => {
            let headline = pick(&desk, n)?.headline.clone();
            match desk.toggle_star(&headline) {
                Some(true) => println!("Saved: {}", headline),
                _ => println!("Removed: {}", headline),
            }
        }
        Command::Starred => {
            if desk.starred().is_empty() {
                println!("No saved brews yet.");
            } else {
                print_articles(desk.starred());
            }
        }
        Command::Export { dir } => {
            if desk.news().is_empty() {
                bail!("nothing brewed today to export");
            }
            let dir = dir
                .or_else(|| settings.export_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            let path = export::write_export(&dir, desk.news(), today)?;
            println!("Exported to {}", path.display());
        }
        Command::Speak { n } => {
            let headline = pick(&desk, n)?.headline.clone();
            let client = client(&settings)?;
            match desk.speak(&client, AudioContext::global(), &headline).await {
                SpeakOutcome::Playing => println!("Playing: {}", headline),
                SpeakOutcome::Skipped => println!("Already playing."),
                SpeakOutcome::Failed => {
                    println!("{}", desk.card_error(&headline).unwrap_or_default())
                }
                SpeakOutcome::UnknownHeadline => println!("No such story."),
            }
        }
        Command::DarkMode => {
            let on = desk.toggle_dark_mode();
            println!("Dark mode {}", if on { "on" } else { "off" });
        }
        Command::Chat { lat, lng } => {
            let location = match (lat, lng) {
                (Some(latitude), Some(longitude)) => Some(GeoLocation {
                    latitude,
                    longitude,
                }),
                _ => settings.location,
            };
            let client = client(&settings)?;
            let models = client.models().clone();
            let controller = ChatTurnController::new(Arc::new(client), models);
            chat::run_chat(controller, location).await?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli))
}
