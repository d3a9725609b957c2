// src/cli.rs
use crate::app_log;
use crate::config::AppConfig;
use crate::page::{PageDriver, StaticPage};
use crate::pipeline::Pipeline;
use crate::presenter::{self, Presentation};
use crate::profile::{ExpansionTrigger, FieldExtractor};
use crate::relay::{self, BackgroundWorker, PageAgent};
use crate::scoring::{Prompts, ScoringClient};
use crate::settings::{SettingsStore, SETTING_KEYS};
use crate::utils::mask_secret;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "profile-scorer")]
#[command(about = "Extract a LinkedIn profile and score its board fit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct PageSource {
    /// Saved profile page to read
    #[arg(long, conflicts_with = "fetch", required_unless_present = "fetch")]
    pub file: Option<PathBuf>,

    /// Fetch the page over HTTP instead
    #[arg(long)]
    pub fetch: Option<String>,

    /// Profile URL to report for a saved page
    #[arg(long, requires = "file")]
    pub url: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Expand and extract the profile, without scoring
    Extract {
        #[command(flatten)]
        source: PageSource,
        /// Print the record as JSON instead of a field dump
        #[arg(long)]
        json: bool,
    },
    /// Extract, score with the model, and show the result
    Score {
        #[command(flatten)]
        source: PageSource,
        /// Print the answer as it streams in
        #[arg(long)]
        stream: bool,
        /// Write the TSV export line to a file, or `-` for stdout
        #[arg(long)]
        export: Option<PathBuf>,
        /// Prefix the export with a header row
        #[arg(long, requires = "export")]
        header: bool,
        /// Print every extracted field under its own heading
        #[arg(long)]
        dump: bool,
    },
    /// Expose the background relay on localhost
    Serve {
        #[arg(long, default_value_t = 8765)]
        port: u16,
    },
    /// Read or change stored settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Show stored settings, with the API key masked
    Show,
    /// Store the API key
    SetKey { api_key: String },
    /// Store any other setting (language, temperature, defaultPrompt)
    Set { key: String, value: String },
}

pub async fn handle_command(cli: Cli, config: AppConfig) -> Result<()> {
    let settings = SettingsStore::new(config.paths.settings.clone());

    match cli.command {
        Command::Extract { source, json } => {
            let page = open_page(&source).await?;
            let pipeline = Pipeline::start(
                page_agent(&config, page)?,
                background_worker(&config, settings, false)?,
            );
            let record = pipeline.extract().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{}", presenter::debug_dump(&record, pipeline.url()));
            }
        }

        Command::Score {
            source,
            stream,
            export,
            header,
            dump,
        } => {
            let page = open_page(&source).await?;
            let pipeline = Pipeline::start(
                page_agent(&config, page)?,
                background_worker(&config, settings, stream)?,
            );

            let record = pipeline.run().await?;
            if stream {
                println!();
            }

            let presentation = presenter::present(&record.ai_response);
            if let Presentation::Raw(_) = presentation {
                app_log!(warn, "Response is not a structured score, showing it as text");
            }
            println!("{}", presentation);

            if dump {
                println!("\n{}", presenter::debug_dump(&record, pipeline.url()));
            }

            if let Some(target) = export {
                let text = if header {
                    presenter::export_with_header(&record, pipeline.url())?
                } else {
                    presenter::export_line(&record, pipeline.url())?
                };
                if target.as_os_str() == "-" {
                    println!("{}", text);
                } else {
                    tokio::fs::write(&target, format!("{}\n", text))
                        .await
                        .with_context(|| format!("Failed to write export to {}", target.display()))?;
                    app_log!(info, "Export written to {}", target.display());
                }
            }
        }

        Command::Serve { port } => {
            let background = relay::spawn("background", background_worker(&config, settings, false)?);
            relay::http::serve(background, port).await?;
        }

        Command::Settings { command } => handle_settings(command, &settings).await?,
    }

    Ok(())
}

async fn handle_settings(command: SettingsCommand, settings: &SettingsStore) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let stored = settings.load().await?;
            println!("Settings file: {}", settings.path().display());
            println!(
                "claudeApiKey: {}",
                stored.api_key.as_deref().map(mask_secret).unwrap_or_else(|| "(not set)".to_string())
            );
            println!("language: {}", stored.language.as_deref().unwrap_or("(not set)"));
            println!("temperature: {}", stored.temperature.as_deref().unwrap_or("(not set)"));
            println!("defaultPrompt: {}", stored.default_prompt.as_deref().unwrap_or("(not set)"));
        }
        SettingsCommand::SetKey { api_key } => {
            settings.set_api_key(&api_key).await?;
            app_log!(info, "API key saved to {}", settings.path().display());
        }
        SettingsCommand::Set { key, value } => {
            settings.set(&key, &value).await.with_context(|| {
                format!("Could not set '{}' (known keys: {})", key, SETTING_KEYS.join(", "))
            })?;
            app_log!(info, "Saved {}", key);
        }
    }
    Ok(())
}

/// Whether `url` points at a LinkedIn host (`linkedin.com` or a subdomain).
pub fn is_linkedin_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
        .is_some_and(|host| host == "linkedin.com" || host.ends_with(".linkedin.com"))
}

async fn open_page(source: &PageSource) -> Result<Arc<dyn PageDriver>> {
    if let Some(url) = source.fetch.as_deref().or(source.url.as_deref()) {
        if !is_linkedin_url(url) {
            app_log!(
                warn,
                "{} is not a LinkedIn URL; expected a LinkedIn profile page",
                url
            );
        }
    }

    let page = match (&source.file, &source.fetch) {
        (Some(path), _) => StaticPage::from_file(path, source.url.clone()).await?,
        (None, Some(url)) => StaticPage::fetch(url).await?,
        (None, None) => anyhow::bail!("Provide --file or --fetch"),
    };
    Ok(Arc::new(page))
}

fn page_agent(config: &AppConfig, page: Arc<dyn PageDriver>) -> Result<PageAgent> {
    Ok(PageAgent::new(
        page,
        FieldExtractor::new(&config.selectors)?,
        ExpansionTrigger::new(&config.selectors, &config.expansion)?,
    ))
}

fn background_worker(config: &AppConfig, settings: SettingsStore, stream: bool) -> Result<BackgroundWorker> {
    let mut api = config.api.clone();
    api.stream |= stream;

    let prompts = Prompts::load(&config.rubric)?;
    let worker = BackgroundWorker::new(settings, ScoringClient::new(api, prompts)?);
    if !stream {
        return Ok(worker);
    }

    Ok(worker.with_delta_sink(Arc::new(|delta: &str| {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", delta);
        let _ = stdout.flush();
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_score_arguments() {
        let cli = Cli::try_parse_from([
            "profile-scorer",
            "score",
            "--file",
            "page.html",
            "--url",
            "https://example.test/in/ada",
            "--export",
            "-",
            "--header",
        ])
        .unwrap();
        let Command::Score {
            source,
            export,
            header,
            stream,
            dump,
        } = cli.command
        else {
            panic!("expected score command");
        };
        assert_eq!(source.file, Some(PathBuf::from("page.html")));
        assert_eq!(source.url.as_deref(), Some("https://example.test/in/ada"));
        assert_eq!(export, Some(PathBuf::from("-")));
        assert!(header);
        assert!(!stream);
        assert!(!dump);
    }

    #[test]
    fn test_page_source_is_required() {
        assert!(Cli::try_parse_from(["profile-scorer", "extract"]).is_err());
        assert!(Cli::try_parse_from([
            "profile-scorer",
            "extract",
            "--file",
            "a.html",
            "--fetch",
            "https://example.test"
        ])
        .is_err());
    }

    #[test]
    fn test_linkedin_url_check() {
        assert!(is_linkedin_url("https://www.linkedin.com/in/ada"));
        assert!(is_linkedin_url("https://linkedin.com/sales/lead/123"));
        assert!(!is_linkedin_url("https://example.test/in/ada"));
        assert!(!is_linkedin_url("https://notlinkedin.com/in/ada"));
        assert!(!is_linkedin_url("not a url"));
    }

    #[test]
    fn test_serve_default_port() {
        let cli = Cli::try_parse_from(["profile-scorer", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { port: 8765 }));
    }
}
