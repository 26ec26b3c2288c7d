use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fmi_relay_core::{
    Config, DeviceLink, OutputFormat, Relay, Schedule, Trigger, WeatherMessage, WriterLink,
    extract_observation, provider_from_config, run_event_loop,
};
use inquire::{Password, PasswordDisplayMode, Text};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "fmi-relay", version, about = "Relays FMI weather observations to a watchface")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Device message format written to stdout: "json" or "dictionary".
    #[arg(long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose logging to stderr.
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Values taking precedence over the config file.
#[derive(Debug, Args)]
pub struct Overrides {
    /// Place name to observe, e.g. "Helsinki".
    #[arg(long, global = true)]
    pub place: Option<String>,

    /// FMI API key.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// FMI service root.
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API key and place in the config file.
    Configure,

    /// Fetch once and send the result, as when the watchface opens.
    Fetch,

    /// Fetch on start and again for every line read from stdin.
    Listen {
        /// Also refresh on wall-clock aligned ticks every N minutes
        /// (15 when given without a value).
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        every_minutes: Option<Option<u32>>,
    },

    /// Run extraction on a saved response body.
    Extract {
        /// File containing a WFS response.
        file: PathBuf,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Fetch => {
                let relay = build_relay(self.overrides, self.format)?;
                relay.run_cycle(Trigger::Ready).await;
                Ok(())
            }
            Command::Listen { every_minutes } => {
                let relay = Arc::new(build_relay(self.overrides, self.format)?);
                let schedule = match every_minutes {
                    Some(Some(n)) => Some(Schedule::every_minutes(n)?),
                    Some(None) => Some(Schedule::default()),
                    None => None,
                };
                let inbox = tokio::io::BufReader::new(tokio::io::stdin());

                tokio::select! {
                    res = run_event_loop(relay, inbox, schedule) => {
                        let outcomes = res?;
                        tracing::info!(cycles = outcomes.len(), "device inbox closed, stopping");
                    }
                    _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, stopping"),
                }
                Ok(())
            }
            Command::Extract { file } => {
                let body = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let observation = extract_observation(&body)
                    .with_context(|| format!("Nothing to send from {}", file.display()))?;

                let link = WriterLink::new(std::io::stdout(), self.format);
                link.send(&WeatherMessage::from(observation)).await
            }
        }
    }
}

fn build_relay(overrides: Overrides, format: OutputFormat) -> anyhow::Result<Relay> {
    let Overrides { place, api_key, base_url } = overrides;
    let config = Config::load()?.with_overrides(api_key, place, base_url);
    let provider = provider_from_config(&config)?;
    tracing::debug!(url = %provider.request_url(), "FMI request url");

    let link = WriterLink::new(std::io::stdout(), format);
    Ok(Relay::new(Arc::new(provider), Arc::new(link)))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let place = Text::new("Place name:")
        .with_help_message("Observation place passed to FMI, e.g. Helsinki")
        .with_initial_value(config.place.as_deref().unwrap_or_default())
        .prompt()?;

    let api_key = Password::new("FMI API key (leave empty for open data):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;

    config.place = Some(place.trim().to_string());
    config.api_key = Some(api_key.trim().to_string()).filter(|k| !k.is_empty());
    config.place()?;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}
