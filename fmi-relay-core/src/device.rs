use std::{fmt::Debug, io::Write, str::FromStr, sync::Mutex};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use crate::{dictionary::Dictionary, model::WeatherMessage};

/// Outbound channel to the paired watch.
#[async_trait]
pub trait DeviceLink: Send + Sync + Debug {
    async fn send(&self, message: &WeatherMessage) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    /// Hex of the dictionary wire encoding.
    Dictionary,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "dictionary" | "dict" => Ok(OutputFormat::Dictionary),
            _ => Err(anyhow!("Unknown output format '{s}'. Supported formats: json, dictionary.")),
        }
    }
}

/// Writes one line per message to the wrapped writer.
#[derive(Debug)]
pub struct WriterLink<W> {
    format: OutputFormat,
    out: Mutex<W>,
}

impl<W: Write + Send> WriterLink<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { format, out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn render(&self, message: &WeatherMessage) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string(message).context("Failed to serialize weather message")
            }
            OutputFormat::Dictionary => {
                let bytes = Dictionary::from(message)
                    .encode()
                    .context("Failed to encode weather message")?;
                Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
            }
        }
    }
}

#[async_trait]
impl<W: Write + Send + Debug> DeviceLink for WriterLink<W> {
    async fn send(&self, message: &WeatherMessage) -> Result<()> {
        let line = self.render(message)?;

        let mut out = self.out.lock().map_err(|_| anyhow!("Device writer lock poisoned"))?;
        writeln!(out, "{line}").context("Failed to write message to device")?;
        out.flush().context("Failed to flush device writer")?;
        Ok(())
    }
}
