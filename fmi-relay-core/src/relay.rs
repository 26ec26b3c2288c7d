//! One fetch, extract and forward cycle.
//!
//! A cycle never returns an error. Fetch and extraction failures drop the
//! cycle, send failures are only logged. Nothing is retried.

use std::sync::Arc;

use crate::{
    device::DeviceLink,
    extract::{ExtractError, extract_observation},
    model::{Trigger, WeatherMessage},
    provider::ObservationSource,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Transport error or non-success status.
    Fetch(String),
    Extract(ExtractError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent(WeatherMessage),
    SendFailed(WeatherMessage),
    Dropped(DropReason),
}

#[derive(Debug, Clone)]
pub struct Relay {
    source: Arc<dyn ObservationSource>,
    link: Arc<dyn DeviceLink>,
}

impl Relay {
    pub fn new(source: Arc<dyn ObservationSource>, link: Arc<dyn DeviceLink>) -> Self {
        Self { source, link }
    }

    pub async fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        tracing::debug!(%trigger, "fetching weather");

        let body = match self.source.fetch_body().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(%trigger, "weather fetch failed: {e:#}");
                return CycleOutcome::Dropped(DropReason::Fetch(format!("{e:#}")));
            }
        };

        let observation = match extract_observation(&body) {
            Ok(obs) => obs,
            Err(e) => {
                tracing::warn!(%trigger, "dropping weather update: {e}");
                return CycleOutcome::Dropped(DropReason::Extract(e));
            }
        };

        let message = WeatherMessage::from(observation);
        tracing::info!(temperature = %message.temperature, city = %message.city, "weather extracted");
        if !message.fits_watch_buffers() {
            tracing::warn!("weather message exceeds watch display buffers, it will be truncated");
        }

        match self.link.send(&message).await {
            Ok(()) => {
                tracing::info!("weather info sent to device");
                CycleOutcome::Sent(message)
            }
            Err(e) => {
                tracing::error!("error sending weather info to device: {e:#}");
                CycleOutcome::SendFailed(message)
            }
        }
    }
}
