use crate::{Config, provider::fmi::FmiProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod fmi;

/// Where a relay cycle gets its raw observation body from.
#[async_trait]
pub trait ObservationSource: Send + Sync + Debug {
    async fn fetch_body(&self) -> anyhow::Result<String>;
}

/// Construct the FMI source from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<FmiProvider> {
    let place = config.place()?;
    FmiProvider::new(config.base_url(), config.api_key(), place)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_place_missing() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No place configured"));
    }

    #[test]
    fn provider_from_config_uses_configured_values() {
        let cfg = Config {
            api_key: Some("KEY".into()),
            place: Some("Helsinki".into()),
            base_url: None,
        };

        let provider = provider_from_config(&cfg).unwrap();
        let url = provider.request_url().to_string();
        assert!(url.starts_with("http://data.fmi.fi/fmi-apikey/KEY/wfs?"));
        assert!(url.contains("place=Helsinki"));
    }

    #[test]
    fn provider_from_config_rejects_bad_base_url() {
        let cfg = Config {
            api_key: None,
            place: Some("Helsinki".into()),
            base_url: Some("not a url".into()),
        };
        assert!(provider_from_config(&cfg).is_err());
    }
}
