use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};

use super::ObservationSource;

const STORED_QUERY: &str = "fmi::observations::weather::multipointcoverage";

/// Finnish Meteorological Institute WFS observation source.
#[derive(Debug, Clone)]
pub struct FmiProvider {
    url: Url,
    http: Client,
}

impl FmiProvider {
    pub fn new(base_url: &str, api_key: Option<&str>, place: &str) -> Result<Self> {
        let mut url = Url::parse(base_url)
            .with_context(|| format!("Invalid FMI base url: {base_url}"))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("FMI base url cannot have a path: {base_url}"))?;
            segments.pop_if_empty();
            if let Some(key) = api_key {
                segments.push("fmi-apikey").push(key);
            }
            segments.push("wfs");
        }

        url.query_pairs_mut()
            .append_pair("request", "getFeature")
            .append_pair("storedquery_id", STORED_QUERY)
            .append_pair("place", place)
            .append_pair("parameters", "temperature")
            .append_pair("maxlocations", "1");

        Ok(Self { url, http: Client::new() })
    }

    /// The full request url, API key included.
    pub fn request_url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ObservationSource for FmiProvider {
    async fn fetch_body(&self) -> Result<String> {
        let res = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .context("Failed to send request to FMI")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read FMI response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "FMI request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        tracing::debug!(bytes = body.len(), "FMI response received");
        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_api_key() {
        let p = FmiProvider::new("http://data.fmi.fi", Some("abc-123"), "Helsinki").unwrap();
        assert_eq!(
            p.request_url().as_str(),
            "http://data.fmi.fi/fmi-apikey/abc-123/wfs?request=getFeature\
             &storedquery_id=fmi%3A%3Aobservations%3A%3Aweather%3A%3Amultipointcoverage\
             &place=Helsinki&parameters=temperature&maxlocations=1"
        );
    }

    #[test]
    fn url_without_api_key() {
        let p = FmiProvider::new("https://opendata.fmi.fi/", None, "Oulu").unwrap();
        let url = p.request_url();
        assert_eq!(url.path(), "/wfs");
        assert!(url.query().unwrap().contains("place=Oulu"));
    }

    #[test]
    fn place_is_query_encoded() {
        let p = FmiProvider::new("http://data.fmi.fi", None, "Helsinki Kaisaniemi").unwrap();
        assert!(p.request_url().query().unwrap().contains("place=Helsinki+Kaisaniemi"));
    }

    #[test]
    fn base_url_path_is_kept() {
        let p = FmiProvider::new("http://localhost:9000/proxy", None, "Oulu").unwrap();
        assert_eq!(p.request_url().path(), "/proxy/wfs");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "ä".repeat(300);
        let t = truncate_body(&long);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
