//! Core library for the `fmi-relay` watchface companion.
//!
//! This crate defines:
//! - Configuration handling
//! - Fetching observations from the FMI WFS service
//! - Pattern-based extraction of temperature and place
//! - The device link and its dictionary wire format
//! - The fetch-and-forward relay cycle and the event loop driving it
//!
//! It is used by `fmi-relay-cli`, but can also be embedded in other hosts.

pub mod config;
pub mod device;
pub mod dictionary;
pub mod events;
pub mod extract;
pub mod model;
pub mod provider;
pub mod relay;

pub use config::Config;
pub use device::{DeviceLink, OutputFormat, WriterLink};
pub use events::{Schedule, run_event_loop};
pub use extract::{ExtractError, extract_observation};
pub use model::{Observation, Trigger, WeatherMessage};
pub use provider::{ObservationSource, fmi::FmiProvider, provider_from_config};
pub use relay::{CycleOutcome, DropReason, Relay};
