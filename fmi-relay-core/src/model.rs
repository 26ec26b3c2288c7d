use serde::{Deserialize, Serialize};

/// Message key the watch reads the temperature from.
pub const TEMPERATURE_KEY: u32 = 0;
/// Message key the watch reads the city from.
pub const CITY_KEY: u32 = 1;

/// Display buffer sizes on the watch, NUL terminator included.
pub const TEMPERATURE_BUFFER_LEN: usize = 10;
pub const CITY_BUFFER_LEN: usize = 32;

const CELSIUS_SUFFIX: &str = "\u{B0}C";

/// Values pulled out of one observation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub temperature: String,
    pub place: String,
}

/// Two-field message forwarded to the watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherMessage {
    pub temperature: String,
    pub city: String,
}

impl From<Observation> for WeatherMessage {
    fn from(Observation { temperature, place }: Observation) -> Self {
        Self {
            temperature: format!("{temperature}{CELSIUS_SUFFIX}"),
            city: place,
        }
    }
}

impl WeatherMessage {
    /// Whether both fields fit the watch display buffers untruncated.
    pub fn fits_watch_buffers(&self) -> bool {
        self.temperature.len() < TEMPERATURE_BUFFER_LEN && self.city.len() < CITY_BUFFER_LEN
    }
}

/// What started a relay cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The watchface was opened.
    Ready,
    /// The watch sent a message.
    DeviceMessage,
    /// Scheduled refresh.
    Tick,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Trigger::Ready => "ready",
            Trigger::DeviceMessage => "device-message",
            Trigger::Tick => "tick",
        })
    }
}
