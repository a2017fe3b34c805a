use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Canonical identifiers of the upstream providers the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    OpenWeatherMap,
    Weatherstack,
    GoogleAi,
    Sensoterra,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenWeatherMap => "openweathermap",
            Self::Weatherstack => "weatherstack",
            Self::GoogleAi => "google_ai",
            Self::Sensoterra => "sensoterra",
        }
    }

    /// Human-facing provider name used in log lines and error messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenWeatherMap => "OpenWeatherMap",
            Self::Weatherstack => "Weatherstack",
            Self::GoogleAi => "Google AI",
            Self::Sensoterra => "Sensoterra",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
