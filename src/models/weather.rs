//! Generation context: weather and occasion.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

impl WeatherCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "Sunny",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Rainy => "Rainy",
            WeatherCondition::Snowy => "Snowy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub condition: WeatherCondition,
    pub temperature_c: f64,
}

impl Weather {
    pub const MIN_TEMPERATURE_C: f64 = -60.0;
    pub const MAX_TEMPERATURE_C: f64 = 60.0;

    pub fn is_plausible(&self) -> bool {
        self.temperature_c.is_finite()
            && (Self::MIN_TEMPERATURE_C..=Self::MAX_TEMPERATURE_C).contains(&self.temperature_c)
    }
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            condition: WeatherCondition::Sunny,
            temperature_c: 22.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Occasion {
    #[default]
    Casual,
    Chic,
    Formal,
}

impl Occasion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Casual => "Casual",
            Occasion::Chic => "Chic",
            Occasion::Formal => "Formal",
        }
    }
}
