//! Mapping from SMHI `weather_symbol` codes (Wsymb2) to sky conditions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Textual sky/precipitation condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionTag {
    #[serde(rename = "clear-night")]
    ClearNight,
    #[serde(rename = "sunny")]
    Sunny,
    #[serde(rename = "partlycloudy")]
    PartlyCloudy,
    #[serde(rename = "cloudy")]
    Cloudy,
    #[serde(rename = "fog")]
    Fog,
    #[serde(rename = "rainy")]
    Rainy,
    #[serde(rename = "lightning-rainy")]
    LightningRainy,
    #[serde(rename = "snowy-rainy")]
    SnowyRainy,
    #[serde(rename = "snowy")]
    Snowy,
}

impl ConditionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionTag::ClearNight => "clear-night",
            ConditionTag::Sunny => "sunny",
            ConditionTag::PartlyCloudy => "partlycloudy",
            ConditionTag::Cloudy => "cloudy",
            ConditionTag::Fog => "fog",
            ConditionTag::Rainy => "rainy",
            ConditionTag::LightningRainy => "lightning-rainy",
            ConditionTag::SnowyRainy => "snowy-rainy",
            ConditionTag::Snowy => "snowy",
        }
    }

    pub const fn all() -> &'static [ConditionTag] {
        &[
            ConditionTag::ClearNight,
            ConditionTag::Sunny,
            ConditionTag::PartlyCloudy,
            ConditionTag::Cloudy,
            ConditionTag::Fog,
            ConditionTag::Rainy,
            ConditionTag::LightningRainy,
            ConditionTag::SnowyRainy,
            ConditionTag::Snowy,
        ]
    }
}

impl fmt::Display for ConditionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Order matters: code 1 is both clear-night and sunny, and the first row wins.
const CONDITION_TABLE: [(ConditionTag, &[i64]); 9] = [
    (ConditionTag::ClearNight, &[1]),
    (ConditionTag::Sunny, &[1, 2]),
    (ConditionTag::PartlyCloudy, &[3, 4]),
    (ConditionTag::Cloudy, &[5, 6]),
    (ConditionTag::Fog, &[7]),
    (ConditionTag::Rainy, &[8, 9, 10, 18, 19, 20]),
    (ConditionTag::LightningRainy, &[11, 21]),
    (ConditionTag::SnowyRainy, &[12, 13, 14, 22, 23, 24]),
    (ConditionTag::Snowy, &[15, 16, 17, 25, 26, 27]),
];

/// Condition for a symbol code, or `None` for an absent or unknown code.
pub fn classify(symbol: Option<i64>) -> Option<ConditionTag> {
    let code = symbol?;
    CONDITION_TABLE
        .iter()
        .find(|(_, codes)| codes.contains(&code))
        .map(|(tag, _)| *tag)
}

/// Human-readable name of a Wsymb2 code.
pub fn symbol_description(code: i64) -> Option<&'static str> {
    let text = match code {
        1 => "Clear sky",
        2 => "Nearly clear sky",
        3 => "Variable cloudiness",
        4 => "Halfclear sky",
        5 => "Cloudy sky",
        6 => "Overcast",
        7 => "Fog",
        8 => "Light rain showers",
        9 => "Moderate rain showers",
        10 => "Heavy rain showers",
        11 => "Thunderstorm",
        12 => "Light sleet showers",
        13 => "Moderate sleet showers",
        14 => "Heavy sleet showers",
        15 => "Light snow showers",
        16 => "Moderate snow showers",
        17 => "Heavy snow showers",
        18 => "Light rain",
        19 => "Moderate rain",
        20 => "Heavy rain",
        21 => "Thunder",
        22 => "Light sleet",
        23 => "Moderate sleet",
        24 => "Heavy sleet",
        25 => "Light snowfall",
        26 => "Moderate snowfall",
        27 => "Heavy snowfall",
        _ => return None,
    };
    Some(text)
}
