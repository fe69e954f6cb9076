// src/config.rs

use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::errors::ConfigError;
use crate::matching::address::normalize;

// Minimum overall score for a pair to be reported as duplicate
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;

// Signal weights for the overall pair score (renormalized by their sum)
pub const ADDRESS_WEIGHT: f64 = 0.40;
pub const TITLE_WEIGHT: f64 = 0.20;
pub const CATEGORY_WEIGHT: f64 = 0.15;
pub const VALUE_WEIGHT: f64 = 0.15;
pub const AREA_WEIGHT: f64 = 0.10;

// Per-signal thresholds used only to explain a reported pair
pub const ADDRESS_REASON_THRESHOLD: f64 = 0.6;
pub const TITLE_REASON_THRESHOLD: f64 = 0.6;
pub const VALUE_REASON_THRESHOLD: f64 = 0.8;
pub const AREA_REASON_THRESHOLD: f64 = 0.8;

// Neutral score used when a signal cannot be computed from both records
pub const NEUTRAL_SIMILARITY: f64 = 0.5;

// Address similarity bonuses
pub const NUMBER_MATCH_BONUS: f64 = 0.15;
pub const STREET_TYPE_MATCH_BONUS: f64 = 0.05;
pub const STREET_NAME_MATCH_BONUS: f64 = 0.10;
pub const STREET_NAME_BONUS_THRESHOLD: f64 = 0.8;

// Auction dates must fall inside [today - PAST, today + FUTURE]
pub const DATE_WINDOW_PAST_DAYS: i64 = 30;
pub const DATE_WINDOW_FUTURE_DAYS: i64 = 365;
pub const MAX_DATE_WINDOW_DAYS: i64 = 36_500;

// Source discount is overwritten when it differs from the computed one by more than this
pub const DISCOUNT_TOLERANCE_POINTS: f64 = 1.0;

// Stamped on every audited record
pub const AUDIT_RULE_VERSION: &str = "quality-audit/1.3.0";

pub const VALID_STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

pub const STATE_CAPITALS: [(&str, &str); 27] = [
    ("Rio Branco", "AC"),
    ("Maceió", "AL"),
    ("Macapá", "AP"),
    ("Manaus", "AM"),
    ("Salvador", "BA"),
    ("Fortaleza", "CE"),
    ("Brasília", "DF"),
    ("Vitória", "ES"),
    ("Goiânia", "GO"),
    ("São Luís", "MA"),
    ("Cuiabá", "MT"),
    ("Campo Grande", "MS"),
    ("Belo Horizonte", "MG"),
    ("Belém", "PA"),
    ("João Pessoa", "PB"),
    ("Curitiba", "PR"),
    ("Recife", "PE"),
    ("Teresina", "PI"),
    ("Rio de Janeiro", "RJ"),
    ("Natal", "RN"),
    ("Porto Alegre", "RS"),
    ("Porto Velho", "RO"),
    ("Boa Vista", "RR"),
    ("Florianópolis", "SC"),
    ("São Paulo", "SP"),
    ("Aracaju", "SE"),
    ("Palmas", "TO"),
];

// chrono formats tried in order when a round date arrives as raw text
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
pub const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

pub const SIMILARITY_THRESHOLD_ENV: &str = "DEDUP_SIMILARITY_THRESHOLD";
pub const REVIEW_THRESHOLD_ENV: &str = "DEDUP_REVIEW_THRESHOLD";
pub const SURVIVOR_STRATEGY_ENV: &str = "DEDUP_SURVIVOR_STRATEGY";
pub const DATE_PAST_DAYS_ENV: &str = "AUDIT_DATE_PAST_DAYS";
pub const DATE_FUTURE_DAYS_ENV: &str = "AUDIT_DATE_FUTURE_DAYS";

/// Weights of the five pair signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalWeights {
    pub address: f64,
    pub title: f64,
    pub category: f64,
    pub value: f64,
    pub area: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            address: ADDRESS_WEIGHT,
            title: TITLE_WEIGHT,
            category: CATEGORY_WEIGHT,
            value: VALUE_WEIGHT,
            area: AREA_WEIGHT,
        }
    }
}

impl SignalWeights {
    pub fn total(&self) -> f64 {
        self.address + self.title + self.category + self.value + self.area
    }

    fn as_array(&self) -> [(&'static str, f64); 5] {
        [
            ("address", self.address),
            ("title", self.title),
            ("category", self.category),
            ("value", self.value),
            ("area", self.area),
        ]
    }
}

/// Configuration of the duplicate detector.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    pub similarity_threshold: f64,
    /// Lower bound of the manual-review band. `None` disables the band.
    pub review_threshold: Option<f64>,
    pub weights: SignalWeights,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            review_threshold: None,
            weights: SignalWeights::default(),
        }
    }
}

impl MatchingConfig {
    /// Builds the config from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(threshold) = read_env_f64(SIMILARITY_THRESHOLD_ENV)? {
            config.similarity_threshold = threshold;
        }
        config.review_threshold = read_env_f64(REVIEW_THRESHOLD_ENV)?;
        config.validate()?;
        info!(
            "Matching config: threshold={:.2}, review_threshold={:?}",
            config.similarity_threshold, config.review_threshold
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "similarity_threshold",
                value: self.similarity_threshold,
            });
        }
        if let Some(review) = self.review_threshold {
            if !(0.0..=1.0).contains(&review) {
                return Err(ConfigError::ThresholdOutOfRange {
                    name: "review_threshold",
                    value: review,
                });
            }
            if review >= self.similarity_threshold {
                return Err(ConfigError::ReviewBandEmpty {
                    review,
                    threshold: self.similarity_threshold,
                });
            }
        }
        for (signal, weight) in self.weights.as_array() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { signal, weight });
            }
        }
        if self.weights.total() <= 0.0 {
            return Err(ConfigError::ZeroTotalWeight);
        }
        Ok(())
    }
}

/// Fixed lookup tables and windows used by the field validators.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub valid_states: HashSet<String>,
    /// Normalized capital city name -> state code
    pub capital_states: HashMap<String, String>,
    pub date_formats: Vec<String>,
    pub datetime_formats: Vec<String>,
    pub date_window_past_days: i64,
    pub date_window_future_days: i64,
    pub discount_tolerance: f64,
    pub rule_version: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            valid_states: VALID_STATES.iter().map(|s| s.to_string()).collect(),
            capital_states: STATE_CAPITALS
                .iter()
                .map(|(city, state)| (normalize(city), state.to_string()))
                .collect(),
            date_formats: DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            datetime_formats: DATETIME_FORMATS.iter().map(|f| f.to_string()).collect(),
            date_window_past_days: DATE_WINDOW_PAST_DAYS,
            date_window_future_days: DATE_WINDOW_FUTURE_DAYS,
            discount_tolerance: DISCOUNT_TOLERANCE_POINTS,
            rule_version: AUDIT_RULE_VERSION.to_string(),
        }
    }
}

impl AuditConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(days) = read_env_i64(DATE_PAST_DAYS_ENV)? {
            config.date_window_past_days = days;
        }
        if let Some(days) = read_env_i64(DATE_FUTURE_DAYS_ENV)? {
            config.date_window_future_days = days;
        }
        config.validate()?;
        info!(
            "Audit config: rule_version={}, date window=[-{}d, +{}d]",
            config.rule_version, config.date_window_past_days, config.date_window_future_days
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.valid_states.is_empty() {
            return Err(ConfigError::EmptyStateSet);
        }
        if let Some((city, state)) = self
            .capital_states
            .iter()
            .find(|(_, state)| !self.valid_states.contains(*state))
        {
            return Err(ConfigError::UnknownCapitalState {
                city: city.clone(),
                state: state.clone(),
            });
        }
        if self.date_window_past_days < 0 || self.date_window_future_days < 0 {
            return Err(ConfigError::NegativeDateWindow {
                past: self.date_window_past_days,
                future: self.date_window_future_days,
            });
        }
        if self.date_window_past_days > MAX_DATE_WINDOW_DAYS
            || self.date_window_future_days > MAX_DATE_WINDOW_DAYS
        {
            return Err(ConfigError::DateWindowTooLarge {
                past: self.date_window_past_days,
                future: self.date_window_future_days,
                max: MAX_DATE_WINDOW_DAYS,
            });
        }
        if self.date_formats.is_empty() {
            return Err(ConfigError::NoDateFormats);
        }
        Ok(())
    }
}

pub(crate) fn read_env(key: &'static str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            debug!("Read {} from environment", key);
            Some(value.trim().to_string())
        }
        _ => None,
    }
}

fn read_env_f64(key: &'static str) -> Result<Option<f64>, ConfigError> {
    read_env(key)
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidEnvValue { key, value })
        })
        .transpose()
}

fn read_env_i64(key: &'static str) -> Result<Option<i64>, ConfigError> {
    read_env(key)
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidEnvValue { key, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_are_valid() {
        assert!(MatchingConfig::default().validate().is_ok());
        assert!(AuditConfig::default().validate().is_ok());
    }

    #[test]
    fn capital_lookup_is_keyed_by_normalized_city() {
        let config = AuditConfig::default();
        assert_eq!(config.capital_states.get("sao paulo").map(String::as_str), Some("SP"));
        assert_eq!(config.capital_states.get("brasilia").map(String::as_str), Some("DF"));
        assert_eq!(config.capital_states.len(), 27);
    }

    #[test]
    fn review_band_must_sit_below_threshold() {
        let config = MatchingConfig {
            review_threshold: Some(0.8),
            ..MatchingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ReviewBandEmpty { .. })
        ));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut config = MatchingConfig::default();
        config.weights.area = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { signal: "area", .. })
        ));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let config = MatchingConfig {
            weights: SignalWeights {
                address: 0.0,
                title: 0.0,
                category: 0.0,
                value: 0.0,
                area: 0.0,
            },
            ..MatchingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTotalWeight)));
    }

    #[test]
    fn oversized_date_window_is_rejected() {
        let config = AuditConfig {
            date_window_future_days: i64::MAX,
            ..AuditConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DateWindowTooLarge {
                past: DATE_WINDOW_PAST_DAYS,
                future: i64::MAX,
                max: MAX_DATE_WINDOW_DAYS,
            })
        );
    }
}
