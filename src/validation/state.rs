// src/validation/state.rs

use log::{debug, warn};

use crate::config::AuditConfig;
use crate::errors::{StateInferenceSource, ValidationError, ValidationWarning};
use crate::matching::address::normalize;
use crate::models::{FieldCorrection, Listing, ListingField};
use crate::validation::{FieldReport, ValidationOutcome};

/// Checks the state code against the valid set, inferring it from the city or
/// the address when it is missing or invalid.
pub fn validate_state(mut listing: Listing, config: &AuditConfig) -> ValidationOutcome {
    let mut report = FieldReport::default();
    let raw = listing.state.clone();

    let cleaned = raw
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    if let Some(code) = cleaned.filter(|c| config.valid_states.contains(c)) {
        listing.state = Some(code);
        return ValidationOutcome::new(listing, report);
    }

    match infer_state(&listing, config) {
        Some((state, via)) => {
            debug!(
                "Listing {}: state {:?} replaced by {} inferred from {}",
                listing.id, raw, state, via
            );
            report.corrections.push(FieldCorrection::new(
                ListingField::State,
                raw.clone(),
                Some(state.clone()),
            ));
            report.warnings.push(ValidationWarning::StateInferred {
                raw,
                state: state.clone(),
                via,
            });
            listing.state = Some(state);
        }
        None => {
            warn!("Listing {}: could not resolve state {:?}", listing.id, raw);
            report.errors.push(ValidationError::UnresolvableState { raw });
        }
    }

    ValidationOutcome::new(listing, report)
}

fn infer_state(listing: &Listing, config: &AuditConfig) -> Option<(String, StateInferenceSource)> {
    let from_city = listing
        .city
        .as_deref()
        .map(normalize)
        .and_then(|city| config.capital_states.get(&city).cloned());
    if let Some(state) = from_city {
        return Some((state, StateInferenceSource::CapitalCity));
    }

    listing
        .address
        .as_deref()
        .and_then(|address| state_code_in_text(address, config))
        .map(|state| (state, StateInferenceSource::Address))
}

/// Last whole-word, uppercase, two-letter token of `text` that is a valid
/// state code ("Rua X, 10 - Campinas/SP" gives "SP"). Lowercase tokens are
/// ignored so words like "do" or "Ap" are never read as codes, except as a
/// trailing "city/uf" or "city - uf" suffix in any case.
fn state_code_in_text(text: &str, config: &AuditConfig) -> Option<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() == 2 && token.chars().all(|c| c.is_ascii_uppercase()))
        .filter(|token| config.valid_states.contains(*token))
        .last()
        .map(str::to_string)
        .or_else(|| trailing_state_suffix(text, config))
}

fn trailing_state_suffix(text: &str, config: &AuditConfig) -> Option<String> {
    let (head, tail) = text.trim().rsplit_once(|c| c == '/' || c == '-')?;
    let tail = tail.trim();
    if head.trim().is_empty()
        || tail.len() != 2
        || !tail.chars().all(|c| c.is_ascii_alphabetic())
    {
        return None;
    }
    let code = tail.to_ascii_uppercase();
    config.valid_states.contains(&code).then_some(code)
}
