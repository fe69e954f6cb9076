// src/utils.rs

use url::Url;

// Helper function to extract the host from a source URL string
pub fn extract_domain(url_str: &str) -> Option<String> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed_url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => match Url::parse(&format!("http://{}", trimmed)) {
            Ok(url) => url,
            Err(_) => return None,
        },
    };
    parsed_url.host_str().map(|host| host.to_lowercase())
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
