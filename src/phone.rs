//! Phone number parsing and national formatting.
//!
//! Registration stores phone numbers in the national format of the region
//! configured under `[phone]`. Only Norwegian numbers (region `NO`) are
//! supported: an optional `+47` / `0047` / `47` country prefix followed by
//! exactly eight digits.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Unsupported phone region: {0}")]
    UnsupportedRegion(String),

    #[error("Not a valid phone number for region {region}: '{raw}'")]
    Invalid { region: String, raw: String },
}

#[must_use]
pub fn is_supported_region(region: &str) -> bool {
    region == "NO"
}

/// Parse `raw` as a phone number for `region` and return it in national
/// format. For `NO`, mobile numbers (leading 4 or 9) group as `XXX XX XXX`
/// and all other numbers as `XX XX XX XX`.
pub fn normalize(raw: &str, region: &str) -> Result<String, PhoneError> {
    if !is_supported_region(region) {
        return Err(PhoneError::UnsupportedRegion(region.to_string()));
    }

    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect();

    let digits = match compact.strip_prefix("+47").or_else(|| compact.strip_prefix("0047")) {
        Some(rest) => rest,
        // A bare 47 prefix only counts as a country code when something
        // eight digits long follows it.
        None if compact.len() == 10 && compact.starts_with("47") => &compact[2..],
        None => compact.as_str(),
    };

    if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::Invalid {
            region: region.to_string(),
            raw: raw.to_string(),
        });
    }

    let formatted = if digits.starts_with('4') || digits.starts_with('9') {
        format!("{} {} {}", &digits[..3], &digits[3..5], &digits[5..])
    } else {
        format!(
            "{} {} {} {}",
            &digits[..2],
            &digits[2..4],
            &digits[4..6],
            &digits[6..]
        )
    };

    Ok(formatted)
}
