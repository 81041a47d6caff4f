//! Phone number normalization to E.164.
//!
//! National-format numbers (leading trunk `0` or bare subscriber digits) are
//! interpreted in the configured default region.

use crate::error::{AppError, AppResult};

/// E.164 allows at most 15 digits including the country code.
const MAX_E164_DIGITS: usize = 15;
/// Shortest plausible international number.
const MIN_E164_DIGITS: usize = 7;

/// Calling codes for the regions accepted as a default phone region.
const CALLING_CODES: &[(&str, &str)] = &[
    ("AE", "971"),
    ("AR", "54"),
    ("AT", "43"),
    ("AU", "61"),
    ("BD", "880"),
    ("BE", "32"),
    ("BI", "257"),
    ("BR", "55"),
    ("BW", "267"),
    ("CA", "1"),
    ("CD", "243"),
    ("CH", "41"),
    ("CL", "56"),
    ("CM", "237"),
    ("CN", "86"),
    ("CO", "57"),
    ("CZ", "420"),
    ("DE", "49"),
    ("DK", "45"),
    ("DZ", "213"),
    ("EG", "20"),
    ("ES", "34"),
    ("ET", "251"),
    ("FI", "358"),
    ("FR", "33"),
    ("GB", "44"),
    ("GH", "233"),
    ("GR", "30"),
    ("HK", "852"),
    ("ID", "62"),
    ("IE", "353"),
    ("IL", "972"),
    ("IN", "91"),
    ("IT", "39"),
    ("JP", "81"),
    ("KE", "254"),
    ("KR", "82"),
    ("MA", "212"),
    ("MW", "265"),
    ("MX", "52"),
    ("MY", "60"),
    ("MZ", "258"),
    ("NG", "234"),
    ("NL", "31"),
    ("NO", "47"),
    ("NZ", "64"),
    ("PH", "63"),
    ("PK", "92"),
    ("PL", "48"),
    ("PT", "351"),
    ("RW", "250"),
    ("SA", "966"),
    ("SE", "46"),
    ("SG", "65"),
    ("SN", "221"),
    ("SO", "252"),
    ("SS", "211"),
    ("TH", "66"),
    ("TR", "90"),
    ("TZ", "255"),
    ("UA", "380"),
    ("UG", "256"),
    ("US", "1"),
    ("VN", "84"),
    ("ZA", "27"),
    ("ZM", "260"),
    ("ZW", "263"),
];

/// Calling code (without `+`) for an ISO region.
pub fn calling_code(region: &str) -> Option<&'static str> {
    let region = region.to_uppercase();
    CALLING_CODES
        .binary_search_by(|(r, _)| r.cmp(&region.as_str()))
        .ok()
        .map(|i| CALLING_CODES[i].1)
}

/// Normalize a user-entered phone number to `+<digits>`.
pub fn normalize(raw: &str, default_region: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("phone_number is required".to_string()));
    }

    let mut compact = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        match c {
            '0'..='9' => compact.push(c),
            '+' if i == 0 => compact.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(invalid()),
        }
    }

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest.to_string()
    } else {
        let code = calling_code(default_region).ok_or_else(|| {
            AppError::InvalidInput(format!("Unsupported phone region '{}'", default_region))
        })?;
        let national = compact.strip_prefix('0').unwrap_or(&compact);
        format!("{}{}", code, national)
    };

    if digits.starts_with('0')
        || !(MIN_E164_DIGITS..=MAX_E164_DIGITS).contains(&digits.len())
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    Ok(format!("+{}", digits))
}

fn invalid() -> AppError {
    AppError::InvalidInput("Enter a valid phone number (e.g. +254712345678)".to_string())
}
