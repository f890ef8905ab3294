//! Per-field value validators.

use regex::Regex;
use std::sync::OnceLock;

/// Maximum length of short texts (names, titles).
pub const MAXIMUM_NAMESIZE: usize = 128;

/// Maximum length of long texts (descriptions, bodies).
pub const MAXIMUM_TEXTSIZE: usize = 4096;

static SHORTURL_REGEX: OnceLock<Regex> = OnceLock::new();
static LONGURL_REGEX: OnceLock<Regex> = OnceLock::new();

/// A constraint checked after a value has been coerced to its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    ShortText,
    LongText,
    ShortLocal,
    LongLocal,
    ShortUrl,
    LongUrl,
    /// Inclusive integer bounds.
    Range(i64, i64),
}

impl Validator {
    /// Check a text value. Returns the rejection reason on failure.
    pub fn check_text(&self, value: &str) -> Result<(), String> {
        match self {
            Validator::ShortText | Validator::ShortLocal => max_length(value, MAXIMUM_NAMESIZE),
            Validator::LongText | Validator::LongLocal => max_length(value, MAXIMUM_TEXTSIZE),
            Validator::ShortUrl => {
                let regex = SHORTURL_REGEX.get_or_init(|| Regex::new(r"^/s/[a-z0-9]{1,30}$").unwrap());
                if regex.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a valid short url", value))
                }
            }
            Validator::LongUrl => {
                let regex =
                    LONGURL_REGEX.get_or_init(|| Regex::new(r"^/[a-z0-9#=_&?/-]{1,255}$").unwrap());
                if regex.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a valid url path", value))
                }
            }
            Validator::Range(..) => Err("range validator applied to text".to_string()),
        }
    }

    /// Check an integer value.
    pub fn check_integer(&self, value: i64) -> Result<(), String> {
        match self {
            Validator::Range(min, max) if value < *min || value > *max => Err(format!(
                "{} is outside the range [{}, {}]",
                value, min, max
            )),
            Validator::Range(..) => Ok(()),
            _ => Err("text validator applied to integer".to_string()),
        }
    }
}

fn max_length(value: &str, limit: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len > limit {
        Err(format!("length {} exceeds the maximum of {}", len, limit))
    } else {
        Ok(())
    }
}
