//! Sensitive data scanner
//!
//! Flags values that look like they carry identifiers or credentials before
//! they are written. Advisory: nothing here blocks a write.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub struct SensitiveDataScanner {
    patterns: Vec<(&'static str, Regex)>,
}

impl SensitiveDataScanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                ("social security number", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b")?),
                ("card number", Regex::new(r"\b(?:\d{4}[- ]?){3}\d{4}\b")?),
                (
                    "password",
                    Regex::new(r#"(?i)\b(?:password|passwd|pwd)"?\s*[:=]\s*"?[^\s",}]+"#)?,
                ),
            ],
        })
    }

    /// Names of the patterns found in `text`.
    pub fn scan(&self, text: &str) -> Vec<&'static str> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Scan the JSON form of `value`.
    pub fn validate<T: Serialize + ?Sized>(&self, value: &T) -> Result<ValidationReport, serde_json::Error> {
        let text = serde_json::to_string(value)?;
        Ok(self.validate_text(&text))
    }

    pub fn validate_text(&self, text: &str) -> ValidationReport {
        let errors: Vec<String> = self
            .scan(text)
            .into_iter()
            .map(|name| format!("Possible {} detected", name))
            .collect();
        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}
