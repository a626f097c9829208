//! Masking of sensitive values before they reach the logs.
//!
//! JSON fields such as `"api_key": "..."` have their value replaced by `***`,
//! and bare e-mail addresses and bearer tokens in free text are masked too.

use regex::Regex;
use std::sync::OnceLock;

use paralegal_core::{Error, Result};

const MASK: &str = "***";

/// JSON fields whose string values are always masked.
const SENSITIVE_FIELDS: &[&str] = &[
    "user_id",
    "email",
    "password",
    "token",
    "api_key",
    "connection_string",
];

/// Regex-based redactor for log payloads.
pub struct Redactor {
    fields: Vec<(Regex, String)>,
    free_text: Vec<Regex>,
}

impl Redactor {
    /// Build a redactor with the default field list.
    pub fn new() -> Result<Self> {
        Self::with_fields(SENSITIVE_FIELDS)
    }

    /// Build a redactor masking the given JSON field names.
    pub fn with_fields(fields: &[&str]) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::configuration(format!("Invalid redaction pattern: {}", e)))
        };

        let fields = fields
            .iter()
            .map(|field| {
                let pattern = format!(r#""{}"\s*:\s*"[^"]*""#, regex::escape(field));
                Ok((compile(&pattern)?, format!(r#""{}": "{}""#, field, MASK)))
            })
            .collect::<Result<Vec<_>>>()?;

        let free_text = vec![
            compile(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")?,
            compile(r"(?i)\bbearer\s+[a-z0-9._~+/=-]+")?,
        ];

        Ok(Self { fields, free_text })
    }

    /// Return `text` with every sensitive value masked.
    pub fn redact(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for (pattern, replacement) in &self.fields {
            masked = pattern
                .replace_all(&masked, replacement.as_str())
                .into_owned();
        }
        for pattern in &self.free_text {
            masked = pattern.replace_all(&masked, MASK).into_owned();
        }
        masked
    }
}

/// Mask sensitive data with the shared default redactor.
pub fn redact(text: &str) -> String {
    static REDACTOR: OnceLock<Option<Redactor>> = OnceLock::new();
    match REDACTOR.get_or_init(|| Redactor::new().ok()) {
        Some(redactor) => redactor.redact(text),
        // Never log unmasked text.
        None => MASK.to_string(),
    }
}
