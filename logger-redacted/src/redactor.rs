use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex = compile(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b");
    // Nepali mobiles (98/97xxxxxxxx, optional +977) and Kathmandu-style landlines (01-4xxxxxx)
    static ref PHONE_REGEX: Regex = compile(r"(?:\+?977[-\s]?)?\b(?:9[6-8]\d{8}|0\d{1,2}-?\d{6,7})\b");
}

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static redaction pattern")
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    pub fn with_custom_pattern(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        self.custom_patterns.push((pattern, replacement.into()));
        self
    }
}

/// PII redactor for log messages and structured fields
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Redact a value that is known to be a phone number, whatever its shape.
    pub fn redact_phone_field(&self, phone: &str) -> String {
        if self.config.hash_for_correlation {
            format!("PHONE[{}]", self.hash_value(phone))
        } else {
            let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
            let tail: String = digits.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
            format!("******{tail}")
        }
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", self.hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((local, domain)) => format!(
                            "{}***@{}***",
                            local.chars().next().unwrap_or('*'),
                            domain.chars().next().unwrap_or('*')
                        ),
                        None => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let phone = caps.get(0).map_or("", |m| m.as_str());
                self.redact_phone_field(phone)
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        // first 8 bytes are enough to correlate log lines
        general_purpose::STANDARD_NO_PAD.encode(result.get(..8).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = plain().redact("Verification mail sent to sita.sharma@example.com");
        assert!(redacted.contains("s***@e***"));
        assert!(!redacted.contains("sita.sharma"));
    }

    #[test]
    fn test_mobile_redaction() {
        let redacted = plain().redact("Khata customer +977-9841234567 paid");
        assert!(!redacted.contains("9841234567"));
        assert!(redacted.contains("******67"));
    }

    #[test]
    fn test_landline_redaction() {
        let redacted = plain().redact("Clinic line 01-4412345");
        assert!(!redacted.contains("4412345"));
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let a = redactor.redact_phone_field("9841234567");
        let b = redactor.redact_phone_field("9841234567");
        assert_eq!(a, b);
        assert!(a.starts_with("PHONE["));
        assert_ne!(a, redactor.redact_phone_field("9801234567"));
    }

    #[test]
    fn test_custom_pattern() {
        let redactor = PiiRedactor::new(
            RedactionConfig::default().with_custom_pattern(Regex::new(r"LAB-\d{8}-\d{4}").unwrap(), "LAB-[REDACTED]"),
        );
        assert_eq!(redactor.redact("order LAB-20240101-0007 ready"), "order LAB-[REDACTED] ready");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(plain().redact("Ward ICU-2 capacity 12"), "Ward ICU-2 capacity 12");
    }
}
