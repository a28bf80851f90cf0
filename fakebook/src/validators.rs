use email_address::EmailAddress;
use url::Url;
use uuid::Uuid;

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Returns `true` if the provided string parses as a UUID.
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Canonical form used for email lookups and the case-insensitive unique key.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Trimmed value, or `None` when nothing but whitespace remains.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
