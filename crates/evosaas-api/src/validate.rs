//! Input predicates for request validation. Limits match what the gateway
//! and the billing plans tolerate.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn valid_password(password: &str) -> bool {
    password.len() >= 8
}

/// 10 to 15 digits after stripping any formatting characters.
pub fn valid_phone_number(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (10..=15).contains(&digits)
}

pub fn valid_instance_name(name: &str) -> bool {
    (3..=50).contains(&name.len())
}

pub fn valid_message(body: &str) -> bool {
    !body.is_empty() && body.len() <= 4096
}
