//! Random account credentials and person names.

use std::sync::OnceLock;

use fake::faker::internet::en::{Password, SafeEmail, Username};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use regex::Regex;

/// Generated password length bounds (inclusive lower, exclusive upper).
const PASSWORD_LENGTH: std::ops::Range<usize> = 12..17;

/// Matches characters a stored username may not contain.
const USERNAME_DISALLOWED_PATTERN: &str = r"[^a-z0-9_.@-]";

static USERNAME_DISALLOWED: OnceLock<Option<Regex>> = OnceLock::new();

fn username_disallowed() -> Option<&'static Regex> {
    USERNAME_DISALLOWED
        .get_or_init(|| match Regex::new(USERNAME_DISALLOWED_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(error = %e, "Username pattern failed to compile; using character filter");
                None
            }
        })
        .as_ref()
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '@' | '-')
}

/// Lower-cases a username and strips characters the directory does not accept.
pub fn normalize_username(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match username_disallowed() {
        Some(re) => re.replace_all(&lowered, "").into_owned(),
        None => lowered.chars().filter(|c| is_username_char(*c)).collect(),
    }
}

/// Credentials for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A first/last name pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    /// "First Last".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// Produces random identities for account provisioning.
#[derive(Debug, Clone, Default)]
pub struct IdentityGenerator;

impl IdentityGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generates a username/email/password triple.
    pub fn account(&self) -> AccountIdentity {
        let raw: String = Username().fake();
        let mut username = normalize_username(&raw);
        if username.is_empty() {
            username = format!("user{}", (1000..99999).fake::<u32>());
        }

        AccountIdentity {
            username,
            email: SafeEmail().fake(),
            password: Password(PASSWORD_LENGTH).fake(),
        }
    }

    /// Generates a fresh first/last name pair.
    pub fn name(&self) -> PersonName {
        PersonName {
            first: FirstName().fake(),
            last: LastName().fake(),
        }
    }
}
