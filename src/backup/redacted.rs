//! Secret strings that never show up in logs.
//!
//! Database passwords travel from job options into command lines. They are
//! wrapped in `RedactedString` on the way so a logged `CommandLine` or job
//! never leaks them.

use bon::Builder;
use derive_more::From;
use getset::Getters;
use std::fmt::{Debug, Display, Formatter};
use zeroize::Zeroize;

/// Placeholder text shown instead of the actual secret in logs/debug output
pub static REDACTED_PASSPHRASE: &str = "###REDACTED###";

/// Option keys whose values are treated as secrets.
pub static SECRET_OPTION_KEYS: &[&str] = &["password"];

/// A string that gets redacted in debug and display output
///
/// Memory is zeroed on drop.
#[derive(Clone, Zeroize, From, Builder, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RedactedString {
    #[builder(into)]
    inner: String,
}

impl From<&str> for RedactedString {
    fn from(value: &str) -> Self {
        Self::builder().inner(value).build()
    }
}

impl Debug for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", REDACTED_PASSPHRASE)
    }
}

impl Display for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", REDACTED_PASSPHRASE)
    }
}

impl Drop for RedactedString {
    fn drop(&mut self) {
        self.zeroize();
    }
}

pub fn is_secret_option(key: &str) -> bool {
    SECRET_OPTION_KEYS.contains(&key)
}
