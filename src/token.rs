//! `<name>@<version>` format tokens.
//!
//! Source formats are identified by tokens like `openapi@3.1` or
//! `proto@3`. Names are case-insensitive and normalize to lowercase;
//! versions are preserved as written.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TokenError;

/// A normalized `<name>@<version>` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatToken {
    /// Normalized to lowercase.
    pub name: String,
    /// Preserved as written.
    pub version: String,
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.\-]*@[A-Za-z0-9][A-Za-z0-9.\-]*$")
            .expect("invalid regex")
    })
}

impl FormatToken {
    /// Parses a `<name>@<version>` token, lowercasing the name.
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        if !token_re().is_match(token) {
            return Err(TokenError::Invalid {
                token: token.to_string(),
            });
        }
        let Some(at) = token.rfind('@') else {
            return Err(TokenError::Invalid {
                token: token.to_string(),
            });
        };
        Ok(Self {
            name: token[..at].to_lowercase(),
            version: token[at + 1..].to_string(),
        })
    }

    /// Reports whether `token` is a syntactically valid format token.
    pub fn is_valid(token: &str) -> bool {
        Self::parse(token).is_ok()
    }

    /// Reports whether this token names the bindspec format itself.
    pub fn is_bindspec(&self) -> bool {
        self.name == "bindspec"
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() || self.version.is_empty() {
            return Ok(());
        }
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Normalizes a token string to `name@version` with a lowercased name.
pub fn normalize(token: &str) -> Result<String, TokenError> {
    Ok(FormatToken::parse(token)?.to_string())
}
