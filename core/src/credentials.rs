//! Account credentials and the basic-auth header derived from them.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Exotel account credentials.
///
/// `domain` is the API host without scheme or userinfo, e.g. `api.exotel.com`
/// or `api.in.exotel.com`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    sid: String,
    domain: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        sid: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            sid: sid.into(),
            domain: domain.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Value for the `Authorization` header.
    pub fn basic_auth(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.api_key, self.api_secret));
        format!("Basic {token}")
    }

    /// `https://{domain}`, the default base URL for this account.
    pub fn default_base_url(&self) -> String {
        format!("https://{}", self.domain.trim_end_matches('/'))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("sid", &self.sid)
            .field("domain", &self.domain)
            .finish()
    }
}
