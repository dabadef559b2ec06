//! Hub configuration.
//!
//! Provider credentials are deliberately optional at startup: a hub with no
//! credentials still ingests webhooks and fans out events, and only the
//! operations that need the credentials (token issuance) fail.

use std::net::SocketAddr;

/// Telephony-provider account identifiers.
///
/// Every field defaults to empty; [`ProviderConfig::is_configured`] gates the
/// operations that require real values.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Provider account identifier
    pub account_sid: String,
    /// API key identifier used to sign access tokens
    pub api_key_sid: String,
    /// API key secret used to sign access tokens
    pub api_key_secret: String,
    /// Voice-application identifier referenced by the outgoing grant
    pub twiml_app_sid: String,
}

impl ProviderConfig {
    /// Whether all credentials required for token issuance are present.
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.api_key_sid.is_empty()
            && !self.api_key_secret.is_empty()
            && !self.twiml_app_sid.is_empty()
    }

    /// Name of the first missing credential, for error messages.
    pub fn first_missing(&self) -> Option<&'static str> {
        if self.account_sid.is_empty() {
            Some("account_sid")
        } else if self.api_key_sid.is_empty() {
            Some("api_key_sid")
        } else if self.api_key_secret.is_empty() {
            Some("api_key_secret")
        } else if self.twiml_app_sid.is_empty() {
            Some("twiml_app_sid")
        } else {
            None
        }
    }
}

/// Top-level configuration for [`CallHubServer`](crate::server::CallHubServer).
#[derive(Debug, Clone)]
pub struct CallHubConfig {
    /// Address the HTTP listener binds to
    pub listen_addr: SocketAddr,
    /// Provider account credentials
    pub provider: ProviderConfig,
    /// Hold-music URL referenced by the webhook acknowledgment
    pub hold_music_url: Option<String>,
}

impl Default for CallHubConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5080".parse().unwrap(),
            provider: ProviderConfig::default(),
            hold_music_url: Some(
                "http://com.twilio.music.classical.s3.amazonaws.com/BusyStrings.wav".to_string(),
            ),
        }
    }
}

impl CallHubConfig {
    /// Set the listen address.
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the provider credentials.
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    /// Load configuration from `CALLPOP_*` environment variables, falling
    /// back to defaults for anything unset. Missing credentials are not an
    /// error here; they surface when token issuance is attempted.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CALLPOP_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.listen_addr = parsed;
            } else {
                tracing::warn!(addr = %addr, "Ignoring unparseable CALLPOP_LISTEN_ADDR");
            }
        }

        config.provider = ProviderConfig {
            account_sid: std::env::var("CALLPOP_ACCOUNT_SID").unwrap_or_default(),
            api_key_sid: std::env::var("CALLPOP_API_KEY_SID").unwrap_or_default(),
            api_key_secret: std::env::var("CALLPOP_API_KEY_SECRET").unwrap_or_default(),
            twiml_app_sid: std::env::var("CALLPOP_TWIML_APP_SID").unwrap_or_default(),
        };

        if let Ok(url) = std::env::var("CALLPOP_HOLD_MUSIC_URL") {
            config.hold_music_url = if url.is_empty() { None } else { Some(url) };
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_provider_reports_missing_field() {
        let provider = ProviderConfig {
            account_sid: "AC123".to_string(),
            ..Default::default()
        };
        assert!(!provider.is_configured());
        assert_eq!(provider.first_missing(), Some("api_key_sid"));
    }

    #[test]
    fn fully_configured_provider() {
        let provider = ProviderConfig {
            account_sid: "AC123".to_string(),
            api_key_sid: "SK123".to_string(),
            api_key_secret: "secret".to_string(),
            twiml_app_sid: "AP123".to_string(),
        };
        assert!(provider.is_configured());
        assert_eq!(provider.first_missing(), None);
    }
}
