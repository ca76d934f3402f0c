use std::time::Duration;

use crate::{gateway::error::GatewayError, settings::Settings};

pub mod api;
mod error;
/// Secret masking for logged payloads
pub mod mask;
/// Hosted payment page redirect field set
pub mod redirect;
/// Server-side transaction verification
pub mod verify;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Bound on the verification call. The gateway documents no upper bound of
/// its own, so a stalled response cannot be allowed to hold the callback
/// request open indefinitely.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MonerisGateway {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl MonerisGateway {
    const SANDBOX_BASE_URL: &str = "https://esqa.moneris.com/HPPDP";
    const PRODUCTION_BASE_URL: &str = "https://www3.moneris.com/HPPDP";

    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .expect("http client is buildable");
        Self {
            client,
            base_url: None,
        }
    }

    /// Routes gateway traffic to a different host, e.g. a local stub
    /// standing in for the hosted payment page.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::new()
        }
    }

    fn base_url(&self, settings: &Settings) -> &str {
        match &self.base_url {
            Some(base) => base,
            None if settings.use_sandbox => Self::SANDBOX_BASE_URL,
            None => Self::PRODUCTION_BASE_URL,
        }
    }

    /// URL of the hosted payment page the browser form posts to.
    pub fn payment_url(&self, settings: &Settings) -> String {
        format!("{}/index.php", self.base_url(settings))
    }

    fn verify_url(&self, settings: &Settings) -> String {
        format!("{}/verifyTxn.php", self.base_url(settings))
    }
}

#[cfg(test)]
mod tests {
    use super::MonerisGateway;
    use crate::settings::Settings;

    #[test]
    fn sandbox_flag_selects_the_esqa_host() {
        let gateway = MonerisGateway::new();
        let sandbox = Settings::for_tests();
        let production = Settings {
            use_sandbox: false,
            ..Settings::for_tests()
        };
        assert_eq!(
            gateway.payment_url(&sandbox),
            "https://esqa.moneris.com/HPPDP/index.php"
        );
        assert_eq!(
            gateway.payment_url(&production),
            "https://www3.moneris.com/HPPDP/index.php"
        );
        assert_eq!(
            gateway.verify_url(&production),
            "https://www3.moneris.com/HPPDP/verifyTxn.php"
        );
    }
}
