/// Gateway and storefront configuration.
///
/// Loaded from the environment once at startup and handed to each
/// component by reference. Nothing mutates it after that.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Moneris store identifier, sent as `ps_store_id`.
    pub ps_store_id: String,
    /// Shared secret for the hosted payment page, sent as `hpp_key`.
    pub hpp_key: String,
    /// Selects the esqa (test) host over the production one.
    pub use_sandbox: bool,
    /// Handling fee in major units, or a percentage of the order total
    /// when `additional_fee_percentage` is set.
    pub additional_fee: f64,
    pub additional_fee_percentage: bool,
    /// Base URL of the storefront, the destination of every post-callback
    /// browser redirect.
    pub store_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let store_url = std::env::var("STORE_URL").unwrap_or_else(|_| {
            tracing::warn!("STORE_URL is not defined, using default one");
            "http://store:3000".to_string()
        });
        Self {
            ps_store_id: std::env::var("MONERIS_PS_STORE_ID")
                .expect("MONERIS_PS_STORE_ID env is defined"),
            hpp_key: std::env::var("MONERIS_HPP_KEY").expect("MONERIS_HPP_KEY env is defined"),
            use_sandbox: env_flag("MONERIS_USE_SANDBOX", true),
            additional_fee: std::env::var("MONERIS_ADDITIONAL_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            additional_fee_percentage: env_flag("MONERIS_ADDITIONAL_FEE_PERCENTAGE", false),
            store_url,
        }
    }

    /// Handling fee to add on top of an order total, in minor units.
    pub fn additional_fee_minor(&self, total: i64) -> i64 {
        if self.additional_fee_percentage {
            (total as f64 * self.additional_fee / 100.).round() as i64
        } else {
            (self.additional_fee * 100.).round() as i64
        }
    }

    /// Where the browser lands after a settled payment.
    pub fn order_completed_url(&self, order_id: i64) -> String {
        format!("{}/checkout/completed/{order_id}", self.store_url)
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl Settings {
    pub fn for_tests() -> Self {
        Self {
            ps_store_id: "QA0MON0123".into(),
            hpp_key: "hpABCDEF0123".into(),
            use_sandbox: true,
            additional_fee: 0.0,
            additional_fee_percentage: false,
            store_url: "http://store.test".into(),
        }
    }
}
