use config::{Config, ConfigError, Environment};
use lazy_static::lazy_static;
use serde::Deserialize;

/// Process settings read from the environment, e.g. `ARM_SUBSCRIPTION_ID`
/// or `CERT_PROVISIONING_TIMEOUT=3600`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    pub az_cli_path: Option<String>,
    pub dig_path: Option<String>,
    pub arm_subscription_id: Option<String>,
    pub cert_provisioning_timeout: Option<u64>,
    pub frontdoor_service_principal: Option<String>,
}

/// Front Door's first-party application id, used to look up its service
/// principal in the current tenant.
pub const FRONTDOOR_APP_ID: &str = "ad0e1c7e-6d38-4ba4-9efd-0bc77ba9f037";

/// Certificate provisioning can take an hour, plus another for domain
/// validation on Front Door managed certificates.
pub const DEFAULT_CERT_TIMEOUT_SECS: u64 = 7200;

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let conf = Config::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()?;
        conf.try_deserialize()
    }

    pub fn cert_timeout(&self) -> u64 {
        self.cert_provisioning_timeout
            .unwrap_or(DEFAULT_CERT_TIMEOUT_SECS)
    }

    pub fn service_principal(&self) -> &str {
        self.frontdoor_service_principal
            .as_deref()
            .unwrap_or(FRONTDOOR_APP_ID)
    }
}

lazy_static! {
    pub static ref settings: Settings = Settings::new().expect("improperly configured");
}
