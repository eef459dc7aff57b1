use std::fmt;

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use validator::{Validate, ValidationError};

use super::engines::{AssociationConf, EngineConf};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
pub struct FrontDoorConf {
    #[validate(length(min = 1, message = "front-door-name cannot be empty"))]
    pub front_door_name: String,
    #[validate(length(min = 1, message = "front-door-group cannot be empty"))]
    pub front_door_group: String,
    #[serde(default)]
    #[validate(nested)]
    pub routing_rules: Vec<RouteConf>,
    #[serde(default)]
    #[validate(nested)]
    pub engine_rules: Vec<EngineConf>,
    #[serde(default)]
    #[validate(nested)]
    pub engine_associations: Vec<AssociationConf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub enum RuleType {
    #[default]
    #[serde(alias = "forward")]
    Forward,
    #[serde(alias = "redirect")]
    Redirect,
    /// Provision frontends and pool only.
    #[serde(rename = "None", alias = "none")]
    Skip,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::Forward => write!(f, "Forward"),
            RuleType::Redirect => write!(f, "Redirect"),
            RuleType::Skip => write!(f, "None"),
        }
    }
}

/// One routing rule together with the frontends and pool it routes between.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
#[validate(schema(function = "validate_route"))]
pub struct RouteConf {
    #[validate(length(min = 1, message = "route name cannot be empty"))]
    pub name: String,
    #[serde(default)]
    pub fatal: bool,
    #[serde(default)]
    pub ruletype: RuleType,
    #[serde(default)]
    #[validate(nested)]
    pub frontends: Vec<FrontendConf>,
    #[validate(nested)]
    pub backend_pool: Option<PoolConf>,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    #[serde(default = "default_protocols")]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub disable: bool,
    #[serde(default = "match_request")]
    pub forward_protocol: String,
    pub forward_path: Option<String>,
    #[serde(default = "found")]
    pub redirect_type: String,
    #[serde(default = "match_request")]
    pub redirect_protocol: String,
    pub destination_host: Option<String>,
    pub destination_path: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum CertificateType {
    FrontDoor,
    AzureKeyVault,
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateType::FrontDoor => write!(f, "FrontDoor"),
            CertificateType::AzureKeyVault => write!(f, "AzureKeyVault"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
#[validate(schema(function = "validate_frontend"))]
pub struct FrontendConf {
    #[validate(length(min = 1, message = "frontend name cannot be empty"))]
    pub name: String,
    /// `true` references a frontend that is already there.
    #[serde(default = "yes")]
    pub exists: bool,
    pub host_name: Option<String>,
    #[serde(default, alias = "create_cname")]
    pub create_cname: bool,
    #[serde(alias = "zone_group")]
    pub zone_group: Option<String>,
    pub waf_name: Option<String>,
    #[serde(default)]
    pub sticky_sessions: bool,
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u32,
    #[serde(default)]
    pub enable_ssl: bool,
    pub certificate_type: Option<CertificateType>,
    #[serde(default = "default_tls", deserialize_with = "scalar_string")]
    pub tls_version: String,
    pub secret_name: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub secret_version: Option<String>,
    pub vault_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct BackendConf {
    #[validate(length(min = 1, message = "backend address cannot be empty"))]
    pub address: String,
    pub host_header: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
#[validate(schema(function = "validate_pool"))]
pub struct PoolConf {
    #[validate(length(min = 1, message = "pool name cannot be empty"))]
    pub name: String,
    /// `true` references a pool that is already there.
    #[serde(default = "yes")]
    pub exists: bool,
    #[serde(default)]
    #[validate(nested)]
    pub backends: Vec<BackendConf>,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_https_port")]
    pub https_port: u16,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_weight")]
    pub weight: u16,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub probe: ProbeConf,
    #[serde(default)]
    pub load_balancing: LoadBalancingConf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProbeConf {
    /// Name of an existing probe to reference instead of managing one.
    pub name: Option<String>,
    #[serde(default = "https")]
    pub protocol: String,
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub disable: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoadBalancingConf {
    pub name: Option<String>,
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default)]
    pub latency: u32,
}

impl Default for ProbeConf {
    fn default() -> Self {
        Self {
            name: None,
            protocol: https(),
            path: root_path(),
            interval: default_interval(),
            disable: false,
        }
    }
}

impl Default for LoadBalancingConf {
    fn default() -> Self {
        Self {
            name: None,
            sample_size: default_sample_size(),
            samples: default_samples(),
            latency: 0,
        }
    }
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_route(route: &RouteConf) -> Result<(), ValidationError> {
    if route.ruletype == RuleType::Forward && route.backend_pool.is_none() {
        return Err(invalid(
            "forward_without_pool",
            format!("route {}: backend pool cannot be null when ruletype is Forward", route.name),
        ));
    }
    if route.ruletype != RuleType::Skip && route.frontends.is_empty() {
        return Err(invalid(
            "no_frontends",
            format!("route {}: frontends config cannot be empty", route.name),
        ));
    }
    Ok(())
}

fn validate_frontend(fe: &FrontendConf) -> Result<(), ValidationError> {
    if !fe.exists && fe.host_name.as_deref().map_or(true, str::is_empty) {
        return Err(invalid(
            "missing_host_name",
            format!("frontend {}: missing host-name config", fe.name),
        ));
    }
    if !fe.exists && fe.create_cname && fe.zone_group.is_none() {
        return Err(invalid(
            "missing_zone_group",
            format!("frontend {}: create-cname requires zone-group", fe.name),
        ));
    }
    if fe.enable_ssl && fe.certificate_type.is_none() {
        return Err(invalid(
            "missing_certificate_type",
            format!("frontend {}: cannot enable ssl without specifying certificate-type", fe.name),
        ));
    }
    if fe.certificate_type == Some(CertificateType::AzureKeyVault) {
        for (field, value) in [
            ("secret-name", &fe.secret_name),
            ("secret-version", &fe.secret_version),
            ("vault-id", &fe.vault_id),
        ] {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(invalid(
                    "missing_key_vault_field",
                    format!("frontend {}: missing {} config for certificate-type AzureKeyVault", fe.name, field),
                ));
            }
        }
    }
    Ok(())
}

fn validate_pool(pool: &PoolConf) -> Result<(), ValidationError> {
    if !pool.exists && pool.backends.is_empty() {
        return Err(invalid(
            "missing_backends",
            format!("pool {}: missing backends config", pool.name),
        ));
    }
    Ok(())
}

/// YAML reads `tls-version: 1.2` as a float; keep it as written.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Value = Deserialize::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(D::Error::custom("expected a scalar")),
    }
}

fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<Value> = Deserialize::deserialize(deserializer)?;
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(D::Error::custom("expected a scalar")),
    }
}

fn yes() -> bool {
    true
}

fn default_patterns() -> Vec<String> {
    vec!["/*".into()]
}

fn default_protocols() -> Vec<String> {
    vec!["Https".into(), "Http".into()]
}

fn match_request() -> String {
    "MatchRequest".into()
}

fn found() -> String {
    "Found".into()
}

fn https() -> String {
    "Https".into()
}

fn root_path() -> String {
    "/".into()
}

fn default_tls() -> String {
    "1.2".into()
}

fn default_session_ttl() -> u32 {
    60
}

fn default_http_port() -> u16 {
    80
}

fn default_https_port() -> u16 {
    443
}

fn default_priority() -> u8 {
    1
}

fn default_weight() -> u16 {
    50
}

fn default_interval() -> u32 {
    120
}

fn default_sample_size() -> u32 {
    4
}

fn default_samples() -> u32 {
    2
}
