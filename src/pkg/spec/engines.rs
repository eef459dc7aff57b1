use std::{fmt, str::FromStr};

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use validator::{Validate, ValidationError};

/// Created in every engine so it is never empty.
pub const NOOP_RULE: &str = "routemanagerNOOP";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
#[validate(schema(function = "validate_engine"))]
pub struct EngineConf {
    #[validate(length(min = 1, message = "engine name cannot be empty"))]
    pub name: String,
    #[validate(nested)]
    pub rules: Vec<EngineRuleConf>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
#[validate(schema(function = "validate_engine_rule"))]
pub struct EngineRuleConf {
    #[validate(length(min = 1, message = "engine rule name cannot be empty"))]
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<ConditionConf>,
    /// The noop action takes one of the five slots a rule has.
    #[serde(default)]
    pub actions: Vec<ActionConf>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum MatchVariable {
    QueryString,
    RequestBody,
    RequestFilename,
    RequestFilenameExtension,
    RequestPath,
    RequestMethod,
    RequestProtocol,
    RequestUri,
}

impl fmt::Display for MatchVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const MAX_CONDITIONS: usize = 10;
const MAX_ACTIONS: usize = 4;

const OPERATORS: [&str; 11] = [
    "Any",
    "BeginsWith",
    "Contains",
    "EndsWith",
    "Equal",
    "GeoMatch",
    "GreaterThan",
    "GreaterThanOrEqual",
    "IPMatch",
    "LessThan",
    "LessThanOrEqual",
];

/// A match operator, negated when written with a `Not` prefix
/// (`NotContains`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub name: &'static str,
    pub negate: bool,
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negate, base) = match s.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("not") => (true, &s[3..]),
            _ => (false, s),
        };
        OPERATORS
            .iter()
            .find(|op| op.eq_ignore_ascii_case(base))
            .map(|name| Operator { name: *name, negate })
            .ok_or_else(|| format!("unknown engine rule condition operator {}", s))
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConditionConf {
    #[serde(rename = "type")]
    pub match_variable: MatchVariable,
    pub operator: Operator,
    #[serde(rename = "match-value", alias = "match-values", deserialize_with = "one_or_many")]
    pub match_values: Vec<String>,
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum HeaderOperation {
    Append,
    Delete,
    Overwrite,
}

impl fmt::Display for HeaderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct HeaderAction {
    pub header_action: HeaderOperation,
    pub header_name: String,
    pub header_value: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ForwardOverride {
    pub backend_pool: String,
    pub forward_path: Option<String>,
    #[serde(default = "https")]
    pub forward_protocol: String,
    #[serde(default)]
    pub enable_caching: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RedirectOverride {
    #[serde(default = "found")]
    pub redirect_type: String,
    #[serde(default = "https")]
    pub redirect_protocol: String,
    #[serde(default = "preserve")]
    pub destination_host: String,
    #[serde(default = "preserve")]
    pub destination_path: String,
    #[serde(default = "preserve")]
    pub query_string: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ActionConf {
    RequestHeader(HeaderAction),
    ResponseHeader(HeaderAction),
    ForwardRouteOverride(ForwardOverride),
    RedirectRouteOverride(RedirectOverride),
}

impl ActionConf {
    pub fn type_name(&self) -> &'static str {
        match self {
            ActionConf::RequestHeader(_) => "RequestHeader",
            ActionConf::ResponseHeader(_) => "ResponseHeader",
            ActionConf::ForwardRouteOverride(_) => "ForwardRouteOverride",
            ActionConf::RedirectRouteOverride(_) => "RedirectRouteOverride",
        }
    }

    pub fn is_route_override(&self) -> bool {
        matches!(
            self,
            ActionConf::ForwardRouteOverride(_) | ActionConf::RedirectRouteOverride(_)
        )
    }
}

#[derive(Debug, Clone, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AssociationConf {
    #[validate(length(min = 1, message = "association engine cannot be empty"))]
    pub engine: String,
    #[validate(length(min = 1, message = "association rules cannot be empty"))]
    pub rules: Vec<String>,
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_engine(engine: &EngineConf) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for rule in &engine.rules {
        if !seen.insert(rule.name.as_str()) {
            return Err(invalid(
                "duplicate_engine_rule",
                format!("engine {}: rule {} is configured twice", engine.name, rule.name),
            ));
        }
    }
    Ok(())
}

fn validate_engine_rule(rule: &EngineRuleConf) -> Result<(), ValidationError> {
    if rule.name == NOOP_RULE {
        return Err(invalid(
            "reserved_rule_name",
            format!("engine rule name {} is reserved", NOOP_RULE),
        ));
    }
    if rule.conditions.len() > MAX_CONDITIONS {
        return Err(invalid(
            "too_many_conditions",
            format!("an engine rule holds at most {} conditions", MAX_CONDITIONS),
        ));
    }
    if rule.actions.len() > MAX_ACTIONS {
        return Err(invalid(
            "too_many_actions",
            format!("an engine rule holds at most {} configured actions", MAX_ACTIONS),
        ));
    }
    if rule.actions.iter().filter(|a| a.is_route_override()).count() > 1 {
        return Err(invalid(
            "multiple_route_overrides",
            format!("engine rule {}: at most one route override action is allowed", rule.name),
        ));
    }
    for action in &rule.actions {
        if let ActionConf::RequestHeader(h) | ActionConf::ResponseHeader(h) = action {
            if h.header_name.is_empty() || h.header_value.is_empty() {
                return Err(invalid(
                    "empty_header_action",
                    format!("engine rule {}: header-name and header-value cannot be empty", rule.name),
                ));
            }
        }
        if let ActionConf::ForwardRouteOverride(f) = action {
            if f.backend_pool.is_empty() {
                return Err(invalid(
                    "missing_backend_pool",
                    format!("engine rule {}: backend-pool cannot be empty for ForwardRouteOverride", rule.name),
                ));
            }
        }
    }
    Ok(())
}

/// `match-value: 200` and `match-value: [GET, POST]` are both accepted.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Sequence(values) => values.into_iter().map(scalar::<D::Error>).collect(),
        value => Ok(vec![scalar(value)?]),
    }
}

fn scalar<E: Error>(value: Value) -> Result<String, E> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(E::custom("expected a scalar match value")),
    }
}

fn https() -> String {
    "Https".into()
}

fn found() -> String {
    "Found".into()
}

fn preserve() -> String {
    "Preserve".into()
}
