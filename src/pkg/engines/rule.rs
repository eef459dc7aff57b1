use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::{action, condition};
use crate::pkg::{
    az::{CliCommand, CommandRunner, Outcome, Scope},
    plan::Decision,
};
use crate::prelude::{Result, RouteManagerError};

/// What a rule holds remotely. Actions and conditions carry no identity
/// beyond their position, so counts are all the teardown needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteActions {
    pub request_headers: usize,
    pub response_headers: usize,
    /// `ForwardRouteOverride` or `RedirectRouteOverride`.
    pub route_override: Option<&'static str>,
}

impl RemoteActions {
    pub fn from_listing(listing: &Value) -> Self {
        let count = |key: &str| listing.get(key).and_then(Value::as_array).map_or(0, Vec::len);
        let route_override = match listing.get("routeConfigurationOverride") {
            None | Some(Value::Null) => None,
            Some(o) if o.get("backendPool").is_some() => Some("ForwardRouteOverride"),
            Some(_) => Some("RedirectRouteOverride"),
        };
        Self {
            request_headers: count("requestHeaderActions"),
            response_headers: count("responseHeaderActions"),
            route_override,
        }
    }
}

#[async_trait]
pub trait RuleInventory: Send + Sync {
    async fn rules(&self, engine: &str) -> Result<BTreeMap<String, i64>>;

    async fn actions(&self, engine: &str, rule: &str) -> Result<RemoteActions>;

    async fn conditions(&self, engine: &str, rule: &str) -> Result<usize>;
}

pub struct AzInventory<'a, R: ?Sized> {
    runner: &'a R,
    scope: &'a Scope,
}

impl<'a, R: CommandRunner + ?Sized> AzInventory<'a, R> {
    pub fn new(runner: &'a R, scope: &'a Scope) -> Self {
        Self { runner, scope }
    }

    fn rule_command(&self, words: &[&str], engine: &str, rule: &str) -> CliCommand {
        self.scope
            .command(words)
            .arg("--name", rule)
            .arg("--rules-engine-name", engine)
    }

    async fn listing(&self, command: CliCommand) -> Result<Value> {
        match self.runner.run(&command).await? {
            Outcome::Data(value) => Ok(value),
            Outcome::Empty => Ok(Value::Null),
            Outcome::Text(text) => Err(RouteManagerError::remote(&command, format!("unexpected output {}", text))),
            Outcome::Failure(err) => Err(RouteManagerError::remote(&command, err)),
        }
    }
}

#[async_trait]
impl<'a, R: CommandRunner + ?Sized> RuleInventory for AzInventory<'a, R> {
    async fn rules(&self, engine: &str) -> Result<BTreeMap<String, i64>> {
        let command = self
            .scope
            .command(&["rules-engine", "rule", "list"])
            .arg("--name", engine)
            .arg("--query", "[].{name:name,priority:priority}")
            .arg("-o", "json");
        let rules = match self.runner.run(&command).await? {
            Outcome::Data(Value::Array(rules)) => rules,
            Outcome::Failure(err) => {
                tracing::warn!("listing rules of engine {}: {}", engine, err);
                return Ok(BTreeMap::new());
            }
            _ => return Ok(BTreeMap::new()),
        };
        Ok(rules
            .iter()
            .filter_map(|r| {
                let name = r.get("name")?.as_str()?;
                let priority = r.get("priority")?.as_i64()?;
                Some((name.to_string(), priority))
            })
            .collect())
    }

    async fn actions(&self, engine: &str, rule: &str) -> Result<RemoteActions> {
        let command = self.rule_command(&["rules-engine", "rule", "action", "list"], engine, rule);
        Ok(RemoteActions::from_listing(&self.listing(command).await?))
    }

    async fn conditions(&self, engine: &str, rule: &str) -> Result<usize> {
        let command = self.rule_command(&["rules-engine", "rule", "condition", "list"], engine, rule);
        Ok(self.listing(command).await?.as_array().map_or(0, Vec::len))
    }
}

/// Removal commands that empty a rule down to its noop action, highest
/// index first so the remaining indices stay valid.
pub fn teardown(scope: &Scope, engine: &str, rule: &str, actions: &RemoteActions, conditions: usize) -> Vec<CliCommand> {
    let overrides = actions
        .route_override
        .map(|kind| action::remove_command(scope, engine, rule, kind, None));
    let requests = (1..actions.request_headers)
        .rev()
        .map(|i| action::remove_command(scope, engine, rule, "RequestHeader", Some(i)));
    let responses = (0..actions.response_headers)
        .rev()
        .map(|i| action::remove_command(scope, engine, rule, "ResponseHeader", Some(i)));
    let conditions = (0..conditions)
        .rev()
        .map(|i| condition::remove_command(scope, engine, rule, i));
    overrides
        .into_iter()
        .chain(requests)
        .chain(responses)
        .chain(conditions)
        .collect()
}

/// Everything one engine rule needs this run, in execution order:
/// removals, the create or update itself, then actions and conditions.
#[derive(Debug, Clone)]
pub struct EngineRulePlan {
    pub name: String,
    pub priority: i64,
    pub decision: Decision,
    pub removals: Vec<CliCommand>,
    pub upsert: CliCommand,
    pub actions: Vec<CliCommand>,
    pub conditions: Vec<CliCommand>,
}

pub fn upsert_command(scope: &Scope, engine: &str, rule: &str, priority: i64, decision: Decision) -> CliCommand {
    let verb = if decision == Decision::Update { "update" } else { "create" };
    let command = scope
        .command(&["rules-engine", "rule", verb])
        .arg("--rules-engine-name", engine)
        .arg("--name", rule)
        .arg("--priority", priority);
    if decision == Decision::Update {
        command
    } else {
        action::with_noop(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(commands: &[CliCommand], needle: &str) -> Vec<usize> {
        commands
            .iter()
            .map(|c| c.to_string())
            .filter(|c| c.contains(needle))
            .filter_map(|c| c.rsplit(' ').next().and_then(|i| i.parse().ok()))
            .collect()
    }

    #[test]
    fn teardown_keeps_noop_and_descends() {
        let remote = RemoteActions {
            request_headers: 3,
            response_headers: 2,
            route_override: Some("RedirectRouteOverride"),
        };
        let commands = teardown(&Scope::new("fd", "rg"), "eng1", "r1", &remote, 3);
        // override + (3 - 1) request + 2 response + 3 conditions
        assert_eq!(commands.len(), 8);
        assert!(commands[0].to_string().ends_with("--action-type RedirectRouteOverride"));
        assert_eq!(indices(&commands, "RequestHeader"), vec![2, 1]);
        assert_eq!(indices(&commands, "ResponseHeader"), vec![1, 0]);
        assert_eq!(indices(&commands, "condition remove"), vec![2, 1, 0]);
    }

    #[test]
    fn teardown_of_a_bare_rule_is_empty() {
        let remote = RemoteActions {
            request_headers: 1,
            ..Default::default()
        };
        assert!(teardown(&Scope::new("fd", "rg"), "eng1", "r1", &remote, 0).is_empty());
        assert!(teardown(&Scope::new("fd", "rg"), "eng1", "r1", &RemoteActions::default(), 0).is_empty());
    }

    #[test]
    fn override_kind_follows_remote_shape() -> crate::prelude::Result<()> {
        let listing: Value = serde_json::from_str(
            r#"{"requestHeaderActions": [{}, {}], "responseHeaderActions": [],
                "routeConfigurationOverride": {"backendPool": {"id": "/pools/p"}}}"#,
        )?;
        let remote = RemoteActions::from_listing(&listing);
        assert_eq!(remote.request_headers, 2);
        assert_eq!(remote.route_override, Some("ForwardRouteOverride"));

        let listing: Value = serde_json::from_str(r#"{"routeConfigurationOverride": {"redirectType": "Found"}}"#)?;
        assert_eq!(RemoteActions::from_listing(&listing).route_override, Some("RedirectRouteOverride"));
        Ok(())
    }

    #[test]
    fn create_carries_noop_action_and_update_does_not() {
        let scope = Scope::new("fd", "rg");
        let create = upsert_command(&scope, "eng1", "r1", 4, Decision::Create).to_string();
        assert!(create.contains("rules-engine rule create"));
        assert!(create.ends_with(
            "--priority 4 --action-type RequestHeader --header-action Overwrite \
             --header-name route-manager-noop --header-value no-rule-association"
        ));
        let update = upsert_command(&scope, "eng1", "r1", 4, Decision::Update).to_string();
        assert!(update.ends_with("rules-engine rule update --front-door-name fd --resource-group rg --rules-engine-name eng1 --name r1 --priority 4"));
    }
}
