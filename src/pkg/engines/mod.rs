//! Rules engine reconciliation.
//!
//! An engine cannot be emptied, so every engine keeps a permanent
//! `routemanagerNOOP` rule. Rules keep the priority they were created with
//! and new rules are appended above the highest one. Actions and conditions
//! of an existing rule are replaced wholesale on every run.

pub mod action;
pub mod condition;
pub mod rule;

use crate::pkg::{
    az::Scope,
    plan::Decision,
    spec::engines::{EngineConf, EngineRuleConf, NOOP_RULE},
};
use crate::prelude::Result;
use rule::{EngineRulePlan, RuleInventory};

pub async fn plan<I>(inventory: &I, scope: &Scope, engine: &EngineConf) -> Result<Vec<EngineRulePlan>>
where
    I: RuleInventory + ?Sized,
{
    let existing = inventory.rules(&engine.name).await?;
    tracing::debug!("engine {} has rules {:?}", &engine.name, &existing);
    let mut next_priority = existing.values().copied().max().unwrap_or(0).max(0);

    let noop = EngineRuleConf {
        name: NOOP_RULE.into(),
        conditions: vec![],
        actions: vec![],
    };
    let mut plans = Vec::with_capacity(engine.rules.len() + 1);
    for rule in std::iter::once(&noop).chain(engine.rules.iter()) {
        let (priority, decision) = match existing.get(&rule.name) {
            Some(priority) => (*priority, Decision::Update),
            None => {
                next_priority += 1;
                (next_priority, Decision::Create)
            }
        };
        plans.push(plan_rule(inventory, scope, &engine.name, rule, priority, decision).await?);
    }
    Ok(plans)
}

async fn plan_rule<I>(
    inventory: &I,
    scope: &Scope,
    engine: &str,
    conf: &EngineRuleConf,
    priority: i64,
    decision: Decision,
) -> Result<EngineRulePlan>
where
    I: RuleInventory + ?Sized,
{
    let removals = if decision == Decision::Update {
        let actions = inventory.actions(engine, &conf.name).await?;
        let conditions = inventory.conditions(engine, &conf.name).await?;
        rule::teardown(scope, engine, &conf.name, &actions, conditions)
    } else {
        vec![]
    };
    tracing::info!(
        "{} engine rule {} at priority {} ({} removals)",
        decision,
        &conf.name,
        priority,
        removals.len()
    );
    Ok(EngineRulePlan {
        name: conf.name.clone(),
        priority,
        decision,
        removals,
        upsert: rule::upsert_command(scope, engine, &conf.name, priority, decision),
        actions: conf
            .actions
            .iter()
            .map(|a| action::add_command(scope, engine, &conf.name, a))
            .collect(),
        conditions: conf
            .conditions
            .iter()
            .map(|c| condition::add_command(scope, engine, &conf.name, c))
            .collect(),
    })
}

#[cfg(test)]
pub mod testing {
    use std::collections::{BTreeMap, HashMap};

    use async_trait::async_trait;

    use super::rule::{RemoteActions, RuleInventory};
    use crate::prelude::Result;

    #[derive(Default)]
    pub struct FixedInventory {
        pub rules: BTreeMap<String, i64>,
        pub actions: HashMap<String, RemoteActions>,
        pub conditions: HashMap<String, usize>,
    }

    impl FixedInventory {
        pub fn with_rule(mut self, name: &str, priority: i64, actions: RemoteActions, conditions: usize) -> Self {
            self.rules.insert(name.into(), priority);
            self.actions.insert(name.into(), actions);
            self.conditions.insert(name.into(), conditions);
            self
        }
    }

    #[async_trait]
    impl RuleInventory for FixedInventory {
        async fn rules(&self, _engine: &str) -> Result<BTreeMap<String, i64>> {
            Ok(self.rules.clone())
        }

        async fn actions(&self, _engine: &str, rule: &str) -> Result<RemoteActions> {
            Ok(self.actions.get(rule).cloned().unwrap_or_default())
        }

        async fn conditions(&self, _engine: &str, rule: &str) -> Result<usize> {
            Ok(self.conditions.get(rule).copied().unwrap_or(0))
        }
    }
}
