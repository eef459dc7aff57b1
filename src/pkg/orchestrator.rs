use std::time::Duration;

use super::{
    az::{cert, dns, CliCommand, CommandRunner, Outcome, Scope},
    conf::Settings,
    engines::{self, rule::AzInventory},
    plan::{Decision, Step},
    routes::{association, frontend, pool, rule},
    spec::{
        config::{FrontDoorConf, PoolConf, RouteConf},
        engines::{AssociationConf, EngineConf},
    },
};
use crate::prelude::{Result, RouteManagerError};

const ENABLED: &str = "Enabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Abort,
    /// Keep going; the run exits 1.
    Degrade,
    /// Keep going; logged only.
    Warn,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub referenced: usize,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Create => self.created += 1,
            Decision::Update => self.updated += 1,
            Decision::Skip => self.skipped += 1,
            Decision::Reference => self.referenced += 1,
        }
    }

    pub fn degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn exit_code(&self) -> u8 {
        u8::from(self.degraded())
    }
}

pub struct RouteOrchestrator<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    scope: Scope,
    settings: Settings,
    whatif: bool,
    report: RunReport,
}

impl<'a, R: CommandRunner + ?Sized> RouteOrchestrator<'a, R> {
    pub fn new(runner: &'a R, scope: Scope, settings: Settings, whatif: bool) -> Self {
        Self {
            runner,
            scope,
            settings,
            whatif,
            report: RunReport::default(),
        }
    }

    pub async fn run(mut self, conf: &FrontDoorConf) -> Result<RunReport> {
        tracing::info!("process routes......");
        for route in &conf.routing_rules {
            if let Err(err) = self.process_route(route).await {
                match err {
                    RouteManagerError::Config(_)
                    | RouteManagerError::ConfigIssues(_)
                    | RouteManagerError::Validation(_) => return Err(err),
                    _ if route.fatal => return Err(err),
                    _ => {
                        tracing::error!("route {} failed: {}", &route.name, &err);
                        self.report.failures.push(format!("route {}: {}", route.name, err));
                    }
                }
            }
        }

        tracing::info!("process rules engines.....");
        for engine in &conf.engine_rules {
            self.process_engine(engine).await?;
        }

        tracing::info!("associating rules to engines.....");
        for association in &conf.engine_associations {
            self.process_association(association).await?;
        }

        let report = self.report;
        tracing::info!(
            "done: {} created, {} updated, {} skipped, {} referenced, {} failures, {} warnings",
            report.created,
            report.updated,
            report.skipped,
            report.referenced,
            report.failures.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Runs `command` unless in whatif mode. `Ok(false)` means it failed
    /// and `policy` let the run continue.
    async fn apply(&mut self, command: &CliCommand, policy: Policy) -> Result<bool> {
        if self.whatif {
            tracing::info!("whatif: {}", command);
            return Ok(true);
        }
        tracing::debug!("{}", command);
        let outcome = match self.runner.run(command).await {
            Ok(outcome) => outcome,
            Err(RouteManagerError::Timeout(_)) => Outcome::Failure("timed out".into()),
            Err(err) => return Err(err),
        };
        tracing::trace!("{:?}", &outcome);
        if outcome.is_success() {
            return Ok(true);
        }
        if outcome.already_exists() {
            tracing::info!("already exists: {}", command);
            return Ok(true);
        }
        let err = match outcome {
            Outcome::Failure(err) => err,
            other => format!("{:?}", other),
        };
        tracing::error!("command `{}` returned with: {}", command, &err);
        match policy {
            Policy::Abort => Err(RouteManagerError::remote(command, err)),
            Policy::Degrade => {
                self.report.failures.push(format!("{}: {}", command, err));
                Ok(false)
            }
            Policy::Warn => {
                self.report.warnings.push(format!("{}: {}", command, err));
                Ok(false)
            }
        }
    }

    async fn apply_step(&mut self, step: &Step, policy: Policy) -> Result<bool> {
        tracing::info!("{}", step);
        self.report.record(step.decision);
        match &step.command {
            Some(command) => self.apply(command, policy).await,
            None => Ok(true),
        }
    }

    async fn process_route(&mut self, route: &RouteConf) -> Result<()> {
        tracing::info!("ROUTE RULE NAME --- {}", &route.name);
        let policy = if route.fatal { Policy::Abort } else { Policy::Degrade };

        for fe in &route.frontends {
            let plan = frontend::build(self.runner, &self.scope, fe, &self.settings).await?;
            self.process_frontend(plan, policy).await?;
        }

        if let Some(pool) = &route.backend_pool {
            self.process_pool(pool, policy).await?;
        }

        if let Some(step) = rule::build(self.runner, &self.scope, route).await? {
            self.apply_step(&step, policy).await?;
        }
        Ok(())
    }

    async fn process_frontend(&mut self, plan: frontend::FrontendPlan, policy: Policy) -> Result<()> {
        if let Some(cname) = &plan.cname {
            tracing::info!("creating cname for {}", &plan.host_name);
            self.apply(cname, policy).await?;
        }
        if let (Some(host), Some(_)) = (&plan.dns_check, &plan.https) {
            if self.whatif && plan.cname.is_some() {
                tracing::info!("whatif: skipping dns validation of {}, its cname is not created yet", host);
            } else {
                dns::validate_frontdoor_cname(self.runner, &self.scope, host).await?;
            }
        }
        self.apply_step(&plan.step, policy).await?;
        if let Some(grant) = &plan.grant {
            self.apply(grant, Policy::Warn).await?;
        }

        let https = match &plan.https {
            Some(https) => https,
            None => return Ok(()),
        };
        tracing::info!("enabling ssl on {}, please wait ......", plan.name());
        if !self.apply(https, policy).await? || self.whatif {
            return Ok(());
        }

        let timeout = Duration::from_secs(self.settings.cert_timeout());
        let (reached, state) =
            cert::poll_certificate_status(self.runner, &self.scope, plan.name(), timeout, ENABLED).await?;
        let state = state.unwrap_or_else(|| "unknown".into());
        if reached {
            tracing::info!("*** cert provisioning for frontend {} succeeded with status {} ***", plan.name(), state);
        } else {
            tracing::error!("*** CERT PROVISIONING FOR FRONTEND {} FAILED with status {} ***", plan.name(), state);
            self.report
                .failures
                .push(format!("cert provisioning for frontend {}: {}", plan.name(), state));
        }
        Ok(())
    }

    async fn process_pool(&mut self, conf: &PoolConf, policy: Policy) -> Result<()> {
        let plan = pool::build(self.runner, &self.scope, conf).await?;
        for step in plan.steps() {
            self.apply_step(step, policy).await?;
        }
        if plan.pool.decision == Decision::Reference {
            return Ok(());
        }

        let remote = if self.whatif && plan.pool.decision == Decision::Create {
            conf.backends.iter().take(1).map(|b| b.address.clone()).collect()
        } else {
            pool::remote_backends(self.runner, &self.scope, &conf.name).await?
        };
        tracing::debug!("existing backends: {:?}", &remote);
        for backend in pool::missing_backends(conf, &remote) {
            tracing::info!("adding backend {}", &backend.address);
            let command = pool::add_backend_command(&self.scope, &conf.name, backend);
            self.apply(&command, policy).await?;
        }
        Ok(())
    }

    async fn process_engine(&mut self, engine: &EngineConf) -> Result<()> {
        let inventory = AzInventory::new(self.runner, &self.scope);
        let plans = engines::plan(&inventory, &self.scope, engine).await?;
        tracing::info!(
            "engine {} rules: {:?}",
            &engine.name,
            plans.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
        );
        for plan in plans {
            for removal in &plan.removals {
                self.apply(removal, Policy::Warn).await?;
            }
            self.report.record(plan.decision);
            self.apply(&plan.upsert, Policy::Abort).await?;
            for command in plan.actions.iter().chain(plan.conditions.iter()) {
                self.apply(command, Policy::Abort).await?;
            }
        }
        Ok(())
    }

    async fn process_association(&mut self, association: &AssociationConf) -> Result<()> {
        tracing::info!("engine association for engine: {}", &association.engine);
        for command in association::commands(&self.scope, association) {
            self.apply(&command, Policy::Abort).await?;
        }
        Ok(())
    }
}
