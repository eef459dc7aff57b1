use serde_json::Value;

use super::{load_balancing, probe};
use crate::pkg::{
    az::{
        existence::{self, ResourceKind},
        CliCommand, CommandRunner, Outcome, Scope,
    },
    plan::Step,
    spec::config::{BackendConf, PoolConf},
};
use crate::prelude::{Result, RouteManagerError};

#[derive(Debug, Clone)]
pub struct PoolPlan {
    pub probe: Option<Step>,
    pub load_balancing: Option<Step>,
    pub pool: Step,
}

impl PoolPlan {
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.probe
            .iter()
            .chain(self.load_balancing.iter())
            .chain(std::iter::once(&self.pool))
    }
}

pub async fn build<R>(runner: &R, scope: &Scope, conf: &PoolConf) -> Result<PoolPlan>
where
    R: CommandRunner + ?Sized,
{
    let kind = ResourceKind::BackendPool;
    if conf.exists {
        tracing::info!("using existing backend pool {}", &conf.name);
        return Ok(PoolPlan {
            probe: None,
            load_balancing: None,
            pool: Step::reference(kind.label(), &conf.name),
        });
    }

    let probe = probe::build(runner, scope, &conf.name, &conf.probe).await?;
    let load_balancing = load_balancing::build(runner, scope, &conf.name, &conf.load_balancing).await?;
    let pool = if existence::exists(runner, scope, &kind, &conf.name).await? {
        tracing::info!("backend pool {} exists", &conf.name);
        Step::skip(kind.label(), &conf.name)
    } else {
        let command = create_command(scope, conf, &probe.name, &load_balancing.name)?;
        Step::create(kind.label(), &conf.name, command)
    };
    Ok(PoolPlan {
        probe: Some(probe),
        load_balancing: Some(load_balancing),
        pool,
    })
}

/// The CLI creates a pool with exactly one backend; the rest are added
/// afterwards with [`add_backend_command`].
pub fn create_command(scope: &Scope, conf: &PoolConf, probe: &str, load_balancing: &str) -> Result<CliCommand> {
    let first = conf
        .backends
        .first()
        .ok_or_else(|| RouteManagerError::Config(format!("pool {}: missing backends config", conf.name)))?;
    Ok(scope
        .command(&["backend-pool", "create"])
        .arg("--name", &conf.name)
        .arg("--probe", probe)
        .arg("--load-balancing", load_balancing)
        .arg("--address", &first.address)
        .opt_arg("--backend-host-header", first.host_header.as_ref())
        .arg("--http-port", conf.http_port)
        .arg("--https-port", conf.https_port)
        .arg("--priority", conf.priority)
        .arg("--weight", conf.weight)
        .arg("--disabled", conf.disable))
}

pub fn add_backend_command(scope: &Scope, pool: &str, backend: &BackendConf) -> CliCommand {
    scope
        .command(&["backend-pool", "backend", "add"])
        .arg("--pool-name", pool)
        .arg("--address", &backend.address)
        .opt_arg("--backend-host-header", backend.host_header.as_ref())
}

pub async fn remote_backends<R>(runner: &R, scope: &Scope, pool: &str) -> Result<Vec<String>>
where
    R: CommandRunner + ?Sized,
{
    let command = scope
        .command(&["backend-pool", "backend", "list"])
        .arg("--pool-name", pool);
    match runner.run(&command).await? {
        Outcome::Data(Value::Array(backends)) => Ok(backends
            .iter()
            .filter_map(|b| b.get("address").and_then(Value::as_str))
            .map(String::from)
            .collect()),
        Outcome::Data(_) | Outcome::Empty | Outcome::Text(_) => Ok(vec![]),
        Outcome::Failure(err) => Err(RouteManagerError::remote(&command, err)),
    }
}

pub fn missing_backends<'a>(conf: &'a PoolConf, remote: &[String]) -> Vec<&'a BackendConf> {
    conf.backends
        .iter()
        .filter(|b| !remote.iter().any(|r| r == &b.address))
        .collect()
}
