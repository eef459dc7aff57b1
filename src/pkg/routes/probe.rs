use crate::pkg::{
    az::{
        existence::{self, ResourceKind},
        CliCommand, CommandRunner, Scope,
    },
    plan::Step,
    spec::config::ProbeConf,
};
use crate::prelude::Result;

pub fn default_name(pool: &str) -> String {
    format!("probe-{}", pool)
}

/// An explicit name references a probe managed elsewhere. Otherwise the
/// pool's own `probe-<pool>` is created when absent; an existing one is
/// left as it is.
pub async fn build<R>(runner: &R, scope: &Scope, pool: &str, conf: &ProbeConf) -> Result<Step>
where
    R: CommandRunner + ?Sized,
{
    let kind = ResourceKind::Probe;
    if let Some(name) = &conf.name {
        return Ok(Step::reference(kind.label(), name));
    }
    let name = default_name(pool);
    if existence::exists(runner, scope, &kind, &name).await? {
        tracing::info!("probe {} exists", &name);
        return Ok(Step::skip(kind.label(), name));
    }
    let command = create_command(scope, &name, conf);
    Ok(Step::create(kind.label(), name, command))
}

pub fn create_command(scope: &Scope, name: &str, conf: &ProbeConf) -> CliCommand {
    let command = scope
        .command(&["probe", "create"])
        .arg("--name", name)
        .arg("--protocol", &conf.protocol);
    let command = if conf.disable {
        command.arg("--enabled", "Disabled")
    } else {
        command
    };
    command
        .arg("--interval", conf.interval)
        .arg("--path", &conf.path)
        .arg("--probeMethod", "GET")
}
