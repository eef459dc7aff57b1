use crate::pkg::{
    az::{
        existence::{self, ResourceKind},
        CliCommand, CommandRunner, Scope,
    },
    plan::Step,
    spec::config::LoadBalancingConf,
};
use crate::prelude::Result;

pub fn default_name(pool: &str) -> String {
    format!("lb-{}", pool)
}

pub async fn build<R>(runner: &R, scope: &Scope, pool: &str, conf: &LoadBalancingConf) -> Result<Step>
where
    R: CommandRunner + ?Sized,
{
    let kind = ResourceKind::LoadBalancing;
    if let Some(name) = &conf.name {
        return Ok(Step::reference(kind.label(), name));
    }
    let name = default_name(pool);
    if existence::exists(runner, scope, &kind, &name).await? {
        tracing::info!("load balancing {} exists", &name);
        return Ok(Step::skip(kind.label(), name));
    }
    let command = create_command(scope, &name, conf);
    Ok(Step::create(kind.label(), name, command))
}

pub fn create_command(scope: &Scope, name: &str, conf: &LoadBalancingConf) -> CliCommand {
    scope
        .command(&["load-balancing", "create"])
        .arg("--name", name)
        .arg("--sample-size", conf.sample_size)
        .arg("--successful-samples-required", conf.samples)
        .arg("--additional-latency", conf.latency)
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::{
        az::testing::{fail, ScriptedRunner},
        plan::Decision,
    };

    #[tokio::test]
    #[traced_test]
    async fn absent_settings_are_created() -> Result<()> {
        let runner = ScriptedRunner::new().on("load-balancing show", fail("ERROR: lb-pool1 does not exist"));
        let conf = LoadBalancingConf {
            latency: 25,
            ..Default::default()
        };
        let step = build(&runner, &Scope::new("fd", "rg"), "pool1", &conf).await?;
        assert_eq!(step.decision, Decision::Create);
        assert_eq!(step.name, "lb-pool1");
        let command = step.command.map(|c| c.to_string()).unwrap_or_default();
        assert!(command.ends_with(
            "--name lb-pool1 --sample-size 4 --successful-samples-required 2 --additional-latency 25"
        ));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn undecidable_show_leaves_settings_alone() -> Result<()> {
        let runner = ScriptedRunner::new().on("load-balancing show", fail("ERROR: AuthorizationFailed"));
        let step = build(&runner, &Scope::new("fd", "rg"), "pool1", &LoadBalancingConf::default()).await?;
        assert_eq!(step.decision, Decision::Skip);
        Ok(())
    }
}
