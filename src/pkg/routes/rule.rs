use crate::pkg::{
    az::{
        existence::{self, ResourceKind},
        CliCommand, CommandRunner, Scope,
    },
    plan::Step,
    spec::config::{RouteConf, RuleType},
};
use crate::prelude::{Result, RouteManagerError};

/// `None` for routes that only provision frontends and pools.
pub async fn build<R>(runner: &R, scope: &Scope, route: &RouteConf) -> Result<Option<Step>>
where
    R: CommandRunner + ?Sized,
{
    if route.ruletype == RuleType::Skip {
        tracing::debug!("route {} has no routing rule", &route.name);
        return Ok(None);
    }
    let kind = ResourceKind::RoutingRule;
    if existence::exists(runner, scope, &kind, &route.name).await? {
        tracing::info!("routing rule {} exists", &route.name);
        return Ok(Some(Step::skip(kind.label(), &route.name)));
    }
    let command = create_command(scope, route)?;
    Ok(Some(Step::create(kind.label(), &route.name, command)))
}

pub fn create_command(scope: &Scope, route: &RouteConf) -> Result<CliCommand> {
    let command = scope
        .command(&["routing-rule", "create"])
        .arg("--route-type", route.ruletype)
        .arg("--name", &route.name)
        .arg("--disabled", route.disable)
        .list_arg("--frontend-endpoints", route.frontends.iter().map(|fe| fe.name.clone()))
        .list_arg("--patterns", route.patterns.iter().cloned())
        .list_arg("--accepted-protocols", route.protocols.iter().cloned());

    match route.ruletype {
        RuleType::Forward => {
            let pool = route.backend_pool.as_ref().ok_or_else(|| {
                RouteManagerError::Config(format!(
                    "route {}: backend pool cannot be null when ruletype is Forward",
                    route.name
                ))
            })?;
            Ok(command
                .arg("--backend-pool", &pool.name)
                .arg("--forwarding-protocol", &route.forward_protocol)
                .opt_arg("--custom-forwarding-path", route.forward_path.as_ref()))
        }
        RuleType::Redirect => Ok(command
            .arg("--redirect-type", &route.redirect_type)
            .arg("--redirect-protocol", &route.redirect_protocol)
            .opt_arg("--custom-host", route.destination_host.as_ref())
            .opt_arg("--custom-path", route.destination_path.as_ref())),
        RuleType::Skip => Err(RouteManagerError::Config(format!(
            "route {} has ruletype None and no routing rule",
            route.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::{
        az::testing::{fail, ok, ScriptedRunner},
        plan::Decision,
    };

    fn route(yaml: &str) -> RouteConf {
        serde_yaml::from_str(yaml).unwrap_or_else(|e| panic!("bad route fixture: {}", e))
    }

    #[test]
    fn forward_rule_references_pool() -> Result<()> {
        let route = route("name: web\nfrontends: [{name: fe1}, {name: fe2}]\nbackend-pool: {name: pool1}\nforward-path: /app\n");
        assert_eq!(
            create_command(&Scope::new("fd", "rg"), &route)?.to_string(),
            "az network front-door routing-rule create --front-door-name fd --resource-group rg --route-type Forward \
             --name web --disabled false --frontend-endpoints fe1 fe2 --patterns /* --accepted-protocols Https Http \
             --backend-pool pool1 --forwarding-protocol MatchRequest --custom-forwarding-path /app"
        );
        Ok(())
    }

    #[test]
    fn redirect_rule_carries_destination() -> Result<()> {
        let route = route(
            "name: old\nruletype: Redirect\nfrontends: [{name: fe1}]\nredirect-type: Moved\n\
             destination-host: www.example.com\ndestination-path: /new\n",
        );
        let command = create_command(&Scope::new("fd", "rg"), &route)?.to_string();
        assert!(command.ends_with(
            "--redirect-type Moved --redirect-protocol MatchRequest --custom-host www.example.com --custom-path /new"
        ));
        assert!(!command.contains("--backend-pool"));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn none_ruletype_builds_nothing() -> Result<()> {
        let runner = ScriptedRunner::new();
        let route = route("name: infra\nruletype: None\nfrontends: []\n");
        assert!(build(&runner, &Scope::new("fd", "rg"), &route).await?.is_none());
        assert!(runner.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn existing_rule_is_skipped() -> Result<()> {
        let route = route("name: web\nfrontends: [{name: fe1}]\nbackend-pool: {name: pool1}\n");
        let runner = ScriptedRunner::new().on("routing-rule show", ok(r#"{"name": "web"}"#));
        let step = build(&runner, &Scope::new("fd", "rg"), &route).await?;
        assert_eq!(step.map(|s| s.decision), Some(Decision::Skip));

        let runner = ScriptedRunner::new().on("routing-rule show", fail("ERROR: (NotFound) Not Found"));
        let step = build(&runner, &Scope::new("fd", "rg"), &route).await?;
        assert_eq!(step.map(|s| s.decision), Some(Decision::Create));
        Ok(())
    }
}
