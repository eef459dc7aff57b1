use super::{CliCommand, CommandRunner, Outcome, Scope};
use crate::prelude::{Result, RouteManagerError};

pub fn split_hostname(hostname: &str) -> Result<(&str, &str)> {
    match hostname.split_once('.') {
        Some((record, zone)) if !record.is_empty() && zone.contains('.') => Ok((record, zone)),
        _ => Err(RouteManagerError::Config(format!(
            "cannot derive a dns zone from host name {}",
            hostname
        ))),
    }
}

pub fn cname_record_command(zone_group: &str, hostname: &str, target_resource: &str) -> Result<CliCommand> {
    let (record, zone) = split_hostname(hostname)?;
    Ok(CliCommand::az(["network", "dns", "record-set", "cname", "create"])
        .arg("--name", record)
        .arg("--resource-group", zone_group)
        .arg("--ttl", 300)
        .arg("--zone-name", zone)
        .arg("--target-resource", target_resource))
}

pub async fn resolve_cname<R>(runner: &R, hostname: &str) -> Result<Vec<String>>
where
    R: CommandRunner + ?Sized,
{
    let command = CliCommand::dig(["+short", "CNAME", hostname]);
    let lookup_failed = |err: String| RouteManagerError::Validation(format!("dns lookup for {} failed: {}", hostname, err));
    match runner.run(&command).await.map_err(|err| lookup_failed(err.to_string()))? {
        Outcome::Text(text) => Ok(text.lines().map(|l| l.trim().to_string()).collect()),
        Outcome::Data(value) => Ok(vec![value.to_string()]),
        Outcome::Empty => Ok(vec![]),
        Outcome::Failure(err) => Err(lookup_failed(err)),
    }
}

/// A Front Door managed certificate needs the custom domain to CNAME to
/// `<front-door>.azurefd.net`, otherwise domain validation can get stuck
/// and the frontend has to be recreated.
pub async fn validate_frontdoor_cname<R>(runner: &R, scope: &Scope, hostname: &str) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let expected = scope.azurefd_host();
    tracing::info!("checking {} is mapped to {}", hostname, &expected);
    let answers = resolve_cname(runner, hostname).await?;
    tracing::info!("{} mapped to {}", hostname, answers.join(", "));
    if answers.iter().any(|a| a == &expected) {
        Ok(())
    } else {
        Err(RouteManagerError::Validation(format!(
            "dns is not valid for {}: expected a CNAME to {}",
            hostname, expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::az::{
        testing::{ok, ScriptedRunner},
        Program,
    };

    #[test]
    fn splits_record_and_zone() -> Result<()> {
        assert_eq!(split_hostname("www.example.com")?, ("www", "example.com"));
        assert!(split_hostname("localhost").is_err());
        assert!(split_hostname("example.com").is_err());
        Ok(())
    }

    #[test]
    fn builds_cname_record() -> Result<()> {
        let cmd = cname_record_command("dns-rg", "shop.example.com", "/subscriptions/s/fd")?;
        assert_eq!(
            cmd.to_string(),
            "az network dns record-set cname create --name shop --resource-group dns-rg --ttl 300 --zone-name example.com --target-resource /subscriptions/s/fd"
        );
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn accepts_matching_cname() -> Result<()> {
        let runner = ScriptedRunner::new().on("dig", ok("myfd.azurefd.net.\n"));
        validate_frontdoor_cname(&runner, &Scope::new("myfd", "rg"), "a.example.com").await
    }

    #[tokio::test]
    #[traced_test]
    async fn rejects_other_targets() {
        let runner = ScriptedRunner::new().on("dig", ok("elsewhere.example.net.\n"));
        let result = validate_frontdoor_cname(&runner, &Scope::new("myfd", "rg"), "a.example.com").await;
        assert!(matches!(result, Err(RouteManagerError::Validation(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn lookup_that_cannot_run_is_a_validation_error() {
        let runner = ScriptedRunner::new().without(Program::Dig);
        match resolve_cname(&runner, "a.example.com").await {
            Err(RouteManagerError::Validation(message)) => {
                assert!(message.starts_with("dns lookup for a.example.com failed: dig binary not found"), "{}", message)
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }
}
