use std::time::Duration;

use serde_json::Value;

use super::{existence::ResourceKind, CommandRunner, Outcome, Scope};
use crate::prelude::{Result, RouteManagerError};

/// The parts of `customHttpsConfiguration` a Key Vault certificate is
/// compared on. `None` stands for "unset" on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomCert {
    pub secret_name: Option<String>,
    pub secret_version: Option<String>,
    pub minimum_tls: Option<String>,
    pub vault_id: Option<String>,
}

impl CustomCert {
    pub fn from_remote(https: &Value) -> Self {
        let text = |v: Option<&Value>| v.and_then(Value::as_str).map(String::from);
        Self {
            secret_name: text(https.get("secretName")),
            secret_version: text(https.get("secretVersion")),
            minimum_tls: text(https.get("minimumTlsVersion")),
            vault_id: text(https.get("vault").and_then(|v| v.get("id"))),
        }
    }
}

/// The CLI drops and re-issues a custom certificate on every enable-https
/// call, so it is only called when the remote configuration differs.
pub async fn provisioning_needed<R>(runner: &R, scope: &Scope, frontend: &str, desired: &CustomCert) -> Result<bool>
where
    R: CommandRunner + ?Sized,
{
    tracing::info!("lookup existing custom cert configuration for {}", frontend);
    let command = ResourceKind::Frontend.show_command(scope, frontend);
    let current = match runner.run(&command).await? {
        Outcome::Data(fe) => match fe.get("customHttpsConfiguration") {
            Some(https) if !https.is_null() => CustomCert::from_remote(https),
            _ => CustomCert::default(),
        },
        other => {
            tracing::warn!("failed to get current ssl config for {}: {:?}", frontend, other);
            return Ok(true);
        }
    };
    tracing::debug!("current {:?}, desired {:?}", &current, desired);
    Ok(&current != desired)
}

/// Blocks until the frontend leaves the `Enabling` state or `timeout`
/// expires, then reports whether it reached `desired`.
pub async fn poll_certificate_status<R>(
    runner: &R,
    scope: &Scope,
    frontend: &str,
    timeout: Duration,
    desired: &str,
) -> Result<(bool, Option<String>)>
where
    R: CommandRunner + ?Sized,
{
    tracing::info!("waiting up to {} minutes for {}", timeout.as_secs() / 60, frontend);
    let wait = scope
        .command(&["frontend-endpoint", "wait"])
        .arg("--name", frontend)
        .arg("--timeout", timeout.as_secs())
        .arg("--custom", "customHttpsProvisioningState!='Enabling'")
        .timeout(timeout + Duration::from_secs(60));
    match runner.run(&wait).await {
        Ok(Outcome::Failure(err)) => tracing::warn!("wait on {} returned: {}", frontend, err),
        Ok(_) => {}
        Err(RouteManagerError::Timeout(cmd)) => tracing::warn!("gave up on `{}`", cmd),
        Err(e) => return Err(e),
    }

    tracing::info!("cert provisioning wait has completed, getting status");
    let show = ResourceKind::Frontend.show_command(scope, frontend);
    let state = match runner.run(&show).await? {
        Outcome::Data(fe) => fe
            .get("customHttpsProvisioningState")
            .and_then(Value::as_str)
            .map(String::from),
        other => {
            tracing::warn!("failed to get frontend {} config: {:?}", frontend, other);
            None
        }
    };
    Ok((state.as_deref() == Some(desired), state))
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::az::testing::{fail, ok, ScriptedRunner};

    fn desired() -> CustomCert {
        CustomCert {
            secret_name: Some("cert".into()),
            secret_version: None,
            minimum_tls: Some("1.2".into()),
            vault_id: Some("/vaults/kv".into()),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn matching_config_needs_no_provisioning() -> Result<()> {
        let runner = ScriptedRunner::new().on(
            "frontend-endpoint show",
            ok(r#"{"customHttpsConfiguration": {"secretName": "cert", "secretVersion": null,
                 "minimumTlsVersion": "1.2", "vault": {"id": "/vaults/kv"}}}"#),
        );
        let scope = Scope::new("fd", "rg");
        assert!(!provisioning_needed(&runner, &scope, "fe1", &desired()).await?);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn differing_or_missing_config_needs_provisioning() -> Result<()> {
        let scope = Scope::new("fd", "rg");
        let runner = ScriptedRunner::new().on(
            "frontend-endpoint show",
            ok(r#"{"customHttpsConfiguration": {"secretName": "cert", "secretVersion": "v1",
                 "minimumTlsVersion": "1.2", "vault": {"id": "/vaults/kv"}}}"#),
        );
        assert!(provisioning_needed(&runner, &scope, "fe1", &desired()).await?);

        let runner = ScriptedRunner::new().on("frontend-endpoint show", ok(r#"{"customHttpsConfiguration": null}"#));
        assert!(provisioning_needed(&runner, &scope, "fe1", &desired()).await?);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn reports_final_state() -> Result<()> {
        let scope = Scope::new("fd", "rg");
        let runner = ScriptedRunner::new()
            .on("frontend-endpoint wait", ok(""))
            .on("frontend-endpoint show", ok(r#"{"customHttpsProvisioningState": "Failed"}"#));
        let (reached, state) =
            poll_certificate_status(&runner, &scope, "fe1", Duration::from_secs(7200), "Enabled").await?;
        assert!(!reached);
        assert_eq!(state.as_deref(), Some("Failed"));
        assert!(runner.calls()[0].contains("--timeout 7200"));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn reaches_enabled_even_if_wait_complains() -> Result<()> {
        let scope = Scope::new("fd", "rg");
        let runner = ScriptedRunner::new()
            .on("frontend-endpoint wait", fail("ERROR: transient"))
            .on("frontend-endpoint show", ok(r#"{"customHttpsProvisioningState": "Enabled"}"#));
        let (reached, _) =
            poll_certificate_status(&runner, &scope, "fe1", Duration::from_secs(60), "Enabled").await?;
        assert!(reached);
        Ok(())
    }
}
