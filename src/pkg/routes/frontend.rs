use serde_json::Value;

use crate::pkg::{
    az::{
        cert::{self, CustomCert},
        dns,
        existence::{self, Existence, ResourceKind},
        keyvault, CliCommand, CommandRunner, Outcome, Scope,
    },
    conf::Settings,
    plan::{Decision, Step},
    spec::config::{CertificateType, FrontendConf},
};
use crate::prelude::{Result, RouteManagerError};

/// Secret version that tracks the newest version in the vault.
const LATEST: &str = "Latest";

#[derive(Debug, Clone)]
pub struct FrontendPlan {
    pub step: Step,
    pub host_name: String,
    /// Runs before the frontend is created.
    pub cname: Option<CliCommand>,
    pub grant: Option<CliCommand>,
    /// Host whose CNAME must point at the Front Door before `https` runs.
    pub dns_check: Option<String>,
    pub https: Option<CliCommand>,
}

impl FrontendPlan {
    pub fn name(&self) -> &str {
        &self.step.name
    }
}

pub async fn build<R>(runner: &R, scope: &Scope, conf: &FrontendConf, settings: &Settings) -> Result<FrontendPlan>
where
    R: CommandRunner + ?Sized,
{
    let kind = ResourceKind::Frontend;
    let existing = existence::probe(runner, scope, &kind, &conf.name).await?;

    let (step, host_name, cname) = if conf.exists {
        let host_name = match &existing {
            Existence::Present(fe) => fe.get("hostName").and_then(Value::as_str).map(String::from),
            _ => None,
        }
        .ok_or_else(|| {
            RouteManagerError::remote(
                kind.show_command(scope, &conf.name),
                format!("failed getting frontend {} in front door {}", conf.name, scope.front_door),
            )
        })?;
        (Step::reference(kind.label(), &conf.name), host_name, None)
    } else {
        let host_name = conf
            .host_name
            .clone()
            .ok_or_else(|| RouteManagerError::Config(format!("frontend {}: missing host-name config", conf.name)))?;
        if existing.exists(&kind) {
            tracing::info!("frontend {} exists", &conf.name);
            (Step::skip(kind.label(), &conf.name), host_name, None)
        } else {
            let cname = match (conf.create_cname, &conf.zone_group) {
                (true, Some(zone_group)) => {
                    let target = front_door_id(runner, scope).await?;
                    Some(dns::cname_record_command(zone_group, &host_name, &target)?)
                }
                (true, None) => {
                    return Err(RouteManagerError::Config(format!(
                        "frontend {}: missing zone-group for {}",
                        conf.name, host_name
                    )))
                }
                _ => None,
            };
            let command = create_command(scope, conf, &host_name, settings)?;
            (Step::create(kind.label(), &conf.name, command), host_name, cname)
        }
    };

    let grant = match (&conf.certificate_type, &conf.vault_id) {
        (Some(CertificateType::AzureKeyVault), Some(vault_id)) => {
            let principal = keyvault::frontdoor_principal(runner, settings.service_principal()).await?;
            tracing::info!("configuring access policy for front door service principal {}", &principal);
            Some(keyvault::grant_access_command(vault_id, &principal))
        }
        _ => None,
    };

    let mut plan = FrontendPlan {
        step,
        host_name,
        cname,
        grant,
        dns_check: None,
        https: None,
    };
    if conf.enable_ssl {
        plan_https(runner, scope, conf, &mut plan).await?;
    }
    Ok(plan)
}

async fn plan_https<R>(runner: &R, scope: &Scope, conf: &FrontendConf, plan: &mut FrontendPlan) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let certificate_type = conf.certificate_type.ok_or_else(|| {
        RouteManagerError::Config(format!(
            "frontend {}: cannot enable ssl without specifying certificate-type",
            conf.name
        ))
    })?;
    match certificate_type {
        CertificateType::FrontDoor => {
            plan.dns_check = Some(plan.host_name.clone());
        }
        CertificateType::AzureKeyVault => {
            // enable-https re-issues a custom certificate on every call
            let desired = desired_cert(conf);
            if plan.step.decision != Decision::Create
                && !cert::provisioning_needed(runner, scope, &conf.name, &desired).await?
            {
                tracing::info!("cert provisioning not needed for {}, current config is good", &conf.name);
                return Ok(());
            }
        }
    }
    plan.https = Some(https_command(scope, conf, certificate_type));
    Ok(())
}

pub fn desired_cert(conf: &FrontendConf) -> CustomCert {
    CustomCert {
        secret_name: conf.secret_name.clone(),
        secret_version: conf.secret_version.clone().filter(|v| v != LATEST),
        minimum_tls: Some(conf.tls_version.clone()),
        vault_id: conf.vault_id.clone(),
    }
}

pub fn create_command(scope: &Scope, conf: &FrontendConf, host_name: &str, settings: &Settings) -> Result<CliCommand> {
    let command = scope
        .command(&["frontend-endpoint", "create"])
        .arg("--name", &conf.name)
        .arg("--host-name", host_name);
    let command = if conf.sticky_sessions {
        command
            .arg("--session-affinity-enabled", true)
            .arg("--session-affinity-ttl", conf.session_ttl)
    } else {
        command
    };
    match &conf.waf_name {
        Some(waf) => {
            let subscription = settings.arm_subscription_id.as_deref().ok_or_else(|| {
                RouteManagerError::Config(format!(
                    "frontend {}: waf-name {} needs ARM_SUBSCRIPTION_ID",
                    conf.name, waf
                ))
            })?;
            Ok(command.arg("--waf-policy", waf_policy_id(subscription, &scope.group, waf)))
        }
        None => Ok(command),
    }
}

pub fn waf_policy_id(subscription: &str, group: &str, waf: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/frontDoorWebApplicationFirewallPolicies/{}",
        subscription, group, waf
    )
}

pub fn https_command(scope: &Scope, conf: &FrontendConf, certificate_type: CertificateType) -> CliCommand {
    let command = scope
        .command(&["frontend-endpoint", "enable-https"])
        .arg("--name", &conf.name)
        .arg("--certificate-source", certificate_type)
        .arg("--minimum-tls-version", &conf.tls_version);
    match certificate_type {
        CertificateType::FrontDoor => command,
        CertificateType::AzureKeyVault => command
            .opt_arg("--secret-name", conf.secret_name.as_ref())
            .opt_arg(
                "--secret-version",
                conf.secret_version.as_ref().filter(|v| v.as_str() != LATEST),
            )
            .opt_arg("--vault-id", conf.vault_id.as_ref()),
    }
}

pub async fn front_door_id<R>(runner: &R, scope: &Scope) -> Result<String>
where
    R: CommandRunner + ?Sized,
{
    let command = CliCommand::az(["network", "front-door", "show"])
        .arg("--name", &scope.front_door)
        .arg("--resource-group", &scope.group);
    match runner.run(&command).await? {
        Outcome::Data(fd) => fd
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| RouteManagerError::remote(&command, "front door has no id")),
        Outcome::Failure(err) => Err(RouteManagerError::remote(&command, err)),
        _ => Err(RouteManagerError::remote(&command, "failed to get front door id")),
    }
}
