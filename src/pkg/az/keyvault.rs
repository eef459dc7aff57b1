use std::time::Duration;

use super::{CliCommand, CommandRunner, Outcome};
use crate::prelude::{Result, RouteManagerError};

pub fn vault_name(vault_id: &str) -> &str {
    vault_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(vault_id)
}

/// Object id of the Front Door service principal. It differs between
/// tenants, so it is looked up through the first-party application id.
pub async fn frontdoor_principal<R>(runner: &R, app_id: &str) -> Result<String>
where
    R: CommandRunner + ?Sized,
{
    let command = CliCommand::az(["ad", "sp", "show"]).arg("--id", app_id);
    match runner.run(&command).await? {
        Outcome::Data(sp) => sp
            .get("objectId")
            .or_else(|| sp.get("id"))
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| RouteManagerError::remote(&command, "service principal has no object id")),
        Outcome::Failure(err) => Err(RouteManagerError::remote(&command, err)),
        _ => Err(RouteManagerError::remote(&command, "empty response")),
    }
}

pub fn grant_access_command(vault_id: &str, principal: &str) -> CliCommand {
    CliCommand::az(["keyvault", "set-policy"])
        .arg("-n", vault_name(vault_id))
        .arg("--certificate-permissions", "get")
        .arg("--secret-permissions", "get")
        .arg("--object-id", principal)
        .timeout(Duration::from_secs(120))
}
