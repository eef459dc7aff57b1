use crate::pkg::{
    az::{CliCommand, Scope},
    spec::engines::{ActionConf, HeaderAction, HeaderOperation},
};

/// Value that marks an action as the placeholder every managed rule starts
/// with. It always sits at request header index 0.
pub const NOOP_HEADER: &str = "route-manager-noop";
pub const NOOP_VALUE: &str = "no-rule-association";

const PRESERVE: &str = "Preserve";

pub fn noop() -> HeaderAction {
    HeaderAction {
        header_action: HeaderOperation::Overwrite,
        header_name: NOOP_HEADER.into(),
        header_value: NOOP_VALUE.into(),
    }
}

/// `rule create` must carry an action, and route overrides are rejected
/// there, so new rules are created with the noop header.
pub fn with_noop(command: CliCommand) -> CliCommand {
    with_header(command.arg("--action-type", "RequestHeader"), &noop())
}

fn with_header(command: CliCommand, header: &HeaderAction) -> CliCommand {
    command
        .arg("--header-action", header.header_action)
        .arg("--header-name", &header.header_name)
        .arg("--header-value", &header.header_value)
}

pub fn add_command(scope: &Scope, engine: &str, rule: &str, action: &ActionConf) -> CliCommand {
    let command = scope
        .command(&["rules-engine", "rule", "action", "add"])
        .arg("--rules-engine-name", engine)
        .arg("--name", rule)
        .arg("--action-type", action.type_name());
    match action {
        ActionConf::RequestHeader(header) | ActionConf::ResponseHeader(header) => with_header(command, header),
        ActionConf::ForwardRouteOverride(forward) => command
            .arg("--backend-pool", &forward.backend_pool)
            .opt_arg("--custom-forwarding-path", forward.forward_path.as_ref())
            .arg("--forwarding-protocol", &forward.forward_protocol)
            .arg("--caching", if forward.enable_caching { "Enabled" } else { "Disabled" }),
        ActionConf::RedirectRouteOverride(redirect) => command
            .arg("--redirect-protocol", &redirect.redirect_protocol)
            .arg("--redirect-type", &redirect.redirect_type)
            .opt_arg("--custom-host", unless_preserved(&redirect.destination_host))
            .opt_arg("--custom-path", unless_preserved(&redirect.destination_path))
            .opt_arg("--custom-query-string", unless_preserved(&redirect.query_string)),
    }
}

fn unless_preserved(value: &str) -> Option<&str> {
    (value != PRESERVE).then_some(value)
}

/// Header actions are addressed by position; a route override is a
/// singleton and needs no index.
pub fn remove_command(scope: &Scope, engine: &str, rule: &str, action_type: &str, index: Option<usize>) -> CliCommand {
    scope
        .command(&["rules-engine", "rule", "action", "remove"])
        .arg("--rules-engine-name", engine)
        .arg("--name", rule)
        .arg("--action-type", action_type)
        .opt_arg("--index", index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Result;

    fn render(yaml: &str) -> Result<String> {
        let action: ActionConf = serde_yaml::from_str(yaml)?;
        Ok(add_command(&Scope::new("fd", "rg"), "eng1", "r1", &action).to_string())
    }

    const PREFIX: &str = "az network front-door rules-engine rule action add --front-door-name fd --resource-group rg \
                          --rules-engine-name eng1 --name r1";

    #[test]
    fn header_action() -> Result<()> {
        assert_eq!(
            render("{type: ResponseHeader, header-action: Delete, header-name: server, header-value: x}")?,
            format!("{} --action-type ResponseHeader --header-action Delete --header-name server --header-value x", PREFIX)
        );
        Ok(())
    }

    #[test]
    fn forward_override() -> Result<()> {
        assert_eq!(
            render("{type: ForwardRouteOverride, backend-pool: pool2, enable-caching: true}")?,
            format!(
                "{} --action-type ForwardRouteOverride --backend-pool pool2 --forwarding-protocol Https --caching Enabled",
                PREFIX
            )
        );
        Ok(())
    }

    #[test]
    fn redirect_override_omits_preserved_parts() -> Result<()> {
        let line = render("{type: RedirectRouteOverride, destination-path: /maintenance}")?;
        assert!(line.ends_with("--redirect-protocol Https --redirect-type Found --custom-path /maintenance"));
        assert!(!line.contains("--custom-host"));
        assert!(!line.contains("--custom-query-string"));
        Ok(())
    }

    #[test]
    fn removal_index_is_optional() {
        let scope = Scope::new("fd", "rg");
        let line = remove_command(&scope, "eng1", "r1", "RequestHeader", Some(2)).to_string();
        assert!(line.ends_with("--action-type RequestHeader --index 2"));
        let line = remove_command(&scope, "eng1", "r1", "ForwardRouteOverride", None).to_string();
        assert!(line.ends_with("--action-type ForwardRouteOverride"));
    }
}
