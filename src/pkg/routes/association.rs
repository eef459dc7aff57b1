use crate::pkg::{
    az::{CliCommand, Scope},
    spec::engines::AssociationConf,
};

pub fn command(scope: &Scope, rule: &str, engine: &str) -> CliCommand {
    scope
        .command(&["routing-rule", "update"])
        .arg("--name", rule)
        .arg("--rules-engine", engine)
}

pub fn commands(scope: &Scope, association: &AssociationConf) -> Vec<CliCommand> {
    association
        .rules
        .iter()
        .map(|rule| command(scope, rule, &association.engine))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_update_per_rule() {
        let association = AssociationConf {
            engine: "eng1".into(),
            rules: vec!["web".into(), "api".into()],
        };
        let lines: Vec<_> = commands(&Scope::new("fd", "rg"), &association)
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "az network front-door routing-rule update --front-door-name fd --resource-group rg --name web --rules-engine eng1",
                "az network front-door routing-rule update --front-door-name fd --resource-group rg --name api --rules-engine eng1",
            ]
        );
    }
}
