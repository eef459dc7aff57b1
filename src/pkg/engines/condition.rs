use crate::pkg::{
    az::{CliCommand, Scope},
    spec::engines::ConditionConf,
};

pub fn add_command(scope: &Scope, engine: &str, rule: &str, condition: &ConditionConf) -> CliCommand {
    let command = scope
        .command(&["rules-engine", "rule", "condition", "add"])
        .arg("--name", rule)
        .arg("--rules-engine-name", engine)
        .arg("--match-variable", condition.match_variable)
        .arg("--operator", condition.operator.name)
        .list_arg("--match-values", condition.match_values.iter().cloned());
    let command = if condition.operator.negate {
        command.arg("--negate-condition", true)
    } else {
        command
    };
    command.opt_arg("--transforms", condition.transform.as_ref())
}

pub fn remove_command(scope: &Scope, engine: &str, rule: &str, index: usize) -> CliCommand {
    scope
        .command(&["rules-engine", "rule", "condition", "remove"])
        .arg("--name", rule)
        .arg("--rules-engine-name", engine)
        .arg("--index", index)
}
