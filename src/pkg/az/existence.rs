use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::{CliCommand, CommandRunner, Outcome, Scope};
use crate::prelude::Result;

lazy_static! {
    static ref DOES_NOT_EXIST: Regex = Regex::new(r"(?i)does not exist").expect("valid regex");
    static ref NOT_FOUND: Regex =
        Regex::new(r"(?i)(not\s?found|was not found|does not exist)").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Probe,
    LoadBalancing,
    BackendPool,
    Frontend,
    RoutingRule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Existence {
    Present(Value),
    Absent,
    /// The show call failed for a reason the kind's predicate does not
    /// recognise.
    Unknown(String),
}

impl ResourceKind {
    pub fn show_command(&self, scope: &Scope, name: &str) -> CliCommand {
        match self {
            ResourceKind::Probe => scope.command(&["probe", "show"]),
            ResourceKind::LoadBalancing => scope.command(&["load-balancing", "show"]),
            ResourceKind::BackendPool => scope.command(&["backend-pool", "show"]),
            ResourceKind::Frontend => scope.command(&["frontend-endpoint", "show"]),
            ResourceKind::RoutingRule => scope.command(&["routing-rule", "show"]),
        }
        .arg("--name", name)
    }

    pub fn is_absent(&self, stderr: &str) -> bool {
        match self {
            ResourceKind::Probe | ResourceKind::LoadBalancing => DOES_NOT_EXIST.is_match(stderr),
            ResourceKind::BackendPool | ResourceKind::Frontend | ResourceKind::RoutingRule => {
                NOT_FOUND.is_match(stderr)
            }
        }
    }

    /// How an unrecognised show failure is read. Probes and load-balancing
    /// settings are left alone; everything else goes down the create path.
    pub fn present_when_unknown(&self) -> bool {
        matches!(self, ResourceKind::Probe | ResourceKind::LoadBalancing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Probe => "probe",
            ResourceKind::LoadBalancing => "load balancing",
            ResourceKind::BackendPool => "backend pool",
            ResourceKind::Frontend => "frontend",
            ResourceKind::RoutingRule => "routing rule",
        }
    }
}

impl Existence {
    pub fn exists(&self, kind: &ResourceKind) -> bool {
        match self {
            Existence::Present(_) => true,
            Existence::Absent => false,
            Existence::Unknown(_) => kind.present_when_unknown(),
        }
    }
}

pub async fn probe<R>(runner: &R, scope: &Scope, kind: &ResourceKind, name: &str) -> Result<Existence>
where
    R: CommandRunner + ?Sized,
{
    let command = kind.show_command(scope, name);
    tracing::debug!("{}", &command);
    let existence = match runner.run(&command).await? {
        Outcome::Data(value) => Existence::Present(value),
        Outcome::Text(text) => Existence::Present(Value::String(text)),
        Outcome::Empty => Existence::Present(Value::Null),
        Outcome::Failure(err) if kind.is_absent(&err) => Existence::Absent,
        Outcome::Failure(err) => {
            tracing::warn!("could not tell whether {} {} exists: {}", kind.label(), name, err);
            Existence::Unknown(err)
        }
    };
    tracing::debug!("{} {} -> {:?}", kind.label(), name, &existence);
    Ok(existence)
}

pub async fn exists<R>(runner: &R, scope: &Scope, kind: &ResourceKind, name: &str) -> Result<bool>
where
    R: CommandRunner + ?Sized,
{
    Ok(probe(runner, scope, kind, name).await?.exists(kind))
}
