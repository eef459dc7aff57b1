use std::fmt;

use super::az::CliCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update,
    Skip,
    /// Named in configuration as already present; never touched.
    Reference,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Decision::Create => "create",
            Decision::Update => "update",
            Decision::Skip => "skip",
            Decision::Reference => "reference",
        };
        write!(f, "{}", word)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub decision: Decision,
    pub kind: &'static str,
    pub name: String,
    pub command: Option<CliCommand>,
}

impl Step {
    pub fn create(kind: &'static str, name: impl Into<String>, command: CliCommand) -> Self {
        Self {
            decision: Decision::Create,
            kind,
            name: name.into(),
            command: Some(command),
        }
    }

    pub fn skip(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            decision: Decision::Skip,
            kind,
            name: name.into(),
            command: None,
        }
    }

    pub fn reference(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            decision: Decision::Reference,
            kind,
            name: name.into(),
            command: None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.decision, self.kind, self.name)
    }
}
