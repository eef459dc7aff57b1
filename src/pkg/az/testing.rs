use std::sync::Mutex;

use async_trait::async_trait;

use super::{CliCommand, CommandRunner, Program, RawOutput};
use crate::prelude::{Result, RouteManagerError};

pub fn ok(stdout: &str) -> RawOutput {
    RawOutput {
        code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

pub fn fail(stderr: &str) -> RawOutput {
    RawOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

/// Replays canned outputs and records every command line it is given.
/// The first rule whose pattern is a substring of the rendered command wins;
/// unmatched commands succeed with `{}`.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, RawOutput)>,
    missing: Vec<Program>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, pattern: &str, output: RawOutput) -> Self {
        self.rules.push((pattern.to_string(), output));
        self
    }

    /// Behaves as if `program` were not installed.
    pub fn without(mut self, program: Program) -> Self {
        self.missing.push(program);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_with(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn execute(&self, command: &CliCommand) -> Result<RawOutput> {
        let line = command.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        if self.missing.contains(&command.program) {
            return Err(RouteManagerError::MissingBinary(
                command.program.name().into(),
                "not found in PATH".into(),
            ));
        }
        Ok(self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| ok("{}")))
    }
}
