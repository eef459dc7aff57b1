use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use crate::prelude::Result;

pub mod cert;
pub mod dns;
pub mod existence;
pub mod keyvault;
pub mod runner;
#[cfg(test)]
pub mod testing;

/// Substrings of stderr lines the CLI prints on otherwise successful calls.
const BENIGN_STDERR: [&str; 2] = ["is in preview", "is experimental"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Az,
    Dig,
}

impl Program {
    pub fn name(&self) -> &'static str {
        match self {
            Program::Az => "az",
            Program::Dig => "dig",
        }
    }
}

/// An immutable external command line. Builders hand these out; nothing
/// executes them except a [`CommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub program: Program,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CliCommand {
    pub fn az<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: Program::Az,
            args: words.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    pub fn dig<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: Program::Dig,
            args: words.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    pub fn arg(mut self, flag: &str, value: impl ToString) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    pub fn opt_arg(self, flag: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.arg(flag, value),
            None => self,
        }
    }

    pub fn list_arg<I, S>(mut self, flag: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.push(flag.to_string());
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Display for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.name())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub front_door: String,
    pub group: String,
}

impl Scope {
    pub fn new(front_door: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            front_door: front_door.into(),
            group: group.into(),
        }
    }

    pub fn command(&self, words: &[&str]) -> CliCommand {
        CliCommand::az(["network", "front-door"].iter().chain(words).copied())
            .arg("--front-door-name", &self.front_door)
            .arg("--resource-group", &self.group)
    }

    pub fn azurefd_host(&self) -> String {
        format!("{}.azurefd.net.", self.front_door)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Data(Value),
    Text(String),
    Empty,
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failure(_))
    }

    pub fn already_exists(&self) -> bool {
        match self {
            Outcome::Failure(err) => err.to_lowercase().contains("already exists"),
            _ => false,
        }
    }
}

fn significant_stderr(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !BENIGN_STDERR.iter().any(|benign| line.contains(benign)))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<RawOutput> for Outcome {
    fn from(raw: RawOutput) -> Self {
        let stderr = significant_stderr(&raw.stderr);
        if !stderr.is_empty() {
            return Outcome::Failure(stderr);
        }
        if raw.code != Some(0) {
            return Outcome::Failure(match raw.code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".into(),
            });
        }
        let stdout = raw.stdout.trim();
        if stdout.is_empty() {
            return Outcome::Empty;
        }
        match serde_json::from_str::<Value>(stdout) {
            Ok(value) => Outcome::Data(value),
            Err(_) => Outcome::Text(stdout.to_string()),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, command: &CliCommand) -> Result<RawOutput>;

    async fn run(&self, command: &CliCommand) -> Result<Outcome> {
        let raw = self.execute(command).await?;
        Ok(Outcome::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(code: i32, stdout: &str, stderr: &str) -> RawOutput {
        RawOutput {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn classifies_json_output() {
        let outcome = Outcome::from(raw(0, r#"{"name": "probe-a"}"#, ""));
        match outcome {
            Outcome::Data(value) => assert_eq!(value["name"], "probe-a"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn classifies_empty_and_text_output() {
        assert_eq!(Outcome::from(raw(0, "  \n", "")), Outcome::Empty);
        assert_eq!(
            Outcome::from(raw(0, "myfd.azurefd.net.\n", "")),
            Outcome::Text("myfd.azurefd.net.".into())
        );
    }

    #[test]
    fn preview_warning_is_not_a_failure() {
        let outcome = Outcome::from(raw(
            0,
            "[]",
            "Command group 'network front-door' is in preview and under development.\n",
        ));
        assert!(outcome.is_success());
    }

    #[test]
    fn stderr_or_exit_code_is_a_failure() {
        let outcome = Outcome::from(raw(0, "", "ERROR: something broke"));
        assert_eq!(outcome, Outcome::Failure("ERROR: something broke".into()));
        assert!(!Outcome::from(raw(2, "", "")).is_success());
    }

    #[test]
    fn already_exists_is_detected() {
        let outcome = Outcome::from(raw(1, "", "ERROR: Frontend fe1 already exists"));
        assert!(outcome.already_exists());
        assert!(!Outcome::Empty.already_exists());
    }

    #[test]
    fn scoped_command_renders() {
        let scope = Scope::new("myfd", "rg");
        let cmd = scope
            .command(&["probe", "create"])
            .arg("--name", "probe-a")
            .list_arg("--patterns", ["/*", "/a b"]);
        assert_eq!(
            cmd.to_string(),
            "az network front-door probe create --front-door-name myfd --resource-group rg --name probe-a --patterns /* '/a b'"
        );
    }
}
