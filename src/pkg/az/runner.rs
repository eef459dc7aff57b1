use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use super::{CliCommand, CommandRunner, Program, RawOutput};
use crate::{
    pkg::conf::Settings,
    prelude::{Result, RouteManagerError},
};

#[derive(Debug, Clone)]
pub struct AzCli {
    az: PathBuf,
    dig: Option<PathBuf>,
}

fn locate(configured: Option<&String>, name: &str) -> Result<PathBuf> {
    match configured {
        Some(path) => Ok(PathBuf::from(path)),
        None => which::which(name)
            .map_err(|e| RouteManagerError::MissingBinary(name.into(), e.to_string())),
    }
}

impl AzCli {
    pub fn new(settings: &Settings) -> Result<Self> {
        let az = locate(settings.az_cli_path.as_ref(), "az")?;
        let dig = locate(settings.dig_path.as_ref(), "dig").ok();
        tracing::debug!("using az at {:?}, dig at {:?}", &az, &dig);
        Ok(Self { az, dig })
    }

    fn binary(&self, program: Program) -> Result<&PathBuf> {
        match program {
            Program::Az => Ok(&self.az),
            Program::Dig => self.dig.as_ref().ok_or_else(|| {
                RouteManagerError::MissingBinary("dig".into(), "not found in PATH".into())
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for AzCli {
    async fn execute(&self, command: &CliCommand) -> Result<RawOutput> {
        let mut process = Command::new(self.binary(command.program)?);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match command.timeout {
            Some(limit) => tokio::time::timeout(limit, process.output())
                .await
                .map_err(|_| RouteManagerError::Timeout(command.to_string()))??,
            None => process.output().await?,
        };

        Ok(RawOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::assert_err;
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::az::Outcome;

    fn cli(binary: &str) -> AzCli {
        AzCli {
            az: PathBuf::from(binary),
            dig: None,
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn captures_stdout() -> Result<()> {
        let outcome = cli("echo").run(&CliCommand::az(["front-door"])).await?;
        assert_eq!(outcome, Outcome::Text("front-door".into()));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn enforces_timeout() {
        let command = CliCommand::az(["5"]).timeout(Duration::from_millis(50));
        let result = cli("sleep").execute(&command).await;
        assert!(matches!(assert_err!(result), RouteManagerError::Timeout(_)));
    }

    #[tokio::test]
    async fn dig_must_be_installed_to_use_it() {
        let result = cli("echo").execute(&CliCommand::dig(["+short"])).await;
        assert!(matches!(result, Err(RouteManagerError::MissingBinary(..))));
    }
}
