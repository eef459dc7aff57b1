pub mod cmd;
pub mod pkg;
pub mod prelude;

use std::process::ExitCode;

use prelude::Result;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cmd::run().await
}
