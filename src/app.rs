//! Interactive console loop over a backend session.
use crate::cli::Config;
use crate::core::{CoreError, CoreSession};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let session = CoreSession::connect(config.session).await?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = input.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if line == "quit" {
            break;
        }

        match session.raw_command(line).await {
            Ok(reply) => println!("{}", reply),
            Err(CoreError::Backend(message)) => println!("ERROR: {}", message),
            Err(e) => {
                // transport failure: the session is poisoned, stop here
                error!(error = %e, "session failed");
                session.quit().await.ok();
                return Err(e.into());
            }
        }
        prompt()?;
    }

    session.quit().await?;
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}
