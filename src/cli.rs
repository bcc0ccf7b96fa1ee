use crate::core::SessionConfig;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionConfig,
}

#[derive(Parser, Debug)]
#[command(name = "graphcore-console")]
#[command(about = "Interactive console for the graph-rewrite core backend", long_about = None)]
pub struct Cli {
    /// Backend executable, looked up on PATH.
    #[arg(default_value = "graph-core")]
    pub backend: String,

    /// Extra arguments passed to the backend.
    #[arg(last = true)]
    pub backend_args: Vec<String>,

    /// Per-response wait bound in seconds; 0 waits forever.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Cli {
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn into_config(self) -> Config {
        let command_timeout = if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        };
        Config {
            session: SessionConfig {
                program: self.backend,
                args: self.backend_args,
                command_timeout,
                ..SessionConfig::default()
            },
        }
    }
}
