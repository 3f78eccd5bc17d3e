use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::http::connection::ConnectionSettings;
use crate::http::parser::ParseLimits;

/// Command-line configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "wirehttp", version, about = "Minimal HTTP/1.1 server over raw TCP")]
pub struct Config {
    /// Directory served and written by the /files/ routes
    #[arg(long, default_value = ".")]
    pub directory: PathBuf,

    /// Address to listen on
    #[arg(long = "listen", env = "LISTEN", default_value = "127.0.0.1:4221")]
    pub listen_addr: String,

    /// Close connections idle for this many seconds
    #[arg(long = "idle-timeout", value_name = "SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// Largest accepted request line plus headers, in bytes
    #[arg(long, default_value_t = ParseLimits::default().max_head_bytes)]
    pub max_head_bytes: usize,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = ParseLimits::default().max_body_bytes)]
    pub max_body_bytes: usize,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn limits(&self) -> ParseLimits {
        ParseLimits {
            max_head_bytes: self.max_head_bytes,
            max_body_bytes: self.max_body_bytes,
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            limits: self.limits(),
            idle_timeout: self.idle_timeout(),
        }
    }
}
