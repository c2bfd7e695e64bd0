//! Tracing setup shared by the binaries embedding the flag evaluator and the realtime registry.
//!
//! Libraries in this workspace only emit `tracing` events; installing a subscriber is the job of
//! whoever owns `main`.

use std::ops::Deref;
use std::str::FromStr;

use envconfig::Envconfig;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct LogConfig {
    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,
}

/// Installs the global subscriber:
///   - debug: pretty, colored output with span lifecycle events
///   - otherwise: one JSON object per line
///
/// Both are filtered by the `RUST_LOG` envvar.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let base_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true);

    let log_layer = if *config.debug {
        base_layer
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(true)
            .with_filter(EnvFilter::from_default_env())
            .boxed()
    } else {
        base_layer
            .json()
            .with_filter(EnvFilter::from_default_env())
            .boxed()
    };

    tracing_subscriber::registry().with(log_layer).try_init()
}
