//! Composition helpers: logging setup and configuration loading.
//!
//! The configuration is assembled from three layers, later ones winning:
//! the JSON attribute file given with `--config`, environment variables
//! (including those loaded from `.env`), and command-line flags.

use std::path::Path;

use rtspmic_core::StreamConfig;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};
use crate::parser::Cli;

/// Values from flags or environment that override the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub rtsp_url: Option<String>,
    pub ffmpeg_path: Option<String>,
    pub rtsp_transport: Option<String>,
    pub max_restarts: Option<u32>,
}

impl ConfigOverrides {
    fn apply(&self, attributes: &mut Map<String, Value>) {
        if let Some(url) = &self.rtsp_url {
            attributes.insert("rtsp_url".to_string(), Value::from(url.as_str()));
        }
        if let Some(path) = &self.ffmpeg_path {
            attributes.insert("ffmpeg_path".to_string(), Value::from(path.as_str()));
        }
        if let Some(transport) = &self.rtsp_transport {
            attributes.insert("rtsp_transport".to_string(), Value::from(transport.as_str()));
        }
        if let Some(max) = self.max_restarts {
            attributes.insert("max_restarts".to_string(), Value::from(max));
        }
    }
}

impl From<&Cli> for ConfigOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            rtsp_url: cli.rtsp_url.clone(),
            ffmpeg_path: cli.ffmpeg_path.clone(),
            rtsp_transport: cli.rtsp_transport.clone(),
            max_restarts: cli.max_restarts,
        }
    }
}

/// Load and validate the stream configuration.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> CliResult<StreamConfig> {
    let mut attributes = match path {
        Some(path) => read_attributes(path)?,
        None => Value::Object(Map::new()),
    };

    // A non-object file is reported by `from_attributes`
    if let Some(object) = attributes.as_object_mut() {
        overrides.apply(object);
    }

    Ok(StreamConfig::from_attributes(&attributes)?)
}

fn read_attributes(path: &Path) -> CliResult<Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
/// Logs go to stderr so stdout stays a clean JSON channel.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
