//! Configuration loading
//!
//! Layers, lowest priority first: embedded defaults, `config/local.toml`,
//! an explicit file, then `SKETCHPAD_<SECTION>__<KEY>` environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::drawing::CanvasLimits;
use crate::error::SketchpadError;
use crate::id::{Alphabet, RoomIdGenerator, DEFAULT_ALPHABET, DEFAULT_ID_LENGTH};
use crate::room::registry::MAX_ID_ATTEMPTS;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub canvas: CanvasLimits,
    pub rooms: RoomsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served at `/`, if any
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub id_length: u32,
    pub alphabet: String,
    pub max_id_attempts: usize,
    /// Seconds a room without subscribers may stay idle; 0 keeps rooms forever
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            id_length: DEFAULT_ID_LENGTH,
            alphabet: DEFAULT_ALPHABET.to_string(),
            max_id_attempts: MAX_ID_ATTEMPTS,
            idle_ttl_secs: 0,
            sweep_interval_secs: 60,
        }
    }
}

impl RoomsConfig {
    /// Build the identifier generator; fails when no full-period
    /// parameters exist for this alphabet and length
    pub fn id_generator(&self) -> crate::error::Result<RoomIdGenerator> {
        RoomIdGenerator::new(self.id_length, Alphabet::new(&self.alphabet)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "sketchpad=info,sketchpad_rs=info,tower_http=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.canvas.max_width == 0 || self.canvas.max_height == 0 {
            return Err(SketchpadError::Config(format!(
                "Canvas limits must be non-zero, got {}x{}",
                self.canvas.max_width, self.canvas.max_height
            )));
        }
        if self.rooms.max_id_attempts == 0 {
            return Err(SketchpadError::Config(
                "rooms.max_id_attempts must be at least 1".to_string(),
            ));
        }
        self.rooms.id_generator()?;
        Ok(())
    }
}

/// Load configuration from files and environment
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. Local overrides (optional)
        .add_source(File::with_name("config/local").required(false));

    // 3. Explicit file from the command line
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    // 4. Environment variables (highest priority)
    let config = builder
        .add_source(
            Environment::with_prefix("SKETCHPAD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    app.validate().context("Invalid configuration")?;

    Ok(app)
}
