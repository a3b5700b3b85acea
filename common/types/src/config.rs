use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::BufReader;

use crate::chain::ChainTag;

/// `appversion` persistence record (spec §6). `db_version` below 0.6.0 is
/// fatal at startup (exit code 8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppVersion {
    pub version: String,
    pub commit: String,
    pub db_version: String,
}

pub const MIN_DB_VERSION: (u32, u32, u32) = (0, 6, 0);

impl AppVersion {
    pub fn db_version_parts(&self) -> Option<(u32, u32, u32)> {
        let mut it = self.db_version.split('.').map(|p| p.parse::<u32>().ok());
        Some((it.next()??, it.next()??, it.next()??))
    }

    pub fn db_version_too_old(&self) -> bool {
        match self.db_version_parts() {
            Some(v) => v < MIN_DB_VERSION,
            None => true,
        }
    }
}

/// Process configuration, loaded the way `EnvironmentConfig` is in the
/// original node crate: environment variables first, then an optional JSON
/// config file override.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub miner_key: String,
    #[serde(default)]
    pub known_rovers: Vec<ChainTag>,
    #[serde(default)]
    pub monitor: bool,
    #[serde(default)]
    pub persist_rover_data: bool,
    #[serde(default)]
    pub p2p_passive: bool,
}

impl EngineConfig {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Overlay `BC_DATA_DIR`, `BC_MONITOR`, `PERSIST_ROVER_DATA`,
    /// `BC_P2P_PASSIVE` on top of whatever the config file set, matching the
    /// env-wins-last precedence `EnvironmentConfig` applies for CLI flags.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("BC_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(v) = std::env::var("BC_MONITOR") {
            self.monitor = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("PERSIST_ROVER_DATA") {
            self.persist_rover_data = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("BC_P2P_PASSIVE") {
            self.p2p_passive = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".bcdata"),
            miner_key: String::new(),
            known_rovers: ChainTag::ALL.to_vec(),
            monitor: false,
            persist_rover_data: false,
            p2p_passive: false,
        }
    }
}
