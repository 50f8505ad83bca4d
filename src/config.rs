//! Desired-state configuration loading.
//!
//! The whole declaration lives in one TOML file
//! (`~/.config/choro/config.toml` unless overridden with `--config`).
//! Target file paths flow from here into each batch explicitly; nothing
//! in the engine assumes a default location.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::resource::{IniResource, L3Agent, MacvtapAgent, Ml2Plugin, Resource, Router, Subnet};

/// The unified choro configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct ChoroConfig {
    /// Declared virtual routers
    #[serde(default)]
    pub routers: Vec<Router>,

    /// Declared subnets
    #[serde(default)]
    pub subnets: Vec<Subnet>,

    /// ML2 core plugin configuration
    #[serde(default)]
    pub ml2: Option<Ml2Plugin>,

    /// L3 agent configuration
    #[serde(default)]
    pub l3_agent: Option<L3Agent>,

    /// Macvtap agent configuration
    #[serde(default)]
    pub macvtap_agent: Option<MacvtapAgent>,
}

impl ChoroConfig {
    /// Default config location: ~/.config/choro/config.toml
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("choro").join("config.toml"))
    }

    /// Load the config. An explicit `--config` path must exist; the
    /// default location falls back to an empty declaration when missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !path.exists() {
            if required {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            log::debug!("no config at {}, using empty declaration", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Invalid TOML format in choro config")?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Every declared resource, API-side kinds first.
    pub fn resources(&self) -> Vec<&dyn Resource> {
        let mut all: Vec<&dyn Resource> = Vec::new();
        for router in &self.routers {
            all.push(router);
        }
        for subnet in &self.subnets {
            all.push(subnet);
        }
        for ini in self.ini_resources() {
            all.push(ini as &dyn Resource);
        }
        all
    }

    /// The INI-backed resources, each owning one target file.
    pub fn ini_resources(&self) -> Vec<&dyn IniResource> {
        let mut all: Vec<&dyn IniResource> = Vec::new();
        if let Some(ml2) = &self.ml2 {
            all.push(ml2);
        }
        if let Some(l3) = &self.l3_agent {
            all.push(l3);
        }
        if let Some(macvtap) = &self.macvtap_agent {
            all.push(macvtap);
        }
        all
    }
}
