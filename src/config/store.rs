use anyhow::bail;

use super::structure::{GatewayConfigInner, GatewayConfigTOML};
use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub path: PathBuf,
    cached: GatewayConfigTOML,
}

impl GatewayConfig {
    pub fn read(path: PathBuf) -> Result<Self, anyhow::Error> {
        let path = match path.is_dir() {
            true => path.join("config.toml"),
            false => path,
        };

        if !path.exists() {
            log::info!("no config at {}, writing defaults", path.display());
            return Self::new(path);
        }

        if !path.is_file() {
            bail!(
                "Given path exists and is not a file... either change the path or delete the file."
            );
        }

        let config_str = std::fs::read_to_string(&path)?;

        Ok(Self {
            path,
            cached: toml::from_str(&config_str)?,
        })
    }

    fn new(path: PathBuf) -> Result<Self, anyhow::Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let config = Self {
            path,
            cached: GatewayConfigTOML::default(),
        };

        config.save()?;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        std::fs::write(&self.path, toml::to_string(&self.cached)?)?;

        Ok(())
    }

    /// The credential used when a caller does not bring its own: the
    /// configured key, else the one taken from the environment at startup.
    pub fn default_credential(&self, from_env: Option<String>) -> Option<String> {
        Some(self.llm.api_key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| from_env.filter(|key| !key.trim().is_empty()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for GatewayConfig {
    type Target = GatewayConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.cached.config
    }
}

impl DerefMut for GatewayConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cached.config
    }
}
