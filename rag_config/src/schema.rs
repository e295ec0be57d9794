use std::path::PathBuf;

use rag_core::{KnowledgeSettings, MemorySettings, RagSettings, WebSessionSettings};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = ".nanocore";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub rag: RagSettings,
    #[serde(default)]
    pub knowledge: KnowledgeSettings,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub web_session: WebSessionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rag: RagSettings::default(),
            knowledge: KnowledgeSettings::default(),
            memory: MemorySettings::default(),
            web_session: WebSessionSettings::default(),
        }
    }
}

impl Config {
    /// Loads `~/.nanocore/config.json`. Env vars `QDRANT_API_KEY` and
    /// `SUPABASE_ANON_KEY` override the corresponding secret fields when
    /// set, so a config file can be checked in without embedding them.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Run the `init` command to create one.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config: Self = serde_json::from_str(&content)?;

        if let Ok(key) = std::env::var("QDRANT_API_KEY") {
            config.knowledge.qdrant_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            config.memory.supabase_anon_key = key;
        }

        Ok(config)
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("cannot find home directory"))?
            .join(CONFIG_DIR_NAME))
    }

    fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Writes a fresh config file with defaults. Refuses to overwrite an
    /// existing one.
    pub fn create_config() -> anyhow::Result<()> {
        Self::ensure_config_dir()?;
        let config_path = Self::config_path()?;

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Edit it directly instead.",
                config_path.display()
            );
        }

        let config = Self::default();
        let content = serde_json::to_string_pretty(&config)?;
        std::fs::write(&config_path, content)?;

        println!("Created config file at: {}", config_path.display());
        Ok(())
    }
}
