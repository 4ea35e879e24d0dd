// ============================================================
// Config Store
// ============================================================
// Saves and restores the model hyperparameters as JSON so the
// exact architecture can be rebuilt later (e.g. by a training
// or serving program that owns the weights).
//
// File layout:
//   <dir>/
//     model_config.json   ← TransformerConfig, pretty-printed
//
// Loading validates the config, so a hand-edited file with
// d_model not divisible by num_heads fails here rather than
// deep inside tensor code.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::ml::model::TransformerConfig;

const CONFIG_FILE: &str = "model_config.json";

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Write `cfg` to `<dir>/model_config.json`, creating `dir` if needed.
    pub fn save(&self, cfg: &TransformerConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create config dir '{}'", self.dir.display()))?;

        let path = self.path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<TransformerConfig> {
        let path = self.path();
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;

        let cfg: TransformerConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Invalid config in '{}'", path.display()))?;

        tracing::debug!("Loaded model config from '{}'", path.display());
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ConfigError;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        assert!(!store.exists());

        let cfg = TransformerConfig::new(500, 64, 32, 4)
            .with_num_encoders(3)
            .with_pad_token(Some(0));
        store.save(&cfg).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.vocab_size, 500);
        assert_eq!(loaded.num_encoders, 3);
        assert_eq!(loaded.num_decoders, 1);
        assert_eq!(loaded.pad_token, Some(0));
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigStore::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("model_config.json"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        store.save(&TransformerConfig::new(10, 4, 10, 4)).unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::HeadsDoNotDivide { d_model: 10, num_heads: 4 })
        );
    }
}
