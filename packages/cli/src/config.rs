use bunnyhop_model::TemplateRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_NAME: &str = "bunnyhop.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid template pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("No template files match {0:?}")]
    NoTemplates(Vec<String>),
}

/// BunnyHop configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Glob patterns of template definition files, relative to the config
    #[serde(default = "default_template_files")]
    pub template_files: Vec<String>,

    /// Undo history depth (0 = unlimited)
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,
}

fn default_template_files() -> Vec<String> {
    vec!["templates/**/*.json".to_string()]
}

fn default_undo_levels() -> usize {
    100
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            debug!(path = %config_path.display(), "Config loaded");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Template files matched by the configured patterns, sorted
    pub fn template_paths(&self, cwd: &str) -> Result<Vec<PathBuf>, ConfigError> {
        let mut paths = Vec::new();
        for pattern in &self.template_files {
            let full = PathBuf::from(cwd).join(pattern);
            let matches = glob::glob(&full.to_string_lossy()).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            paths.extend(matches.filter_map(Result::ok).filter(|path| path.is_file()));
        }
        paths.sort();
        paths.dedup();

        if paths.is_empty() {
            return Err(ConfigError::NoTemplates(self.template_files.clone()));
        }
        Ok(paths)
    }

    /// Load and merge every configured template file
    pub fn load_templates(&self, cwd: &str) -> anyhow::Result<TemplateRegistry> {
        load_templates(&self.template_paths(cwd)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_files: default_template_files(),
            undo_levels: default_undo_levels(),
        }
    }
}

/// Merge template files into one registry; ids must be unique across files
pub fn load_templates(paths: &[PathBuf]) -> anyhow::Result<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    for path in paths {
        let templates = TemplateRegistry::load(path).map_err(|err| anyhow::anyhow!("{}: {}", display(path), err))?;
        registry
            .merge(templates)
            .map_err(|err| anyhow::anyhow!("{}: {}", display(path), err))?;
    }
    Ok(registry)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATES: &str = r#"{
        "connectors": [{ "id": "cnctrExp", "defaultNodeId": "idEmptyExp" }],
        "nodes": [
            { "id": "idNot", "type": "connective", "connectors": [{ "connector": "cnctrExp" }] },
            { "id": "idEmptyExp", "type": "void" }
        ]
    }"#;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "templateFiles": ["blocks/*.json", "extra.json"],
            "undoLevels": 20
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.template_files, vec!["blocks/*.json", "extra.json"]);
        assert_eq!(config.undo_levels, 20);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.template_files, vec!["templates/**/*.json"]);
        assert_eq!(config.undo_levels, 100);

        let partial: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(partial, config);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().to_string_lossy().to_string();
        assert_eq!(Config::load(&cwd).unwrap(), Config::default());

        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "undoLevels": 5 }"#).unwrap();
        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.undo_levels, 5);
        assert_eq!(config.template_files, default_template_files());
    }

    #[test]
    fn test_load_templates_from_patterns() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().to_string_lossy().to_string();
        fs::create_dir_all(dir.path().join("templates/logic")).unwrap();
        fs::write(dir.path().join("templates/logic/not.json"), TEMPLATES).unwrap();
        fs::write(dir.path().join("templates/readme.txt"), "ignored").unwrap();

        let registry = Config::default().load_templates(&cwd).unwrap();
        assert_eq!(registry.node_count(), 2);
        assert_eq!(registry.connector_count(), 1);
    }

    #[test]
    fn test_missing_templates_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().to_string_lossy().to_string();
        let err = Config::default().template_paths(&cwd).unwrap_err();
        assert!(matches!(err, ConfigError::NoTemplates(_)));
    }

    #[test]
    fn test_duplicate_ids_across_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        fs::write(&first, TEMPLATES).unwrap();
        fs::write(&second, TEMPLATES).unwrap();

        let err = load_templates(&[first, second]).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }
}
