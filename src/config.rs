use crate::error::WdlError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Compiler settings, stored as TOML.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    #[serde(rename = "VERBOSE", skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(rename = "ENCODE_DOTS", skip_serializing_if = "Option::is_none")]
    pub encode_dots: Option<bool>,
    #[serde(rename = "CHECK_FILE_STATES", skip_serializing_if = "Option::is_none")]
    pub check_file_states: Option<bool>,
    #[serde(rename = "DEFAULT_PROJECT", skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

impl CompilerConfig {
    pub fn verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    /// Encode `.` in field names as `___`. On by default.
    pub fn encode_dots(&self) -> bool {
        self.encode_dots.unwrap_or(true)
    }

    /// Reject remote files that are not live. On by default.
    pub fn check_file_states(&self) -> bool {
        self.check_file_states.unwrap_or(true)
    }

    /// Settings from the per-user config file, or the defaults when it is absent.
    pub fn load_default() -> Result<Self, WdlError> {
        load_config(&config_file_path()?)
    }
}

const CONFIG_FILE_NAME: &str = ".flowy-dx";

/// `~/.flowy-dx`, resolved from `HOME` (or `USERPROFILE` on Windows).
pub fn config_file_path() -> Result<PathBuf, WdlError> {
    let mut candidates = vec!["HOME"];
    if cfg!(windows) {
        candidates.push("USERPROFILE");
    }
    candidates
        .into_iter()
        .filter_map(env::var_os)
        .find(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join(CONFIG_FILE_NAME))
        .ok_or_else(|| WdlError::config("unable to determine home directory"))
}

/// Read settings from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<CompilerConfig, WdlError> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<CompilerConfig>(&contents).map_err(|e| {
            WdlError::config(format!("failed to parse {} as TOML: {}", path.display(), e))
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(CompilerConfig::default()),
        Err(err) if err.kind() == io::ErrorKind::IsADirectory => Err(WdlError::config(format!(
            "expected {} to be a TOML file, but found a directory",
            path.display()
        ))),
        Err(err) => Err(WdlError::config(format!(
            "failed to read {}: {}",
            path.display(),
            err
        ))),
    }
}

pub fn save_config(path: &Path, config: &CompilerConfig) -> Result<(), WdlError> {
    let serialized = toml::to_string(config)
        .map_err(|e| WdlError::config(format!("failed to serialize config to TOML: {}", e)))?;
    fs::write(path, serialized).map_err(|e| {
        WdlError::config(format!("failed to write config to {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert!(config.encode_dots());
        assert!(config.check_file_states());
        assert!(!config.verbose());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = CompilerConfig {
            verbose: Some(true),
            encode_dots: Some(false),
            check_file_states: None,
            default_project: Some("project-P1".to_string()),
        };
        save_config(&path, &config).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("ENCODE_DOTS = false"));
        assert!(!written.contains("CHECK_FILE_STATES"));

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.encode_dots());
        assert!(loaded.check_file_states());
    }

    #[test]
    fn test_load_default_reads_home_config() {
        let dir = tempdir().unwrap();
        let previous = env::var_os("HOME");
        env::set_var("HOME", dir.path());

        let path = config_file_path().unwrap();
        assert_eq!(path, dir.path().join(".flowy-dx"));
        assert_eq!(CompilerConfig::load_default().unwrap(), CompilerConfig::default());

        fs::write(&path, "VERBOSE = true\nDEFAULT_PROJECT = \"project-H\"\n").unwrap();
        let loaded = CompilerConfig::load_default();

        match previous {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
        let loaded = loaded.unwrap();
        assert!(loaded.verbose());
        assert_eq!(loaded.default_project.as_deref(), Some("project-H"));
    }

    #[test]
    fn test_invalid_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_config(dir.path()), Err(WdlError::Config { .. })));

        let path = dir.path().join("broken.toml");
        fs::write(&path, "ENCODE_DOTS = maybe").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
