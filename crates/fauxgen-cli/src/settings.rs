use std::path::{Path, PathBuf};

use fauxgen_eval::InterpreterOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file looked up in the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "fauxgen.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub disable_metadata: bool,
    pub dry_run: bool,
    pub dictionary_path: Option<PathBuf>,
    /// Destination of the JSON-lines output; stdout when unset.
    pub output: Option<PathBuf>,
}

impl Settings {
    /// Load `explicit`, or `fauxgen.toml` when it exists, or the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_SETTINGS_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            disable_metadata: self.disable_metadata,
            dry_run: self.dry_run,
            dictionary_path: self.dictionary_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_files_with_defaults() {
        let settings = Settings::parse(
            r#"
dry_run = true
dictionary_path = "data/dictionaries"
"#,
        )
        .expect("parse");
        assert!(settings.dry_run);
        assert!(!settings.disable_metadata);
        assert_eq!(
            settings.dictionary_path,
            Some(PathBuf::from("data/dictionaries"))
        );
        assert_eq!(settings.output, None);

        let options = settings.interpreter_options();
        assert!(options.dry_run);
        assert_eq!(
            options.dictionary_path,
            Some(PathBuf::from("data/dictionaries"))
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Settings::parse("seed = 4").expect_err("unknown key");
        assert!(matches!(err, SettingsError::Toml(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.toml")))
            .expect_err("missing file");
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
