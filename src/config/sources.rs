//! Config-file source discovery.
//!
//! Source order: explicit path > local file > per-user file > no file.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ConfigSource {
    /// Config loaded from explicit `--config` path.
    Explicit(PathBuf),
    /// Config loaded from `./retry-stage.toml`.
    Local,
    /// Config loaded from the per-user config directory.
    Global(PathBuf),
    /// No file found; only environment and CLI values apply.
    NoFile,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(path) | Self::Global(path) => write!(f, "{}", path.display()),
            Self::Local => write!(f, "./{CONFIG_FILE_NAME}"),
            Self::NoFile => write!(f, "<no config file>"),
        }
    }
}

/// Read config text from the highest-precedence available source.
///
/// An explicit path must exist; implicit locations are skipped when missing.
pub(super) fn read_config_text_with_sources<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    if let Some(p) = path_override {
        let path = PathBuf::from(p);
        let text = read_file(&path)?;
        return Ok((text, ConfigSource::Explicit(path)));
    }

    if let Ok(text) = read_file(Path::new(CONFIG_FILE_NAME)) {
        return Ok((text, ConfigSource::Local));
    }
    if let Some(dir) = config_root() {
        let global = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if let Ok(text) = read_file(&global) {
            return Ok((text, ConfigSource::Global(global)));
        }
    }

    Ok((String::new(), ConfigSource::NoFile))
}

/// Per-user config root: `$XDG_CONFIG_HOME`, else `~/.config`.
pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn not_found(_: &Path) -> Result<String, io::Error> {
        Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = read_config_text_with_sources(Some("/nope.toml"), &not_found, &|| None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn local_file_beats_global() {
        let read = |path: &Path| -> Result<String, io::Error> {
            if path == Path::new(CONFIG_FILE_NAME) {
                Ok("local".to_string())
            } else {
                Ok("global".to_string())
            }
        };
        let (text, source) =
            read_config_text_with_sources(None, &read, &|| Some(PathBuf::from("/cfg")))
                .expect("read");
        assert_eq!(text, "local");
        assert_eq!(source, ConfigSource::Local);
    }

    #[test]
    fn falls_back_to_global_then_nothing() {
        let expected = PathBuf::from("/cfg").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        let global_only = {
            let expected = expected.clone();
            move |path: &Path| -> Result<String, io::Error> {
                if path == expected {
                    Ok("global".to_string())
                } else {
                    not_found(path)
                }
            }
        };
        let (text, source) =
            read_config_text_with_sources(None, &global_only, &|| Some(PathBuf::from("/cfg")))
                .expect("read");
        assert_eq!(text, "global");
        assert_eq!(source, ConfigSource::Global(expected));

        let (text, source) =
            read_config_text_with_sources(None, &not_found, &|| None).expect("read");
        assert!(text.is_empty());
        assert_eq!(source, ConfigSource::NoFile);
    }
}
