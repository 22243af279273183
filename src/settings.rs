//! Runtime settings (`wex.toml`).
//!
//! ```toml
//! [warehouse]
//! url = "${WAREHOUSE_URL}"
//! max_connections = 4
//!
//! [output]
//! directory = "./extract"
//! format = "delimited"   # or "jsonl"
//! delimiter = "|"
//! null = ""
//! header = true
//!
//! [run]
//! concurrency = 4
//! max_aliases = 52
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alias::DEFAULT_ALIAS_CAPACITY;
use crate::error::{WexError, WexResult};

/// Root settings structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub warehouse: WarehouseSettings,
    pub output: OutputSettings,
    pub run: RunSettings,
}

/// Connection to the warehouse.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseSettings {
    /// Connection URL; `${VAR}` and `$VAR` are expanded.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 4,
        }
    }
}

impl WarehouseSettings {
    /// The URL with environment variables expanded.
    pub fn resolved_url(&self) -> WexResult<Option<String>> {
        self.url.as_deref().map(expand_env_vars).transpose()
    }
}

/// Format of the extracted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Delimited,
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Delimited => "csv",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Where and how extracted rows are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub format: OutputFormat,
    pub delimiter: char,
    /// Written for NULL cells in delimited output.
    pub null: String,
    pub header: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("extract"),
            format: OutputFormat::Delimited,
            delimiter: ',',
            null: String::new(),
            header: true,
        }
    }
}

/// Execution limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunSettings {
    /// Statements executed at the same time.
    pub concurrency: usize,
    /// Alias pool size per view.
    pub max_aliases: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_aliases: DEFAULT_ALIAS_CAPACITY,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WexResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WexError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from the default locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `WEX_CONFIG`
    /// 2. `./wex.toml`
    /// 3. `<config dir>/wex/config.toml`
    ///
    /// Falls back to defaults when none exists.
    pub fn load() -> WexResult<Self> {
        if let Ok(path) = env::var("WEX_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("wex.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("wex").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept as is.
pub fn expand_env_vars(s: &str) -> WexResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                name.push(ch);
            }
            if !closed {
                return Err(WexError::config(format!(
                    "unterminated variable reference '${{{}' in '{}'",
                    name, s
                )));
            }
            name
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| WexError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[warehouse]
url = "postgres://localhost/dw"
max_connections = 8

[output]
directory = "/tmp/out"
format = "jsonl"
delimiter = "|"

[run]
concurrency = 2
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.warehouse.max_connections, 8);
        assert_eq!(settings.output.format, OutputFormat::Jsonl);
        assert_eq!(settings.output.delimiter, '|');
        assert!(settings.output.header);
        assert_eq!(settings.run.concurrency, 2);
        assert_eq!(settings.run.max_aliases, DEFAULT_ALIAS_CAPACITY);
        assert_eq!(
            settings.warehouse.resolved_url().unwrap().as_deref(),
            Some("postgres://localhost/dw")
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.output.format, OutputFormat::Delimited);
        assert_eq!(settings.output.format.extension(), "csv");
        assert_eq!(settings.run.concurrency, 4);
        assert!(settings.warehouse.url.is_none());
    }

    #[test]
    fn test_expand_without_variables() {
        assert_eq!(expand_env_vars("plain").unwrap(), "plain");
        assert_eq!(expand_env_vars("cost $ 5").unwrap(), "cost $ 5");
    }

    #[test]
    fn test_expand_missing_variable() {
        let err = expand_env_vars("${WEX_SURELY_UNSET_VARIABLE_93}").unwrap_err();
        assert!(matches!(err, WexError::MissingEnvVar(name) if name == "WEX_SURELY_UNSET_VARIABLE_93"));
        assert!(expand_env_vars("$WEX_SURELY_UNSET_VARIABLE_93/x").is_err());
    }

    #[test]
    fn test_expand_unterminated_reference() {
        let err = expand_env_vars("postgres://${WEX_HOST/db").unwrap_err();
        assert!(matches!(err, WexError::Config(msg) if msg.contains("unterminated")));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            Settings::from_file("/no/such/wex.toml"),
            Err(WexError::FileNotFound(_))
        ));
    }
}
