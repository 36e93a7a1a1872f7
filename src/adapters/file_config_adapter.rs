//! INI configuration file.
//!
//! Values are trimmed and a blank value reads as absent, so `symbols =`
//! falls back the same way a missing key does. Unparseable numbers and
//! flags fall back to the caller's default; `validate_config` reports them.

use crate::domain::error::LftError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::fs;
use std::path::Path;

pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn load(path: &Path) -> Result<Self, LftError> {
        let file = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| LftError::ConfigParse {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        Self::read(&content, file)
    }

    pub fn parse(content: &str) -> Result<Self, LftError> {
        Self::read(content, "<inline>".to_string())
    }

    fn read(content: &str, file: String) -> Result<Self, LftError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| LftError::ConfigParse { file, reason })?;
        Ok(Self { ini })
    }

    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.value(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.value(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(default)
    }
}
