use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub username: Option<String>,
    pub wordlist: Option<String>,
    pub max_passwords: Option<usize>,
    pub username_field: Option<String>,
    pub password_field: Option<String>,
    pub success_indicator: Option<String>,
    pub failure_indicator: Option<String>,
    pub success_regex: Option<String>,
    pub failure_regex: Option<String>,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub progress_interval: Option<usize>,
    pub logfile: Option<String>,
    #[serde(alias = "workers")]
    pub threads: Option<u32>,
    pub rate: Option<u32>,
    pub timeout: Option<usize>,
    pub delay: Option<f64>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
    pub show_attempts: Option<bool>,
    pub targets: Option<String>,
}

// one named entry in a targets file; same knobs as the config file minus
// process-level output settings
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct TargetEntry {
    pub url: String,
    pub username: String,
    pub wordlist: Option<String>,
    pub username_field: Option<String>,
    pub password_field: Option<String>,
    pub success_indicator: Option<String>,
    pub failure_indicator: Option<String>,
    pub success_regex: Option<String>,
    pub failure_regex: Option<String>,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub progress_interval: Option<usize>,
    #[serde(alias = "workers")]
    pub threads: Option<u32>,
    pub rate: Option<u32>,
    pub timeout: Option<usize>,
    pub delay: Option<f64>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".credbuster").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

// BTreeMap keeps the listing order stable for --list-targets
pub fn load_targets_file(path: &PathBuf) -> Result<BTreeMap<String, TargetEntry>, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read targets file '{}': {e}", path.display()))?;
    serde_yaml::from_str::<BTreeMap<String, TargetEntry>>(&contents)
        .map_err(|e| format!("failed to parse targets file '{}': {e}", path.display()))
}

fn default_config_yaml() -> String {
    r#"# Credbuster config
#
# Location (default):
#   ~/.credbuster/config.yml

# Target (choose via CLI or here)
# url: http://testphp.vulnweb.com/login.php
# username: admin

# Wordlist ("builtin" selects the built-in common-password list)
# wordlist: ./passwords.txt
max_passwords: 1000

# Form fields
username_field: username
password_field: password

# Detection
success_indicator: welcome
# failure_indicator: invalid
# success_regex: "dashboard|logged in"
# failure_regex: "login failed"

# HTTP
timeout: 10
# proxy: http://127.0.0.1:8080
# user_agent: "Mozilla/5.0 ..."

# Performance
threads: 4
rate: 1000
delay: 0.0

# Output
progress_interval: 10
# logfile: ./credbuster.log
# output: ./report.json
# output_format: json
no_color: false
show_attempts: false

# Multi-target runs
# targets: ./targets.yml
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
