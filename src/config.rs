use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linkdeck")]
#[command(about = "Runs the linkdeck bookmark service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Human-readable debug logs, no static asset serving
    #[arg(long)]
    pub dev: bool,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".linkdeck")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
}

impl Default for Cors {
    fn default() -> Self {
        Cors {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub port: u16,
    pub static_dir: Option<String>,
    pub cors: Cors,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            port: 8080,
            static_dir: Some("ui/dist".to_string()),
            cors: Cors::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Storage {
    pub path: String,
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            path: "data/linkdeck.db".to_string(),
        }
    }
}

/// Argon2id cost parameters for stored password hashes.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PasswordHash {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHash {
    fn default() -> Self {
        PasswordHash {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Auth {
    jwt_secret: Option<String>,
    pub token_ttl_hours: u32,
    pub admin_username: String,
    admin_password: Option<String>,
    /// Serve `GET /api/links` without a bearer token.
    pub public_links: bool,
    /// Answer `GET /api/admin/link-groups` with `[]` instead of 401 when the
    /// Authorization header is absent.
    pub empty_list_on_missing_auth: bool,
    pub password_hash: PasswordHash,
}

impl Default for Auth {
    fn default() -> Self {
        Auth {
            jwt_secret: None,
            token_ttl_hours: 24,
            admin_username: "admin".to_string(),
            admin_password: None,
            public_links: true,
            empty_list_on_missing_auth: false,
            password_hash: PasswordHash::default(),
        }
    }
}

impl Auth {
    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn admin_password(&self) -> Option<&str> {
        self.admin_password.as_deref().filter(|s| !s.is_empty())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.token_ttl_hours))
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub database: Storage,
    pub auth: Auth,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Loads the explicit path if given, else the default path when it
    /// exists, else built-in defaults. Environment overrides apply last.
    pub fn resolve(config_path: Option<&str>) -> Result<Self> {
        let mut cfg = match config_path {
            Some(path) => Config::new(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Config::new(&path.to_string_lossy())?
                } else {
                    tracing::info!(path = ?path, "no config file found, using defaults");
                    Config::default()
                }
            }
        };
        cfg.apply_overrides(|name| env::var(name).ok());
        Ok(cfg)
    }

    pub fn from_yaml_str(yaml_str: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let yaml_with_env = Config::substitute_vars(yaml_str, lookup);
        // An empty document deserializes to unit, not to a defaulted map.
        if yaml_with_env.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        Config::from_yaml_str(&yaml_str, |name| env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("LINKDECK_JWT_SECRET").filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(password) = lookup("LINKDECK_ADMIN_PASSWORD").filter(|s| !s.is_empty()) {
            self.auth.admin_password = Some(password);
        }
        if let Some(port) = lookup("LINKDECK_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid LINKDECK_PORT"),
            }
        }
    }

    fn substitute_vars(yaml_str: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    lookup(actual_var).unwrap_or_else(|| default_val.to_string())
                } else {
                    lookup(var_name).unwrap_or_else(|| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        result
    }
}
