use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use anyhow::{anyhow, bail, Context, Result};
use jira_rest_api::ApiClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TOKEN_ENV: &str = "JIRA_API_TOKEN";
const PROFILE_TOKEN_ENV_PREFIX: &str = "JIRA_REST_TOKEN_";
const CONFIG_PATH_ENV: &str = "JIRA_REST_CONFIG";

/// Client profiles stored on disk as YAML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    /// Reads the config at `path`, else `$JIRA_REST_CONFIG`, else
    /// `~/.jira-rest/config.yaml`. A missing file yields an empty config.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = config_path(path, |key| std::env::var_os(key).map(PathBuf::from));

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Unable to read config file at {}", path.display()))
            }
        };

        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    /// Writes the config, readable by the owner only since profiles may
    /// carry API tokens.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        self.validate()?;
        let path = config_path(path, |key| std::env::var_os(key).map(PathBuf::from));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let serialized = serde_yaml::to_string(self)?;
        options
            .open(&path)
            .and_then(|mut file| file.write_all(serialized.as_bytes()))
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        debug!(path = %path.display(), profiles = self.profiles.len(), "Saved config");
        Ok(())
    }

    /// A `default_profile` must name one of the profiles.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.default_profile.as_deref() {
            if !self.profiles.contains_key(name) {
                bail!("default_profile '{name}' does not match any profile");
            }
        }
        Ok(())
    }

    /// The requested profile if given, else the default profile, else the
    /// alphabetically first one.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        let found = match requested.or(self.default_profile.as_deref()) {
            Some(name) => self.profiles.get_key_value(name),
            None => self.profiles.iter().min_by(|a, b| a.0.cmp(b.0)),
        };
        found.map(|(name, profile)| (name.as_str(), profile))
    }

    /// Resolves a profile and builds a client from it.
    pub fn client(&self, requested: Option<&str>) -> Result<ApiClient> {
        let (name, profile) = self
            .resolve_profile(requested)
            .ok_or_else(|| match requested {
                Some(name) => anyhow!("Profile '{name}' not found in config"),
                None => anyhow!("No profile configured"),
            })?;

        profile.build_client(name)
    }
}

/// Explicit path, then the `JIRA_REST_CONFIG` override, then the home
/// directory default.
fn config_path<P, F>(explicit: Option<P>, lookup: F) -> PathBuf
where
    P: AsRef<Path>,
    F: Fn(&str) -> Option<PathBuf>,
{
    explicit
        .map(|p| p.as_ref().to_path_buf())
        .or_else(|| lookup(CONFIG_PATH_ENV).filter(|p| !p.as_os_str().is_empty()))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".jira-rest")
                .join("config.yaml")
        })
}

/// Connection settings for one Jira site. Everything except `base_url` is
/// optional: anonymous access is allowed, and the token may come from the
/// environment instead of the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub user_agent: Option<String>,
}

impl Profile {
    pub fn build_client(&self, name: &str) -> Result<ApiClient> {
        self.build_client_with(name, |key| std::env::var(key).ok())
    }

    /// Builds a client using `lookup` in place of the process environment.
    pub fn build_client_with<F>(&self, name: &str, lookup: F) -> Result<ApiClient>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("Profile '{name}' is missing a base_url."))?;

        let mut client = ApiClient::new(base_url)
            .with_context(|| format!("Profile '{name}' has an invalid base_url"))?;

        if let Some(username) = self.username.as_deref() {
            let token = self.resolve_token(name, lookup).ok_or_else(|| {
                anyhow!(
                    "No token found for profile '{name}'. Set {PROFILE_TOKEN_ENV_PREFIX}{} or {TOKEN_ENV}, or add api_token to the profile",
                    name.to_uppercase()
                )
            })?;
            client = client.with_basic_auth(username, token);
        }

        if let Some(user_agent) = self.user_agent.as_deref() {
            client = client.with_user_agent(user_agent);
        }

        Ok(client)
    }

    /// Token lookup: `JIRA_REST_TOKEN_<PROFILE>`, then `JIRA_API_TOKEN`, then
    /// the profile's own `api_token`. Blank values are skipped.
    pub fn resolve_token<F>(&self, name: &str, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile_var = format!("{PROFILE_TOKEN_ENV_PREFIX}{}", name.to_uppercase());

        lookup(&profile_var)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()))
            .or_else(|| {
                self.api_token
                    .clone()
                    .filter(|t| !t.trim().is_empty())
            })
    }
}
