use crate::prompts::{self, PromptPreset, DEFAULT_PRESET_ID};
use crate::util::is_local_endpoint_url;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const CONFIG_FILE_NAME: &str = "config.json";

/// One of the two upstream credential forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    AuthToken(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub model: String,
    pub anthropic_version: String,
    pub credential: Option<Credential>,
    pub prompt_preset_id: String,
    pub custom_presets: BTreeMap<String, PromptPreset>,
}

/// On-disk layout of `config.json`. Field names stay camelCase so config
/// files written for the original client keep working.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigFile {
    base_url: Option<String>,
    api_key: Option<String>,
    auth_token: Option<String>,
    system_prompt_type: Option<String>,
    system_prompts: BTreeMap<String, PromptPreset>,
}

impl Config {
    /// Load from `config.json` in the current directory (if present) with
    /// environment overrides applied on top.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_from(&cwd)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let file = read_config_file(&dir.join(CONFIG_FILE_NAME))?;

        let base_url = env_nonempty("ANTHROPIC_BASE_URL")
            .or(file.base_url)
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());
        let api_key = env_nonempty("ANTHROPIC_API_KEY").or(file.api_key);
        let auth_token = env_nonempty("ANTHROPIC_AUTH_TOKEN").or(file.auth_token);
        let model = env_nonempty("ANTHROPIC_MODEL")
            .unwrap_or_else(|| "claude-sonnet-4-5-20250929".to_string());
        let anthropic_version =
            env_nonempty("ANTHROPIC_VERSION").unwrap_or_else(|| "2023-06-01".to_string());
        let prompt_preset_id = file
            .system_prompt_type
            .unwrap_or_else(|| DEFAULT_PRESET_ID.to_string());

        // An API key wins when both credential forms are present.
        let credential = match (api_key, auth_token) {
            (Some(key), _) => Some(Credential::ApiKey(key)),
            (None, Some(token)) => Some(Credential::AuthToken(token)),
            (None, None) => None,
        };

        Ok(Self {
            base_url,
            model,
            anthropic_version,
            credential,
            prompt_preset_id,
            custom_presets: file.system_prompts,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!(
                "Invalid base URL '{}': expected http:// or https:// URL",
                self.base_url
            );
        }

        if self.credential.is_none() && !self.is_local_endpoint() {
            bail!(
                "An API key or auth token is required for non-local endpoints (url: '{}')",
                self.base_url
            );
        }

        if self.preset().is_none() {
            bail!(
                "Unknown system prompt preset '{}'; check systemPromptType in config.json",
                self.prompt_preset_id
            );
        }

        Ok(())
    }

    /// The active preset, from config-file presets or built-ins.
    pub fn preset(&self) -> Option<PromptPreset> {
        prompts::resolve_preset(&self.prompt_preset_id, &self.custom_presets)
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.base_url)
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("cannot parse {}", path.display()))
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            credential: Some(Credential::ApiKey("test-key".to_string())),
            prompt_preset_id: DEFAULT_PRESET_ID.to_string(),
            custom_presets: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_accepts_key_credential() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_credential_for_remote_endpoint() {
        let config = Config {
            credential: None,
            ..test_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_allows_local_endpoint_without_credential() {
        let config = Config {
            base_url: "http://localhost:8000".to_string(),
            credential: None,
            ..test_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_preset() {
        let config = Config {
            prompt_preset_id: "missing".to_string(),
            ..test_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let config = Config {
            base_url: "ftp://api.anthropic.com".to_string(),
            ..test_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_reads_camel_case_config_file() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        for key in [
            "ANTHROPIC_BASE_URL",
            "ANTHROPIC_API_KEY",
            "ANTHROPIC_AUTH_TOKEN",
            "ANTHROPIC_MODEL",
            "ANTHROPIC_VERSION",
        ] {
            std::env::remove_var(key);
        }

        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.json"),
            r#"{
                "baseUrl": "http://localhost:3000",
                "authToken": "tok-123",
                "systemPromptType": "researcher"
            }"#,
        )
        .expect("write config");

        let config = Config::load_from(dir.path()).expect("load");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(
            config.credential,
            Some(Credential::AuthToken("tok-123".to_string()))
        );
        assert_eq!(config.prompt_preset_id, "researcher");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        for key in [
            "ANTHROPIC_BASE_URL",
            "ANTHROPIC_API_KEY",
            "ANTHROPIC_AUTH_TOKEN",
        ] {
            std::env::remove_var(key);
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from(dir.path()).expect("load");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.prompt_preset_id, DEFAULT_PRESET_ID);
        assert_eq!(config.credential, None);
    }
}
