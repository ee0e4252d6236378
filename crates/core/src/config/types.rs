use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::messenger::{ChannelId, RoleId, UserId};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub relay: RelayConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub channels: ChannelsConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// How the gateway posting events to the relay surface authenticates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    pub method: RelayAuthMethod,
    /// Shared secret (required when method = "shared_secret")
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelayAuthMethod {
    None,
    SharedSecret,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("curator.json")
}

/// Available store backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

/// Channel routing for mirror cards and announcements.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelsConfig {
    /// Mirror target for entries that are not undetermined
    pub listed: ChannelId,
    /// Mirror target for undetermined entries
    pub undetermined: ChannelId,
    #[serde(default)]
    pub announcements: Option<ChannelId>,
}

/// Discord REST configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordConfig {
    /// Bot token
    pub token: String,
    /// Guild the bot serves, used for message links
    pub guild_id: u64,
    /// The bot's own user id; its reactions are ignored
    #[serde(default)]
    pub bot_user_id: Option<UserId>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Command access configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccessConfig {
    /// Role required for moderation commands; everyone may run them when unset
    #[serde(default)]
    pub staff_role_id: Option<RoleId>,
}

/// Input wizard configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WizardConfig {
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_secs: u64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            reply_timeout_secs: default_reply_timeout(),
        }
    }
}

fn default_reply_timeout() -> u64 {
    60
}

/// Mirror card presentation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default)]
    pub author_icon_url: Option<String>,
    /// Role mentioned on announcements
    #[serde(default)]
    pub announcement_role_id: Option<RoleId>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_icon_url: None,
            announcement_role_id: None,
        }
    }
}

fn default_author_name() -> String {
    "Curator".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub relay: SanitizedRelayConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub channels: ChannelsConfig,
    pub discord: SanitizedDiscordConfig,
    pub access: AccessConfig,
    pub wizard: WizardConfig,
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRelayConfig {
    pub method: String,
    pub secret_configured: bool,
}

/// Sanitized Discord config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDiscordConfig {
    pub guild_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_user_id: Option<UserId>,
    pub api_url: String,
    pub token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            relay: SanitizedRelayConfig {
                method: match config.relay.method {
                    RelayAuthMethod::None => "none".to_string(),
                    RelayAuthMethod::SharedSecret => "shared_secret".to_string(),
                },
                secret_configured: config
                    .relay
                    .secret
                    .as_ref()
                    .is_some_and(|s| !s.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            channels: config.channels.clone(),
            discord: SanitizedDiscordConfig {
                guild_id: config.discord.guild_id,
                bot_user_id: config.discord.bot_user_id,
                api_url: config.discord.api_url.clone(),
                token_configured: !config.discord.token.is_empty(),
                timeout_secs: config.discord.timeout_secs,
            },
            access: config.access.clone(),
            wizard: config.wizard.clone(),
            mirror: config.mirror.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[relay]
method = "none"

[channels]
listed = "479777207934517275"
undetermined = 502916355564224512

[discord]
token = "bot-token"
guild_id = 406911290427654145
"#;

    #[test]
    fn test_deserialize_minimal_config_applies_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.relay.method, RelayAuthMethod::None);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.backend, StoreBackend::Json);
        assert_eq!(config.database.path.to_str().unwrap(), "curator.json");
        assert_eq!(config.discord.api_url, "https://discord.com/api/v10");
        assert_eq!(config.discord.timeout_secs, 30);
        assert_eq!(config.wizard.reply_timeout_secs, 60);
        assert_eq!(config.mirror.author_name, "Curator");
        assert!(config.access.staff_role_id.is_none());
        assert!(config.channels.announcements.is_none());
    }

    #[test]
    fn test_channel_ids_accept_strings_and_numbers() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.channels.listed, ChannelId(479777207934517275));
        assert_eq!(config.channels.undetermined, ChannelId(502916355564224512));
    }

    #[test]
    fn test_deserialize_missing_channels_fails() {
        let toml = r#"
[relay]
method = "none"

[discord]
token = "t"
guild_id = 1
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_sqlite_backend() {
        let toml = format!(
            "{}\n[database]\nbackend = \"sqlite\"\npath = \"/data/curator.db\"\n",
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.database.path.to_str().unwrap(), "/data/curator.db");
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.relay.method = RelayAuthMethod::SharedSecret;
        config.relay.secret = Some("relay-secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.relay.method, "shared_secret");
        assert!(sanitized.relay.secret_configured);
        assert!(sanitized.discord.token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("relay-secret"));
        assert!(!json.contains("bot-token"));
    }
}
