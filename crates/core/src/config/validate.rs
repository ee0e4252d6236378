use super::{
    types::{Config, RelayAuthMethod},
    ConfigError,
};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.channels.listed == config.channels.undetermined {
        return Err(ConfigError::ValidationError(
            "channels.listed and channels.undetermined must differ".to_string(),
        ));
    }

    if config.discord.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "discord.token cannot be empty".to_string(),
        ));
    }

    if config.wizard.reply_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "wizard.reply_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.relay.method == RelayAuthMethod::SharedSecret
        && config.relay.secret.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "relay.secret is required when relay.method = \"shared_secret\"".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[relay]
method = "none"

[channels]
listed = 1
undetermined = 2

[discord]
token = "t"
guild_id = 3
"#,
        )
        .unwrap()
    }

    fn assert_invalid(config: &Config) {
        let err = validate_config(config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_same_mirror_channels_fails() {
        let mut config = valid_config();
        config.channels.undetermined = config.channels.listed;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_empty_token_fails() {
        let mut config = valid_config();
        config.discord.token = "  ".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_reply_timeout_fails() {
        let mut config = valid_config();
        config.wizard.reply_timeout_secs = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_shared_secret_requires_secret() {
        let mut config = valid_config();
        config.relay.method = RelayAuthMethod::SharedSecret;
        assert_invalid(&config);

        config.relay.secret = Some("s".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
