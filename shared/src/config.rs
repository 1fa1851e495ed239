use std::env;

use thiserror::Error;

use crate::profile::{Profile, ProfileError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Process-wide configuration, read from the environment once at startup and
/// shared read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inbox bucket, the source of object-created notifications.
    pub store_inbox: String,

    /// Media bucket receiving the derived variants.
    pub store_media: String,

    /// Transcoding profile; its sink, when present, names the bus completion
    /// events are announced on.
    pub profile: Profile,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Ok(Config {
            store_inbox: var("CONFIG_STORE_INBOX")?,
            store_media: var("CONFIG_STORE_MEDIA")?,
            profile: var("CONFIG_CODEC_PROFILE")?.parse()?,
        })
    }
}

fn var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

pub async fn get_s3_client() -> aws_sdk_s3::Client {
    let cfg = aws_config::load_from_env().await;

    aws_sdk_s3::Client::new(&cfg)
}

pub async fn get_eventbridge_client() -> aws_sdk_eventbridge::Client {
    let cfg = aws_config::load_from_env().await;

    aws_sdk_eventbridge::Client::new(&cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_config_from_env() {
        env::set_var("CONFIG_STORE_INBOX", "inbox");
        env::set_var("CONFIG_STORE_MEDIA", "media");
        env::set_var(
            "CONFIG_CODEC_PROFILE",
            "av|small-128x128:origin|media-events",
        );

        let config = Config::from_env().unwrap();
        assert_eq!(config.store_inbox, "inbox");
        assert_eq!(config.store_media, "media");
        assert_eq!(config.profile.prefix, "av");
        assert_eq!(config.profile.sink.as_deref(), Some("media-events"));

        env::set_var("CONFIG_CODEC_PROFILE", "not a profile");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Profile(_))
        ));

        env::remove_var("CONFIG_CODEC_PROFILE");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("CONFIG_CODEC_PROFILE"))
        ));
    }
}
