// src/config/validate.rs

use std::collections::HashMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::settings::parse_duration;
use crate::errors::{LivecapError, Result};
use crate::resolve::room_id_from_input;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::LivecapError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.stream))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_streams(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let grace = parse_duration(&cfg.config.grace_period).map_err(|e| {
        LivecapError::ConfigError(format!("[config].grace_period: {e}"))
    })?;
    if grace.is_zero() {
        return Err(LivecapError::ConfigError(
            "[config].grace_period must be greater than zero".to_string(),
        ));
    }

    if cfg.config.container.trim().is_empty() {
        return Err(LivecapError::ConfigError(
            "[config].container must not be empty".to_string(),
        ));
    }

    if cfg.config.ffmpeg_path.trim().is_empty() {
        return Err(LivecapError::ConfigError(
            "[config].ffmpeg_path must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_streams(cfg: &RawConfigFile) -> Result<()> {
    let mut rooms: HashMap<String, &str> = HashMap::new();

    for (name, stream) in cfg.stream.iter() {
        let room = room_id_from_input(&stream.room);
        if let Some(other) = rooms.insert(room.clone(), name.as_str()) {
            return Err(LivecapError::ConfigError(format!(
                "streams '{}' and '{}' both point at room '{}'",
                other, name, room
            )));
        }

        if stream.qualities.is_empty() {
            return Err(LivecapError::ConfigError(format!(
                "stream '{}' lists no qualities",
                name
            )));
        }

        if let Some(q) = stream.qualities.iter().find(|q| q.play_url.trim().is_empty()) {
            return Err(LivecapError::ConfigError(format!(
                "stream '{}' quality '{}' has an empty play_url",
                name, q.name
            )));
        }

        if let Some(ref wanted) = stream.quality {
            if !stream.qualities.iter().any(|q| &q.name == wanted) {
                return Err(LivecapError::ConfigError(format!(
                    "stream '{}' selects quality '{}' which it does not list",
                    name, wanted
                )));
            }
        }
    }
    Ok(())
}
