#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use livecap::config::{ConfigFile, ConfigSection, QualityConfig, RawConfigFile, RecorderSettings, StreamConfig};
use livecap::engine::StartRequest;
use livecap::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                stream: BTreeMap::new(),
            },
        }
    }

    pub fn with_stream(mut self, name: &str, stream: StreamConfig) -> Self {
        self.config.stream.insert(name.to_string(), stream);
        self
    }

    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.config.config.ffmpeg_path = path.to_string();
        self
    }

    pub fn with_grace_period(mut self, period: &str) -> Self {
        self.config.config.grace_period = period.to_string();
        self
    }

    pub fn build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `[stream.<name>]` section.
pub struct StreamConfigBuilder {
    stream: StreamConfig,
}

impl StreamConfigBuilder {
    pub fn new(room: &str) -> Self {
        Self {
            stream: StreamConfig {
                room: room.to_string(),
                title: None,
                quality: None,
                qualities: Vec::new(),
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.stream.title = Some(title.to_string());
        self
    }

    pub fn select(mut self, quality: &str) -> Self {
        self.stream.quality = Some(quality.to_string());
        self
    }

    pub fn quality(mut self, name: &str, play_url: &str) -> Self {
        self.stream.qualities.push(QualityConfig {
            name: name.to_string(),
            play_url: play_url.to_string(),
            kind: "flv".to_string(),
        });
        self
    }

    pub fn build(self) -> StreamConfig {
        self.stream
    }
}

/// Settings writing into `dir` with a short grace period.
pub fn settings_in(dir: &Path) -> RecorderSettings {
    RecorderSettings {
        output_dir: dir.to_path_buf(),
        grace_period: Duration::from_millis(200),
        ..RecorderSettings::default()
    }
}

/// Request with a fixed id.
pub fn request(id: &str) -> StartRequest {
    StartRequest::new(
        format!("https://cdn.example/{id}.flv"),
        "123456",
        "高清",
        format!("title {id}"),
    )
    .with_id(id)
}
