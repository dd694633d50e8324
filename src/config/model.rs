// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::exec::command::{
    DEFAULT_CONTAINER, DEFAULT_PROGRAM, DEFAULT_REFERER_BASE, DEFAULT_USER_AGENT,
};
use crate::types::SilentExitBehaviour;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// ffmpeg_path = "bin/ffmpeg"
/// output_dir = "recordings"
/// grace_period = "5s"
///
/// [stream.night_show]
/// room = "https://live.douyin.com/123456"
/// quality = "高清"
/// qualities = [
///   { name = "高清", play_url = "https://..." },
/// ]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All streams from `[stream.<name>]`, keyed by name.
    #[serde(default)]
    pub stream: BTreeMap<String, StreamConfig>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub stream: BTreeMap<String, StreamConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        stream: BTreeMap<String, StreamConfig>,
    ) -> Self {
        Self { config, stream }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Capture tool. A bare name is looked up on `PATH`.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Directory recordings are written to; created if missing.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Output container passed to `-f` and used as file extension.
    #[serde(default = "default_container")]
    pub container: String,

    /// How long `stop` waits after the graceful signal before killing,
    /// e.g. `"5s"` or `"1500ms"`.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// The room id is appended to build the `Referer` header.
    #[serde(default = "default_referer_base")]
    pub referer_base: String,

    /// Classification of a non-zero exit with no diagnostic output.
    #[serde(default)]
    pub silent_exit: SilentExitBehaviour,

    /// Optional directory for daily-rotated log files.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_ffmpeg_path() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_output_dir() -> String {
    "recordings".to_string()
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_grace_period() -> String {
    "5s".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_referer_base() -> String {
    DEFAULT_REFERER_BASE.to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            output_dir: default_output_dir(),
            container: default_container(),
            grace_period: default_grace_period(),
            user_agent: default_user_agent(),
            referer_base: default_referer_base(),
            silent_exit: SilentExitBehaviour::default(),
            log_dir: None,
        }
    }
}

/// `[stream.<name>]` section: one already-resolved stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Share link or numeric room id.
    pub room: String,

    /// Recording title; defaults to the stream name.
    #[serde(default)]
    pub title: Option<String>,

    /// Quality label to record; defaults to the first after sorting.
    #[serde(default)]
    pub quality: Option<String>,

    #[serde(default)]
    pub qualities: Vec<QualityConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    pub name: String,
    pub play_url: String,
    #[serde(default = "default_quality_kind")]
    pub kind: String,
}

fn default_quality_kind() -> String {
    "flv".to_string()
}
