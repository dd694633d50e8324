// src/config/settings.rs

//! Typed runtime settings derived from a validated [`ConfigFile`].

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{ConfigFile, StreamConfig};
use crate::engine::ClassifierPolicy;
use crate::errors::{LivecapError, Result};
use crate::exec::CaptureProfile;
use crate::resolve::{Quality, ResolvedStream, StaticResolver, room_id_from_input};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// What the orchestrator is constructed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    pub profile: CaptureProfile,
    pub output_dir: PathBuf,
    /// Wait after the graceful signal, and again after the kill.
    pub grace_period: Duration,
    pub policy: ClassifierPolicy,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            profile: CaptureProfile::default(),
            output_dir: PathBuf::from("recordings"),
            grace_period: DEFAULT_GRACE_PERIOD,
            policy: ClassifierPolicy::default(),
        }
    }
}

impl RecorderSettings {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let c = &cfg.config;
        let grace_period = parse_duration(&c.grace_period)
            .map_err(|e| LivecapError::ConfigError(format!("[config].grace_period: {e}")))?;

        Ok(Self {
            profile: CaptureProfile {
                program: PathBuf::from(&c.ffmpeg_path),
                container: c.container.clone(),
                user_agent: c.user_agent.clone(),
                referer_base: c.referer_base.clone(),
            },
            output_dir: PathBuf::from(&c.output_dir),
            grace_period,
            policy: ClassifierPolicy {
                silent_exit: c.silent_exit,
            },
        })
    }
}

impl StreamConfig {
    /// The resolver answer this section stands for. The title falls back to
    /// the section name.
    pub fn to_resolved(&self, name: &str) -> ResolvedStream {
        ResolvedStream {
            code: 0,
            message: String::new(),
            title: self.title.clone().unwrap_or_else(|| name.to_string()),
            room_id: room_id_from_input(&self.room),
            qualities: self
                .qualities
                .iter()
                .map(|q| Quality {
                    name: q.name.clone(),
                    play_url: q.play_url.clone(),
                    kind: q.kind.clone(),
                })
                .collect(),
        }
    }
}

impl ConfigFile {
    /// Resolver serving every `[stream.<name>]` section by room id.
    pub fn resolver(&self) -> StaticResolver {
        let mut resolver = StaticResolver::new();
        for (name, stream) in self.stream.iter() {
            resolver.insert(stream.to_resolved(name));
        }
        resolver
    }
}

/// Parse `"500ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration out of range: '{}'", s))
}
