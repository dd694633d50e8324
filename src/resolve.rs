// src/resolve.rs

//! Stream-resolution boundary.
//!
//! Turning a share link or room number into playable URLs is done by an
//! external resolver; this module only defines the shape of its answer and a
//! few helpers for consuming it. [`StaticResolver`] serves answers that were
//! resolved ahead of time (e.g. listed in the config file).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{LivecapError, Result};

/// Room id used when none can be extracted from the input.
pub const UNKNOWN_ROOM: &str = "unknown";

/// Known quality labels from lowest to highest.
const QUALITY_ORDER: &[&str] = &["标清", "高清", "超清", "蓝光", "蓝光4M", "蓝光8M"];

static ROOM_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"live\.douyin\.com/(\d+)").expect("room url pattern is valid")
});

/// One playable rendition of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quality {
    pub name: String,
    pub play_url: String,
    /// Transport hint from the resolver (`flv`, `hls`, ...).
    pub kind: String,
}

/// Resolver answer. `code == 0` means success; anything else carries a
/// human-readable `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub code: i32,
    pub message: String,
    pub title: String,
    pub room_id: String,
    pub qualities: Vec<Quality>,
}

impl ResolvedStream {
    /// Convert a non-zero `code` into an error and sort the qualities.
    pub fn into_result(mut self) -> Result<Self> {
        if self.code != 0 {
            return Err(LivecapError::Resolve(format!(
                "resolver returned code {}: {}",
                self.code, self.message
            )));
        }
        if self.qualities.is_empty() {
            return Err(LivecapError::Resolve(format!(
                "no qualities available for room {}",
                self.room_id
            )));
        }
        sort_qualities(&mut self.qualities);
        Ok(self)
    }

    /// Quality by label, or the first one after sorting.
    pub fn pick_quality(&self, label: Option<&str>) -> Option<&Quality> {
        match label {
            Some(label) => self.qualities.iter().find(|q| q.name == label),
            None => self.qualities.first(),
        }
    }
}

/// Anything that can resolve a share link or room id.
pub trait StreamResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResolvedStream>> + Send + 'a>>;
}

/// Resolver backed by a fixed table keyed by room id.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    rooms: HashMap<String, ResolvedStream>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stream: ResolvedStream) {
        self.rooms.insert(stream.room_id.clone(), stream);
    }
}

impl StreamResolver for StaticResolver {
    fn resolve<'a>(
        &'a self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResolvedStream>> + Send + 'a>> {
        Box::pin(async move {
            let room_id = room_id_from_input(input);
            match self.rooms.get(&room_id) {
                Some(stream) => Ok(stream.clone()),
                None => Ok(ResolvedStream {
                    code: 10001,
                    message: format!("room '{room_id}' is not known to this resolver"),
                    title: String::new(),
                    room_id,
                    qualities: Vec::new(),
                }),
            }
        })
    }
}

/// Extract the numeric room id from a share link or bare room number.
pub fn room_id_from_input(input: &str) -> String {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return input.to_string();
    }
    ROOM_URL_RE
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_ROOM.to_string())
}

/// Sort qualities from lowest to highest known label; unknown labels last,
/// keeping their relative order.
pub fn sort_qualities(qualities: &mut [Quality]) {
    qualities.sort_by_key(|q| quality_rank(&q.name));
}

fn quality_rank(name: &str) -> usize {
    QUALITY_ORDER
        .iter()
        .position(|known| *known == name)
        .unwrap_or(usize::MAX)
}

/// Resolvers sometimes leave JSON-escaped ampersands (`u0026`) in URLs.
pub fn unescape_play_url(url: &str) -> Option<String> {
    if url.contains("u0026") {
        Some(url.replace("u0026", "&"))
    } else {
        None
    }
}
