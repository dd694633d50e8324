// src/exec/command.rs

//! Capture command line construction.
//!
//! The capture tool is invoked as a remuxer: it pulls the stream with a
//! browser-like header block, copies audio/video without re-encoding and
//! writes a fast-start container.
//!
//! ```text
//! <tool> -headers "User-Agent: ..\r\nReferer: ..\r\n" -y -i <url>
//!        -c copy -bsf:a aac_adtstoasc -movflags faststart+empty_moov
//!        -f <container> -loglevel error <output>
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROGRAM: &str = "ffmpeg";
pub const DEFAULT_CONTAINER: &str = "mp4";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER_BASE: &str = "https://live.douyin.com/";

/// Static part of every capture invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureProfile {
    /// Path (or bare name looked up on `PATH`) of the capture tool.
    pub program: PathBuf,
    pub container: String,
    pub user_agent: String,
    /// The room id is appended to form the `Referer` header.
    pub referer_base: String,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            container: DEFAULT_CONTAINER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer_base: DEFAULT_REFERER_BASE.to_string(),
        }
    }
}

impl CaptureProfile {
    pub fn referer_for(&self, room_id: &str) -> String {
        let base = self.referer_base.trim_end_matches('/');
        format!("{base}/{room_id}/")
    }

    pub fn header_block(&self, room_id: &str) -> String {
        format!(
            "User-Agent: {}\r\nReferer: {}\r\n",
            self.user_agent,
            self.referer_for(room_id)
        )
    }

    /// Full command line for one task.
    pub fn command_for(&self, stream_url: &str, room_id: &str, output: &Path) -> CaptureCommand {
        let args = vec![
            "-headers".to_string(),
            self.header_block(room_id),
            "-y".to_string(),
            "-i".to_string(),
            stream_url.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-bsf:a".to_string(),
            "aac_adtstoasc".to_string(),
            "-movflags".to_string(),
            "faststart+empty_moov".to_string(),
            "-f".to_string(),
            self.container.clone(),
            "-loglevel".to_string(),
            "error".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        CaptureCommand {
            program: self.program.clone(),
            args,
        }
    }
}

/// A fully built invocation of the capture tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CaptureCommand {
    /// Whether `program` names a location rather than a bare name that the
    /// OS resolves through `PATH`.
    pub fn has_explicit_path(&self) -> bool {
        self.program.components().count() > 1
    }
}

impl fmt::Display for CaptureCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_order_matches_remux_invocation() {
        let profile = CaptureProfile::default();
        let cmd = profile.command_for("https://cdn/x.flv", "777", Path::new("/rec/out.mp4"));

        assert_eq!(cmd.program, PathBuf::from("ffmpeg"));
        assert_eq!(cmd.args[0], "-headers");
        assert_eq!(&cmd.args[2..], &[
            "-y",
            "-i",
            "https://cdn/x.flv",
            "-c",
            "copy",
            "-bsf:a",
            "aac_adtstoasc",
            "-movflags",
            "faststart+empty_moov",
            "-f",
            "mp4",
            "-loglevel",
            "error",
            "/rec/out.mp4",
        ]);
    }

    #[test]
    fn headers_carry_user_agent_and_room_referer() {
        let profile = CaptureProfile {
            referer_base: "https://live.example.com".to_string(),
            user_agent: "UA/1.0".to_string(),
            ..CaptureProfile::default()
        };
        assert_eq!(
            profile.header_block("42"),
            "User-Agent: UA/1.0\r\nReferer: https://live.example.com/42/\r\n"
        );
    }

    #[test]
    fn explicit_path_detection() {
        let bare = CaptureProfile::default().command_for("u", "r", Path::new("o"));
        assert!(!bare.has_explicit_path());

        let pinned = CaptureProfile {
            program: PathBuf::from("bin/ffmpeg"),
            ..CaptureProfile::default()
        }
        .command_for("u", "r", Path::new("o"));
        assert!(pinned.has_explicit_path());
    }
}
