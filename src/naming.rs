// src/naming.rs

//! Output file naming.
//!
//! Recordings are written as `{title}_{quality}_{YYYYmmdd_HHMMSS}.{container}`
//! inside the configured output directory. The whole file name is sanitised
//! so that a stream title can never escape that directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Title used when the caller provides none.
pub const UNTITLED: &str = "untitled";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Characters rejected by common filesystems (Windows being the strictest).
const RESERVED: &[char] = &['<', '>', '"', '|', '?', '*', ':'];

/// Replace whitespace and path separators with `_` and drop reserved
/// characters and control codes.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '/' | '\\' => Some('_'),
            c if c.is_whitespace() => Some('_'),
            c if RESERVED.contains(&c) || c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Title with surrounding whitespace removed, or [`UNTITLED`].
pub fn effective_title(title: &str) -> &str {
    let trimmed = title.trim();
    if trimmed.is_empty() { UNTITLED } else { trimmed }
}

pub fn output_file_name(
    title: &str,
    quality_label: &str,
    at: DateTime<Local>,
    container: &str,
) -> String {
    let stem = format!(
        "{}_{}_{}",
        effective_title(title),
        quality_label,
        at.format(TIMESTAMP_FORMAT)
    );
    let mut name = sanitize_file_name(&stem);
    // A title made only of dots would otherwise become a relative path.
    if name.starts_with('.') {
        name.insert(0, '_');
    }
    format!("{name}.{}", sanitize_file_name(container))
}

pub fn output_path(
    output_dir: &Path,
    title: &str,
    quality_label: &str,
    at: DateTime<Local>,
    container: &str,
) -> PathBuf {
    output_dir.join(output_file_name(title, quality_label, at, container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 11, 25, 16, 21, 5)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn name_has_title_quality_timestamp_and_container() {
        let name = output_file_name("Night show", "hd", fixed_time(), "mp4");
        assert_eq!(name, "Night_show_hd_20251125_162105.mp4");
    }

    #[test]
    fn separators_and_reserved_characters_are_removed() {
        let name = output_file_name("a/b\\c<d>e:f|g?h*i\"j", "q", fixed_time(), "mp4");
        assert_eq!(name, "a_b_cdefghij_q_20251125_162105.mp4");
    }

    #[test]
    fn empty_title_falls_back() {
        let name = output_file_name("   ", "q", fixed_time(), "mp4");
        assert!(name.starts_with("untitled_q_"));
    }

    #[test]
    fn path_stays_inside_output_dir() {
        let dir = Path::new("/tmp/recordings");
        let path = output_path(dir, "../../etc/passwd", "q", fixed_time(), "mp4");
        assert_eq!(path.parent(), Some(dir));
    }

    proptest! {
        #[test]
        fn sanitized_names_never_contain_separators(title in ".*", quality in "[a-z0-9]{0,6}") {
            let name = output_file_name(&title, &quality, fixed_time(), "mp4");
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
            prop_assert!(!name.chars().any(|c| RESERVED.contains(&c)));
            prop_assert!(!name.starts_with('.'));
        }
    }
}
