//! Location normalization
//!
//! Both stores spell the same file differently: the XML export uses
//! `file://localhost/` URIs with percent-encoding, the Mixed In Key database
//! stores plain paths. [`normalize`] turns either form into one comparable
//! string, which is the only join key between the two stores.

use std::borrow::Cow;

const URI_PREFIXES: [&str; 3] = ["file://localhost", "file://", "file:"];

#[cfg(windows)]
const SEPARATOR: char = '\\';
#[cfg(not(windows))]
const SEPARATOR: char = '/';

/// Canonicalize a raw location (URI or plain path) into a comparable path string.
///
/// Purely lexical: `.` and `..` are resolved without touching the filesystem,
/// separators are unified, and on Windows the result is case-folded. Never
/// fails; input that cannot be resolved lexically comes back separator-normalized.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let decoded = strip_uri(trimmed);
    let unified: String = decoded
        .chars()
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();

    let resolved = resolve_lexically(&unified).unwrap_or_else(|| unified.clone());
    let native: String = resolved
        .chars()
        .map(|c| if c == '/' { SEPARATOR } else { c })
        .collect();

    if cfg!(windows) {
        native.to_lowercase()
    } else {
        native
    }
}

/// Same as [`normalize`] for an optional value; `None` yields an empty string.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

/// Strip a `file://` scheme/host and percent-decode what remains.
/// Plain paths are returned untouched (a literal `%` in a filename is legal).
fn strip_uri(input: &str) -> Cow<'_, str> {
    let Some(rest) = URI_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(input, prefix))
    else {
        return Cow::Borrowed(input);
    };

    let decoded = match urlencoding::decode(rest) {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(rest.as_bytes())).into_owned(),
    };

    // `/C:/Music` -> `C:/Music`; `/Users/x` keeps its root
    if has_drive_after_slash(&decoded) {
        Cow::Owned(decoded[1..].to_string())
    } else {
        Cow::Owned(decoded)
    }
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&input[prefix.len()..])
    } else {
        None
    }
}

fn has_drive_after_slash(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 3 && b[0] == b'/' && b[1].is_ascii_alphabetic() && b[2] == b':'
}

fn has_drive(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

/// Resolve `.`/`..` and duplicate separators in a `/`-separated path.
/// Returns `None` when the path contains a NUL or climbs above an absolute root.
fn resolve_lexically(path: &str) -> Option<String> {
    if path.contains('\0') {
        return None;
    }

    let (root, rest) = if path.starts_with("//") {
        // UNC: keep `//server/share` as the root
        let mut parts = path[2..].splitn(3, '/');
        let server = parts.next().unwrap_or_default();
        let share = parts.next().unwrap_or_default();
        (format!("//{server}/{share}"), parts.next().unwrap_or_default())
    } else if has_drive(path) {
        let drive = path[..2].to_ascii_uppercase();
        let rest = &path[2..];
        if rest.starts_with('/') {
            (format!("{drive}/"), rest)
        } else {
            (drive, rest)
        }
    } else if let Some(rest) = path.strip_prefix('/') {
        ("/".to_string(), rest)
    } else {
        (String::new(), path)
    };

    let absolute = root.ends_with('/') || root.starts_with("//");
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => return None,
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if root.starts_with("//") && !joined.is_empty() {
        Some(format!("{root}/{joined}"))
    } else {
        Some(format!("{root}{joined}"))
    }
}

/// Convert a plain filesystem path into the `file://localhost/` form the XML export uses.
pub fn path_to_location(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let encoded: Vec<String> = unified
        .split('/')
        .map(|segment| {
            if has_drive(segment) && segment.len() == 2 {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect();
    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://localhost{joined}")
    } else {
        format!("file://localhost/{joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_and_plain_path_match() {
        assert_eq!(
            normalize("file://localhost/C:/Music/A%20B.m4a"),
            normalize("C:/Music/A B.m4a")
        );
    }

    #[test]
    fn test_backslash_and_uri_match() {
        assert_eq!(
            normalize("C:\\Music\\Song.mp3"),
            normalize("file://localhost/C:/Music/Song.mp3")
        );
    }

    #[test]
    fn test_unix_uri_keeps_root() {
        let expected = if cfg!(windows) {
            "\\users\\dj\\music\\track one.flac"
        } else {
            "/Users/dj/Music/track one.flac"
        };
        assert_eq!(
            normalize("file://localhost/Users/dj/Music/track%20one.flac"),
            expected
        );
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize_opt(None), "");
    }

    #[test]
    fn test_dot_segments_resolved() {
        assert_eq!(
            normalize("/music/./house/../techno//a.mp3"),
            normalize("/music/techno/a.mp3")
        );
    }

    #[test]
    fn test_climbing_above_root_is_left_alone() {
        let out = normalize("/../x.mp3");
        assert!(out.contains(".."));
    }

    #[test]
    fn test_drive_letter_case_unified() {
        assert_eq!(normalize("c:/Music/x.mp3"), normalize("C:/Music/x.mp3"));
    }

    #[test]
    fn test_literal_percent_in_plain_path() {
        assert!(normalize("/music/100%25 pure.mp3").contains("%25"));
    }

    #[test]
    fn test_path_to_location() {
        assert_eq!(
            path_to_location("/Users/dj/Music/my track.flac"),
            "file://localhost/Users/dj/Music/my%20track.flac"
        );
        assert_eq!(
            path_to_location("C:\\Music\\A B.m4a"),
            "file://localhost/C:/Music/A%20B.m4a"
        );
        assert_eq!(
            normalize(&path_to_location("/Users/dj/Drum & Bass/x.mp3")),
            normalize("/Users/dj/Drum & Bass/x.mp3")
        );
    }
}
