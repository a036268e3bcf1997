use std::collections::HashMap;

/// Fmtp is a parsed `a=fmtp` parameter line with lower-cased keys.
pub(crate) type Fmtp = HashMap<String, String>;

/// parse_fmtp parses a `key=value;key=value` fmtp line. Keys without a value map to "".
pub(crate) fn parse_fmtp(line: &str) -> Fmtp {
    line.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.trim().to_lowercase(), v.trim().to_owned()),
            None => (p.to_lowercase(), String::new()),
        })
        .collect()
}

/// fmtp_consist reports whether every key present in both lines carries the same value,
/// compared case-insensitively. Keys present on one side only never conflict.
pub(crate) fn fmtp_consist(a: &Fmtp, b: &Fmtp) -> bool {
    a.iter().all(|(k, va)| match b.get(k) {
        Some(vb) => va.eq_ignore_ascii_case(vb),
        None => true,
    })
}

/// fmtp_match reports whether two codecs describe the same format: equal MIME types and
/// consistent fmtp parameters.
pub(crate) fn fmtp_match(mime_a: &str, line_a: &str, mime_b: &str, line_b: &str) -> bool {
    mime_a.eq_ignore_ascii_case(mime_b) && fmtp_consist(&parse_fmtp(line_a), &parse_fmtp(line_b))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_fmtp() {
        let f = parse_fmtp(" level-asymmetry-allowed=1;\n\tPacketization-Mode=1 ;usedtx");
        assert_eq!(f.len(), 3);
        assert_eq!(f.get("level-asymmetry-allowed").map(String::as_str), Some("1"));
        assert_eq!(f.get("packetization-mode").map(String::as_str), Some("1"));
        assert_eq!(f.get("usedtx").map(String::as_str), Some(""));

        assert!(parse_fmtp("").is_empty());
    }

    #[test]
    fn test_fmtp_consist() {
        let tests = vec![
            ("equal", "a=1;b=2", "a=1;b=2", true),
            ("whitespace", "a=1;b=2", "  a=1;\n\tb=2 ", true),
            ("value case", "a=x;b=2", "a=X;B=2", true),
            ("extra key", "a=1;b=2", "a=1;b=2;c=3", true),
            ("conflict", "a=1;b=2", "a=1;b=3", false),
            ("conflict with extra key", "a=1;b=2;c=3", "a=1;b=4", false),
        ];

        for (name, a, b, want) in tests {
            assert_eq!(fmtp_consist(&parse_fmtp(a), &parse_fmtp(b)), want, "{name}");
            assert_eq!(fmtp_consist(&parse_fmtp(b), &parse_fmtp(a)), want, "{name} reversed");
        }
    }

    #[test]
    fn test_fmtp_match_requires_same_mime() {
        assert!(fmtp_match("video/VP8", "", "video/vp8", ""));
        assert!(!fmtp_match("video/VP8", "", "video/VP9", ""));
        assert!(!fmtp_match(
            "video/H264",
            "packetization-mode=1",
            "video/H264",
            "packetization-mode=0"
        ));
    }
}
