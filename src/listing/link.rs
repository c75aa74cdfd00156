//! RFC 8288 `Link` header parsing, as used by the GitHub and GitLab APIs

/// Extracts the `rel="next"` target from a `Link` header value
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let target = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let param = param.trim();
            match param.strip_prefix("rel=") {
                Some(rel) => rel
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("next")),
                None => false,
            }
        });

        if is_next && !target.is_empty() {
            Some(target.to_string())
        } else {
            None
        }
    })
}
