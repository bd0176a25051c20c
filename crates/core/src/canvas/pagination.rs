//! `Link` header pagination as used by the Canvas API.
//!
//! Canvas returns list endpoints a page at a time and points at the next
//! page with a header like:
//!
//! ```text
//! Link: <https://canvas.example.edu/api/v1/courses/1/users?page=2&per_page=100>; rel="next",
//!       <https://canvas.example.edu/api/v1/courses/1/users?page=5&per_page=100>; rel="last"
//! ```

/// Extract the `rel="next"` URL from a `Link` header value.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let param = param.trim();
            matches!(param, "rel=\"next\"" | "rel=next")
        });
        is_next.then(|| url.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_link_found() {
        let header = r#"<https://c.example/api/v1/courses/1/users?page=1&per_page=100>; rel="current", <https://c.example/api/v1/courses/1/users?page=2&per_page=100>; rel="next", <https://c.example/api/v1/courses/1/users?page=1&per_page=100>; rel="first", <https://c.example/api/v1/courses/1/users?page=3&per_page=100>; rel="last""#;
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://c.example/api/v1/courses/1/users?page=2&per_page=100")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let header = r#"<https://c.example/api/v1/groups/5/users?page=3>; rel="current", <https://c.example/api/v1/groups/5/users?page=3>; rel="last""#;
        assert_eq!(next_link(header), None);
    }

    #[test]
    fn test_unquoted_rel() {
        let header = "<https://c.example/next>; rel=next";
        assert_eq!(next_link(header).as_deref(), Some("https://c.example/next"));
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(next_link(""), None);
        assert_eq!(next_link("https://c.example/next; rel=\"next\""), None);
    }
}
