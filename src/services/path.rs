//! Splitting of `container/dir/...` paths.

/// Split `path` into `(container, directory)`.
///
/// The container is everything before the first `/`; the directory is the
/// rest with leading and trailing slashes removed. Both may be empty: an
/// empty container addresses the whole store, an empty directory the
/// container root.
pub fn parse_path(path: &str) -> (String, String) {
    let (container, directory) = path.split_once('/').unwrap_or((path, ""));
    (container.to_string(), directory.trim_matches('/').to_string())
}

/// Parent directory of `path` (`""` for top-level names).
pub fn parent(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        let cases = [
            ("", ("", "")),
            ("/", ("", "")),
            ("container", ("container", "")),
            ("container/", ("container", "")),
            ("container/dir", ("container", "dir")),
            ("container//dir/sub//", ("container", "dir/sub")),
            ("/dir", ("", "dir")),
        ];
        for (input, (container, dir)) in cases {
            assert_eq!(
                parse_path(input),
                (container.to_string(), dir.to_string()),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("a/b/c"), "a/b");
        assert_eq!(parent("a"), "");
        assert_eq!(parent("a/b/"), "a");
    }
}
