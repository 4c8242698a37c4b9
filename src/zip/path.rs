use std::path::PathBuf;

fn strip_drive_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        &name[2..]
    } else {
        name
    }
}

/// Turn a stored entry name into a path relative to the destination.
///
/// Both `/` and `\` separate components. A drive prefix, empty components,
/// `.` and `..` are dropped, so the result never leaves the destination.
/// Returns `None` when nothing is left.
pub fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let relative: PathBuf = strip_drive_prefix(name)
        .split(['/', '\\'])
        .filter(|part| !matches!(*part, "" | "." | ".."))
        .collect();

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(
            sanitize_entry_path("dir/b.txt").as_deref(),
            Some(Path::new("dir").join("b.txt").as_path())
        );
        assert_eq!(
            sanitize_entry_path("a.txt").as_deref(),
            Some(Path::new("a.txt"))
        );
    }

    #[test]
    fn traversal_is_dropped() {
        assert_eq!(
            sanitize_entry_path("../../etc/passwd").as_deref(),
            Some(Path::new("etc").join("passwd").as_path())
        );
        assert_eq!(
            sanitize_entry_path("a/./../b").as_deref(),
            Some(Path::new("a").join("b").as_path())
        );
    }

    #[test]
    fn absolute_and_drive_names_become_relative() {
        assert_eq!(
            sanitize_entry_path("/tmp/x").as_deref(),
            Some(Path::new("tmp").join("x").as_path())
        );
        assert_eq!(
            sanitize_entry_path("C:\\Windows\\x.dll").as_deref(),
            Some(Path::new("Windows").join("x.dll").as_path())
        );
    }

    #[test]
    fn directory_entry_keeps_its_components() {
        assert_eq!(
            sanitize_entry_path("assets/sprites/").as_deref(),
            Some(Path::new("assets").join("sprites").as_path())
        );
    }

    #[test]
    fn backslash_separates_on_every_platform() {
        assert_eq!(
            sanitize_entry_path("a\\b.txt").as_deref(),
            Some(Path::new("a").join("b.txt").as_path())
        );
    }

    #[test]
    fn nothing_left() {
        assert_eq!(sanitize_entry_path(""), None);
        assert_eq!(sanitize_entry_path("/"), None);
        assert_eq!(sanitize_entry_path("../.."), None);
    }
}
