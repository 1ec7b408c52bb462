/// Path handling used by the permissions engine and the commands.
///
/// All paths handed around the server are absolute strings in the adapter's own format,
/// so the separator and the normalization rules live in one place.
pub trait FileAdapter: Send + Sync {
    fn separator(&self) -> &str;

    /// Lexically normalizes an absolute path: collapses repeated separators, `.` and `..`
    /// components and drops a trailing separator (except for the root itself).
    fn normalize_path(&self, path: &str) -> String {
        let sep = self.separator();
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split(sep) {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        format!("{}{}", sep, parts.join(sep))
    }

    /// Parent of a normalized absolute path. The root is its own parent.
    fn parent_path(&self, path: &str) -> String {
        let normalized = self.normalize_path(path);
        match normalized.rfind(self.separator()) {
            Some(0) | None => self.separator().to_string(),
            Some(idx) => normalized[..idx].to_string(),
        }
    }

    /// Last component of a path, empty for the root.
    fn file_name<'a>(&self, path: &'a str) -> &'a str {
        let trimmed = path.trim_end_matches(self.separator());
        match trimmed.rfind(self.separator()) {
            Some(idx) => &trimmed[idx + self.separator().len()..],
            None => trimmed,
        }
    }

    fn join(&self, base: &str, name: &str) -> String {
        let sep = self.separator();
        self.normalize_path(&format!("{}{}{}", base.trim_end_matches(sep), sep, name))
    }
}

/// Adapter for the local file system with `/` separated paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileAdapter;

impl FileAdapter for NativeFileAdapter {
    fn separator(&self) -> &str {
        "/"
    }
}
