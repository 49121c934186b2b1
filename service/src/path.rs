use crate::error::Error;

/// A path inside a collection split into its folder part and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    /// Empty for the collection root, otherwise `/a/b`.
    pub folder: String,
    pub file_name: String,
}

impl NormalizedPath {
    pub fn is_root_folder(&self) -> bool {
        self.folder.is_empty()
    }

    /// The full path with a leading slash, e.g. `/a/b/file.txt`.
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.folder, self.file_name)
    }
}

/// Split a path into segments: backslashes become slashes, duplicate slashes collapse.
///
/// `.` and `..` are rejected so that the result always stays under the collection root.
pub fn path_segments(path: &str) -> Result<Vec<String>, Error> {
    let unified = path.trim().replace('\\', "/");
    let segments: Vec<String> = unified
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        return Err(Error::PreconditionViolation(format!(
            "path '{}' is empty",
            path
        )));
    }
    if let Some(bad) = segments.iter().find(|s| *s == "." || *s == "..") {
        return Err(Error::PreconditionViolation(format!(
            "path '{}' contains a relative segment '{}'",
            path, bad
        )));
    }
    Ok(segments)
}

/// Normalize a file path relative to a collection root.
pub fn normalize_relative_path(path: &str) -> Result<NormalizedPath, Error> {
    let unified = path.trim().replace('\\', "/");
    if unified.ends_with('/') {
        return Err(Error::PreconditionViolation(format!(
            "path '{}' has no file name",
            path
        )));
    }

    let mut segments = path_segments(&unified)?;
    let file_name = segments.pop().unwrap_or_default();
    let folder = segments
        .iter()
        .map(|segment| format!("/{}", segment))
        .collect::<String>();

    Ok(NormalizedPath { folder, file_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_in_root() {
        let path = normalize_relative_path("report.pdf").unwrap();
        assert!(path.is_root_folder());
        assert_eq!(path.file_name, "report.pdf");
        assert_eq!(path.full_path(), "/report.pdf");
    }

    #[test]
    fn test_backslashes_and_duplicate_slashes() {
        let path = normalize_relative_path("\\2024\\\\q1//report.pdf").unwrap();
        assert_eq!(path.folder, "/2024/q1");
        assert_eq!(path.file_name, "report.pdf");
        assert_eq!(path.full_path(), "/2024/q1/report.pdf");
    }

    #[test]
    fn test_leading_slash_is_optional() {
        assert_eq!(
            normalize_relative_path("a/b.txt").unwrap(),
            normalize_relative_path("/a/b.txt").unwrap()
        );
    }

    #[test]
    fn test_rejects_empty_and_folder_only_paths() {
        assert!(matches!(
            normalize_relative_path(""),
            Err(Error::PreconditionViolation(_))
        ));
        assert!(matches!(
            normalize_relative_path("//"),
            Err(Error::PreconditionViolation(_))
        ));
        assert!(matches!(
            normalize_relative_path("a/b/"),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_rejects_relative_segments() {
        assert!(normalize_relative_path("../secret.txt").is_err());
        assert!(normalize_relative_path("a/./b.txt").is_err());
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(
            path_segments("\\a//b\\c").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
