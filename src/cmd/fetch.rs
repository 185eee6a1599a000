/*!
`fetch` - read a text file named by the extension.

The path goes through placeholder expansion first. Any failure (expansion or
read) is reported in `error` prefixed with the path exactly as it was sent,
never the expanded one:

  {"contents":"","error":"%ParentProcessDir%/rules.txt: No such file or directory (os error 2)"}
*/

use serde::Serialize;

use crate::path::PathResolver;
use crate::utils::LogContext;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FetchResponse {
    pub contents: String,
    pub error: String,
}

impl FetchResponse {
    fn failure(path: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            contents: String::new(),
            error: format!("{path}: {reason}"),
        }
    }
}

pub fn execute_fetch(path: &str, resolver: &PathResolver<'_>, log: &LogContext) -> FetchResponse {
    let resolved = match resolver.resolve(path) {
        Ok(resolved) => resolved,
        Err(err) => {
            log.debug(format!("fetch: {err}"));
            return FetchResponse::failure(path, err);
        }
    };
    if resolved != path {
        log.debug(format!("fetch: {path} resolved to {resolved}"));
    }

    match std::fs::read(&resolved) {
        // Invalid UTF-8 sequences become U+FFFD rather than failing the fetch.
        Ok(bytes) => FetchResponse {
            contents: String::from_utf8_lossy(&bytes).into_owned(),
            error: String::new(),
        },
        Err(err) => {
            log.debug(format!("fetch: failed to read {resolved}: {err}"));
            FetchResponse::failure(path, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{LocateError, ParentDirLocator};
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct Parent(Option<PathBuf>);

    impl ParentDirLocator for Parent {
        fn locate(&self) -> Result<PathBuf, LocateError> {
            self.0
                .clone()
                .ok_or_else(|| LocateError::LookupFailed("no parent".into()))
        }
    }

    #[test]
    fn existing_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rules.txt");
        std::fs::write(&file, "example.com\n\"quoted\"\n").unwrap();

        let vars: HashMap<String, String> = HashMap::new();
        let parent = Parent(None);
        let resolver = PathResolver::new(&parent, &vars);
        let resp = execute_fetch(file.to_str().unwrap(), &resolver, &LogContext::silent());
        assert_eq!(resp.contents, "example.com\n\"quoted\"\n");
        assert_eq!(resp.error, "");
    }

    #[test]
    fn missing_file_reports_original_path() {
        let dir = tempfile::tempdir().unwrap();
        let vars = HashMap::from([(
            "TEST_FETCH_DIR".to_string(),
            dir.path().to_string_lossy().into_owned(),
        )]);
        let parent = Parent(None);
        let resolver = PathResolver::new(&parent, &vars);

        let resp = execute_fetch("%TEST_FETCH_DIR%/missing.txt", &resolver, &LogContext::silent());
        assert_eq!(resp.contents, "");
        assert!(
            resp.error.starts_with("%TEST_FETCH_DIR%/missing.txt: "),
            "error was {}",
            resp.error
        );
        assert!(!resp.error.contains(&*dir.path().to_string_lossy()));
    }

    #[test]
    fn environment_placeholder_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
        let vars = HashMap::from([(
            "test_fetch_dir".to_string(),
            dir.path().to_string_lossy().into_owned(),
        )]);
        let parent = Parent(None);
        let resolver = PathResolver::new(&parent, &vars);

        let resp = execute_fetch("%TEST_FETCH_DIR%/test.txt", &resolver, &LogContext::silent());
        assert_eq!(resp, FetchResponse { contents: "hello".into(), error: String::new() });
    }

    #[test]
    fn parent_dir_placeholder_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("policy.json"), "{}").unwrap();
        let vars: HashMap<String, String> = HashMap::new();
        let parent = Parent(Some(dir.path().to_path_buf()));
        let resolver = PathResolver::new(&parent, &vars);

        let resp = execute_fetch("${ParentProcessDir}/policy.json", &resolver, &LogContext::silent());
        assert_eq!(resp.contents, "{}");
        assert_eq!(resp.error, "");
    }

    #[test]
    fn parent_lookup_failure_is_not_fatal() {
        let vars: HashMap<String, String> = HashMap::new();
        let parent = Parent(None);
        let resolver = PathResolver::new(&parent, &vars);
        let resp = execute_fetch("%ParentProcessDir%/x.txt", &resolver, &LogContext::silent());
        assert_eq!(resp.contents, "");
        assert!(resp.error.starts_with("%ParentProcessDir%/x.txt: "));
        assert!(resp.error.contains("no parent"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bin.dat");
        std::fs::write(&file, [b'a', 0xff, b'b']).unwrap();
        let vars: HashMap<String, String> = HashMap::new();
        let parent = Parent(None);
        let resolver = PathResolver::new(&parent, &vars);
        let resp = execute_fetch(file.to_str().unwrap(), &resolver, &LogContext::silent());
        assert_eq!(resp.contents, "a\u{fffd}b");
    }
}
