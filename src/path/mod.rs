/*!
Path placeholder expansion for configured file paths.

A path coming from the extension may reference:
  - the directory of the process that launched this helper, spelled
    `%ParentProcessDir%`, `$ParentProcessDir` or `${ParentProcessDir}`
    (any letter case)
  - environment variables as a leading `%NAME%` or an embedded `${NAME}`

Expansion never fails for undefined variables (the placeholder stays verbatim).
The only failure is a parent-directory lookup that was actually needed.
*/

pub mod parent;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, NoExpand, Regex, RegexBuilder};
use thiserror::Error;

pub use parent::{LocateError, ParentDirLocator, SysinfoLocator};

const PARENT_TOKEN: &str = "ParentProcessDir";

/// Spellings substituted with the parent directory, applied in this order.
const PARENT_PLACEHOLDERS: [&str; 3] = [
    "%ParentProcessDir%",
    "${ParentProcessDir}",
    "$ParentProcessDir",
];

/// Case-insensitive literal matchers for `PARENT_PLACEHOLDERS`, same order.
static PARENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PARENT_PLACEHOLDERS
        .iter()
        .map(|placeholder| {
            RegexBuilder::new(&regex::escape(placeholder))
                .case_insensitive(true)
                .build()
                .expect("escaped literal is a valid regex")
        })
        .collect()
});

/// `%NAME%`, only at the very start of the path.
static LEADING_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%([^%]+)%").expect("static regex"));

/// `${NAME}` anywhere in the path.
static BRACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve parent process directory for '{path}': {source}")]
    ParentDirUnavailable {
        path: String,
        #[source]
        source: LocateError,
    },
}

/// Source of environment variables. Lets tests supply variables without
/// mutating the process environment.
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Expands placeholders in raw paths using a parent locator and an environment.
pub struct PathResolver<'a> {
    locator: &'a dyn ParentDirLocator,
    env: &'a dyn Environment,
}

impl<'a> PathResolver<'a> {
    pub fn new(locator: &'a dyn ParentDirLocator, env: &'a dyn Environment) -> Self {
        Self {
            locator,
            env,
        }
    }

    /// Expand every supported placeholder in `raw`.
    pub fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
        let mut path = raw.to_string();

        if contains_ignore_case(&path, PARENT_TOKEN) {
            let dir = self
                .locator
                .locate()
                .map_err(|source| ResolveError::ParentDirUnavailable {
                    path: raw.to_string(),
                    source,
                })?;
            let dir = dir.to_string_lossy();
            for pattern in PARENT_PATTERNS.iter() {
                path = pattern.replace_all(&path, NoExpand(dir.as_ref())).into_owned();
            }
        }

        let path = LEADING_PERCENT
            .replace(&path, |caps: &Captures| self.expand(caps))
            .into_owned();
        let path = BRACED
            .replace_all(&path, |caps: &Captures| self.expand(caps))
            .into_owned();
        Ok(path)
    }

    fn expand(&self, caps: &Captures) -> String {
        let name = &caps[1];
        if name.eq_ignore_ascii_case(PARENT_TOKEN) {
            return caps[0].to_string();
        }
        self.lookup(name).unwrap_or_else(|| caps[0].to_string())
    }

    /// Verbatim, then upper-cased, then lower-cased; first non-empty value wins.
    fn lookup(&self, name: &str) -> Option<String> {
        [
            Cow::Borrowed(name),
            Cow::Owned(name.to_uppercase()),
            Cow::Owned(name.to_lowercase()),
        ]
        .iter()
        .filter_map(|candidate| self.env.var(candidate))
        .find(|value| !value.is_empty())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
