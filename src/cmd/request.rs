/*!
Request model shared by both operating modes.

  Request        - decoded stdio envelope payload (command + params + logging knobs)
  CommandParams  - flat optional string parameters
  Command        - the recognised command names

Helpers:
  - Command::from_name()   exact match, anything else is echoed back
  - params_from_cli()      `--params` JSON merged over `--params-file` (JSON/YAML)
*/

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/* ---- Commands ---- */

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    /// Read a file (after placeholder expansion) and return its contents
    Fetch,
    /// Show the native open-file dialog
    ChooseFile,
    /// Read FlexConfirmMail group policy settings
    OutlookGpoConfigs,
}

impl Command {
    pub const fn variants() -> &'static [Command] {
        &[
            Command::Fetch,
            Command::ChooseFile,
            Command::OutlookGpoConfigs,
        ]
    }

    /// Wire name lookup. Matching is exact, as sent by the extension.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|c| c.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Fetch => "fetch",
            Command::ChooseFile => "choose-file",
            Command::OutlookGpoConfigs => "outlook-gpo-configs",
        }
    }

    /// Whether direct invocation must be given a parameter object.
    pub fn requires_params(&self) -> bool {
        matches!(self, Command::Fetch | Command::ChooseFile)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/* ---- Wire structures ---- */

/// Parameters for every command; each command reads the fields it needs.
///
/// The extension has sent both `path` and `Path` style keys over time, so the
/// capitalised spelling is accepted as an alias.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandParams {
    #[serde(alias = "Path", deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(alias = "Title", deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(alias = "Role", deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(alias = "FileName", deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(alias = "DefaultExtension", deserialize_with = "null_as_default")]
    pub default_extension: String,
    #[serde(alias = "DisplayName", deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(alias = "Pattern", deserialize_with = "null_as_default")]
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Request {
    #[serde(deserialize_with = "null_as_default")]
    pub command: String,
    #[serde(deserialize_with = "null_as_default")]
    pub params: CommandParams,
    #[serde(deserialize_with = "null_as_default")]
    pub logging: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub debug: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub log_rotation_count: i64,
    /// Hours.
    #[serde(deserialize_with = "null_as_default")]
    pub log_rotation_time: i64,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            command: String::new(),
            params: CommandParams::default(),
            logging: false,
            debug: false,
            log_rotation_count: 7,
            log_rotation_time: 24,
        }
    }
}

/// An explicit JSON `null` reads as the type's zero value, the same as an
/// absent key would for a zero-defaulted field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/* ---- Direct-mode parameter loading ---- */

/// Build parameters for direct invocation.
///
/// `--params-file` entries are loaded first; keys from the inline `--params`
/// JSON override them. Returns `None` when neither source was given.
pub fn params_from_cli(inline: Option<&str>, file: Option<&Path>) -> Result<Option<CommandParams>> {
    if inline.is_none() && file.is_none() {
        return Ok(None);
    }

    let mut merged = serde_json::Map::new();
    if let Some(path) = file {
        merge_object(&mut merged, load_param_file(path)?)?;
    }
    if let Some(raw) = inline {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("failed to parse --params as JSON")?;
        merge_object(&mut merged, value)?;
    }

    let params = serde_json::from_value(serde_json::Value::Object(merged))
        .context("parameters do not match the expected shape")?;
    Ok(Some(params))
}

fn load_param_file(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {}", path.display()))?;
    let lower = path.to_string_lossy().to_ascii_lowercase();

    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml).context("failed to convert YAML to JSON")
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")
    }
}

/// Insert `value`'s entries into `into`, later calls overriding earlier ones.
/// Keys are normalised to camelCase and non-string scalars are stringified.
fn merge_object(into: &mut serde_json::Map<String, serde_json::Value>, value: serde_json::Value) -> Result<()> {
    let serde_json::Value::Object(obj) = value else {
        anyhow::bail!("parameters must be a JSON object");
    };
    for (k, v) in obj {
        let v = match v {
            serde_json::Value::String(_) => v,
            serde_json::Value::Null => continue,
            other => serde_json::Value::String(other.to_string()),
        };
        into.insert(camel_key(&k), v);
    }
    Ok(())
}

fn camel_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_names_are_exact() {
        assert_eq!(Command::from_name("fetch"), Some(Command::Fetch));
        assert_eq!(Command::from_name("choose-file"), Some(Command::ChooseFile));
        assert_eq!(
            Command::from_name("outlook-gpo-configs"),
            Some(Command::OutlookGpoConfigs)
        );
        assert_eq!(Command::from_name("FETCH"), None);
        assert_eq!(Command::from_name(""), None);
        assert_eq!(Command::from_name("ping"), None);
    }

    #[test]
    fn display_round_trips_name() {
        for c in Command::variants() {
            assert_eq!(Command::from_name(&c.to_string()), Some(*c));
        }
    }

    #[test]
    fn request_defaults() {
        let req: Request = serde_json::from_value(json!({"command": "fetch"})).unwrap();
        assert_eq!(req.command, "fetch");
        assert!(!req.logging);
        assert!(!req.debug);
        assert_eq!(req.log_rotation_count, 7);
        assert_eq!(req.log_rotation_time, 24);
        assert_eq!(req.params, CommandParams::default());
    }

    #[test]
    fn request_full() {
        let req: Request = serde_json::from_value(json!({
            "command": "choose-file",
            "logging": true,
            "debug": true,
            "logRotationCount": 3,
            "logRotationTime": 1,
            "params": {
                "title": "Pick",
                "role": "rules",
                "fileName": "a.txt",
                "defaultExtension": ".txt",
                "displayName": "Text",
                "pattern": "*.txt"
            }
        }))
        .unwrap();
        assert!(req.logging && req.debug);
        assert_eq!(req.log_rotation_count, 3);
        assert_eq!(req.log_rotation_time, 1);
        assert_eq!(req.params.file_name, "a.txt");
        assert_eq!(req.params.default_extension, ".txt");
        assert_eq!(req.params.display_name, "Text");
        assert_eq!(req.params.pattern, "*.txt");
    }

    #[test]
    fn capitalised_param_keys_accepted() {
        let params: CommandParams =
            serde_json::from_value(json!({"Path": "/tmp/x", "FileName": "y"})).unwrap();
        assert_eq!(params.path, "/tmp/x");
        assert_eq!(params.file_name, "y");
    }

    #[test]
    fn null_fields_read_as_zero_values() {
        let req: Request = serde_json::from_value(json!({
            "command": null,
            "params": null,
            "logging": null,
            "debug": null,
            "logRotationCount": null,
            "logRotationTime": null
        }))
        .unwrap();
        assert_eq!(req.command, "");
        assert_eq!(req.params, CommandParams::default());
        assert!(!req.logging && !req.debug);
        assert_eq!(req.log_rotation_count, 0);
        assert_eq!(req.log_rotation_time, 0);

        let params: CommandParams =
            serde_json::from_value(json!({"path": null, "Title": "Pick"})).unwrap();
        assert_eq!(params.path, "");
        assert_eq!(params.title, "Pick");
    }

    #[test]
    fn unknown_fields_ignored() {
        let req: Request =
            serde_json::from_value(json!({"command": "x", "extra": [1, 2]})).unwrap();
        assert_eq!(req.command, "x");
    }

    #[test]
    fn cli_params_absent() {
        assert!(params_from_cli(None, None).unwrap().is_none());
    }

    #[test]
    fn cli_params_inline() {
        let params = params_from_cli(Some(r#"{"Path":"/etc/hosts"}"#), None)
            .unwrap()
            .unwrap();
        assert_eq!(params.path, "/etc/hosts");
    }

    #[test]
    fn cli_params_rejects_non_object() {
        let err = params_from_cli(Some("[1,2]"), None).unwrap_err();
        assert!(err.to_string().contains("JSON object"), "{err:#}");
        assert!(params_from_cli(Some("{not json"), None).is_err());
    }

    #[test]
    fn cli_params_file_yaml_with_inline_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "Title: From file\npath: /from/file\npattern: 42\n").unwrap();

        let params = params_from_cli(Some(r#"{"path":"/from/cli"}"#), Some(&path))
            .unwrap()
            .unwrap();
        assert_eq!(params.path, "/from/cli");
        assert_eq!(params.title, "From file");
        assert_eq!(params.pattern, "42");
    }

    #[test]
    fn cli_params_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "displayName": "Text", "pattern": "*.txt" }"#).unwrap();
        let params = params_from_cli(None, Some(&path)).unwrap().unwrap();
        assert_eq!(params.display_name, "Text");
        assert_eq!(params.pattern, "*.txt");
    }

    #[test]
    fn cli_params_file_missing() {
        let err = params_from_cli(None, Some(Path::new("/nonexistent/params.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to read param file"));
    }
}
