//! Configuration is a JSON document whose string fields may reference variables, like
//! `{HOME}/.trckr-db.json`. [load] reads the document, [resolve] fills in the variables that
//! [extensions] provide, and [set_property] changes the document unless it's locked.

pub mod extensions;
pub mod template;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use crate::{
    error::{ConfigError, Result, TrckrError},
    storage::port::{DocumentPort, JsonFile},
};

use extensions::{collect_variables, Extension};
use template::expand;

pub const DEFAULT_CONFIG_PATH: &str = ".trckr.json";

/// Config as it was read, before any variable is filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfig {
    path: PathBuf,
    document: Value,
}

impl RawConfig {
    pub fn new(path: PathBuf, document: Value) -> Self {
        Self { path, document }
    }

    /// Where the config lives, or would live if it doesn't exist yet.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

/// What's used when there is no config file.
pub fn default_document() -> Value {
    json!({
        "database": {
            "type": "struct",
            "data_type": "json",
            "path": "{CONFIG_DIR}/.trckr-db.json",
        },
        "defaults": {
            "userid": "{USER}",
            "contextid": "default",
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Default metadata, `userid`, `contextid` and `note`.
    pub defaults: BTreeMap<String, String>,
    pub database: DatabaseConfig,
    pub locked: bool,
    /// Where the config was read from.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub path: PathBuf,
    /// Take an advisory lock while the store is open.
    pub lock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The whole store as one JSON document.
    StructJson,
}

impl Backend {
    fn from_names(kind: &str, data_type: &str) -> Result<Self, ConfigError> {
        match (kind, data_type) {
            ("struct", "json") => Ok(Backend::StructJson),
            _ => Err(ConfigError::UnsupportedDatabase {
                kind: kind.to_string(),
                data_type: data_type.to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct ConfigLayout {
    database: DatabaseLayout,
    #[serde(default)]
    defaults: BTreeMap<String, Value>,
    #[serde(default)]
    locked: bool,
}

#[derive(Deserialize)]
struct DatabaseLayout {
    #[serde(rename = "type")]
    kind: String,
    data_type: String,
    path: String,
    #[serde(default)]
    lock: bool,
}

/// Reads the config at `path`. A missing file gives [default_document].
#[instrument]
pub async fn load(path: &Path) -> Result<RawConfig> {
    let path = std::path::absolute(path).map_err(|e| TrckrError::io(path, e))?;
    let document = JsonFile::new(&path).read(default_document()).await?;
    Ok(RawConfig::new(path, document))
}

/// Fills in the variables of the database path and of every default. Resolving the same document
/// with the same variables always gives the same result.
pub fn resolve(raw: &RawConfig, extensions: &[Extension]) -> Result<ResolvedConfig> {
    let variables = collect_variables(raw, extensions)?;
    let layout: ConfigLayout =
        serde_json::from_value(raw.document().clone()).map_err(ConfigError::Schema)?;

    let backend = Backend::from_names(&layout.database.kind, &layout.database.data_type)?;
    let path = expand(&layout.database.path, &variables)?;
    if path.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "database.path".into(),
            expected: "a non-empty path",
        }
        .into());
    }

    let defaults = layout
        .defaults
        .into_iter()
        .map(|(field, value)| match value {
            Value::String(template) => expand(&template, &variables).map(|v| (field, v)),
            _ => Err(ConfigError::InvalidField {
                field: format!("defaults.{field}"),
                expected: "a string",
            }),
        })
        .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

    debug!("Resolved database path {path} with defaults {defaults:?}");
    Ok(ResolvedConfig {
        defaults,
        database: DatabaseConfig {
            backend,
            path: PathBuf::from(path),
            lock: layout.database.lock,
        },
        locked: layout.locked,
        path: raw.path().to_path_buf(),
    })
}

/// Sets a dot separated `property` of the config document at `path` and writes the document back.
/// Missing objects along the way are created. Nothing is written when the config is locked.
#[instrument]
pub async fn set_property(path: &Path, property: &str, value: &str) -> Result<()> {
    let file = JsonFile::new(path);
    let mut document = file.read(default_document()).await?;

    if document
        .get("locked")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Err(ConfigError::Locked(path.to_path_buf()).into());
    }

    let segments = property.split('.').collect::<Vec<_>>();
    if segments.iter().any(|v| v.is_empty()) {
        return Err(ConfigError::MalformedProperty(property.to_string()).into());
    }
    insert_into_struct(&mut document, property, &segments, parse_value(value))?;

    file.write(&document).await?;
    info!("Set {property} in {path:?}");
    Ok(())
}

fn insert_into_struct(
    document: &mut Value,
    property: &str,
    segments: &[&str],
    value: Value,
) -> Result<(), ConfigError> {
    let not_a_mapping = |segment: &str| ConfigError::NotAMapping {
        property: property.to_string(),
        segment: segment.to_string(),
    };
    let Some((last, parents)) = segments.split_last() else {
        return Err(ConfigError::MalformedProperty(property.to_string()));
    };

    let mut current = document;
    let mut walked = String::new();
    for segment in parents {
        let Value::Object(map) = current else {
            return Err(not_a_mapping(&walked));
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
    }

    let Value::Object(map) = current else {
        return Err(not_a_mapping(&walked));
    };
    map.insert(last.to_string(), value);
    Ok(())
}

/// Booleans are stored as booleans so that `set locked true` works, everything else is a string.
fn parse_value(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use anyhow::Result;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use crate::{
        error::{ConfigError, TrckrError},
        utils::time::tests::test_clock,
    };

    use super::{
        default_document,
        extensions::{standard_extensions, Extension, Variables},
        load, resolve, set_property, Backend, RawConfig,
    };

    fn fixed_extensions() -> Vec<Extension> {
        vec![
            Extension::new("paths", |raw| {
                Variables::from([(
                    "CONFIG_DIR".into(),
                    raw.path().parent().map(|v| v.display().to_string()),
                )])
            }),
            Extension::new("user", |_| {
                Variables::from([
                    ("USER".into(), Some("me".into())),
                    ("GITBRANCH".into(), None),
                ])
            }),
        ]
    }

    fn raw(document: Value) -> RawConfig {
        RawConfig::new(PathBuf::from("/work/.trckr.json"), document)
    }

    #[test]
    fn test_resolve_default_document() -> Result<()> {
        let config = resolve(&raw(default_document()), &fixed_extensions())?;
        assert_eq!(config.database.path, PathBuf::from("/work/.trckr-db.json"));
        assert_eq!(config.database.backend, Backend::StructJson);
        assert!(!config.database.lock);
        assert!(!config.locked);
        assert_eq!(config.defaults["userid"], "me");
        assert_eq!(config.defaults["contextid"], "default");
        assert_eq!(config.path, PathBuf::from("/work/.trckr.json"));
        Ok(())
    }

    #[test]
    fn test_resolve_is_idempotent() -> Result<()> {
        let raw = raw(default_document());
        assert_eq!(
            resolve(&raw, &fixed_extensions())?,
            resolve(&raw, &fixed_extensions())?
        );
        Ok(())
    }

    #[test]
    fn test_resolve_with_standard_extensions() -> Result<()> {
        let mut document = default_document();
        document["defaults"]["note"] = json!("started {TODAY}");
        let config = resolve(&raw(document), &standard_extensions(Arc::new(test_clock())))?;
        assert_eq!(config.defaults["note"], "started 2024-01-03");
        assert!(!config.defaults["userid"].is_empty());
        assert_eq!(config.database.path, PathBuf::from("/work/.trckr-db.json"));
        Ok(())
    }

    #[test]
    fn test_resolve_failures() {
        let mut unset = default_document();
        unset["defaults"]["contextid"] = json!("{GITBRANCH}");
        assert!(matches!(
            resolve(&raw(unset), &fixed_extensions()),
            Err(TrckrError::Config(ConfigError::UnsetVariable { .. }))
        ));

        let mut undefined = default_document();
        undefined["database"]["path"] = json!("{NOWHERE}/db.json");
        assert!(matches!(
            resolve(&raw(undefined), &fixed_extensions()),
            Err(TrckrError::Config(ConfigError::UndefinedVariable { .. }))
        ));

        let mut numeric = default_document();
        numeric["defaults"]["note"] = json!(3);
        assert!(matches!(
            resolve(&raw(numeric), &fixed_extensions()),
            Err(TrckrError::Config(ConfigError::InvalidField { .. }))
        ));

        let mut empty = default_document();
        empty["database"]["path"] = json!("");
        assert!(matches!(
            resolve(&raw(empty), &fixed_extensions()),
            Err(TrckrError::Config(ConfigError::InvalidField { .. }))
        ));

        let mut sqlite = default_document();
        sqlite["database"]["type"] = json!("sql");
        assert!(matches!(
            resolve(&raw(sqlite), &fixed_extensions()),
            Err(TrckrError::Config(ConfigError::UnsupportedDatabase { .. }))
        ));

        assert!(matches!(
            resolve(&raw(json!({"defaults": {}})), &fixed_extensions()),
            Err(TrckrError::Config(ConfigError::Schema(_)))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_config_uses_default() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".trckr.json");
        let raw = load(&path).await?;
        assert_eq!(raw.document(), &default_document());
        assert_eq!(raw.path(), path);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_creates_intermediate_objects() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".trckr.json");
        set_property(&path, "defaults.contextid", "work").await?;
        set_property(&path, "database.lock", "true").await?;
        set_property(&path, "extra.nested.value", "x").await?;

        let raw = load(&path).await?;
        assert_eq!(raw.document()["defaults"]["contextid"], json!("work"));
        assert_eq!(raw.document()["defaults"]["userid"], json!("{USER}"));
        assert_eq!(raw.document()["database"]["lock"], json!(true));
        assert_eq!(raw.document()["extra"]["nested"]["value"], json!("x"));

        let config = resolve(&raw, &fixed_extensions())?;
        assert!(config.database.lock);
        assert_eq!(config.defaults["contextid"], "work");
        Ok(())
    }

    #[tokio::test]
    async fn test_set_through_scalar_fails() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".trckr.json");
        set_property(&path, "defaults.contextid", "work").await?;
        let before = std::fs::read(&path)?;

        let result = set_property(&path, "defaults.contextid.inner", "x").await;
        assert!(matches!(
            result,
            Err(TrckrError::Config(ConfigError::NotAMapping { segment, .. })) if segment == "defaults.contextid"
        ));
        assert!(matches!(
            set_property(&path, "defaults..note", "x").await,
            Err(TrckrError::Config(ConfigError::MalformedProperty(_)))
        ));
        assert_eq!(std::fs::read(&path)?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_locked_config_is_untouched() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".trckr.json");
        let contents = "{\"locked\": true, \"defaults\": {\"contextid\": \"a\"}}";
        std::fs::write(&path, contents)?;

        let result = set_property(&path, "defaults.contextid", "b").await;
        assert!(matches!(
            result,
            Err(TrckrError::Config(ConfigError::Locked(_)))
        ));
        assert_eq!(std::fs::read_to_string(&path)?, contents);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_locked_then_unlock_fails() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".trckr.json");
        set_property(&path, "locked", "true").await?;
        assert!(matches!(
            set_property(&path, "locked", "false").await,
            Err(TrckrError::Config(ConfigError::Locked(_)))
        ));
        Ok(())
    }
}
