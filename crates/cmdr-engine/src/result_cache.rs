//! Result cache keys and lookups
//!
//! A cached result is addressed by the command name, the function name,
//! the call's arguments and the run's canonical parameters, so a command
//! re-run with the same parameters reuses what it computed before.

use cmdr_core::errors::{CommandError, Result};
use cmdr_core::params::{canonical_json, ParamMap};
use cmdr_store::CacheStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Composite key `"{command}{function}({args}){parameters}"`
///
/// Array arguments (tuples included) are rendered without their brackets
/// and unit `()` renders as nothing, so `download(&())` keys as
/// `download()`.
pub fn cache_key(command: &str, function: &str, args: &Value, parameters: &ParamMap) -> String {
    let rendered_args = match args {
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    };
    format!(
        "{}{}({}){}",
        command,
        function,
        rendered_args,
        canonical_json(parameters)
    )
}

/// Cache namespace of a command; test runs are kept apart
pub fn cache_namespace(command: &str, test: bool) -> String {
    if test {
        format!("{}/test", command)
    } else {
        command.to_string()
    }
}

/// Read-through lookup against a cache store
///
/// On a hit the payload must deserialize into `T`, otherwise the entry is
/// stale and `ShapeMismatch` is raised. On a miss, or when `refresh` is set,
/// `compute` runs and its result is stored.
pub fn read_through<T, F>(
    store: &dyn CacheStore,
    namespace: &str,
    key: &str,
    function: &str,
    refresh: bool,
    compute: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    if !refresh {
        if let Some(bytes) = store.read(namespace, key)? {
            tracing::debug!(namespace, function, "cache hit");
            return serde_json::from_slice(&bytes).map_err(|e| {
                CommandError::ShapeMismatch {
                    function: function.to_string(),
                    reason: e.to_string(),
                }
                .into()
            });
        }
    }

    let value = compute()?;
    store.write(namespace, key, &serde_json::to_vec(&value)?)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdr_core::CmdErrorKind;
    use cmdr_store::FsCache;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_format() {
        let mut parameters = ParamMap::new();
        assert_eq!(
            cache_key("load_parents", "download", &Value::Null, &parameters),
            "load_parentsdownload(){}"
        );

        parameters.insert("year".to_string(), json!(2019));
        assert_eq!(
            cache_key("load_parents", "download", &json!(["bob"]), &parameters),
            r#"load_parentsdownload("bob"){"year":2019}"#
        );
        assert_eq!(
            cache_key("c", "f", &json!({"page": 2}), &ParamMap::new()),
            r#"cf({"page":2}){}"#
        );
    }

    #[test]
    fn test_namespace() {
        assert_eq!(cache_namespace("load_parents", false), "load_parents");
        assert_eq!(cache_namespace("load_parents", true), "load_parents/test");
    }

    #[test]
    fn test_read_through_computes_once() {
        let dir = TempDir::new().unwrap();
        let store = FsCache::new(dir.path());
        let mut calls = 0;

        for _ in 0..3 {
            let value: Vec<String> = read_through(&store, "c", "k", "download", false, || {
                calls += 1;
                Ok(vec!["bob".to_string()])
            })
            .unwrap();
            assert_eq!(value, vec!["bob"]);
        }
        assert_eq!(calls, 1);

        let _: Vec<String> =
            read_through(&store, "c", "k", "download", true, || {
                calls += 1;
                Ok(vec!["shelly".to_string()])
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_stale_payload_is_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = FsCache::new(dir.path());
        store.write("c", "k", br#"{"old":"shape"}"#).unwrap();

        let err = read_through::<Vec<String>, _>(&store, "c", "k", "download", false, || {
            Ok(Vec::new())
        })
        .unwrap_err();
        assert_eq!(err.kind(), CmdErrorKind::ShapeMismatch);
    }
}
