//! Function bag invoked by `run`.
//!
//! A bag maps names to zero-argument functions returning JSON. Library users
//! register closures on a [`FunctionRegistry`]; the CLI loads one from a
//! YAML or JSON file:
//!
//! ```yaml
//! token:
//!   value: "abc123"
//! user:
//!   command: ./scripts/make-user.sh
//!   args: ["--role", "admin"]
//! ```
//!
//! Command stdout is parsed as JSON when possible, else used as trimmed text.

use crate::result::{JsonwrightError, JsonwrightResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default bag locations, relative to the project root
pub const DEFAULT_FUNCTION_FILES: &[&str] = &[
    "help/plugin-func.yaml",
    "help/plugin-func.yml",
    "help/plugin-func.json",
];

/// Named functions available to `run`
#[async_trait]
pub trait FunctionBag: Send + Sync {
    /// Whether `name` is defined
    fn has(&self, name: &str) -> bool;

    /// Defined names, sorted
    fn names(&self) -> Vec<String>;

    /// Invoke `name`
    async fn call(&self, name: &str) -> JsonwrightResult<Value>;
}

type SyncFn = Arc<dyn Fn() -> JsonwrightResult<Value> + Send + Sync>;
type AsyncFn = Arc<dyn Fn() -> BoxFuture<'static, JsonwrightResult<Value>> + Send + Sync>;

#[derive(Clone)]
enum Function {
    Value(Value),
    Sync(SyncFn),
    Async(AsyncFn),
    Command {
        program: String,
        args: Vec<String>,
        cwd: Option<PathBuf>,
    },
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Sync(_) => f.write_str("Sync(..)"),
            Self::Async(_) => f.write_str("Async(..)"),
            Self::Command { program, args, .. } => f
                .debug_struct("Command")
                .field("program", program)
                .field("args", args)
                .finish(),
        }
    }
}

/// One entry of a bag file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionEntry {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
}

/// In-memory function bag
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Function>,
    source: Option<PathBuf>,
}

impl FunctionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constant
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.functions
            .insert(name.into(), Function::Value(value.into()));
        self
    }

    /// Register a synchronous function
    #[must_use]
    pub fn with_sync<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> JsonwrightResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Function::Sync(Arc::new(f)));
        self
    }

    /// Register an asynchronous function
    #[must_use]
    pub fn with_async<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = JsonwrightResult<Value>> + Send + 'static,
    {
        let boxed: AsyncFn = Arc::new(move || Box::pin(f()));
        self.functions.insert(name.into(), Function::Async(boxed));
        self
    }

    /// Register an external command
    #[must_use]
    pub fn with_command(
        mut self,
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        self.functions.insert(
            name.into(),
            Function::Command {
                program: program.into(),
                args,
                cwd: None,
            },
        );
        self
    }

    /// Number of functions
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// File the registry was loaded from
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Parse a bag file; `.json` is read as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> JsonwrightResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let entries: BTreeMap<String, FunctionEntry> = if is_json {
            serde_json::from_str(&content).map_err(|e| JsonwrightError::FunctionBag {
                message: format!("{}: {e}", path.display()),
            })?
        } else {
            serde_yaml_ng::from_str(&content).map_err(|e| JsonwrightError::FunctionBag {
                message: format!("{}: {e}", path.display()),
            })?
        };

        let cwd = path.parent().map(Path::to_path_buf);
        let mut registry = Self::new();
        for (name, entry) in entries {
            let function = match (entry.value, entry.command) {
                (Some(value), None) => Function::Value(value),
                (None, Some(program)) => Function::Command {
                    program,
                    args: entry.args,
                    cwd: cwd.clone(),
                },
                _ => {
                    return Err(JsonwrightError::FunctionBag {
                        message: format!(
                            "{}: '{name}' needs exactly one of 'value' or 'command'",
                            path.display()
                        ),
                    })
                }
            };
            registry.functions.insert(name, function);
        }
        registry.source = Some(path.to_path_buf());
        info!(path = %path.display(), functions = registry.len(), "loaded function bag");
        Ok(registry)
    }

    /// Locate and load a bag.
    ///
    /// An explicit path wins; a missing explicit file is logged and yields
    /// `None`, as does finding none of the default locations.
    pub fn discover(project_root: &Path, explicit: Option<&Path>) -> JsonwrightResult<Option<Self>> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_root.join(path)
            };
            if !path.is_file() {
                warn!(path = %path.display(), "function bag file not found");
                return Ok(None);
            }
            return Self::from_file(&path).map(Some);
        }
        for candidate in DEFAULT_FUNCTION_FILES {
            let path = project_root.join(candidate);
            if path.is_file() {
                return Self::from_file(&path).map(Some);
            }
        }
        debug!(root = %project_root.display(), "no function bag found");
        Ok(None)
    }
}

async fn run_command(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> JsonwrightResult<Value> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().await.map_err(|e| JsonwrightError::FunctionBag {
        message: format!("failed to start '{program}': {e}"),
    })?;
    if !output.status.success() {
        return Err(JsonwrightError::FunctionBag {
            message: format!(
                "'{program}' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    Ok(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}

#[async_trait]
impl FunctionBag for FunctionRegistry {
    fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    async fn call(&self, name: &str) -> JsonwrightResult<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| JsonwrightError::UnknownFunction {
                name: name.to_string(),
            })?;
        debug!(function = name, "calling function");
        match function {
            Function::Value(v) => Ok(v.clone()),
            Function::Sync(f) => f(),
            Function::Async(f) => f().await,
            Function::Command { program, args, cwd } => {
                run_command(program, args, cwd.as_deref()).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    mod registry_tests {
        use super::*;

        #[tokio::test]
        async fn test_sync_async_and_values() {
            let bag = FunctionRegistry::new()
                .with_value("token", "abc")
                .with_sync("user", || Ok(json!({"email": "a@b.com"})))
                .with_async("later", || async { Ok(json!(42)) });
            assert_eq!(bag.names(), vec!["later", "token", "user"]);
            assert_eq!(bag.call("token").await.unwrap(), json!("abc"));
            assert_eq!(bag.call("user").await.unwrap()["email"], "a@b.com");
            assert_eq!(bag.call("later").await.unwrap(), json!(42));
        }

        #[tokio::test]
        async fn test_unknown_function() {
            let err = FunctionRegistry::new().call("nope").await.unwrap_err();
            assert!(matches!(err, JsonwrightError::UnknownFunction { .. }));
            assert!(err.is_config());
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_yaml_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bag.yaml");
            std::fs::write(&path, "token:\n  value: abc\nuser:\n  value: {email: a@b.com}\n").unwrap();
            let bag = FunctionRegistry::from_file(&path).unwrap();
            assert_eq!(bag.len(), 2);
            assert_eq!(bag.source(), Some(path.as_path()));
        }

        #[test]
        fn test_entry_needs_value_or_command() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bag.json");
            std::fs::write(&path, r#"{"broken": {"args": ["x"]}}"#).unwrap();
            let err = FunctionRegistry::from_file(&path).unwrap_err();
            assert!(err.to_string().contains("'broken'"));
        }

        #[test]
        fn test_discover_default_locations() {
            let dir = tempfile::tempdir().unwrap();
            assert!(FunctionRegistry::discover(dir.path(), None).unwrap().is_none());
            std::fs::create_dir_all(dir.path().join("help")).unwrap();
            std::fs::write(
                dir.path().join("help/plugin-func.json"),
                r#"{"token": {"value": 1}}"#,
            )
            .unwrap();
            let bag = FunctionRegistry::discover(dir.path(), None).unwrap().unwrap();
            assert!(bag.has("token"));
        }

        #[test]
        fn test_missing_explicit_path_is_tolerated() {
            let dir = tempfile::tempdir().unwrap();
            let found = FunctionRegistry::discover(dir.path(), Some(Path::new("nope.yaml"))).unwrap();
            assert!(found.is_none());
        }

        #[cfg(unix)]
        #[tokio::test]
        async fn test_command_output_parsed_as_json() {
            let bag = FunctionRegistry::new()
                .with_command("json", "echo", vec![r#"{"id": 7}"#.to_string()])
                .with_command("text", "echo", vec!["  plain  ".to_string()]);
            assert_eq!(bag.call("json").await.unwrap(), json!({"id": 7}));
            assert_eq!(bag.call("text").await.unwrap(), json!("plain"));
        }
    }
}
