//! Specification document loading.
//!
//! A document has one root object:
//!
//! ```json
//! {
//!   "describe": {
//!     "text": "Login",
//!     "url": "/login",
//!     "before": ["../hooks/sign-up.json"],
//!     "valid credentials": { "actions": [ { "click": "#submit" } ] }
//!   }
//! }
//! ```
//!
//! Every key other than `text`, `url` and `before` is a case. `before`
//! documents are loaded depth-first and their cases are prepended to every
//! case of the referencing document.

use crate::result::{JsonwrightError, JsonwrightResult};
use crate::schema::Case;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Keys of `describe` that are not cases
pub const RESERVED_KEYS: &[&str] = &["text", "url", "before"];

/// A case together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct CaseEntry {
    /// Key under `describe`
    pub key: String,
    /// Display title
    pub title: String,
    /// Parsed case
    pub case: Case,
    /// Directory of the defining document
    pub base_dir: PathBuf,
    /// `describe.url` of the defining document
    pub suite_url: Option<String>,
    /// Defining document
    pub source: PathBuf,
}

/// One loaded document
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    /// Document path
    pub path: PathBuf,
    /// Suite title
    pub title: String,
    /// Suite-level navigation target
    pub url: Option<String>,
    /// Cases from `before` documents, in execution order
    pub before: Vec<CaseEntry>,
    /// Cases of this document
    pub cases: Vec<CaseEntry>,
}

impl Suite {
    /// Whether the document defines no cases of its own
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Parsed `describe` block before `before` expansion
struct Document {
    title: Option<String>,
    url: Option<String>,
    before: Vec<PathBuf>,
    cases: Vec<CaseEntry>,
}

fn invalid(path: &Path, message: impl Into<String>) -> JsonwrightError {
    JsonwrightError::InvalidDocument {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_before(path: &Path, dir: &Path, value: Option<&Value>) -> JsonwrightResult<Vec<PathBuf>> {
    let raw: Vec<&str> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| invalid(path, "'before' entries must be strings"))
            })
            .collect::<JsonwrightResult<_>>()?,
        Some(_) => return Err(invalid(path, "'before' must be a string or a list of strings")),
    };
    Ok(raw
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let p = Path::new(s);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                dir.join(p)
            }
        })
        .collect())
}

fn read_document(path: &Path) -> JsonwrightResult<Document> {
    let content = std::fs::read_to_string(path)?;
    let root: Value =
        serde_json::from_str(&content).map_err(|e| invalid(path, format!("not valid JSON: {e}")))?;
    let describe: &Map<String, Value> = root
        .get("describe")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid(path, "expected { \"describe\": { ... } }"))?;

    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let url = describe.get("url").and_then(Value::as_str).map(str::to_string);
    let before = parse_before(path, &dir, describe.get("before"))?;

    let mut cases = Vec::new();
    for (key, value) in describe {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if !value.is_object() {
            return Err(invalid(path, format!("case '{key}' must be an object")));
        }
        let case = Case::from_value(value.clone())
            .map_err(|e| invalid(path, format!("case '{key}': {e}")))?;
        let title = case
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| format!("Tests in feature {key}"), str::to_string);
        cases.push(CaseEntry {
            key: key.clone(),
            title,
            case,
            base_dir: dir.clone(),
            suite_url: url.clone(),
            source: path.to_path_buf(),
        });
    }

    Ok(Document {
        title: non_blank(describe.get("text")),
        url,
        before,
        cases,
    })
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Loads documents and numbers untitled suites
#[derive(Debug)]
pub struct SpecLoader {
    counter: AtomicUsize,
}

impl Default for SpecLoader {
    fn default() -> Self {
        Self {
            counter: AtomicUsize::new(1),
        }
    }
}

impl SpecLoader {
    /// Create a loader; untitled suites are numbered from 1
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `*.json` documents under `dir`, recursively, sorted by file name
    pub fn discover(dir: &Path) -> JsonwrightResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(JsonwrightError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
        debug!(dir = %dir.display(), files = files.len(), "discovered documents");
        Ok(files)
    }

    /// Load one document with its `before` chain expanded
    pub fn load(&self, path: &Path) -> JsonwrightResult<Suite> {
        let doc = read_document(path)?;
        let title = doc.title.clone().unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            format!("All Tests {n:02}")
        });

        let mut stack = vec![canonical(path)];
        let mut before = Vec::new();
        for reference in &doc.before {
            before.extend(collect_before(reference, &mut stack)?);
        }

        info!(
            path = %path.display(),
            title = %title,
            cases = doc.cases.len(),
            before = before.len(),
            "loaded document"
        );
        Ok(Suite {
            path: path.to_path_buf(),
            title,
            url: doc.url,
            before,
            cases: doc.cases,
        })
    }

    /// Load every document in `paths`, keeping per-document failures
    pub fn load_all(&self, paths: &[PathBuf]) -> Vec<(PathBuf, JsonwrightResult<Suite>)> {
        paths.iter().map(|p| (p.clone(), self.load(p))).collect()
    }
}

/// Cases of `path` preceded by its own `before` chain.
///
/// `stack` holds the documents currently being expanded; the same document
/// may appear twice in a chain as long as it does not reference itself.
fn collect_before(path: &Path, stack: &mut Vec<PathBuf>) -> JsonwrightResult<Vec<CaseEntry>> {
    if !path.is_file() {
        return Err(JsonwrightError::BeforeNotFound {
            path: path.to_path_buf(),
        });
    }
    let key = canonical(path);
    if stack.contains(&key) {
        return Err(JsonwrightError::BeforeCycle {
            path: path.to_path_buf(),
        });
    }
    stack.push(key);

    let doc = read_document(path)?;
    let mut entries = Vec::new();
    for reference in &doc.before {
        entries.extend(collect_before(reference, stack)?);
    }
    entries.extend(doc.cases);

    stack.pop();
    Ok(entries)
}

/// Distinct documents a suite depends on, for diagnostics
#[must_use]
pub fn before_sources(suite: &Suite) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    suite
        .before
        .iter()
        .filter(|e| seen.insert(e.source.clone()))
        .map(|e| e.source.clone())
        .collect()
}
