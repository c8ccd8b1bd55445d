use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DataError;

/// What a category level renders as when its key path does not resolve, or
/// resolves to a JSON `null`.  Every entry still gets a category string this
/// way, so sibling grouping stays well-defined.
pub const ABSENT_CATEGORY: &str = "(missing)";

/// Separator between the values of a multi-key category level, and between
/// the ancestor categories that make up an interior node id.
pub const CATEGORY_SEPARATOR: &str = ":";

/// Result of resolving a `KeyPath` against a tree-shaped value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lookup<'a> {
    Present(&'a Value),
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Present(v) => Some(v),
            Lookup::Absent => None,
        }
    }

    pub fn as_str(self) -> Option<&'a str> {
        self.value().and_then(Value::as_str)
    }

    /// Numeric values of an array, skipping anything that isn't a number.
    /// A bare number counts as a one element array.
    pub fn numbers(self) -> Vec<f64> {
        match self.value() {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_f64).collect(),
            Some(Value::Number(n)) => n.as_f64().into_iter().collect(),
            _ => vec![],
        }
    }

    /// Numeric values of an array by position, with `None` where an item
    /// isn't a number.  A bare number counts as a one element array.
    pub fn column(self) -> Vec<Option<f64>> {
        match self.value() {
            Some(Value::Array(items)) => items.iter().map(Value::as_f64).collect(),
            Some(Value::Number(n)) => vec![n.as_f64()],
            _ => vec![],
        }
    }

    /// Render the looked-up value as a category string.
    pub fn category_string(self) -> String {
        match self {
            Lookup::Present(Value::Null) | Lookup::Absent => ABSENT_CATEGORY.to_string(),
            Lookup::Present(v) => render_scalar(v),
        }
    }
}

impl<'a> From<Option<&'a Value>> for Lookup<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        match value {
            Some(v) => Lookup::Present(v),
            None => Lookup::Absent,
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => ABSENT_CATEGORY.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<String>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// A validated sequence of field selectors.  Each selector names an object
/// member, or, when the current value is an array, an index into it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    pub fn new<S: AsRef<str>>(segments: &[S]) -> Result<KeyPath, DataError> {
        KeyPath::try_from(
            segments
                .iter()
                .map(|s| s.as_ref().to_string())
                .collect::<Vec<String>>(),
        )
    }

    /// Key path from segments written in the source, which are known to be
    /// non-empty.
    pub(crate) fn literal(segments: &[&'static str]) -> KeyPath {
        debug_assert!(!segments.is_empty() && segments.iter().all(|s| !s.is_empty()));
        KeyPath {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse a `/`-delimited path like `sample/angle_x`.
    pub fn parse(path: &str) -> Result<KeyPath, DataError> {
        KeyPath::try_from(path.split('/').map(str::to_string).collect::<Vec<_>>())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn resolve<'a>(&self, root: &'a Value) -> Lookup<'a> {
        let mut cur = root;
        for segment in &self.segments {
            let next = match cur {
                Value::Object(obj) => obj.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) => cur = v,
                None => return Lookup::Absent,
            }
        }
        Lookup::Present(cur)
    }
}

impl TryFrom<Vec<String>> for KeyPath {
    type Error = DataError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        if segments.is_empty() {
            return Err(DataError::InvalidKeyPath(segments, "no segments"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DataError::InvalidKeyPath(segments, "empty segment"));
        }
        Ok(KeyPath { segments })
    }
}

impl From<KeyPath> for Vec<String> {
    fn from(path: KeyPath) -> Self {
        path.segments
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// One tree level: the values of each key path, joined with `:`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryDef {
    pub key_paths: Vec<KeyPath>,
}

impl CategoryDef {
    pub fn single(path: KeyPath) -> Self {
        CategoryDef {
            key_paths: vec![path],
        }
    }

    pub fn category_string(&self, fields: &Value) -> String {
        self.key_paths
            .iter()
            .map(|kp| kp.resolve(fields).category_string())
            .collect::<Vec<String>>()
            .join(CATEGORY_SEPARATOR)
    }
}

/// The ordered levels of a category tree.  The final level labels leaves;
/// all earlier levels become interior nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CategoryDef>", into = "Vec<CategoryDef>")]
pub struct CategoryKeyList {
    levels: Vec<CategoryDef>,
}

impl CategoryKeyList {
    pub fn new(levels: Vec<CategoryDef>) -> Result<Self, DataError> {
        if levels.is_empty() {
            return Err(DataError::EmptyCategories);
        }
        Ok(CategoryKeyList { levels })
    }

    /// Convenience for the common one-key-path-per-level case, with each
    /// path written `a/b/c`.
    pub fn from_paths(paths: &[&str]) -> Result<Self, DataError> {
        let levels = paths
            .iter()
            .map(|p| KeyPath::parse(p).map(CategoryDef::single))
            .collect::<Result<Vec<_>, _>>()?;
        CategoryKeyList::new(levels)
    }

    /// Levels written in the source, one literal key path each.
    pub(crate) fn literal(paths: &[&[&'static str]]) -> Self {
        debug_assert!(!paths.is_empty());
        CategoryKeyList {
            levels: paths
                .iter()
                .map(|segments| CategoryDef::single(KeyPath::literal(segments)))
                .collect(),
        }
    }

    pub fn levels(&self) -> &[CategoryDef] {
        &self.levels
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Category strings for every level, in level order.
    pub fn categorize(&self, fields: &Value) -> Vec<String> {
        self.levels
            .iter()
            .map(|level| level.category_string(fields))
            .collect()
    }
}

impl TryFrom<Vec<CategoryDef>> for CategoryKeyList {
    type Error = DataError;

    fn try_from(levels: Vec<CategoryDef>) -> Result<Self, Self::Error> {
        CategoryKeyList::new(levels)
    }
}

impl From<CategoryKeyList> for Vec<CategoryDef> {
    fn from(list: CategoryKeyList) -> Self {
        list.levels
    }
}
