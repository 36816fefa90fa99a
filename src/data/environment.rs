use crate::ast::{Value, VariablePath};
use crate::error::ConfigError;
use ahash::AHashMap;
use std::fs;

/// The flat snapshot of all form values a rule is evaluated against.
///
/// Keys are field names; array and group fields hold nested values that rules
/// address with dotted paths (`"employers.0.name"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: AHashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment from a JSON object. Non-object input yields an empty environment.
    pub fn from_json(json: serde_json::Value) -> Self {
        let values = match json {
            serde_json::Value::Object(map) => {
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
            }
            _ => AHashMap::new(),
        };
        Self { values }
    }

    /// Load a values snapshot from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Ok(Self::from_json(json))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Resolves a variable path. Never fails: anything missing is `Undefined`.
    ///
    /// An exact flat key wins. Otherwise the longest prefix of the path that names
    /// a stored value is located and the remaining segments descend into it.
    pub fn resolve(&self, path: &VariablePath) -> Value {
        if let Some(value) = self.values.get(path.as_str()) {
            return value.clone();
        }
        let segments = path.segments();
        for split in (1..=segments.len()).rev() {
            if let Some(root) = self.values.get(&segments[..split].join(".")) {
                return root.descend(&segments[split..]);
            }
        }
        Value::Undefined
    }

    pub fn resolve_str(&self, path: &str) -> Value {
        self.resolve(&VariablePath::parse(path))
    }

    /// Resolves against one array row first, then against the snapshot. Row
    /// entries shadow form fields of the same name.
    pub fn resolve_in_row(&self, row: &Value, path: &VariablePath) -> Value {
        if let Value::Object(entries) = row {
            if let Some(value) = entries.get(path.as_str()) {
                return value.clone();
            }
            let segments = path.segments();
            for split in (1..=segments.len()).rev() {
                if let Some(root) = entries.get(&segments[..split].join(".")) {
                    return root.descend(&segments[split..]);
                }
            }
        }
        self.resolve(path)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
