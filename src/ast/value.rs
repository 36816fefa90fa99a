use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;

/// Runtime value types used during evaluation.
///
/// Mirrors what a form can hold: text inputs produce strings, number inputs
/// produce numbers, checkboxes booleans, multi-selects and repeatable groups
/// arrays. `Undefined` is what a missing variable resolves to.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// JSON-Logic truthiness: `undefined`, `null`, `false`, `0`, `NaN`, `""` and `[]` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// A value is blank when a user has not provided anything for it yet.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Loose numeric coercion used by ordering comparisons and `min`/`max`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) | Value::Null => 0.0,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Undefined | Value::Array(_) | Value::Object(_) => f64::NAN,
        }
    }

    /// Textual form of scalar values, used for length and pattern checks.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(_) => Some(self.to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Descends one path segment into an array (numeric index) or object (key).
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(segment),
            _ => None,
        }
    }

    /// Follows `segments` from this value. Anything missing is `Undefined`.
    pub fn descend(&self, segments: &[String]) -> Value {
        let mut current = self;
        for segment in segments {
            match current.child(segment) {
                Some(next) => current = next,
                None => return Value::Undefined,
            }
        }
        current.clone()
    }

    /// Writes `value` at `segments` below this value, creating missing objects
    /// on the way. An array index may address an existing row or append one
    /// right after the last. Returns `false` when the path cannot be written.
    pub fn set_path(&mut self, segments: &[String], value: Value) -> bool {
        let Some((segment, rest)) = segments.split_first() else {
            *self = value;
            return true;
        };
        let slot = match self {
            Value::Array(items) => {
                let Ok(index) = segment.parse::<usize>() else {
                    return false;
                };
                if index == items.len() {
                    items.push(Value::Object(BTreeMap::new()));
                }
                match items.get_mut(index) {
                    Some(slot) => slot,
                    None => return false,
                }
            }
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(BTreeMap::new())),
            _ => return false,
        };
        slot.set_path(rest, value)
    }

    /// Converts into JSON for payloads. `Undefined` becomes `null`; integral
    /// numbers become JSON integers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Object(map) => write!(
                f,
                "{{{}}}",
                map.iter().map(|(k, v)| format!("{}: {}", k, v)).join(", ")
            ),
        }
    }
}

/// A dotted/bracketed reference into the environment, pre-split into segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariablePath {
    raw: String,
    segments: Vec<String>,
}

impl VariablePath {
    /// Parses `"a.0.b"` and `"a[0].b"` into `["a", "0", "b"]`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.replace('[', ".").replace(']', "");
        let segments = normalized
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The top-level field a path points into.
    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_and_dotted_paths_agree() {
        assert_eq!(
            VariablePath::parse("a[0].b").segments(),
            VariablePath::parse("a.0.b").segments()
        );
        assert_eq!(VariablePath::parse("a.0.b").root(), "a");
    }

    #[test]
    fn integral_numbers_become_json_integers() {
        assert_eq!(Value::Number(18.0).to_json(), serde_json::json!(18));
        assert_eq!(Value::Number(1.5).to_json(), serde_json::json!(1.5));
    }

    #[test]
    fn zero_is_not_blank_but_empty_string_is() {
        assert!(!Value::Number(0.0).is_blank());
        assert!(!Value::from("0").is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::Array(vec![]).is_blank());
    }

    #[test]
    fn set_path_writes_into_rows() {
        let segments = |raw: &str| VariablePath::parse(raw).segments().to_vec();
        let mut rows = Value::Array(vec![]);
        assert!(rows.set_path(&segments("0.name"), Value::from("Acme")));
        assert!(rows.set_path(&segments("0.current"), Value::Bool(true)));
        assert_eq!(rows.descend(&segments("0.name")), Value::from("Acme"));
        assert!(!rows.set_path(&segments("3.name"), Value::from("Gap")));
        assert!(!Value::from("text").set_path(&segments("name"), Value::Null));
    }
}
