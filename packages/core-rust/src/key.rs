//! Canonical match keys and property inspection for the keyed dispatcher.
//!
//! Route keys and request values are both reduced to a canonical string
//! before comparison, so a table may declare numeric, boolean or string keys
//! and still match values of another scalar type with the same string form:
//!
//! | value            | canonical key |
//! |------------------|---------------|
//! | `"domestic"`     | `domestic`    |
//! | `true`           | `true`        |
//! | `1`, `1.0`       | `1`           |
//! | `-0.0`           | `0`           |
//! | `1.5`            | `1.5`         |
//! | `NaN`, `±inf`    | `NaN`, `Infinity`, `-Infinity` |
//! | `null`           | `null`        |
//!
//! Bytes, arrays and records have no canonical form and never match.

use std::fmt;

use crate::types::Value;

/// Canonical string form of a route key or a request property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Key for a null property value.
    #[must_use]
    pub fn null() -> Self {
        Key("null".to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key(b.to_string())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key(i.to_string())
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key(i.to_string())
    }
}

impl From<u32> for Key {
    fn from(i: u32) -> Self {
        Key(i.to_string())
    }
}

impl From<u64> for Key {
    fn from(i: u64) -> Self {
        Key(i.to_string())
    }
}

impl From<f64> for Key {
    fn from(f: f64) -> Self {
        Key(canonical_float(f))
    }
}

#[allow(clippy::float_cmp)]
fn canonical_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_owned()
    } else if f == f64::INFINITY {
        "Infinity".to_owned()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else if f == 0.0 {
        "0".to_owned()
    } else if f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

// ---------------------------------------------------------------------------
// Inspect
// ---------------------------------------------------------------------------

/// Read access to the named properties of a dispatch request.
///
/// Returns `None` when the property is absent or has no canonical form;
/// the dispatcher treats both as a miss.
pub trait Inspect {
    fn property_key(&self, property: &str) -> Option<Key>;
}

impl Inspect for Value {
    fn property_key(&self, property: &str) -> Option<Key> {
        self.get(property).and_then(Value::key)
    }
}

impl Inspect for serde_json::Value {
    fn property_key(&self, property: &str) -> Option<Key> {
        match self.get(property)? {
            serde_json::Value::Null => Some(Key::null()),
            serde_json::Value::Bool(b) => Some(Key::from(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Key::from(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Key::from(u))
                } else {
                    n.as_f64().map(Key::from)
                }
            }
            serde_json::Value::String(s) => Some(Key::from(s.as_str())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}
