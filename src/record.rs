//! Per-poll record of all decoded inverter fields
//!
//! A [`RawRecord`] is the merged result of one poll: runtime telemetry keys at
//! the top level, plus the optional `_basic` and `_settings` namespaces. The
//! device speaks loosely-typed JSON, so values stay as `serde_json::Value` and
//! every lookup goes through a total, non-panicking path walk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested namespace for device identity/version fields
pub const BASIC_NS: &str = "_basic";

/// Nested namespace for device configuration fields
pub const SETTINGS_NS: &str = "_settings";

/// One segment of a fixed lookup path into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSeg {
    /// Object key
    Key(&'static str),
    /// Array index
    Idx(usize),
}

/// Merged result of one poll against the inverter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Wrap an already-merged map
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Top-level key lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Walk a fixed path of keys/indices. Any missing key, out-of-range
    /// index, or wrong-shaped container yields `None`, never a panic.
    pub fn get_path(&self, path: &[PathSeg]) -> Option<&Value> {
        let mut cur: Option<&Value> = match path.first()? {
            PathSeg::Key(k) => self.0.get(*k),
            // Records are always object-rooted
            PathSeg::Idx(_) => None,
        };

        for seg in &path[1..] {
            cur = match (cur, seg) {
                (Some(Value::Object(map)), PathSeg::Key(k)) => map.get(*k),
                (Some(Value::Array(arr)), PathSeg::Idx(i)) => arr.get(*i),
                _ => None,
            };
        }
        cur
    }

    /// Path lookup coerced to a float; `None` for missing or non-numeric values
    pub fn get_path_f64(&self, path: &[PathSeg]) -> Option<f64> {
        self.get_path(path).and_then(Value::as_f64)
    }

    /// The raw payload date string (`YYYYMMDDHHMMSS...`), if present
    pub fn date_str(&self) -> Option<&str> {
        self.get("date").and_then(Value::as_str)
    }

    /// Settings-namespace key lookup
    pub fn setting(&self, name: &str) -> Option<&Value> {
        match self.0.get(SETTINGS_NS) {
            Some(Value::Object(map)) => map.get(name),
            _ => None,
        }
    }

    /// Access the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RawRecord {
        let value = json!({
            "Batt": [[5280, 0], [120, 0]],
            "busVp": 3921,
            "date": "20240511083015xyz",
            "_settings": {"OperM": 1, "Aorvol": 2300},
        });
        match value {
            Value::Object(map) => RawRecord::new(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_path_lookup() {
        let rec = sample();
        assert_eq!(
            rec.get_path(&[PathSeg::Key("Batt"), PathSeg::Idx(0), PathSeg::Idx(0)]),
            Some(&json!(5280))
        );
        assert_eq!(rec.get_path_f64(&[PathSeg::Key("busVp")]), Some(3921.0));
    }

    #[test]
    fn test_path_lookup_misses_are_none() {
        let rec = sample();
        // Missing key
        assert!(rec.get_path(&[PathSeg::Key("PV"), PathSeg::Idx(0)]).is_none());
        // Index out of range
        assert!(
            rec.get_path(&[PathSeg::Key("Batt"), PathSeg::Idx(9), PathSeg::Idx(0)])
                .is_none()
        );
        // Indexing into a scalar
        assert!(rec.get_path(&[PathSeg::Key("busVp"), PathSeg::Idx(0)]).is_none());
        // Key lookup in an array
        assert!(
            rec.get_path(&[PathSeg::Key("Batt"), PathSeg::Key("x")])
                .is_none()
        );
    }

    #[test]
    fn test_settings_and_date() {
        let rec = sample();
        assert_eq!(rec.setting("OperM"), Some(&json!(1)));
        assert!(rec.setting("missing").is_none());
        assert_eq!(rec.date_str(), Some("20240511083015xyz"));
    }
}
