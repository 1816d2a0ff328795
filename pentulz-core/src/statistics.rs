//! Free-form per-parser statistics and their merge rules

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Metric name to numeric, nested-map, or descriptive value.
///
/// Keys are kept sorted so serialized reports are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics(Map<String, Value>);

impl Statistics {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Add one to `counter` inside the nested map stored at `section`
    pub fn increment(&mut self, section: &str, counter: impl Into<String>) {
        let entry = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(histogram) = entry {
            let slot = histogram.entry(counter.into()).or_insert(Value::from(0u64));
            let next = slot.as_u64().unwrap_or(0) + 1;
            *slot = Value::from(next);
        }
    }

    /// Fold `other` into `self`.
    ///
    /// Numbers are summed, nested maps merge key-wise with the same rules, and
    /// any other value keeps whatever was seen first.
    pub fn merge(&mut self, other: &Statistics) {
        merge_maps(&mut self.0, &other.0);
    }
}

impl From<Map<String, Value>> for Statistics {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn merge_maps(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (key, incoming) in from {
        match into.get_mut(key) {
            Some(existing) => merge_value(existing, incoming),
            None => {
                into.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Number(a), Value::Number(b)) => *a = add_numbers(a, b),
        (Value::Object(a), Value::Object(b)) => merge_maps(a, b),
        _ => {}
    }
}

fn add_numbers(a: &Number, b: &Number) -> Number {
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64())
        && let Some(sum) = x.checked_add(y)
    {
        return sum.into();
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
        && let Some(sum) = x.checked_add(y)
    {
        return sum.into();
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| a.clone())
}
