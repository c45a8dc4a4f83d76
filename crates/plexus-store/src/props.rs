//! Nested JSON property bag.

use plexus_core::{IntoPropertyPath, PlexusError, PlexusResult, PropertyPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A nested JSON object addressed by [`PropertyPath`]s.
///
/// Unlike [`ObservableStore`](crate::ObservableStore), which keys whole
/// entries by path, `Props` walks into one document: `a.b.c` is the `c`
/// member of the `b` member of the `a` member of the root object.
///
/// ```rust
/// use plexus_store::Props;
/// use serde_json::json;
///
/// let mut props = Props::new();
/// props.set("widget.size.width", json!(320)).unwrap();
/// props.incr("widget.renders", 1).unwrap();
///
/// assert_eq!(props.get("widget.size.width"), Some(&json!(320)));
/// assert_eq!(
///     props.into_inner(),
///     json!({ "widget": { "size": { "width": 320 }, "renders": 1 } })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props {
    root: Value,
}

impl Props {
    /// Create an empty property bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing document.
    #[must_use]
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// The value at `path`, if every segment resolves.
    #[must_use]
    pub fn get(&self, path: impl IntoPropertyPath) -> Option<&Value> {
        let path = path.into_property_path().ok()?;
        path.segments()
            .iter()
            .try_fold(&self.root, |current, segment| current.get(segment.as_str()))
    }

    /// The value at `path`, or `default` if it does not resolve.
    #[must_use]
    pub fn get_or(&self, path: impl IntoPropertyPath, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Whether `path` resolves to a value.
    #[must_use]
    pub fn has(&self, path: impl IntoPropertyPath) -> bool {
        self.get(path).is_some()
    }

    /// Set the value at `path`, creating missing intermediate objects.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] for an invalid path or if an existing
    /// intermediate value is not an object.
    pub fn set(&mut self, path: impl IntoPropertyPath, value: Value) -> PlexusResult<()> {
        let path = path.into_property_path()?;
        let container = self.container_mut(&path)?;
        container.insert(path.leaf().to_string(), value);
        Ok(())
    }

    /// Add `increment` to the number at `path` and return the result.
    ///
    /// A missing leaf is created holding `increment`. Integers stay integers
    /// unless the stored number is a float.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] for an invalid path, a non-object
    /// intermediate, a non-numeric leaf or an integer overflow.
    pub fn incr(&mut self, path: impl IntoPropertyPath, increment: i64) -> PlexusResult<Value> {
        let path = path.into_property_path()?;
        let container = self.container_mut(&path)?;
        let leaf = path.leaf().to_string();

        let next = match container.get(&leaf) {
            None => Value::from(increment),
            Some(Value::Number(current)) => Value::Number(add(current, increment, &path)?),
            Some(_) => {
                return Err(PlexusError::Usage(format!(
                    "can only increment a number at '{path}'"
                )));
            },
        };
        container.insert(leaf, next.clone());
        Ok(next)
    }

    /// Remove the value at `path`. Returns whether something was removed.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] for an invalid path.
    pub fn delete(&mut self, path: impl IntoPropertyPath) -> PlexusResult<bool> {
        let path = path.into_property_path()?;
        let mut current = &mut self.root;
        for segment in parents(&path) {
            match current.get_mut(segment.as_str()) {
                Some(next) => current = next,
                None => return Ok(false),
            }
        }
        Ok(current
            .as_object_mut()
            .is_some_and(|map| map.remove(path.leaf()).is_some()))
    }

    /// The underlying document.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consume the bag, returning the document.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.root
    }

    fn container_mut(&mut self, path: &PropertyPath) -> PlexusResult<&mut Map<String, Value>> {
        let mut current = &mut self.root;
        for segment in parents(path) {
            let Value::Object(map) = current else {
                return Err(not_an_object(path, segment));
            };
            current = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        match current {
            Value::Object(map) => Ok(map),
            _ => Err(not_an_object(path, path.leaf())),
        }
    }
}

impl Default for Props {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Value> for Props {
    fn from(root: Value) -> Self {
        Self::from_value(root)
    }
}

/// Every segment but the leaf.
fn parents(path: &PropertyPath) -> &[String] {
    path.segments()
        .split_last()
        .map_or(&[], |(_, parents)| parents)
}

fn not_an_object(path: &PropertyPath, segment: &str) -> PlexusError {
    PlexusError::Usage(format!(
        "cannot walk '{path}': the value before '{segment}' is not an object"
    ))
}

#[allow(clippy::cast_precision_loss)]
fn add(current: &Number, increment: i64, path: &PropertyPath) -> PlexusResult<Number> {
    if let Some(n) = current.as_i64() {
        return n
            .checked_add(increment)
            .map(Number::from)
            .ok_or_else(|| PlexusError::Usage(format!("increment overflows at '{path}'")));
    }
    if let Some(n) = current.as_u64() {
        let next = if increment >= 0 {
            n.checked_add(increment.unsigned_abs())
        } else {
            n.checked_sub(increment.unsigned_abs())
        };
        return next
            .map(Number::from)
            .ok_or_else(|| PlexusError::Usage(format!("increment overflows at '{path}'")));
    }
    current
        .as_f64()
        .and_then(|n| Number::from_f64(n + increment as f64))
        .ok_or_else(|| PlexusError::Usage(format!("increment is not a finite number at '{path}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_creates_intermediates() {
        let mut props = Props::new();
        props.set("a.b.c", json!(1)).unwrap();
        assert_eq!(props.as_value(), &json!({ "a": { "b": { "c": 1 } } }));
        assert!(props.has("a.b"));
        assert!(!props.has("a.x"));
    }

    #[test]
    fn test_get_or_default() {
        let props = Props::from_value(json!({ "a": { "b": null } }));
        assert_eq!(props.get("a.b"), Some(&Value::Null));
        assert_eq!(props.get_or("a.c", json!("fallback")), json!("fallback"));
        assert_eq!(props.get_or("a.b.c", json!(0)), json!(0));
        assert_eq!(props.get(""), None);
    }

    #[test]
    fn test_set_through_scalar_is_usage_error() {
        let mut props = Props::from_value(json!({ "a": 5 }));
        let err = props.set("a.b", json!(1)).unwrap_err();
        assert!(matches!(err, PlexusError::Usage(_)));
        assert_eq!(props.get("a"), Some(&json!(5)));
    }

    #[test]
    fn test_incr() {
        let mut props = Props::new();
        assert_eq!(props.incr("stats.loads", 1).unwrap(), json!(1));
        assert_eq!(props.incr("stats.loads", 2).unwrap(), json!(3));
        assert_eq!(props.incr("stats.loads", -5).unwrap(), json!(-2));

        props.set("stats.ratio", json!(0.5)).unwrap();
        assert_eq!(props.incr("stats.ratio", 1).unwrap(), json!(1.5));
    }

    #[test]
    fn test_incr_non_number_is_usage_error() {
        let mut props = Props::from_value(json!({ "name": "x" }));
        assert!(matches!(
            props.incr("name", 1),
            Err(PlexusError::Usage(_))
        ));
    }

    #[test]
    fn test_incr_overflow_is_usage_error() {
        let mut props = Props::from_value(json!({ "n": i64::MAX }));
        assert!(props.incr("n", 1).is_err());
        assert_eq!(props.get("n"), Some(&json!(i64::MAX)));
    }

    #[test]
    fn test_delete() {
        let mut props = Props::from_value(json!({ "a": { "b": 1, "c": 2 } }));
        assert!(props.delete("a.b").unwrap());
        assert!(!props.delete("a.b").unwrap());
        assert!(!props.delete("x.y").unwrap());
        assert_eq!(props.into_inner(), json!({ "a": { "c": 2 } }));
    }

    #[test]
    fn test_serde_transparent() {
        let props: Props = serde_json::from_str(r#"{"a":1}"#).unwrap();
        assert_eq!(props.get("a"), Some(&json!(1)));
        assert_eq!(serde_json::to_string(&props).unwrap(), r#"{"a":1}"#);
    }
}
