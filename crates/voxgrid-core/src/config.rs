//! Loose JSON option documents.
//!
//! Option types accept duck-typed JSON (`"2D"`, `2`, `[true, false, true]`,
//! `"mirror"`, `[0, 0, 0, 255]`, ...). Every field is resolved into its typed
//! form here, once, so the operations only ever see tagged variants.

use serde_json::{Map, Value};

use crate::error::{Result, VoxgridError};

/// Field accessor over a JSON object of options.
pub(crate) struct Fields<'a> {
    what: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Wraps `value`, which must be an object whose keys are all in `known`.
    pub(crate) fn new(what: &'static str, value: &'a Value, known: &[&str]) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(VoxgridError::invalid(format!(
                "{what} options must be a JSON object. Got {value}."
            )));
        };
        if let Some(key) = map.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(VoxgridError::invalid(format!(
                "Unknown {what} option '{key}'. Expected one of {known:?}."
            )));
        }
        Ok(Self { what, map })
    }

    /// Returns a field, treating `null` as absent.
    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub(crate) fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: TryFrom<&'a Value, Error = VoxgridError>,
    {
        self.get(key).map(T::try_from).transpose()
    }

    pub(crate) fn bool(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|v| v.as_bool().ok_or_else(|| self.wrong_type(key, "a boolean", v)))
            .transpose()
    }

    pub(crate) fn string(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
            .map(|v| {
                v.as_str()
                    .map(ToString::to_string)
                    .ok_or_else(|| self.wrong_type(key, "a string", v))
            })
            .transpose()
    }

    pub(crate) fn number(&self, key: &str) -> Result<Option<f64>> {
        self.get(key)
            .map(|v| v.as_f64().ok_or_else(|| self.wrong_type(key, "a number", v)))
            .transpose()
    }

    /// Reads a number or a flat array of numbers.
    pub(crate) fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        if let Some(n) = value.as_f64() {
            return Ok(Some(vec![n]));
        }
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type(key, "an array of numbers", value))?;
        items
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| self.wrong_type(key, "an array of numbers", value)))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &Value) -> VoxgridError {
        VoxgridError::type_mismatch(format!(
            "{} option '{key}' must be {expected}. Got {got}.",
            self.what
        ))
    }
}

/// Parses a JSON document into a value for [`Fields`].
pub(crate) fn parse_document(json: &str) -> Result<Value> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_keys_rejected() {
        let value = json!({"copy": true, "bogus": 1});
        let err = Fields::new("remesh", &value, &["copy"]).err().unwrap();
        assert!(err.to_string().starts_with("Unknown remesh option 'bogus'."));
    }

    #[test]
    fn test_null_is_absent() {
        let value = json!({"scalars": null, "copy": false});
        let fields = Fields::new("remesh", &value, &["scalars", "copy"]).unwrap();
        assert_eq!(fields.string("scalars").unwrap(), None);
        assert_eq!(fields.bool("copy").unwrap(), Some(false));
    }

    #[test]
    fn test_wrong_field_type() {
        let value = json!({"copy": "yes"});
        let fields = Fields::new("remesh", &value, &["copy"]).unwrap();
        assert!(matches!(
            fields.bool("copy"),
            Err(VoxgridError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_not_an_object() {
        assert!(Fields::new("pad", &json!([1, 2]), &[]).is_err());
    }
}
