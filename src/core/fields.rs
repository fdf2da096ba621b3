// Field readers for raw JSON records. Each reader pushes at most one issue and
// returns None on failure so the caller can keep collecting errors.
// Null and absent are the same thing: "not supplied".
use crate::core::error::ValidationIssue;
use serde_json::{Map, Value};

pub(crate) type Raw = Map<String, Value>;

pub(crate) fn supplied<'a>(raw: &'a Raw, field: &str) -> Option<&'a Value> {
    raw.get(field).filter(|value| !value.is_null())
}

pub(crate) fn required_str(
    raw: &Raw,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    if supplied(raw, field).is_none() {
        issues.push(ValidationIssue::new(
            field,
            "value_error.missing",
            "field required",
        ));
        return None;
    }
    optional_str(raw, field, issues)
}

pub(crate) fn optional_str(
    raw: &Raw,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match supplied(raw, field)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => {
            issues.push(ValidationIssue::new(
                field,
                "type_error.str",
                "str type expected",
            ));
            None
        }
    }
}

pub(crate) fn optional_int(
    raw: &Raw,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<i64> {
    let value = supplied(raw, field)?;
    let parsed = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.is_finite())
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        issues.push(ValidationIssue::new(
            field,
            "type_error.integer",
            "value is not a valid integer",
        ));
    }
    parsed
}

pub(crate) fn optional_float(
    raw: &Raw,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<f64> {
    let value = supplied(raw, field)?;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|float| float.is_finite());
    if parsed.is_none() {
        issues.push(ValidationIssue::new(
            field,
            "type_error.float",
            "value is not a valid float",
        ));
    }
    parsed
}

pub(crate) fn optional_object<'a>(
    raw: &'a Raw,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'a Raw> {
    match supplied(raw, field)? {
        Value::Object(object) => Some(object),
        _ => {
            issues.push(ValidationIssue::new(
                field,
                "type_error.dict",
                "value is not a valid dict",
            ));
            None
        }
    }
}

/// Reject anything that is not a JSON object at the record root.
pub(crate) fn as_record<'a>(value: &'a Value, model: &str) -> Result<&'a Raw, ValidationIssue> {
    value.as_object().ok_or_else(|| ValidationIssue {
        loc: vec!["__root__".to_string()],
        message: format!("{model} must be a JSON object"),
        code: "type_error.dict".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{optional_float, optional_int, optional_str, required_str};
    use serde_json::json;

    #[test]
    fn numbers_coerce_to_text() {
        let raw = json!({"pageId": 123123, "ratio": 45.2});
        let raw = raw.as_object().expect("object");
        let mut issues = Vec::new();
        assert_eq!(
            optional_str(raw, "pageId", &mut issues).as_deref(),
            Some("123123")
        );
        assert_eq!(optional_str(raw, "ratio", &mut issues).as_deref(), Some("45.2"));
        assert!(issues.is_empty());
    }

    #[test]
    fn null_counts_as_missing() {
        let raw = json!({"title": null});
        let raw = raw.as_object().expect("object");
        let mut issues = Vec::new();
        assert_eq!(required_str(raw, "title", &mut issues), None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "field required");
    }

    #[test]
    fn numeric_strings_are_accepted_for_numbers() {
        let raw = json!({"age": "42", "latitude": "-12.5", "bad": "x"});
        let raw = raw.as_object().expect("object");
        let mut issues = Vec::new();
        assert_eq!(optional_int(raw, "age", &mut issues), Some(42));
        assert_eq!(optional_float(raw, "latitude", &mut issues), Some(-12.5));
        assert_eq!(optional_int(raw, "bad", &mut issues), None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].loc, vec!["bad".to_string()]);
    }
}
