use super::*;
use crate::router::permissions::Role;
use crate::tools::base::ParamSpec;
use serde_json::json;
use std::collections::BTreeMap;

fn spec(param_type: ParamType, required: bool) -> ParamSpec {
    ParamSpec {
        param_type,
        required,
        description: String::new(),
    }
}

fn leave_tool() -> ToolDefinition {
    let mut parameters = BTreeMap::new();
    parameters.insert("leaveType".to_string(), spec(ParamType::String, true));
    parameters.insert("days".to_string(), spec(ParamType::Integer, true));
    parameters.insert("startDate".to_string(), spec(ParamType::Date, false));
    parameters.insert("paid".to_string(), spec(ParamType::Boolean, false));
    ToolDefinition {
        name: "create_leave_request".to_string(),
        description: String::new(),
        category: "leaves".to_string(),
        parameters,
        required_roles: vec![Role::Employee],
    }
}

#[test]
fn test_validate_coerces_strings() {
    let params = json!({
        "leaveType": " annual ",
        "days": "3",
        "startDate": "2026-11-01",
        "paid": "yes"
    });
    let out = validate(&leave_tool(), &params).unwrap();
    assert_eq!(out["leaveType"], json!("annual"));
    assert_eq!(out["days"], json!(3));
    assert_eq!(out["startDate"], json!("2026-11-01"));
    assert_eq!(out["paid"], json!(true));
}

#[test]
fn test_validate_reports_missing_required() {
    let err = validate(&leave_tool(), &json!({"days": 2})).unwrap_err();
    assert_eq!(err.missing, vec!["leaveType".to_string()]);
    assert_eq!(err.problems.len(), 1);
}

#[test]
fn test_blank_string_counts_as_missing() {
    let err = validate(&leave_tool(), &json!({"leaveType": "  ", "days": 1})).unwrap_err();
    assert_eq!(err.missing, vec!["leaveType".to_string()]);
}

#[test]
fn test_validate_reports_type_problems() {
    let err = validate(
        &leave_tool(),
        &json!({"leaveType": "sick", "days": "several", "startDate": "next week"}),
    )
    .unwrap_err();
    assert!(err.missing.is_empty());
    assert_eq!(err.problems.len(), 2);
    assert!(err.problems.iter().any(|p| p.contains("'days'")));
    assert!(err.problems.iter().any(|p| p.contains("YYYY-MM-DD")));
}

#[test]
fn test_unknown_parameters_are_dropped() {
    let out = validate(
        &leave_tool(),
        &json!({"leaveType": "sick", "days": 1, "sql": "DROP TABLE"}),
    )
    .unwrap();
    assert!(!out.contains_key("sql"));
}

#[test]
fn test_non_object_params_rejected() {
    let err = validate(&leave_tool(), &json!(["annual", 3])).unwrap_err();
    assert!(err.problems[0].contains("must be an object"));
}

#[test]
fn test_null_params_treated_as_empty() {
    let err = validate(&leave_tool(), &Value::Null).unwrap_err();
    assert_eq!(err.missing.len(), 2);
}

#[test]
fn test_coerce_integer() {
    assert_eq!(coerce(ParamType::Integer, &json!(4.0)).unwrap(), json!(4));
    assert_eq!(coerce(ParamType::Integer, &json!("٣")).unwrap(), json!(3));
    assert_eq!(coerce(ParamType::Integer, &json!("1,200")).unwrap(), json!(1200));
    assert!(coerce(ParamType::Integer, &json!(4.5)).is_err());
    assert!(coerce(ParamType::Integer, &json!(true)).is_err());
}

#[test]
fn test_coerce_number() {
    assert_eq!(coerce(ParamType::Number, &json!("12.5")).unwrap(), json!(12.5));
    assert_eq!(coerce(ParamType::Number, &json!(7)).unwrap(), json!(7));
    assert!(coerce(ParamType::Number, &json!("NaN")).is_err());
    assert!(coerce(ParamType::Number, &json!("abc")).is_err());
}

#[test]
fn test_coerce_boolean() {
    assert_eq!(coerce(ParamType::Boolean, &json!("No")).unwrap(), json!(false));
    assert_eq!(coerce(ParamType::Boolean, &json!("نعم")).unwrap(), json!(true));
    assert!(coerce(ParamType::Boolean, &json!("maybe")).is_err());
}

#[test]
fn test_coerce_date_accepts_arabic_digits() {
    assert_eq!(
        coerce(ParamType::Date, &json!("٢٠٢٦-١١-٠١")).unwrap(),
        json!("2026-11-01")
    );
    assert!(coerce(ParamType::Date, &json!("2026-02-30")).is_err());
}

#[test]
fn test_coerce_scalars_to_string() {
    assert_eq!(coerce(ParamType::String, &json!(42)).unwrap(), json!("42"));
    assert_eq!(coerce(ParamType::String, &json!(false)).unwrap(), json!("false"));
    assert!(coerce(ParamType::String, &json!({"a": 1})).is_err());
}

#[test]
fn test_coerce_array_from_csv() {
    assert_eq!(
        coerce(ParamType::Array, &json!("a, b,,c")).unwrap(),
        json!(["a", "b", "c"])
    );
    assert!(coerce(ParamType::Object, &json!("x")).is_err());
    assert_eq!(coerce(ParamType::Any, &json!(null)).unwrap(), json!(null));
}
