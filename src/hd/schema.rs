// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structural JSON schema checks for arbitrary-data signing.
//!
//! Supports the keywords data-signing schemas actually use: `type`,
//! `required`, `properties`, `items`, `enum` and `additionalProperties: false`.
//! Unknown keywords are ignored.

use serde_json::{Map, Value};

/// Validate `value` against `schema`, returning the path of the first violation.
pub fn validate(value: &Value, schema: &Value) -> Result<(), String> {
    check(value, schema, "$")
}

fn check(value: &Value, schema: &Value, at: &str) -> Result<(), String> {
    let Some(rules) = schema.as_object() else {
        // `true` / `{}` accept anything, `false` rejects everything.
        return match schema {
            Value::Bool(false) => Err(format!("{at}: rejected by schema")),
            _ => Ok(()),
        };
    };

    if let Some(expected) = rules.get("type") {
        if !type_matches(value, expected) {
            return Err(format!("{at}: expected type {expected}"));
        }
    }

    if let Some(Value::Array(allowed)) = rules.get("enum") {
        if !allowed.contains(value) {
            return Err(format!("{at}: value not in enum"));
        }
    }

    if let Value::Object(object) = value {
        check_object(object, rules, at)?;
    }

    if let (Value::Array(items), Some(item_schema)) = (value, rules.get("items")) {
        for (i, item) in items.iter().enumerate() {
            check(item, item_schema, &format!("{at}[{i}]"))?;
        }
    }

    Ok(())
}

fn check_object(object: &Map<String, Value>, rules: &Map<String, Value>, at: &str) -> Result<(), String> {
    if let Some(Value::Array(required)) = rules.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                return Err(format!("{at}: missing required property '{name}'"));
            }
        }
    }

    let properties = rules.get("properties").and_then(Value::as_object);
    if let Some(properties) = properties {
        for (name, property_schema) in properties {
            if let Some(field) = object.get(name) {
                check(field, property_schema, &format!("{at}.{name}"))?;
            }
        }
    }

    if rules.get("additionalProperties") == Some(&Value::Bool(false)) {
        let known = |name: &str| properties.is_some_and(|p| p.contains_key(name));
        if let Some(extra) = object.keys().find(|name| !known(name.as_str())) {
            return Err(format!("{at}: unexpected property '{extra}'"));
        }
    }

    Ok(())
}

fn type_matches(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => single_type_matches(value, name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| single_type_matches(value, name)),
        _ => true,
    }
}

fn single_type_matches(value: &Value, name: &str) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => false,
    }
}
