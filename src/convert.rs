/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

//! Value conversion to declared target types.

use serde_json::{Number, Value};

use crate::bind::bindable::{ScalarKind, TypeDescriptor};
use crate::error::BindError;

/// Converts raw property values to declared target types.
///
/// `can_convert` is an explicit query; conversion failure is an ordinary
/// `Err`, never a probe.
pub trait Converter: Send + Sync {
    fn convert(&self, value: &Value, target: &TypeDescriptor) -> Result<Value, BindError>;

    fn can_convert(&self, value: &Value, target: &TypeDescriptor) -> bool {
        self.convert(value, target).is_ok()
    }
}

/// The standard conversion rules.
///
/// Strings parse to booleans, integers, floats and humantime durations
/// (durations normalize to whole milliseconds). Comma-separated strings
/// convert to lists, with single quotes or double quotes around an element
/// stripped. Enum variants match by name ignoring case, dashes and
/// underscores. A lone scalar converts to a single-element list.
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn convert(&self, value: &Value, target: &TypeDescriptor) -> Result<Value, BindError> {
        match target {
            TypeDescriptor::Any => Ok(value.clone()),
            TypeDescriptor::Scalar(kind) => convert_scalar(value, *kind),
            TypeDescriptor::Enum(descriptor) => {
                let Value::String(text) = value else {
                    return Err(BindError::conversion(display_of(value), target));
                };
                let wanted = fold_variant(text);
                descriptor
                    .variants
                    .iter()
                    .find(|variant| fold_variant(variant) == wanted)
                    .map(|variant| Value::String(variant.clone()))
                    .ok_or_else(|| BindError::conversion(text, target))
            }
            TypeDescriptor::List(element) | TypeDescriptor::Array(element) => {
                self.convert_elements(value, element, target)
            }
            TypeDescriptor::Map(key, value_type) => {
                let Value::Object(entries) = value else {
                    return Err(BindError::conversion(display_of(value), target));
                };
                let mut result = serde_json::Map::with_capacity(entries.len());
                for (entry_key, entry_value) in entries {
                    if !matches!(key.as_ref(), TypeDescriptor::Scalar(ScalarKind::String)) {
                        self.convert(&Value::String(entry_key.clone()), key)?;
                    }
                    result.insert(entry_key.clone(), self.convert(entry_value, value_type)?);
                }
                Ok(Value::Object(result))
            }
            TypeDescriptor::Object(_) => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(BindError::conversion(display_of(value), target)),
            },
        }
    }
}

impl DefaultConverter {
    fn convert_elements(
        &self,
        value: &Value,
        element: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<Value, BindError> {
        match value {
            Value::Array(items) => {
                let mut result = Vec::with_capacity(items.len());
                for item in items {
                    result.push(self.convert(item, element)?);
                }
                Ok(Value::Array(result))
            }
            Value::String(text) => {
                if text.trim().is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                let mut result = Vec::new();
                for item in split_elements(text) {
                    let item = strip_quotes(&item);
                    result.push(self.convert(&Value::String(item.to_string()), element)?);
                }
                Ok(Value::Array(result))
            }
            Value::Bool(_) | Value::Number(_) => {
                Ok(Value::Array(vec![self.convert(value, element)?]))
            }
            _ => Err(BindError::conversion(display_of(value), target)),
        }
    }
}

fn convert_scalar(value: &Value, kind: ScalarKind) -> Result<Value, BindError> {
    let target = TypeDescriptor::Scalar(kind);
    match kind {
        ScalarKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(BindError::conversion(display_of(value), target)),
        },
        ScalarKind::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(BindError::conversion(text, target))
                }
            }
            _ => Err(BindError::conversion(display_of(value), target)),
        },
        ScalarKind::Int => match value {
            Value::Number(n) if n.as_i64().is_some() => Ok(value.clone()),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| BindError::conversion(text, target)),
            _ => Err(BindError::conversion(display_of(value), target)),
        },
        ScalarKind::UInt => match value {
            Value::Number(n) if n.as_u64().is_some() => Ok(value.clone()),
            Value::String(text) => text
                .trim()
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| BindError::conversion(text, target)),
            _ => Err(BindError::conversion(display_of(value), target)),
        },
        ScalarKind::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(text) => {
                let parsed = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| BindError::conversion(text, &target))?;
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| BindError::conversion(text, &target))
            }
            _ => Err(BindError::conversion(display_of(value), target)),
        },
        ScalarKind::Duration => match value {
            // Bare numbers are already milliseconds.
            Value::Number(n) if n.as_u64().is_some() => Ok(value.clone()),
            Value::String(text) => {
                let text = text.trim();
                if let Ok(millis) = text.parse::<u64>() {
                    return Ok(Value::from(millis));
                }
                humantime::parse_duration(text)
                    .map(|duration| Value::from(duration.as_millis() as u64))
                    .map_err(|_| BindError::conversion(text, target))
            }
            _ => Err(BindError::conversion(display_of(value), target)),
        },
    }
}

fn fold_variant(name: &str) -> String {
    name.chars()
        .filter(|ch| *ch != '-' && *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits a comma-separated list, keeping commas inside quoted elements.
fn split_elements(text: &str) -> Vec<String> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' => {
                    elements.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    elements.push(current.trim().to_string());
    elements
}

fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn display_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convert(value: Value, target: TypeDescriptor) -> Result<Value, BindError> {
        DefaultConverter.convert(&value, &target)
    }

    #[test]
    fn strings_parse_to_scalars() {
        assert_eq!(
            convert(json!("true"), TypeDescriptor::bool()).unwrap(),
            json!(true)
        );
        assert_eq!(
            convert(json!(" -42 "), TypeDescriptor::int()).unwrap(),
            json!(-42)
        );
        assert_eq!(
            convert(json!("42"), TypeDescriptor::uint()).unwrap(),
            json!(42)
        );
        assert_eq!(
            convert(json!("1.5"), TypeDescriptor::float()).unwrap(),
            json!(1.5)
        );
        assert_eq!(
            convert(json!(8080), TypeDescriptor::string()).unwrap(),
            json!("8080")
        );
    }

    #[test]
    fn invalid_scalars_are_conversion_errors() {
        let error = convert(json!("not-a-number"), TypeDescriptor::int()).unwrap_err();
        assert!(error.is_conversion());
        assert!(convert(json!("yes"), TypeDescriptor::bool()).is_err());
        assert!(convert(json!("-1"), TypeDescriptor::uint()).is_err());
    }

    #[test]
    fn durations_normalize_to_milliseconds() {
        assert_eq!(
            convert(json!("5s"), TypeDescriptor::duration()).unwrap(),
            json!(5000)
        );
        assert_eq!(
            convert(json!("1m 30s"), TypeDescriptor::duration()).unwrap(),
            json!(90_000)
        );
        assert_eq!(
            convert(json!("250"), TypeDescriptor::duration()).unwrap(),
            json!(250)
        );
    }

    #[test]
    fn enums_match_relaxed_variant_names() {
        let target = TypeDescriptor::enumeration("Mode", &["ReadOnly", "ReadWrite"]);
        assert_eq!(
            convert(json!("read-only"), target.clone()).unwrap(),
            json!("ReadOnly")
        );
        assert_eq!(
            convert(json!("READWRITE"), target.clone()).unwrap(),
            json!("ReadWrite")
        );
        assert!(convert(json!("append"), target).is_err());
    }

    #[test]
    fn comma_separated_strings_become_lists() {
        let target = TypeDescriptor::list(TypeDescriptor::int());
        assert_eq!(
            convert(json!("1, 2 ,3"), target.clone()).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(convert(json!(""), target).unwrap(), json!([]));
        let quoted = TypeDescriptor::list(TypeDescriptor::string());
        assert_eq!(
            convert(json!("'a,', \"b\""), quoted).unwrap(),
            json!(["a,", "b"])
        );
    }

    #[test]
    fn lone_scalars_become_single_element_lists() {
        let target = TypeDescriptor::list(TypeDescriptor::int());
        assert_eq!(convert(json!(7), target).unwrap(), json!([7]));
    }

    #[test]
    fn map_values_are_converted_and_keys_validated() {
        let target = TypeDescriptor::map(TypeDescriptor::int(), TypeDescriptor::bool());
        assert_eq!(
            convert(json!({"1": "true"}), target.clone()).unwrap(),
            json!({"1": true})
        );
        assert!(convert(json!({"one": "true"}), target).is_err());
    }

    #[test]
    fn objects_do_not_convert_from_scalars() {
        let descriptor =
            crate::bind::bindable::DataObjectDescriptor::structure("Empty").build();
        let error = convert(json!("text"), TypeDescriptor::object(descriptor)).unwrap_err();
        assert!(error.is_conversion());
    }
}
