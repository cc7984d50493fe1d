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

//! Placeholder substitution in property values.
//!
//! String values may reference other properties as `${name}` or
//! `${name:default}`. Resolution is recursive with a depth bound, so a
//! self-referential placeholder degrades to its literal text instead of
//! looping. Unresolvable placeholders without a default are left verbatim,
//! which also makes resolution idempotent.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::BindError;
use crate::name::PropertyName;
use crate::source::ConfigurationPropertySource;

const MAX_NESTING: usize = 8;

/// Resolves placeholders in a raw property value. Non-string values pass
/// through unchanged.
pub trait PlaceholderResolver: Send + Sync {
    fn resolve(&self, value: &Value) -> Result<Value, BindError>;
}

/// Leaves every value untouched.
pub struct NoOpResolver;

impl PlaceholderResolver for NoOpResolver {
    fn resolve(&self, value: &Value) -> Result<Value, BindError> {
        Ok(value.clone())
    }
}

/// Resolves placeholders against an ordered list of sources; the first
/// source holding the referenced name wins.
pub struct SourcePlaceholderResolver {
    sources: Vec<Arc<dyn ConfigurationPropertySource>>,
}

impl SourcePlaceholderResolver {
    pub fn new(sources: Vec<Arc<dyn ConfigurationPropertySource>>) -> Self {
        SourcePlaceholderResolver { sources }
    }

    fn resolve_text(&self, text: &str, depth: usize) -> Result<String, BindError> {
        if depth >= MAX_NESTING {
            debug!(text, "placeholder nesting limit reached, leaving verbatim");
            return Ok(text.to_string());
        }
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = find_closing(after) else {
                // Unterminated placeholder, keep the remainder as-is.
                result.push_str(&rest[start..]);
                return Ok(result);
            };
            let content = self.resolve_text(&after[..end], depth + 1)?;
            let (name, default) = match content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (content.as_str(), None),
            };
            match self.lookup(name)? {
                Some(value) => {
                    result.push_str(&self.resolve_text(&scalar_text(&value), depth + 1)?);
                }
                None => match default {
                    Some(default) => result.push_str(default),
                    None => {
                        result.push_str("${");
                        result.push_str(&content);
                        result.push('}');
                    }
                },
            }
            rest = &after[end + 1..];
        }
        result.push_str(rest);
        Ok(result)
    }

    fn lookup(&self, name: &str) -> Result<Option<Value>, BindError> {
        let Ok(name) = PropertyName::of(name) else {
            return Ok(None);
        };
        for source in &self.sources {
            if let Some(property) = source.get_property(&name)? {
                return Ok(Some(property.value));
            }
        }
        Ok(None)
    }
}

impl PlaceholderResolver for SourcePlaceholderResolver {
    fn resolve(&self, value: &Value) -> Result<Value, BindError> {
        match value {
            Value::String(text) if text.contains("${") => {
                Ok(Value::String(self.resolve_text(text, 0)?))
            }
            _ => Ok(value.clone()),
        }
    }
}

/// Position of the `}` closing the placeholder that was opened just before
/// `text`, skipping nested `${`.
fn find_closing(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut nested = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            nested += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            if nested == 0 {
                return Some(i);
            }
            nested -= 1;
        }
        i += 1;
    }
    None
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MapSource, from_raw};
    use serde_json::json;

    fn resolver(source: MapSource) -> SourcePlaceholderResolver {
        SourcePlaceholderResolver::new(vec![from_raw(Arc::new(source))])
    }

    #[test]
    fn substitutes_referenced_properties() {
        let resolver = resolver(MapSource::new("test").with("app.name", "demo"));
        assert_eq!(
            resolver.resolve(&json!("service-${app.name}")).unwrap(),
            json!("service-demo")
        );
    }

    #[test]
    fn falls_back_to_defaults() {
        let resolver = resolver(MapSource::new("test"));
        assert_eq!(
            resolver.resolve(&json!("${app.name:fallback}")).unwrap(),
            json!("fallback")
        );
    }

    #[test]
    fn unresolvable_placeholders_stay_verbatim() {
        let resolver = resolver(MapSource::new("test"));
        let value = json!("prefix-${missing.name}");
        assert_eq!(resolver.resolve(&value).unwrap(), value);
        // A second pass changes nothing.
        let once = resolver.resolve(&value).unwrap();
        assert_eq!(resolver.resolve(&once).unwrap(), once);
    }

    #[test]
    fn resolves_nested_placeholders() {
        let resolver = resolver(
            MapSource::new("test")
                .with("which", "inner")
                .with("app.inner", "deep"),
        );
        assert_eq!(
            resolver.resolve(&json!("${app.${which}}")).unwrap(),
            json!("deep")
        );
    }

    #[test]
    fn self_referential_placeholders_terminate() {
        let resolver = resolver(MapSource::new("test").with("a", "${a}"));
        let resolved = resolver.resolve(&json!("${a}")).unwrap();
        assert_eq!(resolved, json!("${a}"));
    }

    #[test]
    fn non_string_values_pass_through() {
        let resolver = resolver(MapSource::new("test"));
        assert_eq!(resolver.resolve(&json!(42)).unwrap(), json!(42));
        assert_eq!(resolver.resolve(&json!(["${x}"])).unwrap(), json!(["${x}"]));
    }
}
