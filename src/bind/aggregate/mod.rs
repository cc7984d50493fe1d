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

//! Aggregate binding: lists, arrays and maps.

mod indexed;
mod map;

use std::sync::Arc;

use serde_json::Value;

use crate::bind::bindable::{Bindable, TypeDescriptor};
use crate::bind::handler::BindHandler;
use crate::bind::{Binder, Context};
use crate::error::BindError;
use crate::name::PropertyName;
use crate::source::ConfigurationPropertySource;

/// The aggregate shape of a target type, with element/entry descriptors
/// extracted.
pub(crate) enum AggregateKind {
    List(TypeDescriptor),
    Array(TypeDescriptor),
    Map(TypeDescriptor, TypeDescriptor),
}

impl AggregateKind {
    pub(crate) fn of(type_desc: &TypeDescriptor) -> Option<Self> {
        match type_desc {
            TypeDescriptor::List(element) => Some(AggregateKind::List((**element).clone())),
            TypeDescriptor::Array(element) => Some(AggregateKind::Array((**element).clone())),
            TypeDescriptor::Map(key, value) => {
                Some(AggregateKind::Map((**key).clone(), (**value).clone()))
            }
            _ => None,
        }
    }
}

/// Binds one element or entry through the full binder pipeline, optionally
/// restricted to a single source.
pub(crate) struct ElementBinder<'a> {
    pub(crate) binder: &'a Binder,
    pub(crate) handler: &'a dyn BindHandler,
}

impl ElementBinder<'_> {
    pub(crate) fn bind(
        &self,
        name: &PropertyName,
        target: &Bindable,
        source: Option<&Arc<dyn ConfigurationPropertySource>>,
        allow_recursive: bool,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        context.with_source(source.cloned(), |context| {
            self.binder
                .bind_internal(name, target, self.handler, context, allow_recursive, false)
        })
    }
}

pub(crate) fn bind(
    binder: &Binder,
    name: &PropertyName,
    target: &Bindable,
    handler: &dyn BindHandler,
    context: &mut Context,
    kind: &AggregateKind,
) -> Result<Option<Value>, BindError> {
    let element_binder = ElementBinder { binder, handler };
    match kind {
        AggregateKind::List(element) | AggregateKind::Array(element) => {
            indexed::bind_indexed(binder, &element_binder, context, name, element)
        }
        AggregateKind::Map(key, value) => {
            map::bind_map(binder, &element_binder, context, name, target, key, value)
        }
    }
}

/// Combines a freshly bound aggregate with the target's existing value.
/// Maps keep existing entries and let bound entries override them; lists
/// and arrays replace the existing contents outright.
pub(crate) fn merge(kind: &AggregateKind, existing: Value, additional: Value) -> Value {
    match kind {
        AggregateKind::Map(_, _) => match (existing, additional) {
            (Value::Object(mut existing), Value::Object(additional)) => {
                for (key, value) in additional {
                    existing.insert(key, value);
                }
                Value::Object(existing)
            }
            (_, additional) => additional,
        },
        _ => additional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_merge_keeps_existing_entries() {
        let kind = AggregateKind::Map(TypeDescriptor::string(), TypeDescriptor::Any);
        let merged = merge(
            &kind,
            json!({"kept": 1, "overridden": 2}),
            json!({"overridden": 3, "added": 4}),
        );
        assert_eq!(merged, json!({"kept": 1, "overridden": 3, "added": 4}));
    }

    #[test]
    fn list_merge_replaces_contents() {
        let kind = AggregateKind::List(TypeDescriptor::int());
        assert_eq!(merge(&kind, json!([1, 2]), json!([3])), json!([3]));
    }
}
