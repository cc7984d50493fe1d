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

//! Indexed binding for lists and arrays.
//!
//! Each source is tried in order. A direct whole-value match converts as a
//! comma-separated scalar (a blank string binds nothing); otherwise
//! `name[0]`, `name[1]`, ... are bound until the first missing index.
//! Indexed children in the source that the scan never reached are fatal.
//! The first source that supplies a result wins.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::bind::aggregate::ElementBinder;
use crate::bind::bindable::{Bindable, TypeDescriptor};
use crate::bind::{Binder, Context};
use crate::error::BindError;
use crate::name::{NameForm, PropertyName};
use crate::source::ConfigurationPropertySource;

pub(crate) fn bind_indexed(
    binder: &Binder,
    element_binder: &ElementBinder<'_>,
    context: &mut Context,
    root: &PropertyName,
    element_type: &TypeDescriptor,
) -> Result<Option<Value>, BindError> {
    let mut result: Option<Vec<Value>> = None;
    for source in context.sources(binder) {
        bind_in_source(
            binder,
            element_binder,
            context,
            &source,
            root,
            element_type,
            &mut result,
        )?;
        if result.is_some() {
            break;
        }
    }
    Ok(result.map(Value::Array))
}

fn bind_in_source(
    binder: &Binder,
    element_binder: &ElementBinder<'_>,
    context: &mut Context,
    source: &Arc<dyn ConfigurationPropertySource>,
    root: &PropertyName,
    element_type: &TypeDescriptor,
    result: &mut Option<Vec<Value>>,
) -> Result<(), BindError> {
    if let Some(property) = source.get_property(root)? {
        context.set_property(property.clone());
        return bind_whole_value(binder, element_type, &property.value, result);
    }
    bind_indexed_children(binder, element_binder, context, source, root, element_type, result)
}

fn bind_whole_value(
    binder: &Binder,
    element_type: &TypeDescriptor,
    value: &Value,
    result: &mut Option<Vec<Value>>,
) -> Result<(), BindError> {
    let resolved = binder.placeholder_resolver().resolve(value)?;
    if let Value::String(text) = &resolved {
        if text.trim().is_empty() {
            return Ok(());
        }
    }
    let list_type = TypeDescriptor::list(element_type.clone());
    let converted = binder.converter().convert(&resolved, &list_type)?;
    if let Value::Array(elements) = converted {
        result.get_or_insert_with(Vec::new).extend(elements);
    }
    Ok(())
}

fn bind_indexed_children(
    binder: &Binder,
    element_binder: &ElementBinder<'_>,
    context: &mut Context,
    source: &Arc<dyn ConfigurationPropertySource>,
    root: &PropertyName,
    element_type: &TypeDescriptor,
    result: &mut Option<Vec<Value>>,
) -> Result<(), BindError> {
    let mut known = known_indexed_children(source, root)?;
    // Recursive element binds are only safe when the scan can prove which
    // children exist.
    let allow_recursive = source.is_enumerable();
    for index in 0.. {
        let child_name = root.append_index(index);
        let bindable = Bindable::of(element_type.clone());
        let bound =
            element_binder.bind(&child_name, &bindable, Some(source), allow_recursive, context)?;
        let Some(value) = bound else {
            break;
        };
        known.remove(&index.to_string());
        result.get_or_insert_with(Vec::new).push(value);
    }
    if !known.is_empty() {
        let mut names: Vec<String> = known
            .into_values()
            .flatten()
            .map(|name| name.to_string())
            .collect();
        names.sort();
        names.dedup();
        return Err(BindError::UnboundIndexedChildren { names });
    }
    Ok(())
}

/// Indexed children directly under `root`, keyed by their index text.
fn known_indexed_children(
    source: &Arc<dyn ConfigurationPropertySource>,
    root: &PropertyName,
) -> Result<HashMap<String, Vec<PropertyName>>, BindError> {
    let mut children: HashMap<String, Vec<PropertyName>> = HashMap::new();
    if !source.is_enumerable() {
        return Ok(children);
    }
    for name in source.property_names()? {
        if !root.is_ancestor_of(&name) {
            continue;
        }
        let chopped = name.chop(root.len() + 1);
        if chopped.is_last_element_indexed() {
            let key = chopped.last_element(NameForm::Uniform);
            children.entry(key).or_default().push(name);
        }
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MapSource, from_raw};

    #[test]
    fn collects_indexed_children_by_index() {
        let source = from_raw(Arc::new(
            MapSource::new("test")
                .with("list[0]", "a")
                .with("list[1].name", "b")
                .with("list[1].other", "c")
                .with("other", "d"),
        ));
        let root = PropertyName::of("list").unwrap();
        let children = known_indexed_children(&source, &root).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children["0"].len(), 1);
        assert_eq!(children["1"].len(), 2);
    }
}
