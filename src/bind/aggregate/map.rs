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

//! Map binding.
//!
//! Entries are unioned across every source; the first source to supply a
//! key wins. Each entry bind runs against the full source list, so nested
//! values can still be assembled across sources. A direct match on the map
//! name itself converts wholesale, but only when no source has structural
//! children under it. Entry keys: a flat scalar map keeps the whole dotted
//! remainder (original spelling) as one key, a nested value contributes
//! the next single segment, a collection-valued entry is cut at its first
//! numeric index.

use std::sync::Arc;

use serde_json::Value;

use crate::bind::aggregate::ElementBinder;
use crate::bind::bindable::{Bindable, ScalarKind, TypeDescriptor};
use crate::bind::{Binder, Context};
use crate::error::BindError;
use crate::name::{NameForm, PropertyName};
use crate::source::{ConfigurationPropertySource, FilteredSource};

pub(crate) fn bind_map(
    binder: &Binder,
    element_binder: &ElementBinder<'_>,
    context: &mut Context,
    root: &PropertyName,
    target: &Bindable,
    key_type: &TypeDescriptor,
    value_type: &TypeDescriptor,
) -> Result<Option<Value>, BindError> {
    let map_type = target.type_desc().clone();
    let has_descendants = binder.has_descendants(root, context)?;
    let mut entries = serde_json::Map::new();
    for source in context.sources(binder) {
        let view = if root.is_empty() {
            source.clone()
        } else {
            if let Some(property) = source.get_property(root)? {
                if !has_descendants {
                    context.set_property(property.clone());
                    let resolved = binder.placeholder_resolver().resolve(&property.value)?;
                    return binder.converter().convert(&resolved, &map_type).map(Some);
                }
            }
            Arc::new(FilteredSource::new(source.clone(), root.clone()))
                as Arc<dyn ConfigurationPropertySource>
        };
        bind_entries(
            binder,
            element_binder,
            context,
            &view,
            root,
            &map_type,
            key_type,
            value_type,
            &mut entries,
        )?;
    }
    Ok(if entries.is_empty() {
        None
    } else {
        Some(Value::Object(entries))
    })
}

#[allow(clippy::too_many_arguments)]
fn bind_entries(
    binder: &Binder,
    element_binder: &ElementBinder<'_>,
    context: &mut Context,
    source: &Arc<dyn ConfigurationPropertySource>,
    root: &PropertyName,
    map_type: &TypeDescriptor,
    key_type: &TypeDescriptor,
    value_type: &TypeDescriptor,
    entries: &mut serde_json::Map<String, Value>,
) -> Result<(), BindError> {
    if !source.is_enumerable() {
        return Ok(());
    }
    let value_is_nested_map = matches!(value_type, TypeDescriptor::Any);
    for name in source.property_names()? {
        let value_bindable = if !root.is_parent_of(&name) && value_is_nested_map {
            Bindable::of(map_type.clone())
        } else {
            Bindable::of(value_type.clone())
        };
        let entry_name = entry_name(binder, source, root, &name, value_type)?;
        let key = key_of(root, &entry_name);
        if key.is_empty() || entries.contains_key(&key) {
            continue;
        }
        if !matches!(key_type, TypeDescriptor::Scalar(ScalarKind::String)) {
            binder
                .converter()
                .convert(&Value::String(key.clone()), key_type)?;
        }
        // Entry binds see the full source list so values union across
        // sources; the contains_key check above keeps the earliest win.
        if let Some(value) = element_binder.bind(&entry_name, &value_bindable, None, true, context)?
        {
            entries.insert(key, value);
        }
    }
    Ok(())
}

fn entry_name(
    binder: &Binder,
    source: &Arc<dyn ConfigurationPropertySource>,
    root: &PropertyName,
    name: &PropertyName,
    value_type: &TypeDescriptor,
) -> Result<PropertyName, BindError> {
    if matches!(
        value_type,
        TypeDescriptor::List(_) | TypeDescriptor::Array(_)
    ) {
        return Ok(chop_at_numeric_index(name, root.len() + 1));
    }
    let value_is_nested_map = matches!(value_type, TypeDescriptor::Any);
    if !root.is_parent_of(name)
        && (value_is_nested_map || !is_scalar_value(binder, source, name, value_type)?)
    {
        return Ok(name.chop(root.len() + 1));
    }
    Ok(name.clone())
}

fn chop_at_numeric_index(name: &PropertyName, from: usize) -> PropertyName {
    for index in from..name.len() {
        if name.is_numeric_index(index) {
            return name.chop(index);
        }
    }
    name.clone()
}

fn is_scalar_value(
    binder: &Binder,
    source: &Arc<dyn ConfigurationPropertySource>,
    name: &PropertyName,
    value_type: &TypeDescriptor,
) -> Result<bool, BindError> {
    if !value_type.is_scalar_like() {
        return Ok(false);
    }
    let Some(property) = source.get_property(name)? else {
        return Ok(false);
    };
    let resolved = binder.placeholder_resolver().resolve(&property.value)?;
    Ok(binder.converter().can_convert(&resolved, value_type))
}

/// The entry key: the segments after `root`, joined with dots in their
/// original spelling.
fn key_of(root: &PropertyName, entry_name: &PropertyName) -> String {
    let mut key = String::new();
    for index in root.len()..entry_name.len() {
        if !key.is_empty() {
            key.push('.');
        }
        key.push_str(&entry_name.element(index, NameForm::Original));
    }
    key
}
