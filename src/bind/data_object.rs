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

//! Object construction strategies.
//!
//! A closed set, tried in fixed order: [`ValueObjectBinder`] for types
//! built through a single constructor with named parameters, then
//! [`StructBinder`] for mutable types bound property by property. Each
//! strategy offers `try_bind` (bind from properties; succeeds only when at
//! least one parameter or property bound) and `try_create` (build a pure
//! default instance for the create path).

use std::sync::Arc;

use serde_json::Value;

use crate::bind::bindable::{Bindable, ConstructorParameter, DataObjectDescriptor, TypeDescriptor};
use crate::bind::handler::BindHandler;
use crate::bind::{Binder, Context};
use crate::error::BindError;
use crate::name::PropertyName;

pub(crate) trait DataObjectBinder: Send + Sync {
    fn try_bind(
        &self,
        binder: &Binder,
        name: &PropertyName,
        target: &Bindable,
        descriptor: &Arc<DataObjectDescriptor>,
        handler: &dyn BindHandler,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError>;

    fn try_create(
        &self,
        binder: &Binder,
        target: &Bindable,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError>;
}

/// Binds one named child of a data object through the full pipeline.
struct PropertyBinder<'a> {
    binder: &'a Binder,
    handler: &'a dyn BindHandler,
    root: &'a PropertyName,
}

impl PropertyBinder<'_> {
    fn bind(
        &self,
        property_name: &str,
        target: &Bindable,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        let name = self.root.append(property_name)?;
        self.binder
            .bind_internal(&name, target, self.handler, context, false, false)
    }
}

/// Constructor-based strategy for immutable types.
pub(crate) struct ValueObjectBinder;

impl DataObjectBinder for ValueObjectBinder {
    fn try_bind(
        &self,
        binder: &Binder,
        name: &PropertyName,
        target: &Bindable,
        descriptor: &Arc<DataObjectDescriptor>,
        handler: &dyn BindHandler,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        let Some(parameters) = descriptor.constructor() else {
            return Ok(None);
        };
        // An existing instance rules out constructor binding.
        if target.has_value_supplier() {
            return Ok(None);
        }
        let property_binder = PropertyBinder {
            binder,
            handler,
            root: name,
        };
        context.with_constructor_binding(descriptor.name().to_string(), |context| {
            let mut args = serde_json::Map::with_capacity(parameters.len());
            let mut bound = false;
            for parameter in parameters {
                let bindable = Bindable::of(parameter.type_desc().clone());
                let value = property_binder.bind(parameter.name(), &bindable, context)?;
                bound |= value.is_some();
                let value = match value {
                    Some(value) => value,
                    None => default_value(binder, context, parameter)?.unwrap_or(Value::Null),
                };
                args.insert(parameter.name().to_string(), value);
            }
            context.clear_property();
            Ok(if bound { Some(Value::Object(args)) } else { None })
        })
    }

    fn try_create(
        &self,
        binder: &Binder,
        target: &Bindable,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        let Some(descriptor) = target.type_desc().as_object() else {
            return Ok(None);
        };
        let Some(parameters) = descriptor.constructor() else {
            return Ok(None);
        };
        let mut args = serde_json::Map::with_capacity(parameters.len());
        for parameter in parameters {
            let value = default_value(binder, context, parameter)?.unwrap_or(Value::Null);
            args.insert(parameter.name().to_string(), value);
        }
        Ok(Some(Value::Object(args)))
    }
}

/// The default for an unbound constructor parameter: `None` without a
/// marker, a best-effort empty instance for a bare marker, otherwise the
/// converted literals (retrying a single literal as a scalar when the
/// array conversion fails).
fn default_value(
    binder: &Binder,
    context: &mut Context,
    parameter: &ConstructorParameter,
) -> Result<Option<Value>, BindError> {
    match &parameter.default {
        None => Ok(None),
        Some(literals) if literals.is_empty() => {
            new_instance_if_possible(binder, context, parameter.type_desc()).map(Some)
        }
        Some(literals) => {
            let array = Value::Array(
                literals
                    .iter()
                    .map(|literal| Value::String(literal.clone()))
                    .collect(),
            );
            match binder.converter().convert(&array, parameter.type_desc()) {
                Ok(value) => Ok(Some(value)),
                Err(error) if literals.len() == 1 => {
                    let single = Value::String(literals[0].clone());
                    binder
                        .converter()
                        .convert(&single, parameter.type_desc())
                        .map(Some)
                        .map_err(|_| error)
                }
                Err(error) => Err(error),
            }
        }
    }
}

fn new_instance_if_possible(
    binder: &Binder,
    context: &mut Context,
    type_desc: &TypeDescriptor,
) -> Result<Value, BindError> {
    // Bare markers only work for object types that can be created empty.
    if type_desc.as_object().is_none() {
        return Err(BindError::UnsatisfiableDefault {
            type_name: type_desc.to_string(),
        });
    }
    let created = binder.create_instance(&Bindable::of(type_desc.clone()), context)?;
    created.ok_or_else(|| BindError::UnsatisfiableDefault {
        type_name: type_desc.to_string(),
    })
}

/// Property-based strategy for mutable types.
pub(crate) struct StructBinder;

impl DataObjectBinder for StructBinder {
    fn try_bind(
        &self,
        binder: &Binder,
        name: &PropertyName,
        target: &Bindable,
        descriptor: &Arc<DataObjectDescriptor>,
        handler: &dyn BindHandler,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        if descriptor.properties().is_empty() {
            return Ok(None);
        }
        // An existing instance is only bound onto when a source actually
        // reports children for this name.
        let has_known_bindable_properties =
            target.has_value_supplier() && binder.has_descendants(name, context)?;
        let existing = if has_known_bindable_properties {
            target.existing_value()
        } else {
            None
        };
        let mut instance = match existing {
            Some(Value::Object(map)) => map,
            Some(_) => return Ok(None),
            None => {
                if !descriptor.is_instantiable() {
                    return Ok(None);
                }
                descriptor.default_instance()
            }
        };
        let property_binder = PropertyBinder {
            binder,
            handler,
            root: name,
        };
        let mut bound = false;
        for property in descriptor.properties() {
            let current = instance
                .get(property.name())
                .filter(|value| !value.is_null())
                .cloned();
            let supplied = current.clone();
            let child = Bindable::of(property.type_desc().clone())
                .with_supplier(Arc::new(move || supplied.clone()));
            let Some(value) = property_binder.bind(property.name(), &child, context)? else {
                continue;
            };
            if property.is_settable() {
                instance.insert(property.name().to_string(), value);
            } else if current.as_ref() != Some(&value) {
                return Err(BindError::NoSetter {
                    property: property.name().to_string(),
                });
            }
            bound = true;
        }
        context.clear_property();
        Ok(if bound {
            Some(Value::Object(instance))
        } else {
            None
        })
    }

    fn try_create(
        &self,
        _binder: &Binder,
        target: &Bindable,
        _context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        let Some(descriptor) = target.type_desc().as_object() else {
            return Ok(None);
        };
        if descriptor.constructor().is_some() || !descriptor.is_instantiable() {
            return Ok(None);
        }
        Ok(Some(Value::Object(descriptor.default_instance())))
    }
}
