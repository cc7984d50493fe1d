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

//! Bind targets and their type descriptors.
//!
//! There is no runtime type introspection, so the shape of a bind target
//! is declared up front: a [`TypeDescriptor`] for scalars, enums and
//! aggregates, and a [`DataObjectDescriptor`] for object types. An object
//! declares either a single constructor with named parameters (bound
//! immutably, with optional default-value markers) or a set of named
//! properties (bound onto an instance, settable or read-only). Parameter
//! and property names are stored in dashed form regardless of how they
//! were declared.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use strum::Display;

use crate::name::to_dashed_form;

/// Scalar target kinds understood by the default converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarKind {
    String,
    Bool,
    Int,
    UInt,
    Float,
    /// Humantime-style durations, normalized to whole milliseconds.
    Duration,
}

/// The declared shape of a bind target.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    /// Accepts any value unchanged.
    Any,
    Scalar(ScalarKind),
    Enum(Arc<EnumDescriptor>),
    List(Box<TypeDescriptor>),
    Array(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Object(Arc<DataObjectDescriptor>),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        TypeDescriptor::Scalar(ScalarKind::String)
    }

    pub fn bool() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Bool)
    }

    pub fn int() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Int)
    }

    pub fn uint() -> Self {
        TypeDescriptor::Scalar(ScalarKind::UInt)
    }

    pub fn float() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Float)
    }

    pub fn duration() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Duration)
    }

    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(key), Box::new(value))
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        TypeDescriptor::Enum(Arc::new(EnumDescriptor {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }))
    }

    pub fn object(descriptor: Arc<DataObjectDescriptor>) -> Self {
        TypeDescriptor::Object(descriptor)
    }

    /// Whether values of this type convert from a single scalar entry.
    pub fn is_scalar_like(&self) -> bool {
        matches!(self, TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::List(_) | TypeDescriptor::Array(_) | TypeDescriptor::Map(_, _)
        )
    }

    pub fn as_object(&self) -> Option<&Arc<DataObjectDescriptor>> {
        match self {
            TypeDescriptor::Object(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Any => write!(f, "any"),
            TypeDescriptor::Scalar(kind) => write!(f, "{kind}"),
            TypeDescriptor::Enum(descriptor) => write!(f, "enum {}", descriptor.name),
            TypeDescriptor::List(element) => write!(f, "list<{element}>"),
            TypeDescriptor::Array(element) => write!(f, "array<{element}>"),
            TypeDescriptor::Map(key, value) => write!(f, "map<{key}, {value}>"),
            TypeDescriptor::Object(descriptor) => write!(f, "{}", descriptor.name),
        }
    }
}

/// A closed set of named variants.
#[derive(Debug)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<String>,
}

/// A constructor parameter: dashed name, type and optional default marker.
///
/// `default` of `None` means no marker; an empty literal list means a bare
/// marker (bind a best-effort empty instance); literals are converted to
/// the parameter type when the parameter is otherwise unbound.
#[derive(Debug, Clone)]
pub struct ConstructorParameter {
    pub(crate) name: String,
    pub(crate) type_desc: TypeDescriptor,
    pub(crate) default: Option<Vec<String>>,
}

impl ConstructorParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_desc(&self) -> &TypeDescriptor {
        &self.type_desc
    }
}

/// A named property of a mutable object type.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) type_desc: TypeDescriptor,
    pub(crate) settable: bool,
    pub(crate) initial: Option<Value>,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_desc(&self) -> &TypeDescriptor {
        &self.type_desc
    }

    pub fn is_settable(&self) -> bool {
        self.settable
    }
}

/// The declared shape of an object bind target.
#[derive(Debug)]
pub struct DataObjectDescriptor {
    name: String,
    constructor: Option<Vec<ConstructorParameter>>,
    properties: Vec<PropertyDescriptor>,
    instantiable: bool,
}

impl DataObjectDescriptor {
    /// Starts a descriptor for an immutable type built through a single
    /// constructor with named parameters.
    pub fn value_object(name: impl Into<String>) -> ValueObjectBuilder {
        ValueObjectBuilder {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Starts a descriptor for a mutable type bound through its properties.
    pub fn structure(name: impl Into<String>) -> StructBuilder {
        StructBuilder {
            name: name.into(),
            properties: Vec::new(),
            instantiable: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructor(&self) -> Option<&[ConstructorParameter]> {
        self.constructor.as_deref()
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Whether an instance can be created without binding anything.
    pub fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    /// A fresh instance carrying the declared initial property values.
    pub(crate) fn default_instance(&self) -> Map<String, Value> {
        self.properties
            .iter()
            .map(|property| {
                (
                    property.name.clone(),
                    property.initial.clone().unwrap_or(Value::Null),
                )
            })
            .collect()
    }
}

pub struct ValueObjectBuilder {
    name: String,
    parameters: Vec<ConstructorParameter>,
}

impl ValueObjectBuilder {
    pub fn parameter(mut self, name: &str, type_desc: TypeDescriptor) -> Self {
        self.parameters.push(ConstructorParameter {
            name: to_dashed_form(name),
            type_desc,
            default: None,
        });
        self
    }

    /// A parameter with default literals applied when nothing binds. Pass
    /// an empty slice for a bare marker.
    pub fn parameter_with_default(
        mut self,
        name: &str,
        type_desc: TypeDescriptor,
        literals: &[&str],
    ) -> Self {
        self.parameters.push(ConstructorParameter {
            name: to_dashed_form(name),
            type_desc,
            default: Some(literals.iter().map(|l| l.to_string()).collect()),
        });
        self
    }

    pub fn build(self) -> Arc<DataObjectDescriptor> {
        debug_assert!(
            !self.parameters.is_empty(),
            "a value object needs at least one constructor parameter"
        );
        Arc::new(DataObjectDescriptor {
            name: self.name,
            constructor: Some(self.parameters),
            properties: Vec::new(),
            instantiable: false,
        })
    }
}

pub struct StructBuilder {
    name: String,
    properties: Vec<PropertyDescriptor>,
    instantiable: bool,
}

impl StructBuilder {
    pub fn property(mut self, name: &str, type_desc: TypeDescriptor) -> Self {
        self.properties.push(PropertyDescriptor {
            name: to_dashed_form(name),
            type_desc,
            settable: true,
            initial: None,
        });
        self
    }

    pub fn property_with_initial(
        mut self,
        name: &str,
        type_desc: TypeDescriptor,
        initial: Value,
    ) -> Self {
        self.properties.push(PropertyDescriptor {
            name: to_dashed_form(name),
            type_desc,
            settable: true,
            initial: Some(initial),
        });
        self
    }

    /// A property that can be read but never written. Binding a value that
    /// differs from its current value is an error.
    pub fn read_only(mut self, name: &str, type_desc: TypeDescriptor, initial: Value) -> Self {
        self.properties.push(PropertyDescriptor {
            name: to_dashed_form(name),
            type_desc,
            settable: false,
            initial: Some(initial),
        });
        self
    }

    /// Marks the type as impossible to create from scratch; binding then
    /// requires an existing instance.
    pub fn not_instantiable(mut self) -> Self {
        self.instantiable = false;
        self
    }

    pub fn build(self) -> Arc<DataObjectDescriptor> {
        Arc::new(DataObjectDescriptor {
            name: self.name,
            constructor: None,
            properties: self.properties,
            instantiable: self.instantiable,
        })
    }
}

/// Supplies the existing value of a bind target, if one is available.
pub type ValueSupplier = Arc<dyn Fn() -> Option<Value> + Send + Sync>;

/// A bind target: a type descriptor plus an optional existing value.
#[derive(Clone)]
pub struct Bindable {
    type_desc: TypeDescriptor,
    value: Option<ValueSupplier>,
}

impl Bindable {
    pub fn of(type_desc: TypeDescriptor) -> Self {
        Bindable {
            type_desc,
            value: None,
        }
    }

    /// Attaches an existing instance to bind onto or merge with.
    pub fn with_existing(mut self, value: Value) -> Self {
        self.value = Some(Arc::new(move || Some(value.clone())));
        self
    }

    /// Attaches a lazy existing-value supplier.
    pub fn with_supplier(mut self, supplier: ValueSupplier) -> Self {
        self.value = Some(supplier);
        self
    }

    pub fn type_desc(&self) -> &TypeDescriptor {
        &self.type_desc
    }

    /// Whether an existing-value supplier is attached at all.
    pub fn has_value_supplier(&self) -> bool {
        self.value.is_some()
    }

    /// The existing value, if a supplier is attached and produces one.
    pub fn existing_value(&self) -> Option<Value> {
        self.value.as_ref().and_then(|supplier| supplier())
    }
}

impl fmt::Debug for Bindable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindable")
            .field("type", &self.type_desc.to_string())
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_names_are_dashed() {
        let descriptor = DataObjectDescriptor::structure("Server")
            .property("mainHost", TypeDescriptor::string())
            .property("idle_timeout", TypeDescriptor::duration())
            .build();
        let names: Vec<&str> = descriptor.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["main-host", "idle-timeout"]);
    }

    #[test]
    fn default_instance_carries_initial_values() {
        let descriptor = DataObjectDescriptor::structure("Server")
            .property_with_initial("host", TypeDescriptor::string(), json!("localhost"))
            .property("port", TypeDescriptor::uint())
            .build();
        let instance = descriptor.default_instance();
        assert_eq!(instance["host"], json!("localhost"));
        assert_eq!(instance["port"], Value::Null);
    }

    #[test]
    fn bindable_value_supplier_is_lazy() {
        let bindable = Bindable::of(TypeDescriptor::string());
        assert!(!bindable.has_value_supplier());
        assert_eq!(bindable.existing_value(), None);
        let bindable = bindable.with_existing(json!("hello"));
        assert!(bindable.has_value_supplier());
        assert_eq!(bindable.existing_value(), Some(json!("hello")));
    }

    #[test]
    fn type_descriptor_display() {
        let descriptor = TypeDescriptor::map(
            TypeDescriptor::string(),
            TypeDescriptor::list(TypeDescriptor::int()),
        );
        assert_eq!(descriptor.to_string(), "map<string, list<int>>");
    }
}
