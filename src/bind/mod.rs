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

//! The binder: recursive binding of property trees onto declared targets.
//!
//! A [`Binder`] holds an ordered list of sources; the first source with a
//! direct match wins. [`Binder::bind`] resolves a name against the sources
//! and produces a [`BindResult`]; [`Binder::bind_or_create`] additionally
//! creates a default instance when nothing bound, or fails. All recursion
//! state lives in a per-invocation [`Context`], scoped strictly by
//! closure-passing so every push is popped on the way out.

mod aggregate;
pub mod bindable;
mod data_object;
pub mod handler;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::bind::aggregate::AggregateKind;
use crate::bind::bindable::Bindable;
use crate::bind::data_object::{DataObjectBinder, StructBinder, ValueObjectBinder};
use crate::bind::handler::{BindHandler, NoOpBindHandler};
use crate::convert::{Converter, DefaultConverter};
use crate::error::BindError;
use crate::name::PropertyName;
use crate::placeholder::{PlaceholderResolver, SourcePlaceholderResolver};
use crate::source::{
    ConfigurationProperty, ConfigurationPropertySource, PropertyState, RawSource,
    SourceAdapterCache, from_raw,
};

/// Outcome of a bind: either a bound value or nothing. Absence is not an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub struct BindResult(Option<Value>);

impl BindResult {
    pub(crate) fn of(value: Option<Value>) -> Self {
        BindResult(value)
    }

    pub fn is_bound(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.0
    }

    /// The bound value, or `default` when nothing bound.
    pub fn or_else(self, default: Value) -> Value {
        self.0.unwrap_or(default)
    }

    /// Deserializes the bound value into a concrete type.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<Option<T>, BindError> {
        match self.0 {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|_| {
                    BindError::conversion(value.to_string(), std::any::type_name::<T>())
                }),
        }
    }
}

/// Mutable state of one bind invocation.
///
/// Tracks the recursion depth, the types currently being bound (for cycle
/// detection), the constructor-binding stack, the last matched property
/// and an optional source override installed by aggregate binders. All
/// stack mutation happens through the `with_*` scope methods.
pub struct Context {
    depth: usize,
    source_override: Option<Arc<dyn ConfigurationPropertySource>>,
    source_push_count: usize,
    data_objects: Vec<String>,
    constructor_bindings: Vec<String>,
    property: Option<ConfigurationProperty>,
}

impl Context {
    fn new() -> Self {
        Context {
            depth: 0,
            source_override: None,
            source_push_count: 0,
            data_objects: Vec::new(),
            constructor_bindings: Vec::new(),
            property: None,
        }
    }

    /// Current recursion depth; 0 for the root bind.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The property most recently matched on this branch, if any.
    pub fn property(&self) -> Option<&ConfigurationProperty> {
        self.property.as_ref()
    }

    /// Whether a constructor-bound type is somewhere up the stack. Exposed
    /// for handlers; the built-in strategies do not consult it.
    pub fn is_nested_constructor_binding(&self) -> bool {
        !self.constructor_bindings.is_empty()
    }

    pub(crate) fn set_property(&mut self, property: ConfigurationProperty) {
        self.property = Some(property);
    }

    pub(crate) fn clear_property(&mut self) {
        self.property = None;
    }

    pub(crate) fn is_binding_data_object(&self, type_name: &str) -> bool {
        self.data_objects.iter().any(|name| name == type_name)
    }

    pub(crate) fn with_increased_depth<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn with_data_object<T>(
        &mut self,
        type_name: String,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.data_objects.push(type_name);
        let result = self.with_increased_depth(f);
        self.data_objects.pop();
        result
    }

    pub(crate) fn with_constructor_binding<T>(
        &mut self,
        type_name: String,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.constructor_bindings.push(type_name);
        let result = f(self);
        self.constructor_bindings.pop();
        result
    }

    /// Restricts lookups to `source` for the duration of `f`. `None`
    /// leaves the current view untouched.
    pub(crate) fn with_source<T>(
        &mut self,
        source: Option<Arc<dyn ConfigurationPropertySource>>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let Some(source) = source else {
            return f(self);
        };
        let previous = self.source_override.replace(source);
        self.source_push_count += 1;
        let result = f(self);
        self.source_push_count -= 1;
        self.source_override = previous;
        result
    }

    /// The sources visible on this branch: the override if one is pushed,
    /// otherwise the binder's full list.
    pub(crate) fn sources(&self, binder: &Binder) -> Vec<Arc<dyn ConfigurationPropertySource>> {
        if self.source_push_count > 0 {
            if let Some(source) = &self.source_override {
                return vec![source.clone()];
            }
        }
        binder.sources.clone()
    }
}

/// Binds configuration properties from ordered sources onto declared
/// targets.
pub struct Binder {
    sources: Vec<Arc<dyn ConfigurationPropertySource>>,
    placeholder_resolver: Arc<dyn PlaceholderResolver>,
    converter: Arc<dyn Converter>,
    data_object_binders: Vec<Box<dyn DataObjectBinder>>,
}

impl Binder {
    /// A binder with the default converter and a placeholder resolver
    /// backed by the same sources.
    pub fn new(sources: Vec<Arc<dyn ConfigurationPropertySource>>) -> Self {
        let placeholder_resolver = Arc::new(SourcePlaceholderResolver::new(sources.clone()));
        Self::with_components(sources, placeholder_resolver, Arc::new(DefaultConverter))
    }

    pub fn with_components(
        sources: Vec<Arc<dyn ConfigurationPropertySource>>,
        placeholder_resolver: Arc<dyn PlaceholderResolver>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        Binder {
            sources,
            placeholder_resolver,
            converter,
            data_object_binders: vec![Box::new(ValueObjectBinder), Box::new(StructBinder)],
        }
    }

    /// Adapts raw stores and builds a binder over them.
    pub fn from_raw_sources(raw: Vec<Arc<dyn RawSource>>) -> Self {
        Self::new(raw.into_iter().map(from_raw).collect())
    }

    /// Like [`Binder::from_raw_sources`] but reusing adapters from a
    /// shared cache.
    pub fn from_cached_sources(cache: &SourceAdapterCache, raw: &[Arc<dyn RawSource>]) -> Self {
        Self::new(raw.iter().map(|source| cache.adapt(source)).collect())
    }

    pub fn sources(&self) -> &[Arc<dyn ConfigurationPropertySource>] {
        &self.sources
    }

    /// Binds `name` onto `target`.
    pub fn bind(&self, name: &str, target: Bindable) -> Result<BindResult, BindError> {
        let name = PropertyName::of(name)?;
        self.bind_name(&name, &target, None)
    }

    /// Binds with a custom lifecycle handler.
    pub fn bind_with(
        &self,
        name: &str,
        target: Bindable,
        handler: &dyn BindHandler,
    ) -> Result<BindResult, BindError> {
        let name = PropertyName::of(name)?;
        self.bind_name(&name, &target, Some(handler))
    }

    pub fn bind_name(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: Option<&dyn BindHandler>,
    ) -> Result<BindResult, BindError> {
        let noop = NoOpBindHandler;
        let handler = handler.unwrap_or(&noop);
        let mut context = Context::new();
        let bound = self.bind_internal(name, target, handler, &mut context, false, false)?;
        Ok(BindResult::of(bound))
    }

    /// Binds `name` onto `target`, creating a default instance when
    /// nothing bound. Failing to create is an error.
    pub fn bind_or_create(&self, name: &str, target: Bindable) -> Result<Value, BindError> {
        self.bind_or_create_with(name, target, None)
    }

    pub fn bind_or_create_with(
        &self,
        name: &str,
        target: Bindable,
        handler: Option<&dyn BindHandler>,
    ) -> Result<Value, BindError> {
        let name = PropertyName::of(name)?;
        let noop = NoOpBindHandler;
        let handler = handler.unwrap_or(&noop);
        let mut context = Context::new();
        let bound = self.bind_internal(&name, &target, handler, &mut context, false, true)?;
        bound.ok_or_else(|| BindError::CannotCreate {
            type_name: target.type_desc().to_string(),
        })
    }

    pub(crate) fn converter(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    pub(crate) fn placeholder_resolver(&self) -> &dyn PlaceholderResolver {
        self.placeholder_resolver.as_ref()
    }

    pub(crate) fn bind_internal(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        allow_recursive: bool,
        create: bool,
    ) -> Result<Option<Value>, BindError> {
        match self.try_bind(name, target, handler, context, allow_recursive, create) {
            Ok(result) => Ok(result),
            Err(error) => self.handle_bind_error(name, target, handler, context, error),
        }
    }

    fn try_bind(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        allow_recursive: bool,
        create: bool,
    ) -> Result<Option<Value>, BindError> {
        let Some(target) = handler.on_start(name, target, context) else {
            return self.handle_bind_result(name, target, handler, context, None, create);
        };
        let bound = self.bind_object(name, &target, handler, context, allow_recursive)?;
        self.handle_bind_result(name, &target, handler, context, bound, create)
    }

    fn handle_bind_result(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        bound: Option<Value>,
        create: bool,
    ) -> Result<Option<Value>, BindError> {
        let mut result = match bound {
            Some(value) => match handler.on_success(name, target, context, value) {
                Some(value) => Some(self.converter.convert(&value, target.type_desc())?),
                None => None,
            },
            None => None,
        };
        if result.is_none() && create {
            let created = self.create_instance(target, context)?;
            result = match handler.on_create(name, target, context, created) {
                Some(value) => Some(self.converter.convert(&value, target.type_desc())?),
                None => None,
            };
            if result.is_none() {
                return Err(BindError::CannotCreate {
                    type_name: target.type_desc().to_string(),
                });
            }
        }
        handler.on_finish(name, target, context, result.as_ref());
        Ok(result)
    }

    fn handle_bind_error(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        match handler.on_failure(name, target, context, error) {
            Ok(Some(substitute)) => {
                Ok(Some(self.converter.convert(&substitute, target.type_desc())?))
            }
            Ok(None) => Ok(None),
            // Wrap once at the innermost failure boundary.
            Err(error @ BindError::Binding { .. }) => Err(error),
            Err(error) => Err(BindError::Binding {
                name: name.to_string(),
                property: context.property().cloned().map(Box::new),
                source: Box::new(error),
            }),
        }
    }

    fn bind_object(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        allow_recursive: bool,
    ) -> Result<Option<Value>, BindError> {
        let property = self.find_property(name, context)?;
        if property.is_none()
            && context.depth() != 0
            && self.contains_no_descendant_of(name, context)?
        {
            return Ok(None);
        }
        if let Some(kind) = AggregateKind::of(target.type_desc()) {
            return self.bind_aggregate(name, target, handler, context, kind);
        }
        if let Some(property) = property {
            return match self.bind_property(target, context, &property) {
                Ok(value) => Ok(Some(value)),
                Err(error) if error.is_conversion() => {
                    // A direct match may still describe a nested object
                    // whose children carry the real values.
                    if let Some(instance) =
                        self.bind_data_object(name, target, handler, context, allow_recursive)?
                    {
                        return Ok(Some(instance));
                    }
                    Err(error)
                }
                Err(error) => Err(error),
            };
        }
        self.bind_data_object(name, target, handler, context, allow_recursive)
    }

    fn bind_aggregate(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        kind: AggregateKind,
    ) -> Result<Option<Value>, BindError> {
        context.with_increased_depth(|context| {
            let bound = aggregate::bind(self, name, target, handler, context, &kind)?;
            match (bound, target.existing_value()) {
                (Some(additional), Some(existing)) => {
                    Ok(Some(aggregate::merge(&kind, existing, additional)))
                }
                (bound, _) => Ok(bound),
            }
        })
    }

    fn bind_data_object(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        context: &mut Context,
        allow_recursive: bool,
    ) -> Result<Option<Value>, BindError> {
        let Some(descriptor) = target.type_desc().as_object().cloned() else {
            return Ok(None);
        };
        if !allow_recursive && context.is_binding_data_object(descriptor.name()) {
            trace!(
                %name,
                type_name = descriptor.name(),
                "type already being bound, skipping recursive bind"
            );
            return Ok(None);
        }
        context.with_data_object(descriptor.name().to_string(), |context| {
            for strategy in &self.data_object_binders {
                if let Some(instance) =
                    strategy.try_bind(self, name, target, &descriptor, handler, context)?
                {
                    return Ok(Some(instance));
                }
            }
            Ok(None)
        })
    }

    pub(crate) fn create_instance(
        &self,
        target: &Bindable,
        context: &mut Context,
    ) -> Result<Option<Value>, BindError> {
        for strategy in &self.data_object_binders {
            if let Some(instance) = strategy.try_create(self, target, context)? {
                return Ok(Some(instance));
            }
        }
        Ok(None)
    }

    fn bind_property(
        &self,
        target: &Bindable,
        context: &mut Context,
        property: &ConfigurationProperty,
    ) -> Result<Value, BindError> {
        context.set_property(property.clone());
        trace!(name = %property.name, origin = %property.origin, "binding property");
        let resolved = self.placeholder_resolver.resolve(&property.value)?;
        self.converter.convert(&resolved, target.type_desc())
    }

    pub(crate) fn find_property(
        &self,
        name: &PropertyName,
        context: &Context,
    ) -> Result<Option<ConfigurationProperty>, BindError> {
        if name.is_empty() {
            return Ok(None);
        }
        for source in context.sources(self) {
            if let Some(property) = source.get_property(name)? {
                return Ok(Some(property));
            }
        }
        Ok(None)
    }

    fn contains_no_descendant_of(
        &self,
        name: &PropertyName,
        context: &Context,
    ) -> Result<bool, BindError> {
        for source in context.sources(self) {
            if source.contains_descendant_of(name)? != PropertyState::Absent {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether any visible source definitely contains descendants of
    /// `name`.
    pub(crate) fn has_descendants(
        &self,
        name: &PropertyName,
        context: &Context,
    ) -> Result<bool, BindError> {
        for source in context.sources(self) {
            if source.contains_descendant_of(name)? == PropertyState::Present {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
