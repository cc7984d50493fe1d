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

//! Configuration property sources.
//!
//! A [`RawSource`] is a plain key/value backing store with its own key
//! spelling (dotted, environment-variable style, anything). A
//! [`ConfigurationPropertySource`] is the canonical view the binder works
//! against: lookups by [`PropertyName`], descendant queries and, for
//! enumerable stores, iteration over canonical names. Adapters in
//! [`crate::source::adapter`] bridge the two.

mod adapter;
mod cache;
mod filtered;
mod mapper;

pub use adapter::{SourceAdapterCache, from_raw};
pub use filtered::FilteredSource;
pub use mapper::{DefaultMapper, PropertyMapper, SystemEnvironmentMapper};

use std::fmt;
use std::sync::RwLock;

use serde_json::Value;
use strum::Display;

use crate::error::BindError;
use crate::name::PropertyName;

/// Answer to a descendant query against a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PropertyState {
    /// The source definitely contains at least one descendant.
    Present,
    /// The source definitely contains no descendants.
    Absent,
    /// The source cannot answer; callers must assume descendants may exist.
    Unknown,
}

/// Where a bound value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub source: String,
    pub key: String,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key '{}' from source '{}'", self.key, self.source)
    }
}

/// A property found in a source: canonical name, raw value and origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationProperty {
    pub name: PropertyName,
    pub value: Value,
    pub origin: Origin,
}

/// A flat key/value backing store in its native key spelling.
///
/// Implementations perform no name translation; the adapters do that. An
/// enumerable store can list its keys, but availability is probed
/// explicitly through [`RawSource::probe_enumeration`] so that stores
/// backed by remote or restricted data can decline enumeration at runtime
/// without a failed listing.
pub trait RawSource: Send + Sync {
    fn name(&self) -> &str;

    /// The value stored under the exact raw key, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// All raw keys, in store order. Only called on enumerable stores.
    fn keys(&self) -> Vec<String>;

    /// Whether this store supports key enumeration at all.
    fn is_enumerable(&self) -> bool {
        true
    }

    /// Whether enumeration is currently available. Checked once, at
    /// adaptation time.
    fn probe_enumeration(&self) -> bool {
        self.is_enumerable()
    }

    /// Immutable stores never change; their name mappings are built once
    /// and frozen.
    fn is_immutable(&self) -> bool {
        false
    }

    /// System-environment stores get the environment mapper in front of
    /// the default mapper.
    fn is_system_environment(&self) -> bool {
        false
    }

    /// Random-value stores answer descendant queries for their namespace
    /// even though they cannot be enumerated.
    fn is_random(&self) -> bool {
        false
    }
}

/// The canonical-name view of a source that the binder consumes.
pub trait ConfigurationPropertySource: Send + Sync {
    fn name(&self) -> &str;

    /// The property stored under the canonical name, if any. The empty
    /// name never matches.
    fn get_property(&self, name: &PropertyName)
    -> Result<Option<ConfigurationProperty>, BindError>;

    /// Whether any property exists strictly below `name`.
    fn contains_descendant_of(&self, name: &PropertyName) -> Result<PropertyState, BindError>;

    /// Whether this source supports canonical-name iteration.
    fn is_enumerable(&self) -> bool {
        false
    }

    /// All canonical names, in store order. Empty for non-enumerable
    /// sources.
    fn property_names(&self) -> Result<Vec<PropertyName>, BindError> {
        Ok(Vec::new())
    }
}

/// An in-memory key/value store preserving insertion order.
///
/// The standard backing store for tests and programmatic configuration.
/// Mutable by default; flag it [`MapSource::immutable`] to let the adapter
/// freeze its name mappings.
pub struct MapSource {
    name: String,
    entries: RwLock<Vec<(String, Value)>>,
    immutable: bool,
    system_environment: bool,
    random: bool,
    enumerable: bool,
}

impl MapSource {
    pub fn new(name: impl Into<String>) -> Self {
        MapSource {
            name: name.into(),
            entries: RwLock::new(Vec::new()),
            immutable: false,
            system_environment: false,
            random: false,
            enumerable: true,
        }
    }

    /// Adds an entry, replacing any existing value under the same raw key.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn system_environment(mut self) -> Self {
        self.system_environment = true;
        self
    }

    pub fn random(mut self) -> Self {
        self.random = true;
        self.enumerable = false;
        self
    }

    /// Marks the store as point-lookup only.
    pub fn non_enumerable(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Inserts or replaces an entry after construction. Poisoned locks are
    /// unrecoverable here, so this panics if a writer panicked earlier.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            entries.push((key, value));
        }
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(k, _)| k != key);
    }
}

impl RawSource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|(k, _)| k.clone()).collect()
    }

    fn is_enumerable(&self) -> bool {
        self.enumerable
    }

    fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn is_system_environment(&self) -> bool {
        self.system_environment
    }

    fn is_random(&self) -> bool {
        self.random
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_source_preserves_insertion_order() {
        let source = MapSource::new("test")
            .with("b.second", 2)
            .with("a.first", 1);
        assert_eq!(source.keys(), vec!["b.second", "a.first"]);
    }

    #[test]
    fn map_source_replaces_existing_keys_in_place() {
        let source = MapSource::new("test").with("a", 1).with("b", 2);
        source.insert("a", 3);
        assert_eq!(source.get("a"), Some(Value::from(3)));
        assert_eq!(source.keys(), vec!["a", "b"]);
    }

    #[test]
    fn random_sources_are_not_enumerable() {
        let source = MapSource::new("random").random();
        assert!(!source.is_enumerable());
        assert!(!source.probe_enumeration());
        assert!(source.is_random());
    }
}
