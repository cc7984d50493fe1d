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

//! Adapters from raw stores to canonical property sources.
//!
//! [`from_raw`] picks the adapter: enumerable stores get the mapping-cache
//! backed adapter with relaxed-spelling lookups and real descendant
//! answers; everything else gets a point-lookup adapter that answers
//! descendant queries `Unknown` (except recognized random-value
//! namespaces). System-environment stores are queried through the
//! environment mapper before the default mapper.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::error::BindError;
use crate::name::{NameForm, PropertyName};
use crate::source::cache::MappingCache;
use crate::source::mapper::{DefaultMapper, PropertyMapper, SystemEnvironmentMapper};
use crate::source::{
    ConfigurationProperty, ConfigurationPropertySource, Origin, PropertyState, RawSource,
};

/// Adapts a raw store into the canonical source the binder consumes.
pub fn from_raw(raw: Arc<dyn RawSource>) -> Arc<dyn ConfigurationPropertySource> {
    let mappers: Vec<Arc<dyn PropertyMapper>> = if raw.is_system_environment() {
        vec![Arc::new(SystemEnvironmentMapper), Arc::new(DefaultMapper)]
    } else {
        vec![Arc::new(DefaultMapper)]
    };
    if raw.is_enumerable() && raw.probe_enumeration() {
        let track = mappers.iter().all(|m| m.uses_default_ancestor_check());
        debug!(
            source = raw.name(),
            track_descendants = track,
            "adapting enumerable source"
        );
        Arc::new(EnumerableAdapter {
            cache: MappingCache::new(raw.is_immutable(), track),
            track_descendants: track,
            raw,
            mappers,
        })
    } else {
        debug!(source = raw.name(), "adapting point-lookup source");
        Arc::new(PointLookupAdapter { raw, mappers })
    }
}

fn lookup(
    raw: &dyn RawSource,
    mappers: &[Arc<dyn PropertyMapper>],
    name: &PropertyName,
) -> Option<ConfigurationProperty> {
    if name.is_empty() {
        return None;
    }
    for mapper in mappers {
        for key in mapper.to_raw_keys(name) {
            if let Some(value) = raw.get(&key) {
                trace!(source = raw.name(), %name, key, "found property");
                return Some(ConfigurationProperty {
                    name: name.clone(),
                    value,
                    origin: Origin {
                        source: raw.name().to_string(),
                        key,
                    },
                });
            }
        }
    }
    None
}

/// Random-value namespaces cannot be enumerated but still claim their own
/// subtree, keyed by the store name.
fn random_descendant_state(raw: &dyn RawSource, name: &PropertyName) -> PropertyState {
    if name.len() > 1 && name.element(0, NameForm::Dashed) == raw.name() {
        PropertyState::Present
    } else {
        PropertyState::Absent
    }
}

struct PointLookupAdapter {
    raw: Arc<dyn RawSource>,
    mappers: Vec<Arc<dyn PropertyMapper>>,
}

impl ConfigurationPropertySource for PointLookupAdapter {
    fn name(&self) -> &str {
        self.raw.name()
    }

    fn get_property(
        &self,
        name: &PropertyName,
    ) -> Result<Option<ConfigurationProperty>, BindError> {
        Ok(lookup(self.raw.as_ref(), &self.mappers, name))
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> Result<PropertyState, BindError> {
        if self.raw.is_random() {
            return Ok(random_descendant_state(self.raw.as_ref(), name));
        }
        Ok(PropertyState::Unknown)
    }
}

struct EnumerableAdapter {
    raw: Arc<dyn RawSource>,
    mappers: Vec<Arc<dyn PropertyMapper>>,
    cache: MappingCache,
    track_descendants: bool,
}

impl ConfigurationPropertySource for EnumerableAdapter {
    fn name(&self) -> &str {
        self.raw.name()
    }

    fn get_property(
        &self,
        name: &PropertyName,
    ) -> Result<Option<ConfigurationProperty>, BindError> {
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(property) = lookup(self.raw.as_ref(), &self.mappers, name) {
            return Ok(Some(property));
        }
        // Alternate raw spellings recorded by the mapping cache.
        let mappings = self.cache.get(self.raw.as_ref(), &self.mappers)?;
        for key in mappings.raw_keys_for(name) {
            if let Some(value) = self.raw.get(key) {
                trace!(source = self.raw.name(), %name, key, "found property via mapping");
                return Ok(Some(ConfigurationProperty {
                    name: name.clone(),
                    value,
                    origin: Origin {
                        source: self.raw.name().to_string(),
                        key: key.clone(),
                    },
                }));
            }
        }
        Ok(None)
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> Result<PropertyState, BindError> {
        if self.raw.is_random() {
            return Ok(random_descendant_state(self.raw.as_ref(), name));
        }
        let mappings = self.cache.get(self.raw.as_ref(), &self.mappers)?;
        if name.is_empty() {
            return Ok(if mappings.has_any_mapping() {
                PropertyState::Present
            } else {
                PropertyState::Absent
            });
        }
        if self.track_descendants {
            return Ok(if mappings.has_descendant(name) {
                PropertyState::Present
            } else {
                PropertyState::Absent
            });
        }
        for candidate in mappings.names() {
            for mapper in &self.mappers {
                if mapper.is_ancestor_of(name, candidate) {
                    return Ok(PropertyState::Present);
                }
            }
        }
        Ok(PropertyState::Absent)
    }

    fn is_enumerable(&self) -> bool {
        true
    }

    fn property_names(&self) -> Result<Vec<PropertyName>, BindError> {
        let mappings = self.cache.get(self.raw.as_ref(), &self.mappers)?;
        Ok(mappings.names().to_vec())
    }
}

struct CacheEntry {
    raw: Arc<dyn RawSource>,
    adapted: Arc<dyn ConfigurationPropertySource>,
}

/// Memoizes [`from_raw`] per raw store identity, so repeated binder
/// sessions over the same stores reuse the adapters and their mapping
/// caches.
#[derive(Default)]
pub struct SourceAdapterCache {
    cache: DashMap<usize, CacheEntry>,
}

impl SourceAdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapt(&self, raw: &Arc<dyn RawSource>) -> Arc<dyn ConfigurationPropertySource> {
        let key = Arc::as_ptr(raw) as *const () as usize;
        if let Some(entry) = self.cache.get(&key) {
            if Arc::ptr_eq(&entry.raw, raw) {
                return entry.adapted.clone();
            }
        }
        let adapted = from_raw(raw.clone());
        self.cache.insert(
            key,
            CacheEntry {
                raw: raw.clone(),
                adapted: adapted.clone(),
            },
        );
        adapted
    }
}
