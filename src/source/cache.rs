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

//! Name-mapping cache for enumerable sources.
//!
//! Maps every raw key of a store to its canonical [`PropertyName`] and
//! back, plus an ancestor table for descendant queries. Mappings are built
//! lazily and reused while the store's key snapshot is unchanged. Immutable
//! stores are built once and frozen. A store mutating concurrently with a
//! rebuild is detected by comparing the key snapshot before and after the
//! build; the rebuild is retried a bounded number of times before giving
//! up with [`BindError::ConcurrentSourceMutation`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{trace, warn};

use crate::error::BindError;
use crate::name::PropertyName;
use crate::source::mapper::PropertyMapper;
use crate::source::RawSource;

const MAX_REBUILD_ATTEMPTS: usize = 10;

pub(crate) struct MappingCache {
    immutable: bool,
    track_descendants: bool,
    state: RwLock<Option<Arc<Mappings>>>,
}

#[derive(Debug)]
pub(crate) struct Mappings {
    canonical_to_raw: HashMap<PropertyName, Vec<String>>,
    descendants: HashMap<PropertyName, Vec<PropertyName>>,
    names: Vec<PropertyName>,
    snapshot: Vec<String>,
}

impl MappingCache {
    pub(crate) fn new(immutable: bool, track_descendants: bool) -> Self {
        MappingCache {
            immutable,
            track_descendants,
            state: RwLock::new(None),
        }
    }

    /// Current mappings, rebuilding first if the store's keys changed.
    pub(crate) fn get(
        &self,
        raw: &dyn RawSource,
        mappers: &[Arc<dyn PropertyMapper>],
    ) -> Result<Arc<Mappings>, BindError> {
        {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            if let Some(mappings) = state.as_ref() {
                if self.immutable || mappings.snapshot == raw.keys() {
                    return Ok(mappings.clone());
                }
            }
        }
        self.rebuild(raw, mappers)
    }

    fn rebuild(
        &self,
        raw: &dyn RawSource,
        mappers: &[Arc<dyn PropertyMapper>],
    ) -> Result<Arc<Mappings>, BindError> {
        for attempt in 1..=MAX_REBUILD_ATTEMPTS {
            let before = raw.keys();
            let mappings = Mappings::build(mappers, &before, self.track_descendants);
            if raw.keys() == before {
                trace!(
                    source = raw.name(),
                    keys = before.len(),
                    "rebuilt name mappings"
                );
                let mappings = Arc::new(mappings);
                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                *state = Some(mappings.clone());
                return Ok(mappings);
            }
            trace!(
                source = raw.name(),
                attempt,
                "source keys changed during mapping rebuild, retrying"
            );
        }
        warn!(
            source = raw.name(),
            attempts = MAX_REBUILD_ATTEMPTS,
            "giving up on name mapping rebuild"
        );
        Err(BindError::ConcurrentSourceMutation)
    }
}

impl Mappings {
    fn build(mappers: &[Arc<dyn PropertyMapper>], keys: &[String], track: bool) -> Self {
        let mut canonical_to_raw: HashMap<PropertyName, Vec<String>> = HashMap::new();
        let mut mapped_keys: HashSet<&str> = HashSet::new();
        let mut descendants: HashMap<PropertyName, Vec<PropertyName>> = HashMap::new();
        let mut names = Vec::new();
        // Earlier mappers win per raw key.
        for mapper in mappers {
            for key in keys {
                if mapped_keys.contains(key.as_str()) {
                    continue;
                }
                let Some(name) = mapper.to_name(key) else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                mapped_keys.insert(key.as_str());
                canonical_to_raw
                    .entry(name.clone())
                    .or_default()
                    .push(key.clone());
                if track {
                    let mut parent = name.parent();
                    while !parent.is_empty() {
                        descendants
                            .entry(parent.clone())
                            .or_default()
                            .push(name.clone());
                        parent = parent.parent();
                    }
                }
                names.push(name);
            }
        }
        Mappings {
            canonical_to_raw,
            descendants,
            names,
            snapshot: keys.to_vec(),
        }
    }

    /// Raw key spellings recorded for a canonical name.
    pub(crate) fn raw_keys_for(&self, name: &PropertyName) -> &[String] {
        self.canonical_to_raw
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn names(&self) -> &[PropertyName] {
        &self.names
    }

    /// Only meaningful when descendant tracking was enabled at build time.
    pub(crate) fn has_descendant(&self, name: &PropertyName) -> bool {
        self.descendants.contains_key(name)
    }

    pub(crate) fn has_any_mapping(&self) -> bool {
        !self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mapper::{DefaultMapper, SystemEnvironmentMapper};
    use crate::source::MapSource;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn default_mappers() -> Vec<Arc<dyn PropertyMapper>> {
        vec![Arc::new(DefaultMapper)]
    }

    #[test]
    fn builds_canonical_and_reverse_mappings() {
        let source = MapSource::new("test")
            .with("server.port", 8080)
            .with("server.mainHost", "localhost");
        let cache = MappingCache::new(false, true);
        let mappings = cache.get(&source, &default_mappers()).unwrap();
        let canonical = PropertyName::of("server.main-host").unwrap();
        assert_eq!(mappings.raw_keys_for(&canonical), ["server.mainHost"]);
        assert_eq!(mappings.names().len(), 2);
    }

    #[test]
    fn tracks_every_ancestor() {
        let source = MapSource::new("test").with("a.b.c.d", 1);
        let cache = MappingCache::new(false, true);
        let mappings = cache.get(&source, &default_mappers()).unwrap();
        for ancestor in ["a", "a.b", "a.b.c"] {
            assert!(mappings.has_descendant(&PropertyName::of(ancestor).unwrap()));
        }
        assert!(!mappings.has_descendant(&PropertyName::of("a.b.c.d").unwrap()));
        assert!(!mappings.has_descendant(&PropertyName::of("x").unwrap()));
    }

    #[test]
    fn rebuilds_when_keys_change() {
        let source = MapSource::new("test").with("first", 1);
        let cache = MappingCache::new(false, true);
        let before = cache.get(&source, &default_mappers()).unwrap();
        assert_eq!(before.names().len(), 1);
        source.insert("second", 2);
        let after = cache.get(&source, &default_mappers()).unwrap();
        assert_eq!(after.names().len(), 2);
    }

    #[test]
    fn immutable_sources_are_built_once() {
        let source = MapSource::new("test").with("first", 1).immutable();
        let cache = MappingCache::new(true, true);
        let before = cache.get(&source, &default_mappers()).unwrap();
        // An immutable store should never change; if it does anyway, the
        // frozen mappings keep serving the original snapshot.
        source.insert("second", 2);
        let after = cache.get(&source, &default_mappers()).unwrap();
        assert_eq!(before.names().len(), 1);
        assert_eq!(after.names().len(), 1);
    }

    /// Reports a different key set on every call.
    struct FlappingSource {
        calls: AtomicUsize,
    }

    impl RawSource for FlappingSource {
        fn name(&self) -> &str {
            "flapping"
        }

        fn get(&self, _key: &str) -> Option<Value> {
            None
        }

        fn keys(&self) -> Vec<String> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            vec![format!("key-{call}")]
        }
    }

    #[test]
    fn endless_key_churn_is_fatal_after_the_retry_ceiling() {
        let source = FlappingSource {
            calls: AtomicUsize::new(0),
        };
        let cache = MappingCache::new(false, true);
        let error = cache.get(&source, &default_mappers()).unwrap_err();
        assert!(matches!(error, BindError::ConcurrentSourceMutation));
    }

    /// Changes its key set once, between the first two listings.
    struct SettlingSource {
        calls: AtomicUsize,
    }

    impl RawSource for SettlingSource {
        fn name(&self) -> &str {
            "settling"
        }

        fn get(&self, _key: &str) -> Option<Value> {
            None
        }

        fn keys(&self) -> Vec<String> {
            if self.calls.fetch_add(1, Ordering::Relaxed) == 0 {
                vec!["early".to_string()]
            } else {
                vec!["early".to_string(), "late".to_string()]
            }
        }
    }

    #[test]
    fn a_single_key_change_mid_rebuild_is_retried() {
        let source = SettlingSource {
            calls: AtomicUsize::new(0),
        };
        let cache = MappingCache::new(false, true);
        let mappings = cache.get(&source, &default_mappers()).unwrap();
        assert_eq!(mappings.names().len(), 2);
    }

    #[test]
    fn earlier_mappers_win_per_key() {
        let source = MapSource::new("test").with("MY_PROP", 1);
        let mappers: Vec<Arc<dyn PropertyMapper>> =
            vec![Arc::new(SystemEnvironmentMapper), Arc::new(DefaultMapper)];
        let cache = MappingCache::new(false, false);
        let mappings = cache.get(&source, &mappers).unwrap();
        let canonical = PropertyName::of("my.prop").unwrap();
        assert_eq!(mappings.raw_keys_for(&canonical), ["MY_PROP"]);
    }
}
