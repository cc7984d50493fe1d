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

//! Translation between raw store keys and canonical property names.

use crate::name::{NameForm, PropertyName};

/// Maps between a store's native key spelling and canonical names.
///
/// `to_raw_keys` produces the candidate raw spellings for a point lookup;
/// `to_name` maps an enumerated raw key back to its canonical name, or
/// `None` when the key has no canonical representation.
pub trait PropertyMapper: Send + Sync {
    fn to_raw_keys(&self, name: &PropertyName) -> Vec<String>;

    fn to_name(&self, raw_key: &str) -> Option<PropertyName>;

    /// Ancestor relation used for descendant queries through this mapper.
    fn is_ancestor_of(&self, name: &PropertyName, candidate: &PropertyName) -> bool {
        name.is_ancestor_of(candidate)
    }

    /// Descendant tracking in the mapping cache is only enabled when every
    /// mapper answers ancestor queries with the default structural check.
    fn uses_default_ancestor_check(&self) -> bool {
        true
    }
}

/// Mapper for stores keyed by dotted canonical names.
pub struct DefaultMapper;

impl PropertyMapper for DefaultMapper {
    fn to_raw_keys(&self, name: &PropertyName) -> Vec<String> {
        vec![name.to_string()]
    }

    fn to_name(&self, raw_key: &str) -> Option<PropertyName> {
        PropertyName::of(raw_key).ok()
    }
}

/// Mapper for system-environment style stores.
///
/// `my.service.key-alpha` maps to the raw key `MY_SERVICE_KEYALPHA`;
/// enumerated keys map back with underscores as separators and all-digit
/// segments as numeric indexes, so `MY_LIST_0_NAME` becomes
/// `my.list[0].name`.
pub struct SystemEnvironmentMapper;

impl PropertyMapper for SystemEnvironmentMapper {
    fn to_raw_keys(&self, name: &PropertyName) -> Vec<String> {
        if name.is_empty() {
            return Vec::new();
        }
        let mut key = String::new();
        for i in 0..name.len() {
            if i > 0 {
                key.push('_');
            }
            key.push_str(&name.element(i, NameForm::Uniform).to_uppercase());
        }
        vec![key]
    }

    fn to_name(&self, raw_key: &str) -> Option<PropertyName> {
        let mut canonical = String::new();
        for segment in raw_key.split('_').filter(|s| !s.is_empty()) {
            if segment.bytes().all(|b| b.is_ascii_digit()) {
                canonical.push('[');
                canonical.push_str(segment);
                canonical.push(']');
            } else {
                if !canonical.is_empty() {
                    canonical.push('.');
                }
                canonical.push_str(&segment.to_lowercase());
            }
        }
        PropertyName::of(&canonical).ok()
    }

    fn uses_default_ancestor_check(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapper_round_trips_canonical_names() {
        let mapper = DefaultMapper;
        let name = PropertyName::of("server.hosts[0].name").unwrap();
        assert_eq!(mapper.to_raw_keys(&name), vec!["server.hosts[0].name"]);
        assert_eq!(mapper.to_name("server.hosts[0].name"), Some(name));
    }

    #[test]
    fn default_mapper_normalizes_relaxed_keys() {
        let mapper = DefaultMapper;
        assert_eq!(
            mapper.to_name("server.mainPort"),
            Some(PropertyName::of("server.main-port").unwrap())
        );
        assert_eq!(mapper.to_name("not a key"), None);
    }

    #[test]
    fn environment_mapper_renders_uppercase_keys() {
        let mapper = SystemEnvironmentMapper;
        let name = PropertyName::of("my.service.key-alpha").unwrap();
        assert_eq!(mapper.to_raw_keys(&name), vec!["MY_SERVICE_KEYALPHA"]);
        let indexed = PropertyName::of("my.list[0].name").unwrap();
        assert_eq!(mapper.to_raw_keys(&indexed), vec!["MY_LIST_0_NAME"]);
    }

    #[test]
    fn environment_mapper_parses_underscored_keys() {
        let mapper = SystemEnvironmentMapper;
        assert_eq!(
            mapper.to_name("MY_SERVICE_TIMEOUT"),
            Some(PropertyName::of("my.service.timeout").unwrap())
        );
        assert_eq!(
            mapper.to_name("MY_LIST_0_NAME"),
            Some(PropertyName::of("my.list[0].name").unwrap())
        );
        assert_eq!(
            mapper.to_name("_LEADING__DOUBLE_"),
            Some(PropertyName::of("leading.double").unwrap())
        );
    }

    #[test]
    fn environment_mapper_skips_the_descendant_table() {
        assert!(!SystemEnvironmentMapper.uses_default_ancestor_check());
        assert!(DefaultMapper.uses_default_ancestor_check());
    }
}
