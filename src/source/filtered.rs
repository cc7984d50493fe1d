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

//! A source view restricted to the descendants of one root name.

use std::sync::Arc;

use crate::error::BindError;
use crate::name::PropertyName;
use crate::source::{ConfigurationProperty, ConfigurationPropertySource, PropertyState};

/// Scopes an underlying source to names nested under `root`. Used by the
/// map binder so entry iteration only sees the subtree being bound.
pub struct FilteredSource {
    inner: Arc<dyn ConfigurationPropertySource>,
    root: PropertyName,
}

impl FilteredSource {
    pub fn new(inner: Arc<dyn ConfigurationPropertySource>, root: PropertyName) -> Self {
        FilteredSource { inner, root }
    }
}

impl ConfigurationPropertySource for FilteredSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get_property(
        &self,
        name: &PropertyName,
    ) -> Result<Option<ConfigurationProperty>, BindError> {
        if !self.root.is_ancestor_of(name) {
            return Ok(None);
        }
        self.inner.get_property(name)
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> Result<PropertyState, BindError> {
        self.inner.contains_descendant_of(name)
    }

    fn is_enumerable(&self) -> bool {
        self.inner.is_enumerable()
    }

    fn property_names(&self) -> Result<Vec<PropertyName>, BindError> {
        Ok(self
            .inner
            .property_names()?
            .into_iter()
            .filter(|name| self.root.is_ancestor_of(name))
            .collect())
    }
}
