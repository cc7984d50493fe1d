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

//! Binding error types.
//!
//! A missing property is never an error: lookups return `Ok(None)` and bind
//! operations return an unbound [`crate::bind::BindResult`]. Errors are
//! reserved for malformed names, failed conversions, structurally invalid
//! input and unsatisfiable targets.

use crate::source::ConfigurationProperty;
use thiserror::Error;

/// Errors produced while resolving and binding configuration properties.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("invalid configuration property name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("cannot convert value '{value}' to {target}")]
    Conversion { value: String, target: String },
    #[error("the elements {names:?} were left unbound")]
    UnboundIndexedChildren { names: Vec<String> },
    #[error("no setter found for property '{property}'")]
    NoSetter { property: String },
    #[error("parameter of type {type_name} must have a non-empty default value")]
    UnsatisfiableDefault { type_name: String },
    #[error("unable to create instance for type {type_name}")]
    CannotCreate { type_name: String },
    #[error("property source keys changed repeatedly while rebuilding name mappings")]
    ConcurrentSourceMutation,
    #[error("failed to bind properties under '{name}': {source}")]
    Binding {
        name: String,
        property: Option<Box<ConfigurationProperty>>,
        #[source]
        source: Box<BindError>,
    },
}

impl BindError {
    pub(crate) fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BindError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conversion(value: impl ToString, target: impl ToString) -> Self {
        BindError::Conversion {
            value: value.to_string(),
            target: target.to_string(),
        }
    }

    /// Whether this error came out of a value conversion. The binder retries
    /// such failures as nested-object binds before propagating them.
    pub fn is_conversion(&self) -> bool {
        matches!(self, BindError::Conversion { .. })
    }

    /// The name that failed to bind, when the error has been wrapped by the
    /// binder's failure boundary.
    pub fn bound_name(&self) -> Option<&str> {
        match self {
            BindError::Binding { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The property that was being processed when the bind failed, if any.
    pub fn bound_property(&self) -> Option<&ConfigurationProperty> {
        match self {
            BindError::Binding { property, .. } => property.as_deref(),
            _ => None,
        }
    }
}
