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

//! Hierarchical configuration binding.
//!
//! `propbind` maps flat, namespaced key/value entries from ordered sources
//! onto typed object graphs: relaxed name matching (`FOO_BAR`, `foo-bar`,
//! `fooBar` and `foo_bar` are the same key), cross-source precedence,
//! `${name:default}` placeholders, default values, collections, maps and
//! two object construction strategies.
//!
//! ```
//! use std::sync::Arc;
//! use propbind::{Bindable, Binder, TypeDescriptor};
//! use propbind::source::MapSource;
//!
//! let source = MapSource::new("app").with("server.port", "8080");
//! let binder = Binder::from_raw_sources(vec![Arc::new(source)]);
//! let port = binder
//!     .bind("server.port", Bindable::of(TypeDescriptor::uint()))?
//!     .deserialize::<u16>()?;
//! assert_eq!(port, Some(8080));
//! # Ok::<(), propbind::BindError>(())
//! ```

pub mod bind;
pub mod convert;
pub mod error;
pub mod name;
pub mod placeholder;
pub mod source;

pub use bind::bindable::{
    Bindable, ConstructorParameter, DataObjectDescriptor, EnumDescriptor, PropertyDescriptor,
    ScalarKind, TypeDescriptor, ValueSupplier,
};
pub use bind::handler::{BindHandler, NoOpBindHandler};
pub use bind::{BindResult, Binder, Context};
pub use convert::{Converter, DefaultConverter};
pub use error::BindError;
pub use name::{NameForm, PropertyName};
pub use placeholder::{NoOpResolver, PlaceholderResolver, SourcePlaceholderResolver};
pub use source::{
    ConfigurationProperty, ConfigurationPropertySource, MapSource, Origin, PropertyState,
    RawSource, SourceAdapterCache, from_raw,
};
