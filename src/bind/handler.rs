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

//! Bind lifecycle hooks.

use serde_json::Value;

use crate::bind::bindable::Bindable;
use crate::bind::Context;
use crate::error::BindError;
use crate::name::PropertyName;

/// Observes and steers a bind operation.
///
/// Hooks run at every level of the recursion, elements and nested
/// properties included. `on_start` may swap the target or abort the branch
/// by returning `None`. `on_success` may replace or discard the bound
/// value before conversion. `on_create` may replace a created instance.
/// `on_failure` is the only recovery point: returning `Ok` substitutes a
/// result (or `Ok(None)` for "bound nothing"), returning the error
/// propagates it. `on_finish` always runs last.
pub trait BindHandler {
    fn on_start(
        &self,
        _name: &PropertyName,
        target: &Bindable,
        _context: &Context,
    ) -> Option<Bindable> {
        Some(target.clone())
    }

    fn on_success(
        &self,
        _name: &PropertyName,
        _target: &Bindable,
        _context: &Context,
        result: Value,
    ) -> Option<Value> {
        Some(result)
    }

    fn on_create(
        &self,
        _name: &PropertyName,
        _target: &Bindable,
        _context: &Context,
        created: Option<Value>,
    ) -> Option<Value> {
        created
    }

    fn on_failure(
        &self,
        _name: &PropertyName,
        _target: &Bindable,
        _context: &Context,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        Err(error)
    }

    fn on_finish(
        &self,
        _name: &PropertyName,
        _target: &Bindable,
        _context: &Context,
        _result: Option<&Value>,
    ) {
    }
}

/// The default handler: every hook is a pass-through.
pub struct NoOpBindHandler;

impl BindHandler for NoOpBindHandler {}
