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

use std::sync::Arc;

use propbind::source::MapSource;
use propbind::{
    BindError, Bindable, Binder, DataObjectDescriptor, RawSource, SourceAdapterCache,
    TypeDescriptor,
};
use serde::Deserialize;
use serde_json::json;

fn binder_over(sources: Vec<MapSource>) -> Binder {
    Binder::from_raw_sources(
        sources
            .into_iter()
            .map(|source| Arc::new(source) as Arc<dyn RawSource>)
            .collect(),
    )
}

#[test]
fn all_naming_conventions_bind_the_same_property() {
    let descriptor = DataObjectDescriptor::structure("Service")
        .property("keyAlpha", TypeDescriptor::string())
        .build();
    let spellings = [
        ("my.service.key-alpha", "dashed"),
        ("my.service.keyAlpha", "camel"),
        ("my.service.key_alpha", "snake"),
    ];
    for (key, label) in spellings {
        let binder = binder_over(vec![MapSource::new("test").with(key, "v")]);
        let result = binder
            .bind(
                "my.service",
                Bindable::of(TypeDescriptor::object(descriptor.clone())),
            )
            .unwrap();
        assert_eq!(
            result.into_value(),
            Some(json!({"key-alpha": "v"})),
            "spelling: {label}"
        );
    }
    let env = MapSource::new("env")
        .with("MY_SERVICE_KEYALPHA", "v")
        .system_environment();
    let result = binder_over(vec![env])
        .bind(
            "my.service",
            Bindable::of(TypeDescriptor::object(descriptor)),
        )
        .unwrap();
    assert_eq!(result.into_value(), Some(json!({"key-alpha": "v"})));
}

#[test]
fn earlier_sources_shadow_later_ones() {
    let binder = binder_over(vec![
        MapSource::new("override").with("app.name", "first"),
        MapSource::new("defaults")
            .with("app.name", "second")
            .with("app.version", "1.0"),
    ]);
    let name = binder
        .bind("app.name", Bindable::of(TypeDescriptor::string()))
        .unwrap();
    assert_eq!(name.into_value(), Some(json!("first")));
    let version = binder
        .bind("app.version", Bindable::of(TypeDescriptor::string()))
        .unwrap();
    assert_eq!(version.into_value(), Some(json!("1.0")));
}

#[test]
fn binding_is_idempotent() {
    let descriptor = DataObjectDescriptor::structure("Server")
        .property("host", TypeDescriptor::string())
        .property("port", TypeDescriptor::uint())
        .build();
    let binder = binder_over(vec![
        MapSource::new("test")
            .with("server.host", "example.org")
            .with("server.port", "443"),
    ]);
    let target = Bindable::of(TypeDescriptor::object(descriptor));
    let first = binder.bind("server", target.clone()).unwrap();
    let second = binder.bind("server", target).unwrap();
    assert_eq!(first, second);
}

#[test]
fn bound_objects_deserialize_into_structs() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Server {
        host: String,
        port: u16,
        #[serde(rename = "idle-timeout")]
        idle_timeout: u64,
    }
    let descriptor = DataObjectDescriptor::structure("Server")
        .property("host", TypeDescriptor::string())
        .property("port", TypeDescriptor::uint())
        .property("idleTimeout", TypeDescriptor::duration())
        .build();
    let binder = binder_over(vec![
        MapSource::new("test")
            .with("server.host", "example.org")
            .with("server.port", "8443")
            .with("server.idle-timeout", "30s"),
    ]);
    let server = binder
        .bind("server", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap()
        .deserialize::<Server>()
        .unwrap();
    assert_eq!(
        server,
        Some(Server {
            host: "example.org".into(),
            port: 8443,
            idle_timeout: 30_000,
        })
    );
}

#[test]
fn value_objects_bind_through_their_constructor() {
    let descriptor = DataObjectDescriptor::value_object("Point")
        .parameter("x", TypeDescriptor::int())
        .parameter_with_default("y", TypeDescriptor::int(), &["0"])
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("point.x", "3")]);
    let result = binder
        .bind("point", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap();
    assert_eq!(result.into_value(), Some(json!({"x": 3, "y": 0})));
}

#[test]
fn purely_default_value_objects_stay_unbound() {
    let descriptor = DataObjectDescriptor::value_object("Point")
        .parameter_with_default("x", TypeDescriptor::int(), &["1"])
        .parameter_with_default("y", TypeDescriptor::int(), &["2"])
        .build();
    let binder = binder_over(vec![MapSource::new("test")]);
    let result = binder
        .bind(
            "point",
            Bindable::of(TypeDescriptor::object(descriptor.clone())),
        )
        .unwrap();
    assert!(!result.is_bound());
    // The create path fills every slot from the defaults instead.
    let created = binder
        .bind_or_create("point", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap();
    assert_eq!(created, json!({"x": 1, "y": 2}));
}

#[test]
fn default_literal_lists_convert_elementwise() {
    let descriptor = DataObjectDescriptor::value_object("Config")
        .parameter("name", TypeDescriptor::string())
        .parameter_with_default(
            "ports",
            TypeDescriptor::list(TypeDescriptor::uint()),
            &["80", "443"],
        )
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("config.name", "web")]);
    let result = binder
        .bind("config", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap();
    assert_eq!(
        result.into_value(),
        Some(json!({"name": "web", "ports": [80, 443]}))
    );
}

#[test]
fn bare_default_markers_need_a_creatable_type() {
    let nested = DataObjectDescriptor::structure("Extras")
        .property_with_initial("enabled", TypeDescriptor::bool(), json!(false))
        .build();
    let descriptor = DataObjectDescriptor::value_object("Config")
        .parameter("name", TypeDescriptor::string())
        .parameter_with_default("extras", TypeDescriptor::object(nested), &[])
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("config.name", "web")]);
    let result = binder
        .bind("config", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap();
    assert_eq!(
        result.into_value(),
        Some(json!({"name": "web", "extras": {"enabled": false}}))
    );

    let bad = DataObjectDescriptor::value_object("Config")
        .parameter("name", TypeDescriptor::string())
        .parameter_with_default("retries", TypeDescriptor::int(), &[])
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("config.name", "web")]);
    let error = binder
        .bind("config", Bindable::of(TypeDescriptor::object(bad)))
        .unwrap_err();
    assert!(matches!(
        error,
        BindError::Binding { source, .. }
            if matches!(*source, BindError::UnsatisfiableDefault { .. })
    ));
}

#[test]
fn structs_bind_onto_existing_instances() {
    let descriptor = DataObjectDescriptor::structure("Server")
        .property("host", TypeDescriptor::string())
        .property("port", TypeDescriptor::uint())
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("server.port", "9090")]);
    let target = Bindable::of(TypeDescriptor::object(descriptor))
        .with_existing(json!({"host": "kept.example.org", "port": 80}));
    let result = binder.bind("server", target).unwrap();
    assert_eq!(
        result.into_value(),
        Some(json!({"host": "kept.example.org", "port": 9090}))
    );
}

#[test]
fn read_only_properties_reject_differing_values() {
    let descriptor = DataObjectDescriptor::structure("Info")
        .read_only("id", TypeDescriptor::string(), json!("fixed"))
        .property("label", TypeDescriptor::string())
        .build();

    let binder = binder_over(vec![
        MapSource::new("test")
            .with("info.id", "fixed")
            .with("info.label", "ok"),
    ]);
    let result = binder
        .bind(
            "info",
            Bindable::of(TypeDescriptor::object(descriptor.clone())),
        )
        .unwrap();
    assert_eq!(
        result.into_value(),
        Some(json!({"id": "fixed", "label": "ok"}))
    );

    let binder = binder_over(vec![MapSource::new("test").with("info.id", "changed")]);
    let error = binder
        .bind("info", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap_err();
    assert!(matches!(
        error,
        BindError::Binding { source, .. } if matches!(*source, BindError::NoSetter { .. })
    ));
}

#[test]
fn an_object_binds_only_if_something_bound() {
    let descriptor = DataObjectDescriptor::structure("Server")
        .property_with_initial("host", TypeDescriptor::string(), json!("localhost"))
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("unrelated", "x")]);
    let result = binder
        .bind("server", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap();
    assert!(!result.is_bound());
}

#[test]
fn self_referential_types_stay_unbound_instead_of_recursing() {
    let leaf = DataObjectDescriptor::structure("Tree")
        .property("value", TypeDescriptor::int())
        .build();
    let tree = DataObjectDescriptor::structure("Tree")
        .property("value", TypeDescriptor::int())
        .property("child", TypeDescriptor::object(leaf))
        .build();
    let binder = binder_over(vec![MapSource::new("test").with("tree.child.value", "1")]);
    let result = binder
        .bind(
            "tree",
            Bindable::of(TypeDescriptor::object(tree.clone())),
        )
        .unwrap();
    // The nested "Tree" is already on the stack, so the child never binds
    // and nothing else matched.
    assert!(!result.is_bound());

    let binder = binder_over(vec![MapSource::new("test").with("tree.value", "5")]);
    let result = binder
        .bind("tree", Bindable::of(TypeDescriptor::object(tree)))
        .unwrap();
    assert_eq!(
        result.into_value(),
        Some(json!({"value": 5, "child": null}))
    );
}

#[test]
fn self_referential_list_elements_rebind_over_enumerable_sources() {
    // Element binds carry an enumerable source override, so a type already
    // on the stack may still bind as a collection element.
    let leaf = DataObjectDescriptor::structure("Group")
        .property("name", TypeDescriptor::string())
        .build();
    let group = DataObjectDescriptor::structure("Group")
        .property("name", TypeDescriptor::string())
        .property(
            "members",
            TypeDescriptor::list(TypeDescriptor::object(leaf)),
        )
        .build();
    let binder = binder_over(vec![
        MapSource::new("test")
            .with("group.name", "root")
            .with("group.members[0].name", "child"),
    ]);
    let result = binder
        .bind("group", Bindable::of(TypeDescriptor::object(group)))
        .unwrap();
    assert_eq!(
        result.into_value(),
        Some(json!({"name": "root", "members": [{"name": "child"}]}))
    );
}

#[test]
fn placeholders_resolve_across_sources() {
    let binder = binder_over(vec![
        MapSource::new("app").with("greeting", "hello ${app.user:world}"),
        MapSource::new("defaults").with("app.user", "admin"),
    ]);
    let result = binder
        .bind("greeting", Bindable::of(TypeDescriptor::string()))
        .unwrap();
    assert_eq!(result.into_value(), Some(json!("hello admin")));
}

#[test]
fn shared_adapter_cache_reuses_sources_across_binders() {
    let cache = SourceAdapterCache::new();
    let raw: Vec<Arc<dyn RawSource>> =
        vec![Arc::new(MapSource::new("test").with("key", "value"))];
    let first = Binder::from_cached_sources(&cache, &raw);
    let second = Binder::from_cached_sources(&cache, &raw);
    assert!(Arc::ptr_eq(&first.sources()[0], &second.sources()[0]));
    let bound = second
        .bind("key", Bindable::of(TypeDescriptor::string()))
        .unwrap();
    assert_eq!(bound.into_value(), Some(json!("value")));
}

#[test]
fn random_namespace_sources_do_not_block_sibling_shortcuts() {
    // A non-enumerable random source claims only its own namespace, so
    // nested binds elsewhere still short-circuit to unbound.
    let descriptor = DataObjectDescriptor::structure("Server")
        .property("host", TypeDescriptor::string())
        .build();
    let random: Arc<dyn RawSource> = Arc::new(MapSource::new("random").random());
    let plain: Arc<dyn RawSource> = Arc::new(MapSource::new("plain").with("other", "x"));
    let binder = Binder::from_raw_sources(vec![random, plain]);
    let result = binder
        .bind("server", Bindable::of(TypeDescriptor::object(descriptor)))
        .unwrap();
    assert!(!result.is_bound());
}
