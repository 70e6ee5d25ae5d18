//! Importer behavior against complete documents

mod common;

use oasproxy::domain::{Endpoint, HttpMethod};
use oasproxy::openapi::{import_openapi, parse_document, EndpointResolver, ImportOptions};
use oasproxy::Error;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Import document text (YAML or JSON) so path order is the declared order
fn import(text: &str, default_port: u16) -> oasproxy::Result<oasproxy::domain::ApiDefinition> {
    let document = parse_document(text.as_bytes()).expect("parse openapi");
    import_openapi(&document, &EndpointResolver::new(default_port), &ImportOptions::default())
}

#[test]
fn test_schemeless_server_uses_configured_port() {
    let api = import(
        r#"
openapi: 3.0.0
info: {title: Example, version: '1.0'}
servers:
  - url: api.example.com/v1
paths: {}
"#,
        8080,
    )
    .expect("import");

    assert_eq!(api.production_urls, vec![Endpoint::new("api.example.com", "/v1", 8080)]);
}

#[test]
fn test_trace_operation_contributes_no_resource() {
    let api = import(
        r#"
openapi: 3.0.0
info: {title: Pets, version: '1.0'}
servers:
  - url: pets.local
paths:
  /pets:
    get:
      responses: {'200': {description: OK}}
    trace:
      responses: {'200': {description: OK}}
"#,
        80,
    )
    .expect("import");

    assert_eq!(api.resources.len(), 1);
    assert_eq!(api.resources[0].path, "/pets");
    assert_eq!(api.resources[0].method, HttpMethod::Get);
}

#[test]
fn test_yaml_petstore_imports_in_declaration_order() {
    let document = parse_document(common::PETSTORE_YAML.as_bytes()).expect("parse");
    let api = import_openapi(&document, &EndpointResolver::new(80), &ImportOptions::default())
        .expect("import");

    let seen: Vec<(String, HttpMethod)> =
        api.resources.iter().map(|r| (r.path.clone(), r.method)).collect();
    assert_eq!(
        seen,
        vec![
            ("/pets".to_string(), HttpMethod::Get),
            ("/pets".to_string(), HttpMethod::Post),
            ("/pets/{petId}".to_string(), HttpMethod::Get),
        ]
    );
    assert!(api.resources[2].has_path_parameters());
    assert_eq!(api.vendor_extensions.get("x-owner"), Some(&json!("pets-team")));
}

#[test]
fn test_unsorted_paths_keep_declaration_order() {
    let api = import(common::UNSORTED_PATHS_YAML, 80).expect("import");

    let paths: Vec<&str> = api.resources.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/zeta", "/alpha", "/mid"]);
}

#[test]
fn test_relative_server_url_is_resolution_error() {
    let err = import(
        r#"
openapi: 3.0.0
info: {title: Relative, version: '1.0'}
servers:
  - url: /api/v3
paths: {}
"#,
        80,
    )
    .expect_err("should fail");

    assert!(matches!(err, Error::EndpointResolution { .. }));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_operation_servers_override_document_servers() {
    let api = import(
        r#"
openapi: 3.0.0
info: {title: Override, version: '1.0'}
servers:
  - url: default.local
paths:
  /legacy:
    get:
      servers:
        - url: legacy.local:8081/old
      responses: {'200': {description: OK}}
  /current:
    get:
      responses: {'200': {description: OK}}
"#,
        80,
    )
    .expect("import");

    let legacy = &api.resources[0];
    assert_eq!(legacy.production_endpoints, vec![Endpoint::new("legacy.local", "/old", 8081)]);
    assert_eq!(api.production_endpoints_for(legacy)[0].host, "legacy.local");

    let current = &api.resources[1];
    assert!(current.production_endpoints.is_empty());
    assert_eq!(api.production_endpoints_for(current)[0].host, "default.local");
}

#[test]
fn test_operation_security_overrides_document_security() {
    let api = import(
        r#"
openapi: 3.0.0
info: {title: Secure, version: '1.0'}
security:
  - oauth: [read]
paths:
  /open:
    get:
      security: []
      responses: {'200': {description: OK}}
  /closed:
    get:
      responses: {'200': {description: OK}}
"#,
        80,
    )
    .expect("import");

    assert!(api.resources[0].security.is_empty());
    let inherited = &api.resources[1].security;
    assert_eq!(inherited.len(), 1);
    assert!(inherited[0]["oauth"].contains("read"));
}

#[test]
fn test_unparseable_server_url_is_resolution_error() {
    let err = import(
        r#"{"openapi": "3.0.0", "info": {"title": "Broken", "version": "1.0"}, "servers": [{"url": "http://"}], "paths": {}}"#,
        80,
    )
    .expect_err("should fail");

    assert!(matches!(err, Error::EndpointResolution { .. }));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_missing_version_is_import_error() {
    let err = import(
        r#"{"openapi": "3.0.0", "info": {"title": "No Version", "version": ""}, "paths": {}}"#,
        80,
    )
    .expect_err("should fail");

    assert!(matches!(err, Error::Import { .. }));
    assert!(err.to_string().contains("info.version"));
}

fn extension_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn test_vendor_extensions_pass_through_unchanged(
        extensions in prop::collection::btree_map("x-[a-z]{1,8}", extension_value(), 0..5)
    ) {
        let mut operation = json!({"responses": {"200": {"description": "OK"}}});
        for (key, value) in &extensions {
            operation[key] = value.clone();
        }

        let document = json!({
            "openapi": "3.0.0",
            "info": {"title": "Ext", "version": "1"},
            "paths": {"/things": {"get": operation}}
        });
        let api = import(&document.to_string(), 80)
        .expect("import");

        let imported = &api.resources[0].vendor_extensions;
        prop_assert_eq!(imported.len(), extensions.len());
        for (key, value) in &extensions {
            prop_assert_eq!(imported.get(key), Some(value));
        }
    }

    #[test]
    fn test_portless_host_gets_default_port(host in "[a-z]{1,10}\\.[a-z]{2,5}", port in 1u16..) {
        let endpoint = EndpointResolver::new(port).resolve(&host).expect("resolve");
        prop_assert_eq!(endpoint.port, port);
        prop_assert_eq!(endpoint.host, host);
    }
}
