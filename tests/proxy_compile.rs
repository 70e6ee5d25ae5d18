//! End-to-end compilation from OpenAPI documents to Envoy resources

mod common;

use envoy_types::pb::envoy::config::route::v3::route_match::PathSpecifier;
use oasproxy::assembly::ConfigAssembler;
use oasproxy::config::{AccessLogSettings, AppConfig};
use oasproxy::openapi::ImportOptions;
use oasproxy::xds::access_log::DEFAULT_ACCESS_LOG_PATH;
use oasproxy::xds::filters::http::{
    HttpFilterConfigEntry, HttpFilterKind, LocalRateLimitConfig, TokenBucketConfig, ROUTER_FILTER_NAME,
};
use oasproxy::xds::route::{HostRewrite, PathMatch};
use oasproxy::xds::{render_bootstrap, BootstrapFormat, UpstreamSelection};
use oasproxy::Error;
use serde_json::{json, Value};

fn compile_petstore(assembler: &ConfigAssembler) -> oasproxy::assembly::CompiledApi {
    assembler
        .import_and_assemble(
            common::PETSTORE_YAML.as_bytes(),
            &ImportOptions::default(),
            UpstreamSelection::Production,
        )
        .expect("compile petstore")
}

#[test]
fn test_routes_follow_path_declaration_order() {
    let compiled = common::assembler()
        .import_and_assemble(
            common::UNSORTED_PATHS_YAML.as_bytes(),
            &ImportOptions::default(),
            UpstreamSelection::Production,
        )
        .expect("compile");

    let route_config = &compiled.tree.model.listener.http_connection_manager.route_config;
    let paths: Vec<&PathMatch> =
        route_config.virtual_hosts[0].routes.iter().map(|r| &r.r#match.path).collect();
    assert_eq!(
        paths,
        vec![
            &PathMatch::Exact("/zeta".into()),
            &PathMatch::Exact("/alpha".into()),
            &PathMatch::Exact("/mid".into()),
        ]
    );

    // Same order in the encoded listener
    let bootstrap = render_bootstrap(&compiled).expect("bootstrap");
    let routes = &bootstrap["static_resources"]["listeners"][0]["filter_chains"][0]["filters"][0]
        ["typed_config"]["route_config"]["virtual_hosts"][0]["routes"];
    let encoded: Vec<&str> =
        routes.as_array().expect("routes").iter().filter_map(|r| r["match"]["path"].as_str()).collect();
    assert_eq!(encoded, vec!["/zeta", "/alpha", "/mid"]);
}

#[test]
fn test_compilation_is_deterministic() {
    let assembler = common::assembler();
    let first = compile_petstore(&assembler);
    let second = compile_petstore(&assembler);

    assert_eq!(first.tree.model, second.tree.model);
    assert_eq!(first.tree.listener, second.tree.listener);
    assert_eq!(first.tree.clusters, second.tree.clusters);
    assert_eq!(render_bootstrap(&first).expect("first"), render_bootstrap(&second).expect("second"));
}

#[test]
fn test_petstore_routes_use_basepath_and_templates() {
    let compiled = compile_petstore(&common::assembler());
    let routes = &compiled.tree.model.listener.http_connection_manager.route_config.virtual_hosts[0].routes;

    assert_eq!(routes.len(), 3);
    assert_eq!(routes[0].r#match.path, PathMatch::Exact("/v1/pets".into()));
    assert_eq!(routes[0].r#match.headers[0].exact, "GET");
    assert_eq!(routes[1].r#match.headers[0].exact, "POST");
    assert_eq!(routes[2].r#match.path, PathMatch::Template("/v1/pets/{petId}".into()));
    assert_eq!(routes[2].name.as_deref(), Some("showPetById"));

    for route in routes {
        assert_eq!(route.action.cluster, "production_petstore_local_80");
        assert_eq!(route.action.host_rewrite, Some(HostRewrite::Literal("petstore.local".into())));
    }
    assert_eq!(compiled.tree.clusters.len(), 1);

    let envoy_routes = &compiled
        .tree
        .model
        .listener
        .http_connection_manager
        .route_config
        .to_envoy_route_configuration()
        .expect("route configuration")
        .virtual_hosts[0]
        .routes;
    let specifier = envoy_routes[2].r#match.as_ref().and_then(|m| m.path_specifier.as_ref());
    assert!(matches!(specifier, Some(PathSpecifier::PathMatchPolicy(_))));
}

#[test]
fn test_missing_log_config_uses_default_sink() {
    let config = AppConfig::default();
    assert!(config.access_logs.is_none());

    let compiled = compile_petstore(&ConfigAssembler::from_config(&config));
    let access_log = &compiled.tree.model.listener.http_connection_manager.access_log;
    assert_eq!(access_log.path, DEFAULT_ACCESS_LOG_PATH);
    assert!(access_log.format.is_none());

    let bootstrap = render_bootstrap(&compiled).expect("bootstrap");
    let hcm = &bootstrap["static_resources"]["listeners"][0]["filter_chains"][0]["filters"][0]["typed_config"];
    assert_eq!(hcm["access_log"][0]["typed_config"]["path"], json!(DEFAULT_ACCESS_LOG_PATH));
}

#[test]
fn test_configured_access_log_is_used() {
    let mut config = AppConfig::default();
    config.access_logs = Some(AccessLogSettings {
        log_file: "/var/log/envoy/access.log".into(),
        format: Some("%START_TIME% %REQ(:PATH)%\n".into()),
    });

    let compiled = compile_petstore(&ConfigAssembler::from_config(&config));
    let access_log = &compiled.tree.model.listener.http_connection_manager.access_log;
    assert_eq!(access_log.path, "/var/log/envoy/access.log");
    assert_eq!(access_log.format.as_deref(), Some("%START_TIME% %REQ(:PATH)%\n"));
    assert_eq!(compiled.tree.listener.filter_chains[0].filters.len(), 1);
}

#[test]
fn test_configured_filters_precede_router() {
    let mut config = AppConfig::default();
    config.envoy.http_filters = vec![HttpFilterConfigEntry {
        name: None,
        is_optional: false,
        disabled: false,
        filter: HttpFilterKind::LocalRateLimit(LocalRateLimitConfig {
            stat_prefix: "petstore_rl".into(),
            token_bucket: TokenBucketConfig {
                max_tokens: 100,
                tokens_per_fill: Some(10),
                fill_interval_ms: 1000,
            },
            status_code: Some(429),
            per_downstream_connection: false,
        }),
    }];

    let compiled = compile_petstore(&ConfigAssembler::from_config(&config));
    let bootstrap = render_bootstrap(&compiled).expect("bootstrap");
    let filters = bootstrap["static_resources"]["listeners"][0]["filter_chains"][0]["filters"][0]
        ["typed_config"]["http_filters"]
        .as_array()
        .expect("http filters")
        .iter()
        .map(|f| f["name"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();

    assert_eq!(filters, vec!["envoy.filters.http.local_ratelimit".to_string(), ROUTER_FILTER_NAME.to_string()]);
}

#[test]
fn test_sandbox_selection_routes_to_sandbox_cluster() {
    let options = ImportOptions { sandbox_urls: vec!["http://sandbox.petstore.local:8081/v1".into()] };
    let compiled = common::assembler()
        .import_and_assemble(common::PETSTORE_YAML.as_bytes(), &options, UpstreamSelection::Sandbox)
        .expect("compile sandbox");

    assert_eq!(compiled.summary().clusters, vec!["sandbox_sandbox_petstore_local_8081".to_string()]);
    let route = &compiled.tree.model.listener.http_connection_manager.route_config.virtual_hosts[0].routes[0];
    assert_eq!(route.action.host_rewrite, Some(HostRewrite::Literal("sandbox.petstore.local".into())));
}

#[test]
fn test_sandbox_without_endpoints_fails_whole_compilation() {
    let err = common::assembler()
        .import_and_assemble(
            common::PETSTORE_YAML.as_bytes(),
            &ImportOptions::default(),
            UpstreamSelection::Sandbox,
        )
        .expect_err("should fail");

    assert!(matches!(err, Error::ConfigEncode(_)));
}

#[test]
fn test_to_resources_lists_clusters_then_listener() {
    let compiled = compile_petstore(&common::assembler());
    let resources = compiled.tree.to_resources().expect("resources");

    assert_eq!(resources.len(), 2);
    assert!(resources[0].type_url.ends_with("envoy.config.cluster.v3.Cluster"));
    assert!(resources[1].type_url.ends_with("envoy.config.listener.v3.Listener"));
}

#[test]
fn test_bootstrap_serializes_to_equivalent_json_and_yaml() {
    let mut config = common::config_with_default_port(8080);
    config.envoy.admin_port = 9901;
    let compiled = compile_petstore(&ConfigAssembler::from_config(&config));
    let bootstrap = render_bootstrap(&compiled).expect("bootstrap");

    assert_eq!(bootstrap["admin"]["address"]["socket_address"]["port_value"], json!(9901));
    let cluster = &bootstrap["static_resources"]["clusters"][0];
    assert_eq!(cluster["name"], json!("production_petstore_local_8080"));

    let as_json = BootstrapFormat::Json.serialize(&bootstrap).expect("json");
    let as_yaml = BootstrapFormat::Yaml.serialize(&bootstrap).expect("yaml");
    let from_json: Value = serde_json::from_str(&as_json).expect("parse json");
    let from_yaml: Value = serde_yaml::from_str(&as_yaml).expect("parse yaml");
    assert_eq!(from_json, from_yaml);
}
