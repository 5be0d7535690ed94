use super::*;
use crate::config::GatewayConfig;
use crate::protocol::LogLevel;

fn test_context() -> ServerContext {
    ServerContext::new(&GatewayConfig::default()).expect("context builds")
}

#[test]
fn context_carries_config_identity() {
    let mut config = GatewayConfig::default();
    config.server.name = "test-gateway".to_string();
    config.server.version = "9.9.9".to_string();

    let ctx = ServerContext::new(&config).expect("context builds");
    assert_eq!(ctx.server_info().name, "test-gateway");
    assert_eq!(ctx.server_info().version, "9.9.9");
}

#[test]
fn context_carries_configured_cache_ttl() {
    let mut config = GatewayConfig::default();
    config.cache.default_ttl_secs = 42;

    let ctx = ServerContext::new(&config).expect("context builds");
    assert_eq!(ctx.cache_ttl(), Duration::from_secs(42));
}

#[test]
fn instances_are_isolated() {
    let first = test_context();
    let second = test_context();

    first.set_log_level(LogLevel::Error);
    assert_eq!(first.log_level(), LogLevel::Error);
    assert_eq!(second.log_level(), LogLevel::Info);

    first
        .cache()
        .set("k", serde_json::json!(1), std::time::Duration::from_secs(60));
    assert!(second.cache().is_empty());
}

#[test]
fn should_emit_compares_severity() {
    let ctx = test_context();
    ctx.set_log_level(LogLevel::Warning);

    assert!(!ctx.should_emit(LogLevel::Debug));
    assert!(!ctx.should_emit(LogLevel::Info));
    assert!(ctx.should_emit(LogLevel::Warning));
    assert!(ctx.should_emit(LogLevel::Error));
    assert!(ctx.should_emit(LogLevel::Emergency));
}

#[tokio::test]
async fn static_resolver_serves_registered_content() {
    let mut resolver = StaticResourceResolver::new();
    resolver.insert("ui://panel/main", "<html>panel</html>");

    let found = resolver
        .resolve("ui://panel/main")
        .await
        .expect("resolve succeeds")
        .expect("content registered");
    assert_eq!(found.uri, "ui://panel/main");
    assert_eq!(found.text, "<html>panel</html>");
    assert_eq!(found.mime_type.as_deref(), Some("text/html"));

    let missing = resolver
        .resolve("ui://panel/other")
        .await
        .expect("resolve succeeds");
    assert!(missing.is_none());
}

#[test]
fn default_capabilities_are_static() {
    let ctx = test_context();
    let caps = ctx.capabilities();
    assert_eq!(caps.tools.list_changed, Some(false));
    assert_eq!(caps.resources.subscribe, Some(false));
    assert_eq!(caps.prompts.list_changed, Some(false));
}
