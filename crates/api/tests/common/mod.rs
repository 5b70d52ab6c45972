// All functions in this module are shared test helpers. Not every test binary
// uses every helper, so we suppress dead_code warnings at the item level.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use courier_api::config::{
    Config, DatabaseConfig, ExternalServicesConfig, RabbitConfig, RedisConfig, ServerConfig,
};
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_broker::BrokerGateway;
use courier_cache::CacheGateway;
use courier_clients::{RetryPolicy, TemplateClient, UserPreferencesClient};
use courier_orchestrator::Orchestrator;

/// Port 1 on loopback: connection refused, never a live backend.
const DEAD_ADDR: &str = "127.0.0.1:1";

/// Build a test `Config` pointing every backend at [`DEAD_ADDR`].
pub fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "postgres".to_string(),
            password: String::new(),
            name: "courier".to_string(),
            ssl_mode: "prefer".to_string(),
            max_open_conns: 2,
            max_idle_conns: 1,
            conn_max_lifetime: Duration::from_secs(1800),
            conn_max_idle_time: Duration::from_secs(600),
        },
        redis: RedisConfig {
            address: DEAD_ADDR.to_string(),
            password: String::new(),
            db: 0,
        },
        rabbitmq: RabbitConfig {
            url: format!("amqp://{DEAD_ADDR}/%2f"),
            exchange_name: "notifications".to_string(),
            exchange_type: "topic".to_string(),
            queue_name: "orchestrator_queue".to_string(),
            routing_key: "notification.*".to_string(),
            prefetch_count: 10,
        },
        server: ServerConfig {
            port: 0,
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(60),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        external_services: ExternalServicesConfig {
            user_service_base: format!("http://{DEAD_ADDR}"),
            template_service_base: format!("http://{DEAD_ADDR}"),
        },
    }
}

/// Build the full application router with all middleware layers, against
/// unreachable backends.
///
/// Every gateway is constructed lazily, so no live Postgres, Redis, or
/// broker is required; a request that would touch one observes a connection
/// error and the handler's documented failure contract applies.
pub fn build_test_app() -> Router {
    let config = test_config();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_lazy("postgres://postgres@127.0.0.1:1/courier")
        .expect("lazy pool construction must not touch the network");

    let cache = CacheGateway::new(DEAD_ADDR, "", 0).expect("cache gateway");
    let broker = BrokerGateway::new(config.broker_settings());

    // Tight retry policy so a test that does reach a client fails quickly.
    let policy = RetryPolicy {
        initial_delay: Duration::from_millis(10),
        multiplier: 2.0,
        max_delay: Duration::from_millis(20),
        max_elapsed: Duration::from_millis(100),
    };
    let user_client =
        UserPreferencesClient::new(config.external_services.user_service_base.clone(), policy.clone());
    let template_client =
        TemplateClient::new(config.external_services.template_service_base.clone(), policy);

    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        cache.clone(),
        broker,
        user_client,
        template_client,
    ));

    let config = Arc::new(config);
    let state = AppState {
        pool,
        cache,
        orchestrator,
        config: Arc::clone(&config),
    };
    build_app_router(state, &config.server)
}

// ---------------------------------------------------------------------------
// Shared HTTP test helpers
// ---------------------------------------------------------------------------

/// Collect the response body into a `serde_json::Value`.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// POST JSON to the given URI with extra headers and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: serde_json::Value,
) -> axum::response::Response {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = request
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw (possibly malformed) body with extra headers.
pub async fn post_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: &'static str,
) -> axum::response::Response {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = request.body(Body::from(body)).unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET the given URI and return the response.
pub async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}
