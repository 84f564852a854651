// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::stream::BoxStream;
use serde_json::{json, Value};
use spark_proxy_core::application::spark_application::{
    SparkApplicationService, StandardSparkApplicationService,
};
use spark_proxy_core::domain::application::{ApplicationSpec, SparkApplication};
use spark_proxy_core::domain::events::ApplicationEvent;
use spark_proxy_core::domain::lifecycle::TransitionRequest;
use spark_proxy_core::domain::repository::{RegistryError, TransitionOutcome};
use spark_proxy_core::domain::status::ApplicationRef;
use spark_proxy_core::infrastructure::{
    EventBus, InMemoryApplicationRegistry, SimulatedBackend, UuidIdentityGenerator,
};
use spark_proxy_core::presentation::{app, app_with_layers};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;

const PI_FILE: &str = "local:///opt/spark/examples/src/main/python/pi.py";

/// Router over a backend that never reports back within a test's lifetime.
fn router() -> Router {
    let (reports, _) = mpsc::channel(16);
    let backend = Arc::new(SimulatedBackend::new(reports, Duration::from_secs(3600), false));
    let service = Arc::new(StandardSparkApplicationService::new(
        Arc::new(InMemoryApplicationRegistry::new(Arc::new(UuidIdentityGenerator))),
        backend,
        Arc::new(EventBus::new(64)),
    ));
    app(service)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn pi_request() -> Value {
    json!({
        "name": "pi",
        "type": "SPARK_APPLICATION_TYPE_PYTHON",
        "mode": "DEPLOY_MODE_CLUSTER",
        "mainApplicationFile": PI_FILE
    })
}

#[tokio::test]
async fn test_health() {
    let router = router();
    let (status, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_pi_create_get_delete() {
    let router = router();
    let collection = "/api/v1/namespaces/default/applications";
    let item = "/api/v1/namespaces/default/applications/pi";

    let (status, created) = send(&router, Method::POST, collection, Some(pi_request())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!created["id"].as_str().unwrap().is_empty());
    assert_eq!(created["name"], "pi");
    assert_eq!(created["namespace"], "default");
    assert_eq!(created["type"], "SPARK_APPLICATION_TYPE_PYTHON");
    assert_eq!(created["mode"], "DEPLOY_MODE_CLUSTER");
    assert_eq!(created["mainApplicationFile"], PI_FILE);
    assert_eq!(created["state"], "SPARK_APPLICATION_STATE_PENDING");

    let (status, fetched) = send(&router, Method::GET, item, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, body) = send(&router, Method::DELETE, item, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = send(&router, Method::GET, item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_every_field_round_trips() {
    let router = router();
    let request = json!({
        "name": "etl",
        "type": "SPARK_APPLICATION_TYPE_SCALA",
        "mode": "DEPLOY_MODE_CLIENT",
        "image": "spark:3.5.0",
        "mainApplicationFile": "local:///opt/app.jar",
        "mainClass": "com.example.Etl",
        "arguments": ["--date", "2026-01-01"],
        "driver": {"cores": 1, "coreLimit": "1200m", "memory": "512m", "serviceAccount": "spark"},
        "executor": {"cores": 2, "instances": 3, "memory": "2g", "labels": {"team": "data"}},
        "deps": ["local:///opt/deps/a.jar", "local:///opt/deps/b.jar"],
        "sparkConf": {"spark.ui.enabled": "false", "spark.sql.shuffle.partitions": "8"},
        "sparkVersion": "3.5.0"
    });

    let (status, created) = send(
        &router,
        Method::POST,
        "/api/v1/namespaces/analytics/applications",
        Some(request.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, fetched) = send(&router, Method::GET, "/api/v1/namespaces/analytics/applications/etl", None).await;
    for (field, value) in request.as_object().unwrap() {
        assert_eq!(&fetched[field], value, "field {field} changed");
    }
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["namespace"], "analytics");
}

#[tokio::test]
async fn test_mode_defaults_to_cluster() {
    let router = router();
    let (status, created) = send(
        &router,
        Method::POST,
        "/api/v1/namespaces/default/applications",
        Some(json!({"name": "pi", "type": 1, "main_application_file": PI_FILE})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["mode"], "DEPLOY_MODE_CLUSTER");
}

#[tokio::test]
async fn test_duplicate_then_recreate() {
    let router = router();
    let collection = "/api/v1/namespaces/default/applications";

    let (_, first) = send(&router, Method::POST, collection, Some(pi_request())).await;

    let (status, body) = send(&router, Method::POST, collection, Some(pi_request())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");

    send(&router, Method::DELETE, "/api/v1/namespaces/default/applications/pi", None).await;

    let (status, second) = send(&router, Method::POST, collection, Some(pi_request())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(first["id"], second["id"]);
}

#[tokio::test]
async fn test_delete_is_not_idempotent() {
    let router = router();
    let item = "/api/v1/namespaces/default/applications/pi";

    let (status, _) = send(&router, Method::DELETE, item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&router, Method::POST, "/api/v1/namespaces/default/applications", Some(pi_request())).await;
    let (status, _) = send(&router, Method::DELETE, item, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&router, Method::DELETE, item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_request_lists_fields() {
    let router = router();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/namespaces/default/applications",
        Some(json!({"type": "SPARK_APPLICATION_TYPE_UNSPECIFIED", "mode": 9})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");
    let message = body["message"].as_str().unwrap();
    for field in ["name", "type", "mode", "mainApplicationFile"] {
        assert!(message.contains(field), "{field} missing from {message}");
    }
}

#[tokio::test]
async fn test_malformed_body_and_unknown_fields() {
    let router = router();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/namespaces/default/applications")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut request = pi_request();
    request["replicas"] = json!(3);
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/namespaces/default/applications",
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");

    let mut request = pi_request();
    request["driver"] = json!({"cores": 1, "gpus": 2});
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/namespaces/default/applications",
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");
    assert!(body["message"].as_str().unwrap().contains("gpus"));

    let (status, _) = send(&router, Method::GET, "/api/v1/namespaces/default/applications/pi", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_path_segments() {
    let router = router();

    let (status, body) = send(&router, Method::GET, "/api/v1/namespaces/Default/applications", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/v1/namespaces/default/applications/my_job",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/namespaces/default/applications/%FF",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_routing_errors_are_json() {
    let router = router();

    let (status, body) = send(&router, Method::PUT, "/api/v1/namespaces/default/applications/pi", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "UNIMPLEMENTED");

    let (status, body) = send(&router, Method::GET, "/api/v2/applications", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

/// Service whose operations never complete.
struct StalledService;

#[async_trait]
impl SparkApplicationService for StalledService {
    async fn create_application(
        &self,
        _namespace: &str,
        _spec: ApplicationSpec,
    ) -> Result<SparkApplication, RegistryError> {
        std::future::pending().await
    }

    async fn list_applications(&self, _namespace: &str) -> Vec<SparkApplication> {
        std::future::pending().await
    }

    async fn get_application(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<SparkApplication, RegistryError> {
        std::future::pending().await
    }

    async fn delete_application(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<SparkApplication, RegistryError> {
        std::future::pending().await
    }

    async fn transition_application(
        &self,
        _namespace: &str,
        _target: &ApplicationRef,
        _request: &TransitionRequest,
    ) -> Result<TransitionOutcome, RegistryError> {
        std::future::pending().await
    }

    async fn watch_application(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<BoxStream<'static, ApplicationEvent>, RegistryError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_deadline_is_reported_as_json() {
    let router = app_with_layers(Arc::new(StalledService), Duration::from_millis(20));

    let (status, body) = send(&router, Method::GET, "/api/v1/namespaces/default/applications", None).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["code"], "DEADLINE_EXCEEDED");
}

#[tokio::test]
async fn test_list_scoping() {
    let router = router();

    let (status, body) = send(&router, Method::GET, "/api/v1/namespaces/empty/applications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    for name in ["b", "a"] {
        let mut request = pi_request();
        request["name"] = json!(name);
        send(&router, Method::POST, "/api/v1/namespaces/default/applications", Some(request)).await;
    }
    send(&router, Method::POST, "/api/v1/namespaces/other/applications", Some(pi_request())).await;

    let (_, body) = send(&router, Method::GET, "/api/v1/namespaces/default/applications", None).await;
    let names: Vec<&str> = body["applications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|app| app["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates() {
    let router = router();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let router = router.clone();
            tokio::spawn(async move {
                let mut request = pi_request();
                request["name"] = json!(format!("job-{i}"));
                send(&router, Method::POST, "/api/v1/namespaces/default/applications", Some(request)).await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(ids.insert(body["id"].as_str().unwrap().to_string()));
    }

    let (_, body) = send(&router, Method::GET, "/api/v1/namespaces/default/applications", None).await;
    assert_eq!(body["applications"].as_array().unwrap().len(), 32);
}

#[tokio::test]
async fn test_status_endpoint_enforces_lifecycle() {
    let router = router();
    let status_uri = "/api/v1/namespaces/default/applications/pi/status";
    send(&router, Method::POST, "/api/v1/namespaces/default/applications", Some(pi_request())).await;

    let (status, body) = send(
        &router,
        Method::POST,
        status_uri,
        Some(json!({"state": "SPARK_APPLICATION_STATE_SUBMITTED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "SPARK_APPLICATION_STATE_SUBMITTED");

    // Source state no longer matches
    let (status, body) = send(
        &router,
        Method::POST,
        status_uri,
        Some(json!({
            "state": "SPARK_APPLICATION_STATE_RUNNING",
            "expectedState": "SPARK_APPLICATION_STATE_PENDING"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ABORTED");

    for state in ["SPARK_APPLICATION_STATE_RUNNING", "SPARK_APPLICATION_STATE_COMPLETED"] {
        let (status, _) = send(&router, Method::POST, status_uri, Some(json!({"state": state}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &router,
        Method::POST,
        status_uri,
        Some(json!({"state": "SPARK_APPLICATION_STATE_RUNNING"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ABORTED");

    let (_, body) = send(&router, Method::GET, "/api/v1/namespaces/default/applications/pi", None).await;
    assert_eq!(body["state"], "SPARK_APPLICATION_STATE_COMPLETED");

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/namespaces/default/applications/ghost/status",
        Some(json!({"state": "SPARK_APPLICATION_STATE_SUBMITTED"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
