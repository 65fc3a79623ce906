//! # Integration Tests
//!
//! End-to-end tests over real sockets.
//!
//! Covers:
//! - Contract smoke tests
//! - Ingest, fan-out and record keeping through the HTTP surface
//! - Debounced realtime refresh after forwarding settles

#[cfg(test)]
mod contract_tests {
    use contracts::{Identify, Notification, Topic};

    #[test]
    fn test_notification_identity_and_topic() {
        let notification = Notification::new("user1", "bucket1");
        assert_eq!(notification.identity(), "user1/bucket1");
        assert_eq!(notification.topic(), "users/user1/buckets/bucket1/logs");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use contracts::{BucketConfig, ForwardRecord, ForwardTargetConfig, SplayConfig, Store};
    use splay_cli::{server, Services};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    const TOPIC: &str = "users/user1/buckets/bucket1/logs";

    /// How a local forward target answers
    #[derive(Clone, Copy)]
    enum Reply {
        Status(u16),
        Hang,
    }

    /// Requests a target has seen
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(HeaderMap, serde_json::Value)>>>);

    impl Captured {
        fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }

        fn first(&self) -> (HeaderMap, serde_json::Value) {
            self.0.lock().unwrap()[0].clone()
        }
    }

    async fn capture(
        State((reply, captured)): State<(Reply, Captured)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let payload = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        captured.0.lock().unwrap().push((headers, payload));
        match reply {
            Reply::Status(code) => StatusCode::from_u16(code).unwrap(),
            Reply::Hang => std::future::pending().await,
        }
    }

    /// Start a forward target, returning its url
    async fn spawn_target(reply: Reply) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/hook", post(capture))
            .with_state((reply, captured.clone()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (format!("http://{addr}/hook"), captured)
    }

    /// A url nothing listens on
    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/hook")
    }

    fn config(forwards: &[String], ttl_ms: u64) -> SplayConfig {
        let mut config = SplayConfig::default();
        config.forward.timeout_secs = 1;
        config.notify.ttl_ms = ttl_ms;
        config.notify.poll_interval_ms = 20;
        config.buckets.push(BucketConfig {
            id: Some("bucket1".into()),
            slug: "b1".into(),
            name: "Bucket one".into(),
            description: String::new(),
            user: "user1".into(),
            forwards: forwards
                .iter()
                .enumerate()
                .map(|(i, url)| ForwardTargetConfig {
                    name: format!("target-{i}"),
                    url: url.clone(),
                })
                .collect(),
        });
        config
    }

    struct Running {
        services: Services,
        base: String,
        cancel: CancellationToken,
    }

    impl Running {
        async fn start(config: SplayConfig) -> Self {
            let services = Services::build(config).unwrap();
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr: SocketAddr = listener.local_addr().unwrap();
            let cancel = CancellationToken::new();
            services.broadcast_loop().spawn(cancel.clone());
            tokio::spawn(server::serve(listener, services.router(), cancel.clone()));
            Self {
                services,
                base: format!("http://{addr}"),
                cancel,
            }
        }

        async fn post(&self, slug: &str, body: &str) -> reqwest::Response {
            self.post_with(slug, body, &[]).await
        }

        async fn post_with(
            &self,
            slug: &str,
            body: &str,
            headers: &[(&str, &str)],
        ) -> reqwest::Response {
            let mut request = reqwest::Client::new()
                .post(format!("{}/buckets/{slug}", self.base))
                .header("content-type", "application/json")
                .body(body.to_string());
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            request.send().await.unwrap()
        }

        async fn forward_records(&self) -> Vec<ForwardRecord> {
            let store = &self.services.store;
            let receives = store.list_receive_records(&"bucket1".into()).await.unwrap();
            let mut records = Vec::new();
            for receive in receives {
                records.extend(store.list_forward_records(&receive.id).await.unwrap());
            }
            records
        }
    }

    impl Drop for Running {
        fn drop(&mut self) {
            self.cancel.cancel();
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached within 5s");
    }

    #[tokio::test]
    async fn test_hanging_target_does_not_block_caller_or_siblings() {
        let (hang_url, _) = spawn_target(Reply::Hang).await;
        let (ok_url, ok_seen) = spawn_target(Reply::Status(200)).await;
        let running = Running::start(config(&[hang_url.clone(), ok_url.clone()], 50)).await;

        let (client, mut refreshes) = running.services.hub.connect(Some("user1".into()));
        client.subscribe(TOPIC);

        let started = Instant::now();
        let response = running.post("b1", r#"{"event":"push","n":1}"#).await;
        assert_eq!(response.status(), 200);
        assert!(started.elapsed() < Duration::from_millis(800));
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "success": "true" }));

        let store = Arc::clone(&running.services.store);
        wait_for(|| store.forward_record_count() == 2).await;
        assert_eq!(ok_seen.len(), 1);

        let records = running.forward_records().await;
        let status_of = |url: &str| {
            records
                .iter()
                .find(|r| r.destination_url == url)
                .map(|r| r.status_code)
        };
        assert_eq!(status_of(&hang_url), Some(None));
        assert_eq!(status_of(&ok_url), Some(Some(200)));

        let refresh = tokio::time::timeout(Duration::from_secs(5), refreshes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refresh.topic, TOPIC);
        assert_eq!(refresh.data.as_ref(), b"refresh");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(refreshes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_one_record_per_target_whatever_the_outcome() {
        let (ok_url, _) = spawn_target(Reply::Status(200)).await;
        let (error_url, error_seen) = spawn_target(Reply::Status(500)).await;
        let unreachable = dead_url().await;
        let running =
            Running::start(config(&[ok_url.clone(), error_url.clone(), unreachable.clone()], 50))
                .await;

        assert_eq!(running.post("b1", r#"{"x":1}"#).await.status(), 200);

        let store = Arc::clone(&running.services.store);
        wait_for(|| store.forward_record_count() == 3).await;
        assert_eq!(error_seen.len(), 1);

        let mut statuses: Vec<(String, Option<u16>)> = running
            .forward_records()
            .await
            .into_iter()
            .map(|r| (r.destination_url, r.status_code))
            .collect();
        statuses.sort();
        let mut expected = vec![(ok_url, Some(200)), (error_url, Some(500)), (unreachable, None)];
        expected.sort();
        assert_eq!(statuses, expected);
    }

    #[tokio::test]
    async fn test_headers_and_body_reach_target() {
        let (url, seen) = spawn_target(Reply::Status(204)).await;
        let running = Running::start(config(&[url], 50)).await;

        let response = running
            .post_with(
                "b1",
                r#"{"b":2,"a":{"nested":true}}"#,
                &[("x-custom", "abc"), ("x-forwarded-for", "203.0.113.7")],
            )
            .await;
        assert_eq!(response.status(), 200);

        wait_for(|| seen.len() == 1).await;
        let (headers, payload) = seen.first();
        assert_eq!(payload, serde_json::json!({ "a": { "nested": true }, "b": 2 }));
        assert_eq!(headers["x-custom"], "abc");
        assert!(headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json"));

        let forwarded: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert!(forwarded.iter().all(|v| v.contains("203.0.113.7")), "{forwarded:?}");
        assert!(!forwarded.is_empty());
    }

    #[tokio::test]
    async fn test_peer_address_forwarded_when_no_proxy_header() {
        let (url, seen) = spawn_target(Reply::Status(200)).await;
        let running = Running::start(config(&[url], 50)).await;

        assert_eq!(running.post("b1", r#"{"x":1}"#).await.status(), 200);
        wait_for(|| seen.len() == 1).await;

        let (headers, _) = seen.first();
        assert_eq!(headers["x-forwarded-for"], "127.0.0.1");

        let receives = running
            .services
            .store
            .list_receive_records(&"bucket1".into())
            .await
            .unwrap();
        assert_eq!(receives[0].ip.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_unknown_slug_and_bad_body_leave_no_record() {
        let (url, seen) = spawn_target(Reply::Status(200)).await;
        let running = Running::start(config(&[url], 50)).await;

        let response = running.post("missing", r#"{"x":1}"#).await;
        assert_eq!(response.status(), 404);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["message"].as_str().unwrap().contains("missing"));

        assert_eq!(running.post("b1", "[1,2,3]").await.status(), 400);
        assert_eq!(running.post("b1", "{not json").await.status(), 400);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(running.services.store.receive_record_count(), 0);
        assert_eq!(running.services.store.forward_record_count(), 0);
        assert_eq!(seen.len(), 0);
    }

    #[tokio::test]
    async fn test_burst_collapses_to_one_refresh() {
        let running = Running::start(config(&[], 300)).await;
        let (client, mut refreshes) = running.services.hub.connect(Some("user1".into()));
        client.subscribe(TOPIC);
        let (stranger, mut stranger_refreshes) = running.services.hub.connect(Some("user2".into()));
        stranger.subscribe(TOPIC);

        for n in 0..5 {
            let body = format!(r#"{{"n":{n}}}"#);
            assert_eq!(running.post("b1", &body).await.status(), 200);
        }
        assert_eq!(running.services.store.receive_record_count(), 5);

        let refresh = tokio::time::timeout(Duration::from_secs(5), refreshes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refresh.topic, TOPIC);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(refreshes.try_recv().is_err());
        assert!(stranger_refreshes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let running = Running::start(config(&[], 50)).await;
        let body: serde_json::Value = reqwest::get(format!("{}/api/health", running.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "code": 200, "message": "API is healthy." })
        );
    }

    #[tokio::test]
    async fn test_service_from_config_file() {
        use std::io::Write;

        let (url, seen) = spawn_target(Reply::Status(200)).await;
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
ingest_token = "s3cret"

[forward]
timeout_secs = 2

[notify]
ttl_ms = 50
poll_interval_ms = 20

[[buckets]]
id = "bucket1"
slug = "b1"
user = "user1"

[[buckets.forwards]]
name = "local"
url = "{url}"
"#
        )
        .unwrap();

        let config = config_loader::ConfigLoader::load_from_path(file.path()).unwrap();
        let running = Running::start(config).await;

        assert_eq!(running.post("b1", r#"{"x":1}"#).await.status(), 401);
        let response = running
            .post_with("b1", r#"{"x":1}"#, &[("authorization", "Bearer s3cret")])
            .await;
        assert_eq!(response.status(), 200);

        wait_for(|| seen.len() == 1).await;
        let (headers, _) = seen.first();
        assert!(!headers.contains_key("authorization"));

        let store = Arc::clone(&running.services.store);
        wait_for(|| store.forward_record_count() == 1).await;
        let records = running.forward_records().await;
        let recorded = contracts::Headers::from_json(&records[0].headers).unwrap();
        assert_eq!(recorded.first("authorization"), Some("Bearer s3cret"));
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_dispatch() {
        let (url, seen) = spawn_target(Reply::Status(200)).await;
        let running = Running::start(config(&[url], 50)).await;

        assert_eq!(running.post("b1", r#"{"x":1}"#).await.status(), 200);
        running.services.drain().await.unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(running.services.store.forward_record_count(), 1);
        assert_eq!(running.services.dispatcher.pending(), 0);
    }
}
