//! ARM clients against a canned local HTTP server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use azmon_arm::{create_azure_clients, ClientOptions};
use azmon_core::api::MetricsQuery;
use azmon_core::memory::filter_resource_types;
use azmon_core::{AzureClients, ClientError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SUB: &str = "sub1";
const R1: &str = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Test/type1/resource1";

#[derive(Debug, Clone)]
struct Request {
    method: String,
    path: String,
    query: String,
    authorization: Option<String>,
}

type Routes = Arc<Mutex<HashMap<String, (u16, String)>>>;

/// Minimal HTTP/1.1 server: one response per connection, routed on the
/// request path.
struct CannedServer {
    addr: SocketAddr,
    routes: Routes,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl CannedServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to random port");
        let addr = listener.local_addr().expect("local addr");
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        routes.lock().unwrap().insert(
            "/tenant/oauth2/v2.0/token".to_string(),
            (200, r#"{"token_type":"Bearer","expires_in":3600,"access_token":"token-1"}"#.to_string()),
        );

        let (accept_routes, accept_requests) = (routes.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = accept_routes.clone();
                let requests = accept_requests.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, routes, requests).await;
                });
            }
        });

        Self { addr, routes, requests }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn route(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes.lock().unwrap().insert(path.to_string(), (status, body.into()));
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn requests_to(&self, path: &str) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    fn clients(&self) -> AzureClients {
        create_azure_clients(SUB, "client", "secret", "tenant", &ClientOptions::local(&self.base_url())).unwrap()
    }
}

async fn serve(mut stream: TcpStream, routes: Routes, requests: Arc<Mutex<Vec<Request>>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    requests.lock().unwrap().push(Request {
        method,
        path: path.to_string(),
        query: query.to_string(),
        authorization,
    });

    let (status, body) = routes
        .lock()
        .unwrap()
        .get(path)
        .cloned()
        .unwrap_or((404, r#"{"error":{"code":"NotFound"}}"#.to_string()));

    let response = format!(
        "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn query_param(query: &str, key: &str) -> Option<String> {
    reqwest::Url::parse(&format!("http://x/?{query}"))
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn subscription_listing_follows_next_link() {
    let server = CannedServer::start().await;
    server.route(
        "/subscriptions/sub1/resources",
        200,
        format!(
            r#"{{"value":[{{"id":"{R1}","name":"resource1","type":"Microsoft.Test/type1","location":"eastus"}}],
               "nextLink":"{}/page2?api-version=2021-04-01"}}"#,
            server.base_url()
        ),
    );
    server.route(
        "/page2",
        200,
        r#"{"value":[{"id":"/subscriptions/sub1/resourceGroups/rg2/providers/Microsoft.Test/type1/resource2","type":"Microsoft.Test/type1"}]}"#,
    );

    let clients = server.clients();
    let resources = clients
        .resources
        .list("resourceType eq 'Microsoft.Test/type1'")
        .await
        .unwrap();

    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].id.as_deref(), Some(R1));
    assert_eq!(resources[1].location, None);

    let first = &server.requests_to("/subscriptions/sub1/resources")[0];
    assert_eq!(first.method, "GET");
    assert_eq!(first.authorization.as_deref(), Some("Bearer token-1"));
    assert_eq!(query_param(&first.query, "api-version").as_deref(), Some("2021-04-01"));
    let filter = query_param(&first.query, "$filter").unwrap();
    assert_eq!(filter_resource_types(&filter), vec!["Microsoft.Test/type1"]);
    assert_eq!(server.requests_to("/page2").len(), 1);
}

#[tokio::test]
async fn resource_group_listing_uses_group_path() {
    let server = CannedServer::start().await;
    server.route("/subscriptions/sub1/resourceGroups/rg1/resources", 200, r#"{"value":[]}"#);

    let clients = server.clients();
    let resources = clients.resources.list_by_resource_group("rg1", "").await.unwrap();
    assert!(resources.is_empty());

    let request = &server.requests_to("/subscriptions/sub1/resourceGroups/rg1/resources")[0];
    assert_eq!(query_param(&request.query, "$filter"), None);
}

#[tokio::test]
async fn token_is_cached_across_calls() {
    let server = CannedServer::start().await;
    server.route(&format!("{R1}/providers/Microsoft.Insights/metricDefinitions"), 200, r#"{"value":[]}"#);

    let clients = server.clients();
    clients.metric_definitions.list(R1).await.unwrap();
    clients.metric_definitions.list(R1).await.unwrap();

    assert_eq!(server.requests_to("/tenant/oauth2/v2.0/token").len(), 1);
    let token_request = &server.requests_to("/tenant/oauth2/v2.0/token")[0];
    assert_eq!(token_request.method, "POST");
}

#[tokio::test]
async fn metric_definitions_decoded() {
    let server = CannedServer::start().await;
    server.route(
        &format!("{R1}/providers/Microsoft.Insights/metricDefinitions"),
        200,
        r#"{"value":[
            {"name":{"value":"metric1","localizedValue":"Metric 1"},"unit":"Count",
             "metricAvailabilities":[{"timeGrain":"PT1M","retention":"P93D"},{"timeGrain":"PT1H","retention":"P93D"}]},
            {"name":{"value":"metric,2","localizedValue":"Metric 2"},"unit":"Bytes",
             "metricAvailabilities":[{"timeGrain":"PT5M","retention":"P93D"}]}
        ]}"#,
    );

    let definitions = server.clients().metric_definitions.list(R1).await.unwrap();
    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[1].name.as_ref().unwrap().value.as_deref(), Some("metric,2"));
    assert_eq!(definitions[0].metric_availabilities[0].time_grain.as_deref(), Some("PT1M"));

    let request = &server.requests_to(&format!("{R1}/providers/Microsoft.Insights/metricDefinitions"))[0];
    assert_eq!(query_param(&request.query, "api-version").as_deref(), Some("2018-01-01"));
}

#[tokio::test]
async fn metrics_query_carries_names_and_aggregations() {
    let server = CannedServer::start().await;
    server.route(
        &format!("{R1}/providers/Microsoft.Insights/metrics"),
        200,
        r#"{"namespace":"Microsoft.Test/type1","resourceregion":"eastus","interval":"PT1M",
            "value":[{"id":"x","type":"Microsoft.Insights/metrics","unit":"Count",
                      "name":{"value":"metric1","localizedValue":"metric1"},
                      "timeseries":[{"data":[{"timeStamp":"2022-02-22T22:59:00Z","total":5.0}]}]}]}"#,
    );

    let query = MetricsQuery {
        metric_names: vec!["metric1".to_string(), "metric%23".to_string()],
        aggregations: vec!["total".to_string(), "maximum".to_string()],
    };
    let response = server.clients().metrics.list(R1, &query).await.unwrap();
    assert_eq!(response.resource_region.as_deref(), Some("eastus"));
    assert_eq!(response.value.len(), 1);

    let request = &server.requests_to(&format!("{R1}/providers/Microsoft.Insights/metrics"))[0];
    assert_eq!(query_param(&request.query, "metricnames").as_deref(), Some("metric1,metric%23"));
    assert_eq!(query_param(&request.query, "aggregation").as_deref(), Some("total,maximum"));
    assert_eq!(query_param(&request.query, "api-version").as_deref(), Some("2018-01-01"));
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let server = CannedServer::start().await;
    server.route(
        &format!("{R1}/providers/Microsoft.Insights/metrics"),
        400,
        r#"{"code":"BadRequest","message":"Failed to find metric configuration"}"#,
    );

    let err = server
        .clients()
        .metrics
        .list(R1, &MetricsQuery::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Failed to find metric configuration"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn rejected_credentials_are_auth_errors() {
    let server = CannedServer::start().await;
    server.route("/tenant/oauth2/v2.0/token", 401, r#"{"error":"invalid_client"}"#);

    let err = server.clients().resources.list("").await.unwrap_err();
    assert!(matches!(err, ClientError::Auth(m) if m.contains("invalid_client")));
    assert!(server.requests_to("/subscriptions/sub1/resources").is_empty());
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let server = CannedServer::start().await;
    server.route("/subscriptions/sub1/resources", 200, "not json");

    let err = server.clients().resources.list("").await.unwrap_err();
    assert!(matches!(err, ClientError::Malformed(_)));
}
