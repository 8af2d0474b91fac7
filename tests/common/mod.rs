#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary file with the given extension.
    ///
    /// The file is removed when the returned handle is dropped.
    pub fn create_temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("oasgate_spec_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_spec(content, "json")
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_spec(content, "yaml")
    }
}

pub mod mock_upstream {
    use std::io::Read;
    use std::net::{SocketAddr, TcpListener};
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    /// A request as received by the mock upstream.
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub method: String,
        /// Path and query as sent on the request line
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Recorded {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// What the mock answers with.
    #[derive(Debug, Clone)]
    pub struct Reply {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
        pub delay: Option<Duration>,
    }

    impl Reply {
        pub fn json(status: u16, body: &str) -> Self {
            Self {
                status,
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: body.to_string(),
                delay: None,
            }
        }

        pub fn with_header(mut self, name: &str, value: &str) -> Self {
            self.headers.push((name.to_string(), value.to_string()));
            self
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    /// tiny_http upstream running on a std thread.
    pub struct MockUpstream {
        server: Arc<Server>,
        addr: SocketAddr,
        received: Arc<Mutex<Vec<Recorded>>>,
        handle: Option<JoinHandle<()>>,
    }

    impl MockUpstream {
        pub fn start<F>(reply: F) -> Self
        where
            F: Fn(&Recorded) -> Reply + Send + 'static,
        {
            let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
            let addr = server.server_addr().to_ip().unwrap();
            let received = Arc::new(Mutex::new(Vec::new()));

            let srv = Arc::clone(&server);
            let log = Arc::clone(&received);
            let handle = thread::spawn(move || {
                for mut request in srv.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let recorded = Recorded {
                        method: request.method().to_string(),
                        url: request.url().to_string(),
                        headers: request
                            .headers()
                            .iter()
                            .map(|h| (h.field.as_str().to_string(), h.value.as_str().to_string()))
                            .collect(),
                        body,
                    };
                    let answer = reply(&recorded);
                    log.lock().unwrap().push(recorded);

                    if let Some(delay) = answer.delay {
                        thread::sleep(delay);
                    }
                    let mut response =
                        Response::from_string(answer.body).with_status_code(answer.status);
                    for (name, value) in &answer.headers {
                        response = response.with_header(
                            Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap(),
                        );
                    }
                    let _ = request.respond(response);
                }
            });

            Self {
                server,
                addr,
                received,
                handle: Some(handle),
            }
        }

        /// Base URL with a path prefix, e.g. `http://127.0.0.1:PORT/api`.
        pub fn base_url(&self) -> String {
            format!("http://{}/api", self.addr)
        }

        pub fn received(&self) -> Vec<Recorded> {
            self.received.lock().unwrap().clone()
        }
    }

    impl Drop for MockUpstream {
        fn drop(&mut self) {
            self.server.unblock();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    /// URL of a local port nothing listens on.
    pub fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/api")
    }
}

pub mod gateway {
    use axum::body::{to_bytes, Body};
    use axum::http::{HeaderMap, Request, StatusCode};
    use oasgate::forwarder::{Forwarder, ForwarderConfig};
    use oasgate::server::{build_app, AppService, AppState};
    use oasgate::spec::{parse_spec, SpecFormat};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    pub const MAX_BODY: usize = 64 * 1024;

    pub fn service(spec_json: &str, upstream: &str, timeout: Duration) -> AppService {
        let spec = parse_spec(spec_json, SpecFormat::Json, Path::new("test.json")).unwrap();
        let forwarder =
            Forwarder::new(&ForwarderConfig::new(upstream).with_timeout(timeout)).unwrap();
        AppService::new(spec, Arc::new(forwarder))
    }

    pub fn app(spec_json: &str, upstream: &str) -> axum::Router {
        app_with_timeout(spec_json, upstream, Duration::from_secs(5))
    }

    pub fn app_with_timeout(spec_json: &str, upstream: &str, timeout: Duration) -> axum::Router {
        build_app(AppState::ready(service(spec_json, upstream, timeout)), MAX_BODY)
    }

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Vec<u8>,
    }

    impl TestResponse {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).unwrap()
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    pub async fn send(app: &axum::Router, request: Request<Body>) -> TestResponse {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    pub async fn get(app: &axum::Router, uri: &str) -> TestResponse {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(
        app: &axum::Router,
        method: &str,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        send(app, builder.body(Body::from(body.to_string())).unwrap()).await
    }
}

/// Specification shared by the gateway tests.
pub const PETSTORE: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Petstore", "version": "1.0.0" },
  "paths": {
    "/pets": {
      "get": {
        "operationId": "listPets",
        "parameters": [
          { "name": "status", "in": "query", "required": true,
            "schema": { "type": "string", "enum": ["available", "pending", "sold"] } },
          { "name": "limit", "in": "query", "schema": { "type": "integer" } }
        ],
        "responses": { "200": { "description": "ok" } }
      },
      "post": {
        "operationId": "createPet",
        "requestBody": {
          "required": true,
          "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/NewPet" } }
          }
        },
        "responses": { "201": { "description": "created" } }
      }
    },
    "/pets/{petId}": {
      "parameters": [
        { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } }
      ],
      "get": { "operationId": "getPet", "responses": { "200": { "description": "ok" } } },
      "delete": { "operationId": "deletePet", "responses": { "204": { "description": "gone" } } },
      "head": { "operationId": "headPet", "responses": { "200": { "description": "ok" } } }
    },
    "/redirect": {
      "get": { "operationId": "redirect", "responses": { "302": { "description": "moved" } } }
    },
    "/slow": {
      "get": { "operationId": "slow", "responses": { "200": { "description": "ok" } } }
    }
  },
  "components": {
    "schemas": {
      "NewPet": {
        "type": "object",
        "required": ["name"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "tag": { "type": "string" }
        },
        "additionalProperties": false
      }
    }
  }
}"##;
