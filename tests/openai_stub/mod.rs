use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

/// How the stub answers `/v1/responses` calls. Sites are counted by their
/// title calls, so site numbers are only meaningful with concurrency 1.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Answer `"<kind>-<n>"` for the n-th call.
    EchoSlots,
    /// Fail the n-th call (1-based) with `status`.
    FailCall { call: usize, status: u16 },
    /// Fail the `slot`-th call (1-based) of the `site`-th site with `status`.
    FailSiteSlot { site: usize, slot: usize, status: u16 },
    /// Every call fails with `status`.
    AlwaysStatus(u16),
    /// Valid JSON without any output text.
    EmptyOutput,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
struct Counters {
    calls: usize,
    sites: usize,
    slot_in_site: usize,
}

pub struct OpenAiStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl OpenAiStub {
    pub fn spawn(behavior: StubBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let mut counters = Counters::default();
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/v1/responses" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_owned());

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let Some(prompt) = parsed.get("input").and_then(|v| v.as_str()) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing input").with_status_code(400),
                    );
                    continue;
                };
                let kind = prompt_kind(prompt);

                counters.calls += 1;
                if kind == "title" {
                    counters.sites += 1;
                    counters.slot_in_site = 0;
                }
                counters.slot_in_site += 1;
                let n = counters.calls;

                recorded
                    .lock()
                    .expect("lock recorded requests")
                    .push(RecordedRequest {
                        authorization,
                        body: parsed.clone(),
                    });

                let failure = match behavior {
                    StubBehavior::FailCall { call, status } if call == n => Some(status),
                    StubBehavior::FailSiteSlot { site, slot, status }
                        if site == counters.sites && slot == counters.slot_in_site =>
                    {
                        Some(status)
                    }
                    StubBehavior::AlwaysStatus(status) => Some(status),
                    _ => None,
                };
                if let Some(status) = failure {
                    let body = serde_json::json!({
                        "error": { "message": format!("stub failure {status}"), "type": "stub" }
                    });
                    let _ = request.respond(json_response(body, status));
                    continue;
                }

                let output_text = match behavior {
                    StubBehavior::EmptyOutput => String::new(),
                    _ => format!("{kind}-{n}"),
                };
                let response_body = serde_json::json!({
                    "id": "resp_stub",
                    "object": "response",
                    "model": parsed.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
                    "output": [
                        {
                            "type": "message",
                            "role": "assistant",
                            "content": [
                                { "type": "output_text", "text": output_text }
                            ]
                        }
                    ],
                    "usage": { "input_tokens": 7, "output_tokens": 3, "total_tokens": 10 }
                });
                let _ = request.respond(json_response(response_body, 200));
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock recorded requests").clone()
    }
}

impl Drop for OpenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn json_response(body: Value, status: u16) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}

/// Section prompts always ask for a word count; meta prompts always name
/// the meta description; everything else is a title prompt.
fn prompt_kind(prompt: &str) -> &'static str {
    if prompt.contains("meta description") {
        "meta"
    } else if prompt.contains(" words") {
        "section"
    } else {
        "title"
    }
}
