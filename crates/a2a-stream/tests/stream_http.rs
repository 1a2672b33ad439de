use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use a2a_stream::prelude::*;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use axum::routing::post;
use futures::{StreamExt as _, TryStreamExt as _, stream};
use serde_json::{Value, json};

/// What the local agent answers with.
#[derive(Clone)]
enum Reply {
    /// SSE body delivered in the given chunks, optionally never closing.
    Sse { chunks: Vec<String>, hang: bool },
    /// SSE body with `gap` between consecutive chunks.
    Paced { chunks: Vec<String>, gap: Duration },
    Status(StatusCode),
    Empty,
}

#[derive(Clone)]
struct Agent {
    reply: Reply,
    seen: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn handle(State(agent): State<Agent>, headers: HeaderMap, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    agent.seen.lock().expect("lock").push((headers, body));
    match agent.reply {
        Reply::Status(status) => Response::builder()
            .status(status)
            .body(Body::from("denied"))
            .expect("response"),
        Reply::Empty => Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .expect("response"),
        Reply::Sse { chunks, hang } => {
            let head = stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
            let body = if hang {
                Body::from_stream(head.chain(stream::pending()))
            } else {
                Body::from_stream(head)
            };
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/event-stream")
                .body(body)
                .expect("response")
        }
        Reply::Paced { chunks, gap } => {
            let body = stream::iter(chunks).then(move |chunk| async move {
                tokio::time::sleep(gap).await;
                Ok::<_, Infallible>(chunk)
            });
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/event-stream")
                .body(Body::from_stream(body))
                .expect("response")
        }
    }
}

async fn spawn_agent(reply: Reply) -> (SocketAddr, Arc<Mutex<Vec<(HeaderMap, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/a2a", post(handle)).with_state(Agent {
        reply,
        seen: seen.clone(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, seen)
}

fn client(addr: SocketAddr, mode: TransportMode) -> AgentStreamClient {
    client_with_timeout(addr, mode, Duration::from_secs(5))
}

fn client_with_timeout(
    addr: SocketAddr,
    mode: TransportMode,
    timeout: Duration,
) -> AgentStreamClient {
    let config = ClientConfig::new(format!("http://{addr}/a2a"))
        .access_token("access-1")
        .id_token("identity-1")
        .timeout(timeout)
        .transport(mode);
    AgentStreamClient::new(config).expect("client")
}

fn record(result: Value) -> String {
    format!(
        "data: {}\n\n",
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    )
}

fn artifact(name: &str, text: &str, append: bool) -> Value {
    json!({
        "kind": "artifact-update",
        "taskId": "t-1",
        "contextId": "c-1",
        "append": append,
        "artifact": {"name": name, "parts": [{"kind": "text", "text": text}]}
    })
}

fn streaming_then_final() -> Vec<String> {
    vec![
        record(artifact("streaming_result", "Hel", false)),
        record(artifact("streaming_result", "lo", true)),
        record(artifact("final_result", "Hello", false)),
        record(json!({
            "kind": "status-update", "taskId": "t-1", "contextId": "c-1",
            "status": {"state": "completed"}, "final": true
        })),
        record(json!({
            "kind": "status-update", "taskId": "t-1",
            "status": {"state": "working"}, "final": false
        })),
    ]
}

const MODES: [TransportMode; 2] = [TransportMode::Delegated, TransportMode::Fallback];

#[tokio::test]
async fn single_task_snapshot() {
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Sse {
            chunks: vec![record(
                json!({"kind": "task", "id": "t-1", "status": {"state": "submitted"}}),
            )],
            hang: false,
        })
        .await;
        let events: Vec<ParsedEvent> = client(addr, mode)
            .send("hi", None)
            .try_collect()
            .await
            .expect("events");
        assert_eq!(events.len(), 1, "{mode}");
        assert_eq!(events[0].event_type, EventType::Task);
        assert!(!events[0].is_final);
        assert_eq!(events[0].task_id.as_deref(), Some("t-1"));
    }
}

#[tokio::test]
async fn streaming_artifacts_then_final_status() {
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Sse {
            chunks: streaming_then_final(),
            hang: true,
        })
        .await;
        let events: Vec<ParsedEvent> = client(addr, mode)
            .send("hi", None)
            .try_collect()
            .await
            .expect("events");

        assert_eq!(events.len(), 4, "{mode}");
        assert!(!events[0].should_append);
        assert!(events[1].should_append);
        assert_eq!(events[2].artifact_kind(), Some(ArtifactKind::FinalResult));
        assert!(events[2].is_final);
        assert_eq!(events[3].event_type, EventType::Status);
        assert!(events[3].is_final);
    }
}

#[tokio::test]
async fn transports_agree_on_awkward_chunking() {
    let body = streaming_then_final().concat();
    let chunks: Vec<String> = body
        .as_bytes()
        .chunks(7)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();

    let mut outputs = Vec::new();
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Sse {
            chunks: chunks.clone(),
            hang: false,
        })
        .await;
        let events: Vec<ParsedEvent> = client(addr, mode)
            .send("hi", None)
            .try_collect()
            .await
            .expect("events");
        outputs.push(serde_json::to_value(&events).expect("serialize"));
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn transports_agree_on_trailing_records() {
    let one = record(artifact("streaming_result", "one", false));
    let two = record(artifact("streaming_result", "two", true));
    // Newline-terminated but never closed by a blank line.
    let open_tail = two.trim_end_matches('\n').to_string() + "\n";
    // No newline at all after the last line.
    let cut_tail = two.trim_end_matches('\n').to_string();

    for (body, expected) in [
        (format!("{one}{open_tail}"), vec!["one", "two"]),
        (format!("{one}{cut_tail}"), vec!["one"]),
    ] {
        for mode in MODES {
            let (addr, _) = spawn_agent(Reply::Sse {
                chunks: vec![body.clone()],
                hang: false,
            })
            .await;
            let texts: Vec<String> = client(addr, mode)
                .send("hi", None)
                .map_ok(|e| e.display_content)
                .try_collect()
                .await
                .expect("events");
            assert_eq!(texts, expected, "{mode}");
        }
    }
}

#[tokio::test]
async fn long_stream_outlives_timeout_while_data_keeps_flowing() {
    let mut chunks: Vec<String> = (0..6)
        .map(|i| {
            record(json!({
                "kind": "status-update", "taskId": "t-1",
                "status": {"state": "working", "message": {"parts": [{"kind": "text", "text": i.to_string()}]}}
            }))
        })
        .collect();
    chunks.push(record(json!({
        "kind": "status-update", "taskId": "t-1",
        "status": {"state": "completed"}, "final": true
    })));

    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Paced {
            chunks: chunks.clone(),
            gap: Duration::from_millis(250),
        })
        .await;
        let events: Vec<ParsedEvent> =
            client_with_timeout(addr, mode, Duration::from_secs(1))
                .send("hi", None)
                .try_collect()
                .await
                .expect("stream longer than the timeout should complete");
        assert_eq!(events.len(), 7, "{mode}");
        assert!(events[6].is_final);
    }
}

#[tokio::test]
async fn unauthorized_is_session_expired() {
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Status(StatusCode::UNAUTHORIZED)).await;
        let mut events = client(addr, mode).send("hi", None);
        let err = events.next().await.expect("item").expect_err("401");
        assert!(err.is_session_expired());
        assert!(err.to_string().contains("Session expired"));
        assert!(events.next().await.is_none());
    }
}

#[tokio::test]
async fn other_statuses_are_http_errors() {
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Status(StatusCode::BAD_GATEWAY)).await;
        let err = client(addr, mode)
            .send("hi", None)
            .try_collect::<Vec<_>>()
            .await
            .expect_err("502");
        assert_eq!(
            err,
            StreamError::Http {
                status: 502,
                method: "message/stream".into()
            }
        );
    }
}

#[tokio::test]
async fn empty_body_is_missing_body() {
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Empty).await;
        let err = client(addr, mode)
            .send("hi", None)
            .try_collect::<Vec<_>>()
            .await
            .expect_err("no body");
        assert_eq!(err, StreamError::MissingBody);
    }
}

#[tokio::test]
async fn json_rpc_error_surfaces_code_and_message() {
    let error = format!(
        "data: {}\n\n",
        json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32603, "message": "Internal error"}})
    );
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Sse {
            chunks: vec![error.clone()],
            hang: false,
        })
        .await;
        let err = client(addr, mode)
            .send("hi", None)
            .try_collect::<Vec<_>>()
            .await
            .expect_err("rpc error");
        let text = err.to_string();
        assert!(text.contains("-32603"), "{text}");
        assert!(text.contains("Internal error"), "{text}");
    }
}

#[tokio::test]
async fn second_send_supersedes_first() {
    for mode in MODES {
        let (addr, _) = spawn_agent(Reply::Sse {
            chunks: vec![record(
                json!({"kind": "status-update", "taskId": "t-1", "status": {"state": "working"}}),
            )],
            hang: true,
        })
        .await;
        let mut client = client(addr, mode);
        let mut first = client.send("one", None);
        let event = first.next().await.expect("event").expect("ok");
        assert_eq!(event.display_content, "working");

        let mut second = client.send("two", None);
        let rest = tokio::time::timeout(Duration::from_secs(2), first.next())
            .await
            .expect("first stream should end");
        assert!(rest.is_none(), "{mode}");

        let event = second.next().await.expect("event").expect("ok");
        assert_eq!(event.display_content, "working");
    }
}

#[tokio::test]
async fn request_carries_headers_and_json_rpc_body() {
    let (addr, seen) = spawn_agent(Reply::Sse {
        chunks: vec![record(
            json!({"kind": "task", "id": "t-1", "status": {"state": "completed"}}),
        )],
        hang: false,
    })
    .await;
    let _: Vec<ParsedEvent> = client(addr, TransportMode::Fallback)
        .send("hello agent", Some("ctx-9".into()))
        .try_collect()
        .await
        .expect("events");

    let seen = seen.lock().expect("lock");
    let (headers, body) = &seen[0];
    assert_eq!(headers[header::AUTHORIZATION], "Bearer access-1");
    assert_eq!(headers["x-identity-token"], "identity-1");
    assert_eq!(headers[header::ACCEPT], "text/event-stream");
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["method"], "message/stream");
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(
        body["params"]["message"],
        json!({"role": "user", "parts": [{"kind": "text", "text": "hello agent"}], "contextId": "ctx-9"})
    );
}
