//! Integration test: run the client against a tiny_http server standing in
//! for the compiler's trace server.

use std::thread;
use std::time::Duration;

use thorn_insight_client::{ClientError, InsightClient};
use thorn_insight_core::GlobalSpan;
use thorn_insight_core::model::{Channel, Effect, Payload, Request, RequestTracker, Stage};
use thorn_insight_protocol::{EdgeKind, FileEntry, WireSpan};
use tiny_http::{Response, Server};

/// Serve canned bodies by path + query until the test process exits.
fn mock_server() -> String {
    let server = Server::http("127.0.0.1:0").expect("bind mock server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("mock server listens on TCP");
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let (status, body) = match request.url() {
                "/files" => (200, r#"[[0,"main.thorn"],[1,"lib.thorn"]]"#),
                "/files/0" => (200, r#"["let x = 1;",[100,110]]"#),
                "/files?low=104&high=105" => (200, r#""x""#),
                "/data?low=100&high=110" => (
                    200,
                    r#"[{"stage":"lexer","source":[100,103],"ok":"Let"},
                        {"stage":"parser","source":[104,105],"error":"bad","ref":[100,103]}]"#,
                ),
                "/data/graph?stage=parser" => (
                    200,
                    r#"{"nodes":[{"stage":"parser","source":[0,20],"ok":"Item"},
                                 {"stage":"parser","source":[5,10],"ok":"Expr"}],
                        "edges":[{"source":0,"target":1,"ty":"Parent"},
                                 {"source":1,"target":0,"ty":"Ref"}]}"#,
                ),
                "/data/graph?stage=llvm" => (200, "not json"),
                _ => (404, "not found"),
            };
            let _ = request.respond(Response::from_string(body).with_status_code(status));
        }
    });
    addr.to_string()
}

fn client(addr: &str) -> InsightClient {
    InsightClient::new(addr, Duration::from_secs(5)).expect("client builds")
}

fn g(start: u64, end: u64) -> GlobalSpan {
    GlobalSpan::new(start, end).expect("valid span")
}

#[tokio::test]
async fn fetches_every_endpoint() {
    let client = client(&mock_server());

    let files = client.files().await.expect("file list");
    assert_eq!(files[0], FileEntry(0, "main.thorn".into()));
    assert_eq!(files.len(), 2);

    let content = client.file_content(0).await.expect("file content");
    assert_eq!(content.0, "let x = 1;");
    assert_eq!(content.1, WireSpan(100, 110));

    assert_eq!(client.span_text(g(104, 105)).await.expect("span text"), "x");

    let events = client.trace_events(g(100, 110)).await.expect("trace events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].ref_span, Some(WireSpan(100, 103)));
    assert_eq!(events[1].error.as_deref(), Some("bad"));

    let graph = client.graph(&Stage::Parser).await.expect("graph");
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges[1].kind, EdgeKind::Ref);
}

#[tokio::test]
async fn reports_status_and_decode_errors() {
    let client = client(&mock_server());

    let missing = client.file_content(9).await;
    assert!(matches!(missing, Err(ClientError::Status { .. })), "{missing:?}");

    let garbled = client.graph(&Stage::Llvm).await;
    assert!(matches!(garbled, Err(ClientError::Decode { .. })), "{garbled:?}");
}

#[tokio::test]
async fn fulfill_keeps_the_token() {
    let client = client(&mock_server());
    let mut tracker = RequestTracker::new();

    let token = tracker.issue(Channel::Files);
    let response = client
        .fulfill(Effect {
            token,
            request: Request::Files,
        })
        .await;
    assert_eq!(response.token, token);
    assert!(matches!(response.result, Ok(Payload::Files(ref f)) if f.len() == 2));

    let token = tracker.issue(Channel::FileContent);
    let response = client
        .fulfill(Effect {
            token,
            request: Request::FileContent(42),
        })
        .await;
    assert_eq!(response.token, token);
    assert!(response.result.is_err());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Port 9 (discard) is closed on test machines.
    let client = InsightClient::new("127.0.0.1:9", Duration::from_millis(500)).expect("client");
    let result = client.files().await;
    assert!(matches!(result, Err(ClientError::Transport { .. })), "{result:?}");
}
