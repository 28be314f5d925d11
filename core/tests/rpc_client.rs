//! RPC client integration tests
//!
//! Each test runs the real client against a scripted TCP daemon bound to
//! an ephemeral port.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

use incant_core::rpc::{probe, RpcClient, RpcReply, TransportError};

/// Bind an ephemeral listener and run `script` on the first connection
async fn spawn_daemon<F, Fut>(script: F) -> String
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        script(stream).await;
    });

    addr
}

/// Read one request record from the client
async fn read_request(reader: &mut BufReader<OwnedReadHalf>) -> Value {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    serde_json::from_str(line.trim()).unwrap()
}

fn correlation_id(request: &Value) -> String {
    request["correlationId"].as_str().unwrap().to_string()
}

fn stream_record(id: &str, message_type: &str, content: &str, done: bool) -> Vec<u8> {
    format!(
        "{}\r\n",
        json!({
            "correlationId": id,
            "messageType": message_type,
            "payload": {"content": content, "done": done},
        })
    )
    .into_bytes()
}

fn terminal_record(id: &str, message_type: &str, payload: Value) -> Vec<u8> {
    format!(
        "{}\r\n",
        json!({
            "correlationId": id,
            "messageType": message_type,
            "payload": payload,
        })
    )
    .into_bytes()
}

#[tokio::test]
async fn streaming_chunks_reassemble_in_order() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = read_request(&mut reader).await;
        assert_eq!(request["messageType"], "llm/streamChat");
        let id = correlation_id(&request);

        // Final chunk carries content AND the completion marker
        write_half
            .write_all(&stream_record(&id, "llm/streamChat", "ab", false))
            .await
            .unwrap();
        write_half
            .write_all(&stream_record(&id, "llm/streamChat", "cd", false))
            .await
            .unwrap();
        write_half
            .write_all(&stream_record(&id, "llm/streamChat", "ef", true))
            .await
            .unwrap();
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let reply = client
        .request("llm/streamChat", json!({"messages": []}))
        .unwrap()
        .wait()
        .await
        .unwrap();

    match reply {
        RpcReply::Stream(text) => assert_eq!(text, "abcdef"),
        RpcReply::Payload(other) => panic!("expected stream, got {other:?}"),
    }
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn interleaved_streams_stay_isolated() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let first = correlation_id(&read_request(&mut reader).await);
        let second = correlation_id(&read_request(&mut reader).await);

        // Interleave chunks across the two requests
        for record in [
            stream_record(&second, "llm/streamChat", "B1", false),
            stream_record(&first, "llm/streamChat", "A1", false),
            stream_record(&second, "llm/streamChat", "B2", true),
            stream_record(&first, "llm/streamChat", "A2", true),
        ] {
            write_half.write_all(&record).await.unwrap();
        }
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let first = client.request("llm/streamChat", json!({"n": 1})).unwrap();
    let second = client.request("llm/streamChat", json!({"n": 2})).unwrap();

    let (first, second) = tokio::join!(first.wait(), second.wait());

    match first.unwrap() {
        RpcReply::Stream(text) => assert_eq!(text, "A1A2"),
        other => panic!("unexpected reply {other:?}"),
    }
    match second.unwrap() {
        RpcReply::Stream(text) => assert_eq!(text, "B1B2"),
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn terminal_type_delivers_payload_verbatim() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = read_request(&mut reader).await;
        assert_eq!(request["messageType"], "config/getBrowserSerialized");
        let id = correlation_id(&request);

        write_half
            .write_all(&terminal_record(
                &id,
                "config/getBrowserSerialized",
                json!({"models": [{"title": "fast"}, {"title": "smart"}]}),
            ))
            .await
            .unwrap();
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let reply = client
        .request("config/getBrowserSerialized", Value::Null)
        .unwrap()
        .wait()
        .await
        .unwrap();

    match reply {
        RpcReply::Payload(payload) => {
            assert_eq!(payload["models"][1]["title"], "smart");
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn unknown_correlation_id_is_dropped() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let id = correlation_id(&read_request(&mut reader).await);

        // Orphan record first: must not crash or cross-deliver
        write_half
            .write_all(&stream_record("no-such-request", "llm/streamChat", "X", true))
            .await
            .unwrap();
        write_half
            .write_all(&stream_record(&id, "llm/streamChat", "real", true))
            .await
            .unwrap();
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let reply = client
        .request("llm/streamChat", Value::Null)
        .unwrap()
        .wait()
        .await
        .unwrap();

    match reply {
        RpcReply::Stream(text) => assert_eq!(text, "real"),
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn malformed_record_does_not_kill_the_read_loop() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let id = correlation_id(&read_request(&mut reader).await);

        write_half.write_all(b"not json at all\r\n").await.unwrap();
        write_half
            .write_all(&stream_record(&id, "llm/streamChat", "survived", true))
            .await
            .unwrap();
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let reply = client
        .request("llm/streamChat", Value::Null)
        .unwrap()
        .wait()
        .await
        .unwrap();

    match reply {
        RpcReply::Stream(text) => assert_eq!(text, "survived"),
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn split_reads_reassemble_records() {
    // Byte-level fragmentation: records delivered in arbitrary pieces
    let addr = spawn_daemon(|stream| async move {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let id = correlation_id(&read_request(&mut reader).await);

        let mut bytes = stream_record(&id, "llm/streamChat", "hello ", false);
        bytes.extend(stream_record(&id, "llm/streamChat", "world", true));

        for piece in bytes.chunks(7) {
            write_half.write_all(piece).await.unwrap();
            write_half.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let reply = client
        .request("llm/streamChat", Value::Null)
        .unwrap()
        .wait()
        .await
        .unwrap();

    match reply {
        RpcReply::Stream(text) => assert_eq!(text, "hello world"),
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn cancel_prevents_late_delivery() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, _write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let _ = read_request(&mut reader).await;
        // Never respond; hold the connection open
        tokio::time::sleep(Duration::from_secs(5)).await;
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let pending = client.request("llm/streamChat", Value::Null).unwrap();
    let id = pending.correlation_id().to_string();

    assert_eq!(client.pending_requests(), 1);
    assert!(client.cancel(&id));
    assert_eq!(client.pending_requests(), 0);
    // Cancelling twice is a no-op
    assert!(!client.cancel(&id));

    let result = pending.wait().await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
}

#[tokio::test]
async fn dropped_client_abandons_pending_requests() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, _write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let _ = read_request(&mut reader).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let pending = client.request("llm/streamChat", Value::Null).unwrap();

    drop(client);

    let result = pending.wait().await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
}

#[tokio::test]
async fn daemon_disconnect_abandons_pending_requests() {
    let addr = spawn_daemon(|stream| async move {
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let _ = read_request(&mut reader).await;
        drop(write_half);
        drop(reader);
    })
    .await;

    let client = RpcClient::connect(&addr).await.unwrap();
    let result = client
        .request("llm/streamChat", Value::Null)
        .unwrap()
        .wait()
        .await;

    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn connect_to_nothing_fails() {
    // Bind then drop to get a port with no listener
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = RpcClient::connect(&addr).await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
}

#[tokio::test]
async fn probe_reports_listening_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    // Keep accepting so the probe's connect completes
    tokio::spawn(async move {
        loop {
            let _ = listener.accept().await;
        }
    });

    assert!(probe(&addr, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn probe_fails_fast_on_dead_address() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let limit = Duration::from_millis(500);
    let start = Instant::now();
    let alive = probe(&addr, limit).await;
    let elapsed = start.elapsed();

    assert!(!alive);
    // Bounded by the timeout plus scheduler slack
    assert!(elapsed < limit + Duration::from_secs(1), "took {elapsed:?}");
}
