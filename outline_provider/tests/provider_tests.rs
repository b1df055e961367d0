use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use outline_provider::config::{default_openai_config, OPENAI_DEFAULTS};
use outline_provider::{CompletionProvider, OpenAiProvider, ProviderError};

/// Serves one canned HTTP response and hands back the raw request.
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).expect("write response");
        request
    });
    (format!("http://{addr}"), handle)
}

fn read_request(stream: &mut std::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).expect("read");
        if n == 0 { break; }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok()).flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length { break; }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn provider_for(base_url: String, timeout: Duration) -> OpenAiProvider {
    let mut config = default_openai_config("test-key");
    config.base_url = base_url;
    config.timeout = timeout;
    OpenAiProvider::new(config).expect("valid config")
}

#[test]
fn posts_chat_completion_and_reads_content() {
    let (base, handle) = serve_once("200 OK", r#"{"choices":[{"message":{"role":"assistant","content":"[]"}}]}"#);
    let provider = provider_for(base, Duration::from_secs(5));

    let answer = provider.complete("list the sections").expect("completion");
    assert_eq!(answer, "[]");

    let request = handle.join().expect("server thread");
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer test-key"));
    assert!(request.contains(OPENAI_DEFAULTS.model));
    assert!(request.contains("list the sections"));
}

#[test]
fn non_200_status_is_an_api_error() {
    let (base, handle) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#);
    let provider = provider_for(base, Duration::from_secs(5));
    match provider.complete("x") {
        Err(ProviderError::Api { status, body }) => {
            assert_eq!(status, 429);
            assert!(body.contains("slow down"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
    handle.join().expect("server thread");
}

#[test]
fn missing_content_is_malformed() {
    let (base, handle) = serve_once("200 OK", r#"{"choices":[]}"#);
    let provider = provider_for(base, Duration::from_secs(5));
    assert!(matches!(provider.complete("x"), Err(ProviderError::Malformed(_))));
    handle.join().expect("server thread");
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let holder = thread::spawn(move || {
        // Accept and hold the connection without answering
        let (stream, _) = listener.accept().expect("accept");
        thread::sleep(Duration::from_millis(1500));
        drop(stream);
    });

    let provider = provider_for(base, Duration::from_millis(300));
    let err = provider.complete("x").expect_err("must time out");
    assert!(err.is_timeout(), "got {err:?}");
    holder.join().expect("holder thread");
}

#[test]
fn empty_api_key_is_rejected() {
    let config = default_openai_config("  ");
    assert!(matches!(OpenAiProvider::new(config), Err(ProviderError::NotConfigured(_))));
}
