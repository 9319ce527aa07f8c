//! Session client tests against a minimal in-process HTTP server.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::*;

/// Serve each connection one canned response, in order; loops the last
/// response for any further connections.
async fn spawn_http_server(responses: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let response = responses[served.min(responses.len() - 1)].clone();
            served += 1;

            // Read the request head; the tests only send bodyless
            // requests.
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    format!("http://{addr}")
}

fn ok_response(body: &str, extra_headers: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n{extra_headers}Connection: close\r\n\r\n{body}",
        body.len()
    )
}

#[tokio::test]
async fn get_returns_status_and_body() {
    let base = spawn_http_server(vec![ok_response("<html><title>X</title>ok</html>", "")]).await;
    let client = SessionClient::new();

    let response = client.get(&base).send().await.unwrap();
    assert_eq!(response.status, 200);
    assert!(response.ok());
    assert!(response.text().contains("ok"));
    assert_eq!(response.title().as_deref(), Some("X"));
    assert_eq!(response.header("content-type"), Some("text/html"));
}

#[tokio::test]
async fn set_cookie_lands_in_the_jar() {
    let base = spawn_http_server(vec![ok_response(
        "ok",
        "Set-Cookie: session=abc123; Path=/; HttpOnly\r\nSet-Cookie: theme=dark\r\n",
    )])
    .await;
    let client = SessionClient::new();
    client.get(&base).send().await.unwrap();

    let cookies = client.get_cookies();
    assert_eq!(cookies.get("session").map(String::as_str), Some("abc123"));
    assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));

    let record = client.jar().get("session", None, None).unwrap();
    assert!(record.http_only);
    assert_eq!(record.domain, "127.0.0.1");
}

#[tokio::test]
async fn jar_cookies_are_sent_back() {
    // Second response echoes nothing; we only care what the server read.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<String>();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        let _ = seen_tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
        let body = ok_response("ok", "");
        let _ = stream.write_all(body.as_bytes()).await;
    });

    let client = SessionClient::new();
    client.set_cookies(
        HashMap::from([("a".to_string(), "1".to_string())]),
        "127.0.0.1",
    );
    client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();

    let request_head = seen_rx.await.unwrap();
    assert!(request_head.contains("Cookie: a=1"), "head: {request_head}");
}

#[tokio::test]
async fn redirects_are_followed_with_cookie_harvest() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        // First hop: redirect and set a cookie.
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let _ = stream.read(&mut buf).await;
        let redirect = "HTTP/1.1 302 Found\r\nLocation: /final\r\nSet-Cookie: hop=1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
        let _ = stream.write_all(redirect.as_bytes()).await;
        let _ = stream.shutdown().await;

        // Second hop: the real document.
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let _ = stream.read(&mut buf).await;
        let body = ok_response("landed", "");
        let _ = stream.write_all(body.as_bytes()).await;
    });

    let client = SessionClient::new();
    let response = client
        .get(format!("http://{addr}/start"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.text().contains("landed"));
    assert_eq!(response.history.len(), 2);
    assert!(response.history[0].ends_with("/start"));
    assert!(response.history[1].ends_with("/final"));
    // The intermediate hop's cookie was harvested.
    assert_eq!(
        client.get_cookies().get("hop").map(String::as_str),
        Some("1")
    );
}

#[tokio::test]
async fn default_headers_and_fingerprint_apply() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<String>();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        let _ = seen_tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
        let _ = stream.write_all(ok_response("ok", "").as_bytes()).await;
    });

    let client = SessionClient::new();
    client.set_fingerprint(&FingerprintProfile {
        user_agent: Some("KestrelBot/1.0".to_string()),
        headers: vec![("Accept-Language".to_string(), "de-DE".to_string())],
    });

    client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();

    let head = seen_rx.await.unwrap();
    assert!(head.contains("user-agent: KestrelBot/1.0") || head.contains("User-Agent: KestrelBot/1.0"));
    assert!(head.contains("accept-language: de-DE") || head.contains("Accept-Language: de-DE"));
}

#[test]
fn parse_set_cookie_attributes() {
    let url = Url::parse("https://shop.example.com/cart").unwrap();
    let cookie = parse_set_cookie(
        "token=xyz; Domain=.example.com; Path=/cart; Secure; HttpOnly; SameSite=Strict; Max-Age=3600",
        &url,
    )
    .unwrap();

    assert_eq!(cookie.name, "token");
    assert_eq!(cookie.value, "xyz");
    assert_eq!(cookie.domain, ".example.com");
    assert_eq!(cookie.path, "/cart");
    assert!(cookie.secure);
    assert!(cookie.http_only);
    assert_eq!(cookie.same_site, SameSite::Strict);
    let expires = cookie.expires.unwrap();
    assert!(expires > now_epoch() + 3000.0 && expires < now_epoch() + 4000.0);
}

#[test]
fn parse_set_cookie_defaults_scope_from_url() {
    let url = Url::parse("http://example.org/deep/page").unwrap();
    let cookie = parse_set_cookie("plain=1", &url).unwrap();
    assert_eq!(cookie.domain, "example.org");
    assert_eq!(cookie.path, "/");
    assert!(cookie.expires.is_none());
    assert_eq!(cookie.same_site, SameSite::Lax);
}

#[test]
fn parse_set_cookie_expires_rfc_date() {
    let url = Url::parse("http://example.org/").unwrap();
    let cookie =
        parse_set_cookie("old=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT", &url).unwrap();
    // Already in the past; the record reports itself expired.
    assert!(cookie.is_expired());
}

#[test]
fn parse_set_cookie_rejects_garbage() {
    let url = Url::parse("http://example.org/").unwrap();
    assert!(parse_set_cookie("no-equals-sign", &url).is_none());
    assert!(parse_set_cookie("=value-without-name", &url).is_none());
}

#[test]
fn cookie_header_respects_scope() {
    let jar = CookieStore::new();
    jar.set(CookieRecord::new("a", "1", "example.com"));
    jar.set(CookieRecord::new("b", "2", "other.org"));
    jar.set(CookieRecord::new("s", "3", "example.com").secure(true));

    assert_eq!(cookie_header_for(&jar, "http://example.com/"), "a=1");
    let https = cookie_header_for(&jar, "https://example.com/");
    assert!(https.contains("a=1") && https.contains("s=3"));
}

#[test]
fn form_body_is_url_encoded() {
    let client = SessionClient::new();
    let builder = client
        .post("http://example.com/submit")
        .form(&[("a b", "c&d"), ("e", "f=g")]);

    assert_eq!(builder.body.as_deref(), Some(&b"a+b=c%26d&e=f%3Dg"[..]));
    assert!(builder
        .headers
        .iter()
        .any(|(name, value)| name == "Content-Type"
            && value == "application/x-www-form-urlencoded"));
}

#[tokio::test]
async fn set_cookies_roundtrip_superset() {
    // P6: everything pushed in comes back out.
    let client = SessionClient::new();
    let pushed = HashMap::from([
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
    ]);
    client.set_cookies(pushed.clone(), "example.com");

    let cookies = client.get_cookies();
    for (name, value) in &pushed {
        assert_eq!(cookies.get(name), Some(value));
    }

    client.delete_cookie("a");
    assert!(client.get_cookies().get("a").is_none());
    client.clear_cookies();
    assert!(client.get_cookies().is_empty());
}
