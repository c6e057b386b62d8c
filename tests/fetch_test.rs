// Phase 2: image fetch + decode tests
//
// HTTP tests run against a one-shot responder on 127.0.0.1.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use chop_cropper::error::ChopError;
use chop_cropper::fetch::{HttpFetcher, ImageSource, decode_image, fetch_pixels};
use image::{ImageFormat, RgbImage};

fn rgb_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode PNG");
    buf.into_inner()
}

/// Serve exactly one HTTP response, returning the URL to request.
fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            let header = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    format!("http://{addr}/original/2304B00C0001D00.png")
}

fn local_fetcher() -> HttpFetcher {
    let client = reqwest::blocking::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("build client");
    HttpFetcher::with_client(client)
}

struct MemorySource(HashMap<String, Vec<u8>>);

impl ImageSource for MemorySource {
    fn fetch(&self, url: &str) -> chop_cropper::error::Result<Vec<u8>> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| ChopError::fetch(format!("HTTP 404 Not Found fetching {url}")))
    }
}

// ---- decode tests ----

#[test]
fn test_decode_synthesizes_alpha() {
    let pixels = decode_image(&rgb_png(6, 4, [200, 100, 80])).expect("decode PNG");
    assert_eq!((pixels.width(), pixels.height()), (6, 4));
    assert_eq!(pixels.as_raw().len(), 6 * 4 * 4);
    assert_eq!(pixels.rgba_at(5, 3), Some([200, 100, 80, 255]));
    assert_eq!(pixels.rgba_at(6, 0), None);
}

#[test]
fn test_decode_garbage_is_fetch_error() {
    let result = decode_image(b"<html>not an image</html>");
    assert!(matches!(result, Err(ChopError::FetchError(_))), "got {result:?}");
}

#[test]
fn test_fetch_pixels_keeps_source_bytes() {
    let bytes = rgb_png(3, 3, [10, 20, 30]);
    let url = "https://images.example.com/a.png".to_string();
    let source = MemorySource(HashMap::from([(url.clone(), bytes.clone())]));

    let fetched = fetch_pixels(&source, &url).expect("fetch from memory");
    assert_eq!(fetched.bytes, bytes);
    assert_eq!(fetched.pixels.width(), 3);
}

// ---- HttpFetcher tests ----

#[test]
fn test_http_fetch_success() {
    let body = rgb_png(8, 8, [200, 100, 80]);
    let url = serve_once("200 OK", body.clone());

    let bytes = local_fetcher().fetch(&url).expect("fetch should succeed");
    assert_eq!(bytes, body);
}

#[test]
fn test_http_fetch_non_2xx_is_fetch_error() {
    let url = serve_once("404 Not Found", b"missing".to_vec());

    let result = local_fetcher().fetch(&url);
    match result {
        Err(ChopError::FetchError(msg)) => assert!(msg.contains("404"), "message: {msg}"),
        other => panic!("expected FetchError, got {other:?}"),
    }
}

#[test]
fn test_http_fetch_unreachable_is_fetch_error() {
    // Bind then drop to find a port nobody listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        listener.local_addr().expect("local addr").port()
    };
    let url = format!("http://127.0.0.1:{port}/missing.jpg");

    let result = local_fetcher().fetch(&url);
    assert!(matches!(result, Err(ChopError::FetchError(_))), "got {result:?}");
}

#[test]
fn test_http_fetcher_from_default_settings() {
    let settings = chop_cropper::config::settings::Settings::default();
    assert!(HttpFetcher::from_settings(&settings).is_ok());
}
