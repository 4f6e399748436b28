#![allow(dead_code)]

//! Local HTTP/1.1 server used by the integration tests.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct TestServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// TCP connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Start a server on an ephemeral port.
///
/// Routes:
/// - `/echo`: request body back, with the request's content type
/// - `/headers`: request headers as `name: value` lines
/// - `/cookies`: two `Set-Cookie` headers
/// - `/json`: a small JSON document
/// - `/missing`: 404 without a content type
/// - `/slow`: answers after three seconds
/// - `/redirect/{n}`: 302 to `/redirect/{n-1}`, `arrived` at zero
/// - `/loop`: 302 to itself
/// - `/found`, `/see-other`, `/temporary`: 302, 303 and 307 to `/echo`
/// - `/away?to={url}`: 302 to `url`
/// - `/nowhere`: 302 without a `Location`
/// - anything else: `hello`
///
/// Every response carries the request method in `x-method`.
pub async fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(route))
                    .await;
            });
        }
    });

    TestServer { addr, connections }
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();
    let headers = req.headers().clone();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();

    let mut builder = Response::builder().header("x-method", method.as_str());
    let response = match path.as_str() {
        "/echo" => {
            if let Some(ct) = headers.get(CONTENT_TYPE) {
                builder = builder.header(CONTENT_TYPE, ct);
            }
            builder.body(Full::new(body))
        }
        "/headers" => {
            let mut out = String::new();
            for (name, value) in &headers {
                out.push_str(&format!("{}: {}\n", name, value.to_str().unwrap_or("")));
            }
            builder
                .header(CONTENT_TYPE, "text/plain")
                .body(Full::new(Bytes::from(out)))
        }
        "/cookies" => builder
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .header(CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from_static(b"ok"))),
        "/json" => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(br#"{"name":"mimicnet","ok":true}"#))),
        "/missing" => builder
            .status(404)
            .body(Full::new(Bytes::from_static(b"not found"))),
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            builder.body(Full::new(Bytes::from_static(b"late")))
        }
        "/loop" => redirect(builder, 302, "/loop"),
        "/found" => redirect(builder, 302, "/echo"),
        "/see-other" => redirect(builder, 303, "/echo"),
        "/temporary" => redirect(builder, 307, "/echo"),
        "/away" => redirect(builder, 302, query.strip_prefix("to=").unwrap_or("/")),
        "/nowhere" => builder.status(302).body(Full::new(Bytes::new())),
        p if p.starts_with("/redirect/") => match p["/redirect/".len()..].parse::<u32>() {
            Ok(0) | Err(_) => builder
                .header(CONTENT_TYPE, "text/plain")
                .body(Full::new(Bytes::from_static(b"arrived"))),
            Ok(n) => redirect(builder, 302, &format!("/redirect/{}", n - 1)),
        },
        _ => builder
            .header(CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from_static(b"hello"))),
    };
    Ok(response.unwrap())
}

fn redirect(
    builder: http::response::Builder,
    status: u16,
    location: &str,
) -> http::Result<Response<Full<Bytes>>> {
    builder
        .status(status)
        .header(http::header::LOCATION, location)
        .body(Full::new(Bytes::new()))
}
