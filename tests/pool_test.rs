//! Pool behaviour through the transport, using an in-process handle.

use bytes::Bytes;
use http::Request;
use http_body_util::{Empty, Full};
use mimicnet::http::{BodySink, HeaderSink};
use mimicnet::{Handle, HandleConfig, HandleOption, NetError, PerformError, ResponseCapture, Transport};
use std::sync::Arc;

/// Answers every request with `200` and the request URL as body.
#[derive(Default)]
struct EchoHandle {
    url: Option<String>,
    body: Option<Bytes>,
    include_header: bool,
    write_sink: Option<Arc<dyn BodySink>>,
    header_sink: Option<Arc<dyn HeaderSink>>,
    response_code: Option<u16>,
    fail: bool,
}

impl Handle for EchoHandle {
    fn open() -> Result<Self, NetError> {
        Ok(Self::default())
    }

    fn set_option(&mut self, option: HandleOption) -> Result<(), NetError> {
        match option {
            HandleOption::Url(url) => {
                self.fail = url.contains("/fail");
                self.url = Some(url);
            }
            HandleOption::PostFields(body) => self.body = Some(body),
            HandleOption::IncludeHeader(v) => self.include_header = v,
            HandleOption::WriteSink(sink) => self.write_sink = Some(sink),
            HandleOption::HeaderSink(sink) => self.header_sink = Some(sink),
            _ => {}
        }
        Ok(())
    }

    async fn perform(&mut self) -> Result<(), NetError> {
        tokio::task::yield_now().await;
        if self.fail {
            return Err(PerformError::ConnectionReset.into());
        }
        let head = [
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/plain\r\n",
            "X-Echo: yes\r\n",
            "\r\n",
        ];
        for line in head {
            if let Some(sink) = &self.header_sink {
                sink.add_header_line(line);
            }
            if self.include_header {
                if let Some(sink) = &self.write_sink {
                    sink.append(line.as_bytes());
                }
            }
        }
        let body = match &self.body {
            Some(body) => body.clone(),
            None => Bytes::from(self.url.clone().unwrap_or_default()),
        };
        if let Some(sink) = &self.write_sink {
            sink.append(&body);
        }
        self.response_code = Some(200);
        Ok(())
    }

    fn response_code(&self) -> Option<u16> {
        self.response_code
    }

    fn content_type(&self) -> Option<String> {
        None
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn transport(pool_size: usize) -> Transport<EchoHandle> {
    Transport::with_config(HandleConfig::builder().pool_size(pool_size).build())
}

fn get(url: &str) -> Request<Empty<Bytes>> {
    Request::get(url).body(Empty::new()).unwrap()
}

#[tokio::test]
async fn test_sequential_requests_reuse_one_handle() {
    let transport = transport(4);
    for i in 0..100 {
        let url = format!("http://mock.local/{}", i);
        let resp = transport.execute(get(&url)).await.unwrap();
        assert_eq!(resp.text().unwrap(), url);
        assert_eq!(resp.headers().get("x-echo").unwrap(), "yes");
    }
    assert_eq!(transport.pool().created_count(), 1);
    assert_eq!(transport.pool().idle_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_burst_over_capacity() {
    let transport = Arc::new(transport(5));
    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let transport = transport.clone();
            tokio::spawn(async move {
                let url = format!("http://mock.local/burst/{}", i);
                let resp = transport.execute(get(&url)).await.unwrap();
                assert_eq!(resp.text().unwrap(), url);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let pool = transport.pool();
    assert!(pool.created_count() >= 1);
    assert!(pool.created_count() <= 200);
    assert!(pool.idle_count() <= pool.capacity());
    assert_eq!(pool.created_count(), pool.idle_count() + pool.destroyed_count());
}

#[tokio::test]
async fn test_failed_perform_releases_handle() {
    let transport = transport(2);
    let err = transport.execute(get("http://mock.local/fail")).await.unwrap_err();
    assert_eq!(err.perform_error(), Some(&PerformError::ConnectionReset));
    assert_eq!(transport.pool().idle_count(), 1);

    // The released handle was reset; the next request succeeds on it.
    let resp = transport.execute(get("http://mock.local/ok")).await.unwrap();
    assert_eq!(resp.text().unwrap(), "http://mock.local/ok");
    assert_eq!(transport.pool().created_count(), 1);
}

#[tokio::test]
async fn test_combined_capture() {
    let transport = transport(2).with_capture(ResponseCapture::Combined);
    let request = Request::post("http://mock.local/submit")
        .body(Full::new(Bytes::from_static(b"payload\r\n\r\nwith separator")))
        .unwrap();
    let resp = transport.execute(request).await.unwrap();
    assert_eq!(resp.content_type(), Some("text/plain"));
    assert_eq!(resp.headers().get("x-echo").unwrap(), "yes");
    assert_eq!(resp.text().unwrap(), "payload\r\n\r\nwith separator");
}

#[tokio::test]
async fn test_pool_never_blocks_when_drained() {
    let transport = transport(1);
    let first = transport.pool().checkout().unwrap();
    let second = transport.pool().checkout().unwrap();
    assert_eq!(transport.pool().created_count(), 2);
    drop(first);
    drop(second);
    assert_eq!(transport.pool().idle_count(), 1);
    assert_eq!(transport.pool().destroyed_count(), 1);
}
