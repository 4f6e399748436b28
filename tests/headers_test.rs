use http::HeaderMap;
use mimicnet::http::framing::{parse_header_line, parse_headers, split_header_body};
use mimicnet::http::{HeaderCollector, HeaderSink};
use mimicnet::NetError;

const RAW: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 123\r\nX-Custom: test-value\r\n";

#[test]
fn test_parse_status_and_headers() {
    let headers = parse_headers(RAW);
    assert_eq!(headers.len(), 3);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(headers.get("Content-Length").unwrap(), "123");
    assert_eq!(headers.get("x-custom").unwrap(), "test-value");
}

#[test]
fn test_empty_input() {
    assert!(parse_headers("").is_empty());
    assert!(parse_headers("\r\n\r\n").is_empty());
    assert!(parse_header_line("").is_none());
}

#[test]
fn test_bare_lf_matches_crlf() {
    let lf = RAW.replace("\r\n", "\n");
    assert_eq!(parse_headers(&lf), parse_headers(RAW));
}

#[test]
fn test_collector_matches_parse_headers() {
    let collector = HeaderCollector::new();
    for line in RAW.split_inclusive("\r\n") {
        collector.add_header_line(line);
    }
    collector.add_header_line("\r\n");
    assert_eq!(collector.headers(), parse_headers(RAW));
}

#[test]
fn test_repeated_names_accumulate() {
    let headers = parse_headers("Set-Cookie: a=1\nset-cookie: b=2\nSET-COOKIE: c=3\n");
    let values: Vec<_> = headers.get_all("set-cookie").iter().collect();
    assert_eq!(values, vec!["a=1", "b=2", "c=3"]);
}

#[test]
fn test_malformed_lines_skipped() {
    let headers = parse_headers("no colon\nGood: yes\nbad name: x\n: empty\n");
    let mut expected = HeaderMap::new();
    expected.insert("good", "yes".parse().unwrap());
    assert_eq!(headers, expected);
}

#[test]
fn test_split_combined_blob() {
    let blob = format!("{}\r\n{{\"ok\":true}}", RAW);
    let (head, body) = split_header_body(blob.as_bytes()).unwrap();
    assert_eq!(parse_headers(std::str::from_utf8(head).unwrap()).len(), 3);
    assert_eq!(body, br#"{"ok":true}"#);

    assert_eq!(
        split_header_body(b"no separator at all").unwrap_err(),
        NetError::MalformedResponse
    );
}
