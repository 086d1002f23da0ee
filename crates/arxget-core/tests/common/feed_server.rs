//! Minimal HTTP/1.1 server standing in for the query API and the e-print host.
//!
//! `GET /api/query?...&start=N&max_results=M` returns an Atom page sliced
//! from the configured entries. `GET /e-print/<key>` returns the key as the
//! body with a configurable `Content-Type`. `GET /moved/<key>` answers 302
//! (with its own `text/html` type) pointing at `/e-print/<key>`.
//! `GET /chemrxiv/items?...&limit=N&skip=M` serves the same entries as an
//! items page whose assets point back at `/e-print/<id>`. Every request
//! target is logged.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub updated: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Send `opensearch:totalResults`.
    pub send_total: bool,
    /// Status for every feed request (200 = serve pages).
    pub feed_status: u16,
    /// Content type by artifact key; keys not listed get `default_content_type`.
    pub content_types: HashMap<String, String>,
    pub default_content_type: Option<String>,
    /// Artifact keys answered with 404.
    pub missing: Vec<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            send_total: false,
            feed_status: 200,
            content_types: HashMap::new(),
            default_content_type: Some("application/pdf".to_string()),
            missing: Vec::new(),
        }
    }
}

pub struct FeedServer {
    base: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl FeedServer {
    /// Starts a server in a background thread. Runs until the process exits.
    pub fn start(entries: Vec<Entry>, opts: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let base = format!("http://127.0.0.1:{}/", port);
        let state = Arc::new((entries, opts, base.clone()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_accept = Arc::clone(&log);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&state);
                let log = Arc::clone(&log_accept);
                thread::spawn(move || handle(stream, &state.0, &state.1, &state.2, &log));
            }
        });
        FeedServer { base, log }
    }

    /// `http://127.0.0.1:<port>/`
    pub fn base_url(&self) -> String {
        self.base.clone()
    }

    pub fn api_url(&self) -> String {
        format!("{}api/query", self.base)
    }

    pub fn download_url(&self) -> String {
        format!("{}e-print/", self.base)
    }

    pub fn chemrxiv_url(&self) -> String {
        format!("{}chemrxiv/items", self.base)
    }

    /// `skip` parameter of every items request, in arrival order.
    pub fn item_skips(&self) -> Vec<usize> {
        self.query_param("/chemrxiv/items", "skip")
    }

    /// `start` parameter of every feed request, in arrival order.
    pub fn feed_starts(&self) -> Vec<usize> {
        self.query_param("/api/query", "start")
    }

    fn query_param(&self, path: &str, name: &str) -> Vec<usize> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|target| {
                let url = url::Url::parse(&format!("http://localhost{}", target)).ok()?;
                if url.path() != path {
                    return None;
                }
                url.query_pairs()
                    .find(|(k, _)| k == name)
                    .and_then(|(_, v)| v.parse().ok())
            })
            .collect()
    }

    /// Artifact keys requested, in arrival order.
    pub fn artifact_requests(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|t| t.strip_prefix("/e-print/").map(str::to_string))
            .collect()
    }
}

fn handle(
    mut stream: TcpStream,
    entries: &[Entry],
    opts: &ServerOptions,
    base: &str,
    log: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m.to_string(), t.to_string()),
        _ => return,
    };
    log.lock().unwrap().push(target.clone());

    if method != "GET" {
        respond(&mut stream, "405 Method Not Allowed", None, b"");
        return;
    }

    let is_atom = target.starts_with("/api/query");
    let is_items = target.starts_with("/chemrxiv/items");
    if is_atom || is_items {
        if opts.feed_status != 200 {
            respond(&mut stream, &format!("{} Error", opts.feed_status), None, b"");
            return;
        }
        let url = url::Url::parse(&format!("http://localhost{}", target)).unwrap();
        let param = |name: &str| -> usize {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0)
        };
        let total = opts.send_total.then_some(entries.len());
        if is_atom {
            let start = param("start").min(entries.len());
            let end = (start + param("max_results")).min(entries.len());
            let body = atom_page(&entries[start..end], total);
            respond(&mut stream, "200 OK", Some("application/atom+xml; charset=utf-8"), body.as_bytes());
        } else {
            let start = param("skip").min(entries.len());
            let end = (start + param("limit")).min(entries.len());
            let body = items_page(&entries[start..end], total, base);
            respond(&mut stream, "200 OK", Some("application/json"), body.as_bytes());
        }
        return;
    }

    if let Some(key) = target.strip_prefix("/moved/") {
        let head = format!(
            "HTTP/1.1 302 Found\r\nLocation: /e-print/{}\r\nContent-Type: text/html\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            key
        );
        let _ = stream.write_all(head.as_bytes());
        return;
    }

    if let Some(key) = target.strip_prefix("/e-print/") {
        if opts.missing.iter().any(|m| m == key) {
            respond(&mut stream, "404 Not Found", Some("text/plain"), b"not found");
            return;
        }
        let content_type = opts
            .content_types
            .get(key)
            .cloned()
            .or_else(|| opts.default_content_type.clone());
        respond(&mut stream, "200 OK", content_type.as_deref(), key.as_bytes());
        return;
    }

    respond(&mut stream, "404 Not Found", None, b"");
}

fn respond(stream: &mut TcpStream, status: &str, content_type: Option<&str>, body: &[u8]) {
    let ct = content_type
        .map(|c| format!("Content-Type: {}\r\n", c))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        ct,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn atom_page(entries: &[Entry], total: Option<usize>) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <feed xmlns=\"http://www.w3.org/2005/Atom\" xmlns:opensearch=\"http://a9.com/-/spec/opensearch/1.1/\">\n\
         <title type=\"html\">ArXiv Query</title>\n\
         <id>http://arxiv.org/api/test</id>\n\
         <updated>2023-08-15T00:00:00-04:00</updated>\n",
    );
    if let Some(total) = total {
        xml.push_str(&format!("<opensearch:totalResults>{}</opensearch:totalResults>\n", total));
    }
    for e in entries {
        xml.push_str(&format!(
            "<entry>\n<id>{}</id>\n<updated>{}</updated>\n<published>{}</published>\n<title>{}</title>\n</entry>\n",
            e.id, e.updated, e.updated, e.title
        ));
    }
    xml.push_str("</feed>\n");
    xml
}

fn items_page(entries: &[Entry], total: Option<usize>, base: &str) -> String {
    let hits: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "item": {
                    "id": e.id,
                    "title": e.title,
                    "statusDate": e.updated,
                    "publishedDate": e.updated,
                    "asset": {
                        "fileName": format!("{}.pdf", e.id),
                        "original": { "url": format!("{}e-print/{}", base, e.id) }
                    }
                }
            })
        })
        .collect();
    let mut page = serde_json::json!({ "itemHits": hits });
    if let Some(total) = total {
        page["totalCount"] = serde_json::json!(total);
    }
    page.to_string()
}
