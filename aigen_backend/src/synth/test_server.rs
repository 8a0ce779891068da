//! Bare HTTP/1.1 server the adapter tests point their clients at.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde_json::Value;

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

pub(crate) struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    pub fn json(value: Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn png(image: &DynamicImage) -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body: png_bytes(image),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
        }
    }
}

type Handler = dyn Fn(&Recorded, &TestServer) -> Reply + Send + Sync;

#[derive(Clone)]
pub(crate) struct TestServer {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    /// Serves every connection on its own thread until the test process exits.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded, &TestServer) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();
        let server = Self {
            url: format!("http://127.0.0.1:{port}"),
            requests: Arc::default(),
        };
        let handler: Arc<Handler> = Arc::new(handler);

        let accept_server = server.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let server = accept_server.clone();
                let handler = handler.clone();
                thread::spawn(move || server.serve(stream, handler.as_ref()));
            }
        });
        server
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// `"METHOD /path"` for every request received so far.
    pub fn routes(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn find(&self, method: &str, path: &str) -> Option<Recorded> {
        self.requests()
            .into_iter()
            .find(|r| r.method == method && r.path == path)
    }

    /// Blocks a handler until another request has arrived, up to a few seconds.
    pub fn wait_for(&self, method: &str, path: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.find(method, path).is_some() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn serve(&self, stream: TcpStream, handler: &Handler) {
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let Some(request) = read_request(&mut reader) else {
            return;
        };
        self.requests.lock().unwrap().push(request.clone());
        let reply = handler(&request, self);

        let mut stream = stream;
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            reply.status,
            if reply.status < 400 { "OK" } else { "Error" },
            reply.content_type,
            reply.body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&reply.body);
        let _ = stream.flush();
    }
}

fn read_request(reader: &mut BufReader<TcpStream>) -> Option<Recorded> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(Recorded {
        method,
        path: path.to_string(),
        query: query.to_string(),
        body,
    })
}

pub(crate) fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
