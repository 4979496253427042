//! Fake Ollama servers for exercising the streaming pipeline in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Duration};

pub struct FakeOllama {
    pub base_url: String,
    hit_counter: Arc<AtomicUsize>,
}

impl FakeOllama {
    /// Number of connections the server has accepted.
    pub fn hits(&self) -> usize {
        self.hit_counter.load(Ordering::SeqCst)
    }
}

/// Serve `body` to the first connection, then close it. With `hold_open`
/// the socket stays open without sending further bytes, which is how a
/// stalled or cancelled stream looks on the wire.
pub async fn serve_once(body: String, hold_open: bool) -> FakeOllama {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let hit_counter = Arc::new(AtomicUsize::new(0));
    let hits_for_server = Arc::clone(&hit_counter);

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        hits_for_server.fetch_add(1, Ordering::SeqCst);
        let _ = read_request(&mut stream).await;

        let header =
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n";
        let _ = stream.write_all(header.as_bytes()).await;
        let _ = stream.write_all(body.as_bytes()).await;
        let _ = stream.flush().await;

        if hold_open {
            sleep(Duration::from_secs(30)).await;
        }
    });

    FakeOllama {
        base_url: format!("http://{addr}"),
        hit_counter,
    }
}

/// A URL nothing is listening on, for connection-refused scenarios.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    drop(listener);
    format!("http://{addr}")
}

/// Read the request head plus however many body bytes Content-Length
/// declares, so the client never sees a reset while still writing.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]);
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            let mut body_len = buf.len() - (end + 4);
            while body_len < content_length {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                body_len += n;
            }
            return Ok(());
        }
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}
