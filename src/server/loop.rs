// Server loop module
// Accepts connections until shutdown, then waits for in-flight ones to finish

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Longest time to wait for open connections after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Accept connections on `listener` until `shutdown` completes
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                break;
            }
        }
    }

    drop(listener);
    drain(&active_connections).await;
}

/// Wait until no connection is open, or give up after `DRAIN_TIMEOUT`
async fn drain(active_connections: &AtomicUsize) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;

    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Closing with {} connection(s) still open",
                active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cli, Config};
    use crate::filecache::tests::scratch_dir;
    use crate::server::create_listener;
    use clap::Parser;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn request(addr: std::net::SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let root = scratch_dir("server-loop");
        std::fs::write(root.join("hello.txt"), "hello").unwrap();

        let cli = Cli::parse_from([
            "cached_fileserver",
            "-c",
            "/nonexistent/cached_fileserver",
            "-f",
            "/static",
        ]);
        let config = Config::load(&cli).unwrap();
        let state = Arc::new(AppState::new(config, &root));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state, async {
            let _ = stop_rx.await;
        }));

        let hit = request(
            addr,
            "GET /static/hello.txt HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(hit.starts_with("HTTP/1.1 200"), "{hit}");
        assert!(hit.ends_with("hello"));

        let miss = request(
            addr,
            "GET /hello.txt HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(miss.starts_with("HTTP/1.1 404"), "{miss}");
        assert!(miss.ends_with("404"));

        stop_tx.send(()).unwrap();
        server.await.unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
