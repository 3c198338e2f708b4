use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{info, trace, warn};

/// Copies bytes between client and origin until both directions are done.
///
/// `pending` holds client bytes that were read along with the CONNECT head; they reach the origin
/// before anything else. When a direction ends, by EOF or error, only the write side of its
/// destination is shut down so the other direction can keep draining.
///
/// Returns the bytes copied client to origin and origin to client.
pub async fn relay(
    client_recv: &mut (impl AsyncRead + Unpin),
    client_send: &mut (impl AsyncWrite + Unpin),
    origin_recv: &mut (impl AsyncRead + Unpin),
    origin_send: &mut (impl AsyncWrite + Unpin),
    pending: &[u8],
    client: SocketAddr,
    origin: SocketAddr,
) -> (io::Result<u64>, io::Result<u64>) {
    tokio::join!(
        async {
            let result = async {
                origin_send.write_all(pending).await?;
                let copied = tokio::io::copy(client_recv, origin_send).await?;
                Ok::<_, io::Error>(pending.len() as u64 + copied)
            }
            .await;
            shutdown(origin_send, origin).await;
            log_direction(result, client, origin)
        },
        async {
            let result = tokio::io::copy(origin_recv, client_send).await;
            shutdown(client_send, client).await;
            log_direction(result, origin, client)
        }
    )
}

async fn shutdown(writer: &mut (impl AsyncWrite + Unpin), peer: SocketAddr) {
    if let Err(e) = writer.shutdown().await {
        trace!(%peer, cause = %e, "failed to shutdown tunnel side");
    }
}

fn log_direction(result: io::Result<u64>, from: SocketAddr, to: SocketAddr) -> io::Result<u64> {
    match &result {
        Ok(copied) => info!("tunnel side closed, {copied} bytes copied from {from} to {to}"),
        Err(e) => warn!(cause = %e, "tunnel side failed, copying from {from} to {to}"),
    }
    result
}
