//! One client connection, from the request head to the last byte of the answer.
//!
//! A connection carries exactly one exchange:
//!
//! 1. read the request head from the client
//! 2. CONNECT requests are checked against the tunnel allow-list, answered with `200 OK` and
//!    relayed byte for byte until both sides close
//! 3. any other request is rewritten to origin form and sent to the origin, and the origin's
//!    response goes back through the [`ResponseFilter`]
//!
//! A failure before anything reached the client is answered with an error page. Once the
//! client may have seen part of a response the connection is just dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use micro_proxy_http::connection::{RequestReader, RequestWriter, ResponseReader, ResponseWriter};
use micro_proxy_http::protocol::body::BodyReader;
use micro_proxy_http::protocol::{MessageHead, PayloadSize, RequestHead, SendError};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::error_page::ErrorPage;
use crate::filter::{ContentTransform, ResponseFilter};
use crate::synthetic;
use crate::target::Destination;
use crate::tunnel;
use crate::upstream::{Upstream, check_tunnel_target};

type ClientWriter = ResponseWriter<OwnedWriteHalf>;

/// State shared by every connection; nothing in it changes after startup.
#[derive(Debug)]
pub struct ProxyService {
    config: Arc<ProxyConfig>,
    upstream: Arc<dyn Upstream>,
    filter: ResponseFilter,
    error_page: ErrorPage,
}

impl ProxyService {
    pub fn new(config: Arc<ProxyConfig>, upstream: Arc<dyn Upstream>, transform: Arc<dyn ContentTransform>) -> Self {
        let filter = ResponseFilter::new(Arc::clone(&config), transform);
        let error_page = ErrorPage::from_config(&config);
        Self { config, upstream, filter, error_page }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serves the single exchange on `stream`, then closes it.
    pub async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let (client_read, client_write) = stream.into_split();
        let mut client_writer = ResponseWriter::new(client_write);

        let error = match self.process(client_read, &mut client_writer, peer).await {
            Ok(()) => {
                debug!(%peer, "finished process, connection shutdown");
                return;
            }
            Err(e) => e,
        };

        match error.status() {
            Some(status) if client_writer.written() == 0 => {
                warn!(%peer, cause = %error, "failed to proxy request, send error page");
                let (head, body) = self.error_page.response(status, error.reason());
                info!(%peer, "-> {}", head.start_line());
                if let Err(e) = client_writer.write_message(head, body).await {
                    warn!(%peer, cause = %e, "failed to send error page");
                }
            }
            _ => warn!(%peer, cause = %error, "failed to proxy request, drop connection"),
        }
    }

    async fn process(
        &self,
        client_read: OwnedReadHalf,
        client_writer: &mut ClientWriter,
        peer: SocketAddr,
    ) -> Result<(), ProxyError> {
        let mut client_reader = RequestReader::new(client_read);

        let (request, payload_size) = timeout(self.config.head_timeout(), client_reader.read_head())
            .await
            .map_err(|e| ProxyError::bad_request(format!("request head not received: {e}")))?
            .map_err(|e| ProxyError::bad_request(format!("can't read request: {e}")))?;
        info!(%peer, "<- {}", request.start_line());

        if request.is_connect() {
            self.tunnel(&request, client_reader, client_writer, peer).await
        } else {
            self.forward(request, payload_size, client_reader, client_writer, peer).await
        }
    }

    async fn forward(
        &self,
        mut request: RequestHead,
        payload_size: PayloadSize,
        client_reader: RequestReader<OwnedReadHalf>,
        client_writer: &mut ClientWriter,
        peer: SocketAddr,
    ) -> Result<(), ProxyError> {
        let destination = Destination::from_request(&request)?;
        request.set_target(destination.relative_target.clone());
        if !request.headers().contains("Host") {
            request.headers_mut().set("Host", destination.authority());
        }

        let origin = self.dial(&destination).await?;
        let origin_addr = origin.peer_addr().map_err(ProxyError::bad_gateway)?;
        let (origin_read, origin_write) = origin.into_split();
        let mut origin_reader = ResponseReader::for_request(origin_read, &request);
        let mut origin_writer = RequestWriter::new(origin_write);

        info!(peer = %origin_addr, "-> {}", request.start_line());
        let request_body = client_reader.into_body(payload_size);
        origin_writer
            .write_message(request, request_body)
            .await
            .map_err(|e| ProxyError::bad_gateway(format!("can't send request to {origin_addr}: {e}")))?;

        let (response, payload_size) = timeout(self.config.head_timeout(), origin_reader.read_head())
            .await
            .map_err(|e| ProxyError::bad_gateway(format!("no response from {origin_addr}: {e}")))?
            .map_err(|e| ProxyError::bad_gateway(format!("can't read response from {origin_addr}: {e}")))?;
        info!(peer = %origin_addr, "<- {}", response.start_line());

        let body = origin_reader.into_body(payload_size);
        let (response, body) = self.filter.apply(&destination.url, response, body).await?;

        info!(%peer, "-> {}", response.start_line());
        client_writer.write_message(response, body).await.map_err(|e| match e {
            SendError::Body { source } => {
                ProxyError::bad_gateway(format!("can't relay response body from {origin_addr}: {source}"))
            }
            e => ProxyError::unclassified(format!("can't send response: {e}")),
        })
    }

    async fn dial(&self, destination: &Destination) -> Result<TcpStream, ProxyError> {
        let authority = destination.authority();
        timeout(self.config.dial_timeout(), self.upstream.dial(&destination.host, destination.port))
            .await
            .map_err(|e| ProxyError::bad_gateway(format!("can't connect to {authority}: {e}")))?
            .map_err(|e| ProxyError::bad_gateway(format!("can't connect to {authority}: {e}")))
    }

    async fn tunnel(
        &self,
        request: &RequestHead,
        client_reader: RequestReader<OwnedReadHalf>,
        client_writer: &mut ClientWriter,
        peer: SocketAddr,
    ) -> Result<(), ProxyError> {
        let target = request.target().trim();
        let addrs = check_tunnel_target(self.upstream.as_ref(), self.config.allow_tunnels_to(), target).await?;

        let origin = timeout(self.config.dial_timeout(), self.upstream.connect(&addrs))
            .await
            .map_err(|e| ProxyError::bad_gateway(format!("can't connect to {target}: {e}")))?
            .map_err(|e| ProxyError::bad_gateway(format!("can't connect to {target}: {e}")))?;
        let origin_addr = origin.peer_addr().map_err(ProxyError::bad_gateway)?;

        let head = synthetic::response_head(request.version(), StatusCode::OK);
        info!(%peer, "-> {}", head.start_line());
        client_writer
            .write_message(head, BodyReader::empty())
            .await
            .map_err(|e| ProxyError::unclassified(format!("can't confirm tunnel: {e}")))?;
        info!("established tunnel between {peer} and {origin_addr}");

        let (mut client_read, pending) = client_reader.into_parts();
        let (mut origin_read, mut origin_write) = origin.into_split();
        let (sent, received) = tunnel::relay(
            &mut client_read,
            client_writer.get_mut(),
            &mut origin_read,
            &mut origin_write,
            &pending,
            peer,
            origin_addr,
        )
        .await;
        debug!(%peer, sent = ?sent.ok(), received = ?received.ok(), "tunnel finished");
        Ok(())
    }
}
