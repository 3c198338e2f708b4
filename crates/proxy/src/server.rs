use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ProxyConfig;
use crate::filter::{ContentTransform, ElementRemover};
use crate::handler::ProxyService;
use crate::upstream::{TcpUpstream, Upstream};

#[derive(Debug)]
pub struct ProxyServerBuilder {
    config: ProxyConfig,
    upstream: Arc<dyn Upstream>,
    transform: Arc<dyn ContentTransform>,
}

impl ProxyServerBuilder {
    fn new(config: ProxyConfig) -> Self {
        Self { config, upstream: Arc::new(TcpUpstream), transform: Arc::new(ElementRemover) }
    }

    pub fn upstream(mut self, upstream: impl Upstream + 'static) -> Self {
        self.upstream = Arc::new(upstream);
        self
    }

    pub fn transform(mut self, transform: impl ContentTransform + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    pub fn build(self) -> ProxyServer {
        let service = ProxyService::new(Arc::new(self.config), self.upstream, self.transform);
        ProxyServer { service: Arc::new(service) }
    }
}

#[derive(Debug)]
pub struct ProxyServer {
    service: Arc<ProxyService>,
}

impl ProxyServer {
    pub fn builder(config: ProxyConfig) -> ProxyServerBuilder {
        ProxyServerBuilder::new(config)
    }

    /// Binds the configured address and serves until the process ends.
    pub async fn start(self) -> io::Result<()> {
        let address = bind_address(self.service.config().listen_on());
        info!("start listening at {address}");

        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e);
            }
        };

        self.serve(listener).await;
        Ok(())
    }

    /// Accepts connections from `listener`, one task per connection.
    pub async fn serve(self, listener: TcpListener) {
        loop {
            let (tcp_stream, peer) = match listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let service = Arc::clone(&self.service);
            tokio::spawn(async move {
                service.handle(tcp_stream, peer).await;
            });
        }
    }
}

/// `:8080` means every interface.
fn bind_address(listen_on: &str) -> String {
    if listen_on.starts_with(':') { format!("0.0.0.0{listen_on}") } else { listen_on.to_string() }
}
