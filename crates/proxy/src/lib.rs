//! An intercepting HTTP/1.x forward proxy.
//!
//! Plain `http://` requests are forwarded to their origin with the message engine from
//! [`micro_proxy_http`]; HTML pages whose URL matches a configured rule have the elements named
//! by the rule's CSS selectors cut out on the way back. `CONNECT` opens a raw tunnel, but only
//! to public addresses matching the configured allow-list.
//!
//! # Example
//!
//! ```no_run
//! use micro_proxy::config::ProxyConfig;
//! use micro_proxy::server::ProxyServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProxyConfig::from_json(r#"{"ListenOn": "127.0.0.1:8080", "AllowTunnelsTo": ":443$"}"#)?;
//!     ProxyServer::builder(config).build().start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod error_page;
pub mod filter;
pub mod handler;
pub mod server;
pub mod synthetic;
pub mod target;
pub mod tunnel;
pub mod upstream;
