//! Listener specs, handles, and the accept loop.
//!
//! # Responsibilities
//! - Derive up to three listener specs (plain, TLS, Unix) from configuration
//! - Bind each endpoint and accept connections until shutdown is requested
//! - Track live connections so shutdown can drain them
//! - Keep accepting after transient accept errors

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::accept::Accept;
use axum_server::tls_rustls::RustlsAcceptor;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::connection::ConnectionTracker;
use super::tls::load_tls_config;
use crate::config::{SchemeConfig, DISABLED_PORT};
use crate::http::server::serve_connection;
use crate::observability::metrics;

#[cfg(unix)]
use super::unix;
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// The three listener flavours a server can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Http,
    Https,
    Unix,
}

impl ListenerKind {
    /// Every kind, in shutdown order.
    pub const ALL: [ListenerKind; 3] = [ListenerKind::Http, ListenerKind::Https, ListenerKind::Unix];

    /// Name used across the host boundary.
    pub fn as_str(self) -> &'static str {
        match self {
            ListenerKind::Http => "http",
            ListenerKind::Https => "https",
            ListenerKind::Unix => "unix",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown listener kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ListenerKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(ListenerKind::Http),
            "https" => Ok(ListenerKind::Https),
            "unix" => Ok(ListenerKind::Unix),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Where a listener accepts connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port`, IPv6 hosts bracketed.
    Tcp(String),
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => f.write_str(addr),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// PEM certificate chain and private key for the TLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// One listener to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    pub kind: ListenerKind,
    pub endpoint: Endpoint,
    pub tls: Option<TlsFiles>,
    /// Octal mode applied to the socket file after binding.
    pub permission: Option<String>,
}

impl ListenerSpec {
    /// Enabled listeners in `http`, `https`, `unix` order. A port of `-1` or an
    /// empty socket path disables that listener.
    pub fn from_config(scheme: &SchemeConfig) -> Vec<ListenerSpec> {
        let mut specs = Vec::with_capacity(3);

        if scheme.http_port != DISABLED_PORT {
            specs.push(ListenerSpec {
                kind: ListenerKind::Http,
                endpoint: Endpoint::Tcp(tcp_address(&scheme.address, scheme.http_port)),
                tls: None,
                permission: None,
            });
        }
        if scheme.https_port != DISABLED_PORT {
            specs.push(ListenerSpec {
                kind: ListenerKind::Https,
                endpoint: Endpoint::Tcp(tcp_address(&scheme.address, scheme.https_port)),
                tls: Some(TlsFiles {
                    cert: PathBuf::from(&scheme.cert_file),
                    key: PathBuf::from(&scheme.key_file),
                }),
                permission: None,
            });
        }
        if !scheme.unix_file.is_empty() {
            specs.push(ListenerSpec {
                kind: ListenerKind::Unix,
                endpoint: Endpoint::Unix(PathBuf::from(&scheme.unix_file)),
                tls: None,
                permission: Some(scheme.unix_file_perm.clone()).filter(|perm| !perm.is_empty()),
            });
        }

        specs
    }
}

fn tcp_address(host: &str, port: i32) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to load TLS material: {0}")]
    Tls(#[source] io::Error),
    #[error("unix sockets are not supported on this platform: {endpoint}")]
    UnsupportedUnix { endpoint: String },
}

/// Shared handle to a launched listener.
///
/// The lifecycle layer stores one per kind; dropping every clone does not
/// stop the listener, [`ListenerHandle::request_shutdown`] does.
#[derive(Debug)]
pub struct ListenerHandle {
    kind: ListenerKind,
    shutdown: watch::Sender<bool>,
    tracker: ConnectionTracker,
}

impl ListenerHandle {
    pub fn new(kind: ListenerKind) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            kind,
            shutdown,
            tracker: ConnectionTracker::new(),
        })
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting and ask live connections to finish.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Request shutdown and wait up to `timeout` for live connections to close.
    /// Returns `false` if connections were still open at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.request_shutdown();
        self.tracker.wait_idle(timeout).await
    }
}

enum Bound {
    Tcp {
        listener: TcpListener,
        tls: Option<RustlsAcceptor>,
    },
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

enum Accepted {
    Tcp(TcpStream, std::net::SocketAddr),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Bound {
    async fn accept(&self) -> io::Result<Accepted> {
        match self {
            Bound::Tcp { listener, .. } => {
                let (stream, peer) = listener.accept().await?;
                Ok(Accepted::Tcp(stream, peer))
            }
            #[cfg(unix)]
            Bound::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                Ok(Accepted::Unix(stream))
            }
        }
    }
}

async fn bind(spec: &ListenerSpec) -> Result<Bound, ListenerError> {
    match &spec.endpoint {
        Endpoint::Tcp(addr) => {
            let tls = match &spec.tls {
                Some(files) => {
                    let config = load_tls_config(&files.cert, &files.key)
                        .await
                        .map_err(ListenerError::Tls)?;
                    Some(RustlsAcceptor::new(config))
                }
                None => None,
            };
            let listener = TcpListener::bind(addr.as_str())
                .await
                .map_err(|source| ListenerError::Bind {
                    endpoint: addr.clone(),
                    source,
                })?;
            Ok(Bound::Tcp { listener, tls })
        }
        Endpoint::Unix(path) => {
            #[cfg(unix)]
            {
                let listener = unix::bind(path).map_err(|source| ListenerError::Bind {
                    endpoint: spec.endpoint.to_string(),
                    source,
                })?;
                match &spec.permission {
                    Some(mode) => unix::apply_permissions(path, mode),
                    None => debug!(path = %path.display(), "No socket file permission configured, mode left unchanged"),
                }
                Ok(Bound::Unix {
                    listener,
                    path: path.clone(),
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(ListenerError::UnsupportedUnix {
                    endpoint: spec.endpoint.to_string(),
                })
            }
        }
    }
}

/// Bind `spec` and serve `app` until `handle` requests shutdown.
///
/// Returns `Ok(())` after a requested shutdown and an error if the endpoint
/// could not be bound. Connections still open when this returns keep running
/// until they finish or the drain deadline passes.
pub async fn run(spec: ListenerSpec, app: Router, handle: Arc<ListenerHandle>) -> Result<(), ListenerError> {
    let kind = spec.kind;
    let bound = bind(&spec).await?;

    info!(listener = %kind, endpoint = %spec.endpoint, "Listener active");
    metrics::record_listener_state(kind.as_str(), true);

    let mut last_error = None::<io::ErrorKind>;
    loop {
        let accepted = tokio::select! {
            _ = handle.stopped() => break,
            accepted = bound.accept() => accepted,
        };

        match accepted {
            Ok(accepted) => {
                last_error = None;
                dispatch(&bound, accepted, app.clone(), Arc::clone(&handle));
            }
            Err(error) => {
                let error_kind = error.kind();
                if last_error != Some(error_kind) {
                    warn!(listener = %kind, error = %error, "Accept error");
                }
                last_error = Some(error_kind);
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    cleanup(&bound);
    metrics::record_listener_state(kind.as_str(), false);
    info!(listener = %kind, "Listener stopped accepting");
    Ok(())
}

fn cleanup(bound: &Bound) {
    match bound {
        Bound::Tcp { .. } => {}
        #[cfg(unix)]
        Bound::Unix { path, .. } => unix::cleanup(path),
    }
}

fn dispatch(bound: &Bound, accepted: Accepted, app: Router, handle: Arc<ListenerHandle>) {
    let guard = handle.tracker.track();

    match (bound, accepted) {
        (Bound::Tcp { tls: Some(acceptor), .. }, Accepted::Tcp(stream, peer)) => {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                match acceptor.accept(stream, ()).await {
                    Ok((stream, ())) => serve_connection(stream, app, handle).await,
                    Err(error) => debug!(peer = %peer, error = %error, "TLS handshake failed"),
                }
                drop(guard);
            });
        }
        (_, Accepted::Tcp(stream, peer)) => {
            debug!(peer = %peer, connection_id = %guard.id(), "Connection accepted");
            tokio::spawn(async move {
                serve_connection(stream, app, handle).await;
                drop(guard);
            });
        }
        #[cfg(unix)]
        (_, Accepted::Unix(stream)) => {
            tokio::spawn(async move {
                serve_connection(stream, app, handle).await;
                drop(guard);
            });
        }
    }
}
