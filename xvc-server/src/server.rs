use std::{
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, ToSocketAddrs},
    time::error::Elapsed,
};
use tokio_util::{codec::Framed, sync::CancellationToken, task::TaskTracker};
use xvc_protocol::{
    DEFAULT_MAX_VECTOR_LEN, Message, Response, Version, XvcInfo, error::ReadError,
    framing::ServerCodec,
};

use crate::XvcBackend;

#[derive(Debug, Clone)]
pub struct Config {
    /// Vector length advertised to clients by GetInfo
    pub max_vector_len: u32,
    /// Longest TMS/TDI vector in bytes a client may send. Unlimited when `None`.
    pub max_shift_bytes: Option<usize>,
    /// Clients that neither send nor accept data for this long are disconnected
    pub read_write_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_vector_len: DEFAULT_MAX_VECTOR_LEN,
            max_shift_bytes: None,
            read_write_timeout: None,
        }
    }
}

/// Serves one shared [XvcBackend] to any number of connections.
#[derive(Debug)]
pub struct Server<T: XvcBackend> {
    backend: Arc<Mutex<T>>,
    config: Config,
}

impl<T: XvcBackend> Clone for Server<T> {
    fn clone(&self) -> Self {
        Server {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
        }
    }
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use xvc_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .max_vector_len(2048)
///     .max_shift_bytes(2048)
///     .rw_timeout(Duration::from_secs(20))
///     .build(my_device);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the vector length this server advertises.
    pub fn max_vector_len(mut self, len: u32) -> Self {
        self.config.max_vector_len = len;
        self
    }

    /// Close connections that send a TMS/TDI vector longer than `len` bytes
    pub fn max_shift_bytes(mut self, len: usize) -> Self {
        self.config.max_shift_bytes = Some(len);
        self
    }

    /// Disconnect clients that stay idle for longer than `timeout`
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = Some(timeout);
        self
    }

    /// Build and return the server
    pub fn build<T: XvcBackend>(self, backend: T) -> Server<T> {
        Server::new(backend, self.config)
    }
}

impl<T: XvcBackend> Server<T> {
    pub fn new(backend: T, config: Config) -> Server<T> {
        Server {
            backend: Arc::new(Mutex::new(backend)),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The device shared by all connections of this server.
    pub fn backend(&self) -> Arc<Mutex<T>> {
        Arc::clone(&self.backend)
    }

    /// Binds to `addr` and serves connections until `shutdown` is cancelled.
    pub async fn listen(
        &self,
        addr: impl ToSocketAddrs,
        shutdown: CancellationToken,
    ) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Accepts connections until `shutdown` is cancelled, then waits for the
    /// connections that were already accepted to end.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> io::Result<()> {
        log::info!(
            "Server listening for connections on {}",
            listener.local_addr()?
        );
        let connections = TaskTracker::new();

        loop {
            let (tcp, peer_addr) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted?,
            };
            log::info!("New client connection from {}", peer_addr);
            if let Err(e) = tcp.set_nodelay(true) {
                log::warn!("Could not set TCP_NODELAY for {}: {}", peer_addr, e);
            }

            let server = self.clone();
            connections.spawn(async move {
                if let Err(e) = server.handle_connection(tcp).await {
                    log::error!("Client {} error: {}", peer_addr, e);
                }
                log::info!("Client {} disconnected", peer_addr);
            });
        }

        drop(listener);
        connections.close();
        log::info!(
            "Stopped accepting connections, waiting for {} client(s)",
            connections.len()
        );
        connections.wait().await;
        Ok(())
    }

    /// Answers messages from `stream` until the peer disconnects.
    ///
    /// Unknown commands end the connection with an error, as do vectors longer than
    /// [Config::max_shift_bytes] when a limit is set.
    pub async fn handle_connection<S>(&self, stream: S) -> Result<(), ReadError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let codec = match self.config.max_shift_bytes {
            Some(max) => ServerCodec::new(max),
            None => ServerCodec::unbounded(),
        };
        let mut framed = Framed::new(stream, codec);

        loop {
            let Ok(next) = self.timed(framed.next()).await else {
                log::error!("Client read timeout, closing connection");
                break;
            };
            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(err)) if err.is_disconnect() => {
                    log::trace!("Client went away mid-message: {}", err);
                    break;
                }
                Some(Err(err)) => return Err(err),
                None => break,
            };

            let response = self.process_message(message);
            match self.timed(framed.send(response)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_disconnect() => break,
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    log::error!("Client write timeout, closing connection");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn timed<F: Future>(&self, future: F) -> Result<F::Output, Elapsed> {
        match self.config.read_write_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future).await,
            None => Ok(future.await),
        }
    }

    fn lock_backend(&self) -> MutexGuard<'_, T> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process each message, forwarding the implementation to the backend.
    fn process_message(&self, message: Message) -> Response {
        match message {
            Message::GetInfo => {
                log::info!("Received GetInfo message");
                Response::Info(XvcInfo::new(Version::V1_0, self.config.max_vector_len))
            }
            Message::SetTck { period_ns } => {
                log::debug!("Received SetTck message: period_ns={}", period_ns);
                let ret_period = self.lock_backend().set_tck(period_ns);
                log::debug!("Set TCK returned: period_ns={}", ret_period);
                Response::TckPeriod(ret_period)
            }
            Message::Shift { num_bits, tms, tdi } => {
                log::debug!("Received Shift message: num_bits={}", num_bits);
                if num_bits == 0 {
                    return Response::Tdo(Box::default());
                }
                log::trace!("Shift TMS data: {:02x?}", &tms[..]);
                log::trace!("Shift TDI data: {:02x?}", &tdi[..]);
                let tdo = self.lock_backend().shift(num_bits, &tms, &tdi);
                log::trace!("Shift result TDO data: {:02x?}", &tdo[..]);
                Response::Tdo(tdo)
            }
        }
    }
}
