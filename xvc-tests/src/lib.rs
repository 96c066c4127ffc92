//! Harness running a simulator server on a loopback port for end-to-end tests.
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, mpsc},
    thread,
};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use xvc_client::XvcClient;
use xvc_server::server::{Config, Server};
use xvc_sim::chain::Chain;

/// A server on its own runtime thread. Stops accepting connections when dropped.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    chain: Arc<Mutex<Chain>>,
}

impl TestServer {
    pub fn start(chain: Chain) -> TestServer {
        let server = Server::new(chain, Config::default());
        let chain = server.backend();
        let shutdown = CancellationToken::new();
        let (addr_tx, addr_rx) = mpsc::channel();

        let token = shutdown.clone();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("runtime should start");
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("loopback port should be free");
                addr_tx
                    .send(listener.local_addr().expect("listener has an address"))
                    .expect("test is waiting for the address");
                server
                    .serve(listener, token)
                    .await
                    .expect("server should not fail");
            });
        });

        let addr = addr_rx.recv().expect("server should report its address");
        TestServer {
            addr,
            shutdown,
            chain,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn client(&self) -> XvcClient {
        XvcClient::new(self.addr).expect("server should accept connections")
    }

    /// The simulated device shared by all connections
    pub fn chain(&self) -> Arc<Mutex<Chain>> {
        Arc::clone(&self.chain)
    }

    pub fn stop_accepting(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
