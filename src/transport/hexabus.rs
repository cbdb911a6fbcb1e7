//! # Correlating UDP Transport
//!
//! [`Hexabus`] owns one UDP socket. A background thread decodes every datagram and
//! files it in a bounded correlation store; callers then wait either for the next
//! packet from anyone or for the next packet from one peer.
//!
//! ## Threads
//! - `hexabus-recv`: socket → decode → correlation store. Malformed datagrams are
//!   logged and dropped. Any other socket error ends the loop: sending keeps
//!   working but nothing is delivered any more.
//!
//! ## Lifecycle
//! `close()` (or dropping the transport) stops the receive thread, wakes every
//! waiting caller with `Closed` and releases the socket.
//!
//! ## Example
//! ```rust,no_run
//! use hexabus::{Hexabus, Packet};
//! use std::time::Duration;
//!
//! # fn main() -> hexabus::Result<()> {
//! let bus = Hexabus::new()?;
//! let plug = "192.168.1.20:61616".parse().unwrap();
//! bus.send_to(&Packet::query(1)?, plug)?;
//! let reply = bus.receive_from(plug, Duration::from_secs(2))?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use crate::config::{TransportConfig, MAX_PACKET_SIZE};
use crate::core::packet::{Packet, ReceivedPacket};
use crate::error::constants::{ERR_ILLEGAL_PACKET, ERR_RECEIVER_IO};
use crate::error::{HexabusError, Result};
use crate::transport::queue::CorrelationQueue;
use crate::transport::Transport;
use crate::utils::metrics::Metrics;
use parking_lot::{Mutex, RwLock};
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Correlating request/response transport over one UDP socket.
pub struct Hexabus {
    socket: RwLock<Option<UdpSocket>>,
    local_addr: SocketAddr,
    queue: Arc<CorrelationQueue>,
    running: Arc<AtomicBool>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    response_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Hexabus {
    /// Bind an ephemeral port with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&TransportConfig::default())
    }

    /// Bind a specific local address with otherwise default settings.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Self::from_socket(socket, &TransportConfig::default())
    }

    pub fn with_config(config: &TransportConfig) -> Result<Self> {
        check_config(config)?;
        let socket = UdpSocket::bind(config.bind_address.as_str())?;
        Self::from_socket(socket, config)
    }

    /// Take over an already bound socket and start the receive thread.
    pub fn from_socket(socket: UdpSocket, config: &TransportConfig) -> Result<Self> {
        check_config(config)?;
        socket.set_read_timeout(Some(config.poll_interval))?;
        let local_addr = socket.local_addr()?;
        let reader = socket.try_clone()?;

        let queue = Arc::new(CorrelationQueue::new(
            config.queue_capacity,
            config.peer_queue_capacity,
        ));
        let running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(Metrics::new());

        let handle = {
            let queue = Arc::clone(&queue);
            let running = Arc::clone(&running);
            let metrics = Arc::clone(&metrics);
            thread::Builder::new()
                .name("hexabus-recv".into())
                .spawn(move || receive_loop(reader, queue, running, metrics))?
        };

        info!(%local_addr, "Hexabus transport started");

        Ok(Self {
            socket: RwLock::new(Some(socket)),
            local_addr,
            queue,
            running,
            receiver: Mutex::new(Some(handle)),
            response_timeout: config.response_timeout,
            metrics,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Timeout used by the `*_default` receive calls
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Packets received but not yet taken by a caller
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn is_closed(&self) -> bool {
        !self.running.load(Ordering::Acquire)
    }

    /// Encode `packet` and send it to `addr`.
    #[instrument(level = "debug", skip(self, packet), fields(packet_type = %packet.packet_type()))]
    pub fn send_to(&self, packet: &Packet, addr: SocketAddr) -> Result<()> {
        let bytes = packet.encode()?;
        let guard = self.socket.read();
        let socket = guard.as_ref().ok_or(HexabusError::Closed)?;
        socket.send_to(&bytes, addr)?;
        self.metrics.packet_sent();
        debug!(%addr, len = bytes.len(), "Packet sent");
        Ok(())
    }

    /// Next packet from any peer.
    pub fn receive(&self, timeout: Duration) -> Result<ReceivedPacket> {
        self.queue.pop(None, timeout)
    }

    /// Next packet sent by `addr`; packets from other peers stay queued.
    pub fn receive_from(&self, addr: SocketAddr, timeout: Duration) -> Result<ReceivedPacket> {
        self.queue.pop(Some(addr), timeout)
    }

    pub fn receive_default(&self) -> Result<ReceivedPacket> {
        self.receive(self.response_timeout)
    }

    pub fn receive_from_default(&self, addr: SocketAddr) -> Result<ReceivedPacket> {
        self.receive_from(addr, self.response_timeout)
    }

    /// Stop the receive thread and release the socket. Idempotent.
    pub fn close(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.queue.close();
        if let Some(handle) = self.receiver.lock().take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("Receive thread panicked");
            }
        }
        self.socket.write().take();
        info!(local_addr = %self.local_addr, "Hexabus transport closed");
    }
}

impl Transport for Hexabus {
    fn send_to(&self, packet: &Packet, addr: SocketAddr) -> Result<()> {
        Hexabus::send_to(self, packet, addr)
    }

    fn receive_from(&self, addr: SocketAddr, timeout: Duration) -> Result<ReceivedPacket> {
        Hexabus::receive_from(self, addr, timeout)
    }
}

impl Drop for Hexabus {
    fn drop(&mut self) {
        self.close();
    }
}

fn check_config(config: &TransportConfig) -> Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(HexabusError::ConfigError(problems.join("; ")))
    }
}

/// Read timeouts surface as one of these depending on the platform.
pub(crate) fn is_poll_timeout(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

fn receive_loop(
    socket: UdpSocket,
    queue: Arc<CorrelationQueue>,
    running: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
) {
    // One spare byte so oversized datagrams fail decoding instead of being cut
    let mut buf = [0u8; MAX_PACKET_SIZE + 1];

    while running.load(Ordering::Acquire) {
        let (len, source) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if is_poll_timeout(e.kind()) => continue,
            // ICMP port unreachable from an earlier send, reported on Windows
            Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
            Err(e) => {
                error!(error = %e, "{}", ERR_RECEIVER_IO);
                break;
            }
        };

        metrics.datagram_received();

        match ReceivedPacket::decode(&buf[..len], source) {
            Ok(received) => {
                debug!(packet = %received, "Packet received");
                if !queue.push(received) {
                    break;
                }
                metrics.delivered();
            }
            Err(e) => {
                metrics.malformed();
                warn!(%source, len, error = %e, "{}", ERR_ILLEGAL_PACKET);
            }
        }
    }

    debug!("Receive loop stopped");
}
