//! # Listener Server
//!
//! Passive receiver for broadcasts on the well-known Hexabus port. Every decoded
//! packet is handed to every registered [`HexabusListener`].
//!
//! ## Threads
//! ```text
//! hexabus-server-recv     socket ──raw datagrams──▶ decode queue
//! hexabus-server-fanout   decode queue ──decode──▶ one queue per listener
//! hexabus-listener-N      listener queue ──▶ on_packet()
//! ```
//! The receive thread only copies bytes, so a slow decode never stalls the socket.
//! Each listener runs on its own thread behind its own bounded queue, so a slow
//! listener only ever delays itself.
//!
//! ## Back-pressure
//! - Decode queue full: the oldest raw datagram is dropped.
//! - Listener queue full: the configured [`OverflowPolicy`] decides between dropping
//!   that listener's oldest packet and unregistering the listener.
//!
//! ## Example
//! ```rust,no_run
//! use hexabus::{HexabusServer, ReceivedPacket};
//!
//! # fn main() -> hexabus::Result<()> {
//! let server = HexabusServer::new()?;
//! server.register(|received: ReceivedPacket| println!("{received}"))?;
//! # server.shutdown();
//! # Ok(())
//! # }
//! ```

use crate::config::{ServerConfig, MAX_PACKET_SIZE};
use crate::core::packet::ReceivedPacket;
use crate::error::constants::{ERR_ILLEGAL_PACKET, ERR_RECEIVER_IO};
use crate::error::{HexabusError, Result};
use crate::transport::hexabus::is_poll_timeout;
use crate::utils::metrics::Metrics;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

pub use crate::config::OverflowPolicy;

/// Consumer of packets received by a [`HexabusServer`].
///
/// Called on the listener's own thread, one packet at a time, in arrival order.
pub trait HexabusListener: Send + 'static {
    fn on_packet(&mut self, packet: ReceivedPacket);
}

impl<F> HexabusListener for F
where
    F: FnMut(ReceivedPacket) + Send + 'static,
{
    fn on_packet(&mut self, packet: ReceivedPacket) {
        self(packet)
    }
}

/// Handle returned by [`HexabusServer::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct ListenerSlot {
    sender: Sender<ReceivedPacket>,
    /// Second receiving end, used to evict the oldest packet on overflow
    evict: Receiver<ReceivedPacket>,
    active: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ListenerSlot {
    /// Stop the worker. With `wait`, join it unless called from the worker itself.
    fn stop(mut self, id: ListenerId, wait: bool) {
        self.active.store(false, Ordering::Release);
        drop(self.sender);
        let Some(worker) = self.worker.take() else {
            return;
        };
        if wait && worker.thread().id() != thread::current().id() && worker.join().is_err() {
            warn!(%id, "Listener panicked");
        }
    }
}

type Listeners = Arc<Mutex<HashMap<ListenerId, ListenerSlot>>>;

/// Push-based receiver fanning packets out to registered listeners.
pub struct HexabusServer {
    local_addr: SocketAddr,
    config: ServerConfig,
    running: Arc<AtomicBool>,
    listeners: Listeners,
    next_id: AtomicU64,
    threads: Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<Metrics>,
}

impl HexabusServer {
    /// Listen on the well-known port on all IPv4 interfaces.
    pub fn new() -> Result<Self> {
        Self::with_config(ServerConfig::default())
    }

    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::with_config(ServerConfig {
            bind_address: addr.to_string(),
            ..ServerConfig::default()
        })
    }

    pub fn with_config(config: ServerConfig) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(HexabusError::ConfigError(problems.join("; ")));
        }

        let socket = UdpSocket::bind(config.bind_address.as_str())?;
        socket.set_read_timeout(Some(config.poll_interval))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let listeners: Listeners = Arc::new(Mutex::new(HashMap::new()));
        let metrics = Arc::new(Metrics::new());
        let (raw_tx, raw_rx) = bounded(config.decode_queue_capacity);

        let receiver = {
            let running = Arc::clone(&running);
            let metrics = Arc::clone(&metrics);
            let evict = raw_rx.clone();
            thread::Builder::new()
                .name("hexabus-server-recv".into())
                .spawn(move || receive_loop(socket, raw_tx, evict, running, metrics))?
        };

        let fanout = {
            let listeners = Arc::clone(&listeners);
            let metrics = Arc::clone(&metrics);
            let policy = config.overflow_policy;
            thread::Builder::new()
                .name("hexabus-server-fanout".into())
                .spawn(move || fanout_loop(raw_rx, listeners, policy, metrics))?
        };

        info!(%local_addr, "Hexabus listener server started");

        Ok(Self {
            local_addr,
            config,
            running,
            listeners,
            next_id: AtomicU64::new(1),
            threads: Mutex::new(vec![receiver, fanout]),
            metrics,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Start delivering packets to `listener` on a dedicated thread.
    pub fn register<L: HexabusListener>(&self, mut listener: L) -> Result<ListenerId> {
        if !self.is_running() {
            return Err(HexabusError::Closed);
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = bounded::<ReceivedPacket>(self.config.listener_queue_capacity);
        let evict = receiver.clone();
        let active = Arc::new(AtomicBool::new(true));

        let worker = {
            let active = Arc::clone(&active);
            thread::Builder::new()
                .name(format!("hexabus-listener-{}", id.0))
                .spawn(move || {
                    for packet in receiver.iter() {
                        if !active.load(Ordering::Acquire) {
                            break;
                        }
                        listener.on_packet(packet);
                    }
                    debug!(%id, "Listener stopped");
                })?
        };

        self.listeners.lock().insert(
            id,
            ListenerSlot {
                sender,
                evict,
                active,
                worker: Some(worker),
            },
        );
        debug!(%id, "Listener registered");
        Ok(id)
    }

    /// Stop delivering to a listener. Returns `false` for unknown ids.
    ///
    /// Packets still queued for the listener are discarded. Does not wait for the
    /// listener's thread: a callback already in progress may still finish after
    /// this returns. Safe to call from inside the listener's own callback.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let slot = self.listeners.lock().remove(&id);
        match slot {
            Some(slot) => {
                slot.stop(id, false);
                debug!(%id, "Listener unregistered");
                true
            }
            None => false,
        }
    }

    /// Stop receiving, close every queue and wait for all threads. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        let current = thread::current().id();
        for handle in self.threads.lock().drain(..) {
            if handle.thread().id() != current && handle.join().is_err() {
                warn!("Server thread panicked");
            }
        }

        let slots: Vec<_> = self.listeners.lock().drain().collect();
        for (id, slot) in slots {
            slot.stop(id, true);
        }

        info!(local_addr = %self.local_addr, "Hexabus listener server stopped");
        self.metrics.log_metrics();
    }
}

impl Drop for HexabusServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Push onto a bounded channel, evicting its oldest entry when full.
///
/// Returns `false` when nobody can receive any more.
fn push_drop_oldest<T>(
    sender: &Sender<T>,
    evict: &Receiver<T>,
    mut item: T,
    metrics: &Metrics,
) -> bool {
    loop {
        match sender.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                if evict.try_recv().is_ok() {
                    metrics.overflow();
                }
                item = back;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

fn receive_loop(
    socket: UdpSocket,
    raw: Sender<(Vec<u8>, SocketAddr)>,
    evict: Receiver<(Vec<u8>, SocketAddr)>,
    running: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
) {
    // One spare byte so oversized datagrams fail decoding instead of being cut
    let mut buf = [0u8; MAX_PACKET_SIZE + 1];

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, source)) => {
                metrics.datagram_received();
                if !push_drop_oldest(&raw, &evict, (buf[..len].to_vec(), source), &metrics) {
                    break;
                }
            }
            Err(e) if is_poll_timeout(e.kind()) => continue,
            Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
            Err(e) => {
                error!(error = %e, "{}", ERR_RECEIVER_IO);
                break;
            }
        }
    }

    debug!("Server receive loop stopped");
}

fn fanout_loop(
    raw: Receiver<(Vec<u8>, SocketAddr)>,
    listeners: Listeners,
    policy: OverflowPolicy,
    metrics: Arc<Metrics>,
) {
    // Ends once the receive loop has exited and the queue is drained
    for (bytes, source) in raw.iter() {
        let received = match ReceivedPacket::decode(&bytes, source) {
            Ok(received) => received,
            Err(e) => {
                metrics.malformed();
                warn!(%source, len = bytes.len(), error = %e, "{}", ERR_ILLEGAL_PACKET);
                continue;
            }
        };
        debug!(packet = %received, "Broadcast received");

        let mut dropped = Vec::new();
        {
            let guard = listeners.lock();
            for (id, slot) in guard.iter() {
                // A finished worker means the listener panicked
                if slot.worker.as_ref().map_or(true, |w| w.is_finished()) {
                    dropped.push(*id);
                    continue;
                }
                let delivered = match policy {
                    OverflowPolicy::DropOldest => {
                        push_drop_oldest(&slot.sender, &slot.evict, received.clone(), &metrics)
                    }
                    OverflowPolicy::Disconnect => match slot.sender.try_send(received.clone()) {
                        Ok(()) => true,
                        Err(TrySendError::Full(_)) => {
                            metrics.overflow();
                            false
                        }
                        Err(TrySendError::Disconnected(_)) => false,
                    },
                };
                if delivered {
                    metrics.delivered();
                } else {
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            let slot = listeners.lock().remove(&id);
            if let Some(slot) = slot {
                warn!(%id, "Listener disconnected");
                metrics.listener_disconnected();
                slot.stop(id, false);
            }
        }
    }

    debug!("Fan-out loop stopped");
}
