//! Bounded correlation store for received packets.
//!
//! One arrival-ordered buffer shared by "next packet from anyone" and "next packet
//! from this peer" readers. Each packet lives in exactly one place, so taking it
//! through either path removes it for both.
//!
//! Capacity is enforced per peer and in total. A full store blocks the producer
//! until a reader makes room or the store is closed.

use crate::core::packet::ReceivedPacket;
use crate::error::{HexabusError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Unwrap IPv4-mapped IPv6 addresses so both spellings of a peer match.
pub(crate) fn canonical(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), addr.port()),
            None => addr,
        },
        IpAddr::V4(_) => addr,
    }
}

struct State {
    items: VecDeque<ReceivedPacket>,
    per_peer: HashMap<SocketAddr, usize>,
    closed: bool,
}

impl State {
    fn has_room_for(&self, peer: &SocketAddr, capacity: usize, peer_capacity: usize) -> bool {
        self.items.len() < capacity && self.per_peer.get(peer).copied().unwrap_or(0) < peer_capacity
    }

    fn take(&mut self, from: Option<SocketAddr>) -> Option<ReceivedPacket> {
        let index = match from {
            None => 0,
            Some(peer) => self.items.iter().position(|item| item.source == peer)?,
        };
        let item = self.items.remove(index)?;
        if let Some(count) = self.per_peer.get_mut(&item.source) {
            *count -= 1;
            if *count == 0 {
                self.per_peer.remove(&item.source);
            }
        }
        Some(item)
    }
}

pub(crate) struct CorrelationQueue {
    state: Mutex<State>,
    arrived: Condvar,
    space: Condvar,
    capacity: usize,
    peer_capacity: usize,
}

impl CorrelationQueue {
    pub(crate) fn new(capacity: usize, peer_capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                per_peer: HashMap::new(),
                closed: false,
            }),
            arrived: Condvar::new(),
            space: Condvar::new(),
            capacity: capacity.max(1),
            peer_capacity: peer_capacity.max(1),
        }
    }

    /// Store a packet, blocking while its peer or the store is full.
    /// Returns `false` once the queue is closed.
    pub(crate) fn push(&self, mut item: ReceivedPacket) -> bool {
        item.source = canonical(item.source);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return false;
            }
            if state.has_room_for(&item.source, self.capacity, self.peer_capacity) {
                *state.per_peer.entry(item.source).or_insert(0) += 1;
                state.items.push_back(item);
                self.arrived.notify_all();
                return true;
            }
            self.space.wait(&mut state);
        }
    }

    /// Take the oldest packet, optionally only one sent by `from`.
    pub(crate) fn pop(&self, from: Option<SocketAddr>, timeout: Duration) -> Result<ReceivedPacket> {
        let from = from.map(canonical);
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(HexabusError::Closed);
            }
            if let Some(item) = state.take(from) {
                self.space.notify_all();
                return Ok(item);
            }
            match deadline {
                Some(deadline) => {
                    if self.arrived.wait_until(&mut state, deadline).timed_out() {
                        if let Some(item) = state.take(from) {
                            self.space.notify_all();
                            return Ok(item);
                        }
                        return Err(HexabusError::NoResponse(timeout));
                    }
                }
                None => self.arrived.wait(&mut state),
            }
        }
    }

    /// Wake every waiter; later calls fail with `Closed`.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.items.clear();
        state.per_peer.clear();
        self.arrived.notify_all();
        self.space.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}
