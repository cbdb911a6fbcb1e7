//! # Transport Layer
//!
//! UDP transport for talking to Hexabus devices.
//!
//! ## Components
//! - **Hexabus**: one socket, a background receive thread and a correlation store
//!   that hands replies to whoever waits for that peer
//! - **Transport**: the seam [`Device`](crate::protocol::device::Device) talks through,
//!   so device logic can be driven by scripted peers in tests
//!
//! ## Guarantees
//! - Packets from one peer are handed out in arrival order
//! - Nothing is retransmitted; a lost reply surfaces as `NoResponse`

pub mod hexabus;
pub(crate) mod queue;

use crate::core::packet::{Packet, ReceivedPacket};
use crate::error::Result;
use std::net::SocketAddr;
use std::time::Duration;

pub use hexabus::Hexabus;

/// Request/response access to the bus.
pub trait Transport: Send + Sync {
    /// Encode and send one packet.
    fn send_to(&self, packet: &Packet, addr: SocketAddr) -> Result<()>;

    /// Wait for the next packet sent by `addr`.
    fn receive_from(&self, addr: SocketAddr, timeout: Duration) -> Result<ReceivedPacket>;
}
