//! # Device Model
//!
//! A typed client view of one Hexabus device: its endpoint registry, endpoint
//! discovery and typed reads and writes.
//!
//! ## Discovery
//! EID 0 answers with a `UINT32` bitmap. Bit `i - 1` set means EID `offset + i`
//! exists, for `i` in `1..=31`. Each announced endpoint is described with an
//! `EndpointQuery`. The next page starts at `offset + 32`: its descriptor either
//! answers with another bitmap or with an `Error`, which ends discovery.
//!
//! ## Validation
//! Every EID, endpoint and data type check runs before a packet is sent. A wrong
//! type never reaches the wire.
//!
//! ## Example
//! ```rust,no_run
//! use hexabus::{Device, Hexabus};
//! use std::sync::Arc;
//!
//! # fn main() -> hexabus::Result<()> {
//! let bus = Arc::new(Hexabus::new()?);
//! let mut plug = Device::new(bus, "192.168.1.20:61616".parse().unwrap());
//! plug.fetch_endpoints()?;
//! plug.write(1, true)?;
//! let watts: u32 = plug.query(2)?;
//! # Ok(())
//! # }
//! ```

use crate::config::DEFAULT_RESPONSE_TIMEOUT;
use crate::core::packet::{checked_eid, Packet};
use crate::core::types::DataType;
use crate::core::value::{HexabusValue, Value};
use crate::error::{HexabusError, Result};
use crate::protocol::endpoint::Endpoint;
use crate::transport::{Hexabus, Transport};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Endpoints announced per descriptor page
const PAGE_SIZE: u32 = 32;

/// One remote device reachable through a shared transport.
pub struct Device<T: Transport = Hexabus> {
    transport: Arc<T>,
    address: SocketAddr,
    endpoints: BTreeMap<u8, Endpoint>,
    timeout: Duration,
}

impl<T: Transport> Device<T> {
    /// Create a device knowing only its descriptor endpoint, EID 0.
    pub fn new(transport: Arc<T>, address: SocketAddr) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(0, Endpoint::descriptor(address, 0));
        Self {
            transport,
            address,
            endpoints,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Replace the reply timeout used by queries and discovery.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Known endpoints in EID order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    pub fn endpoint(&self, eid: u32) -> Result<&Endpoint> {
        let eid = checked_eid(eid)?;
        self.endpoints
            .get(&eid)
            .ok_or(HexabusError::UnknownEndpoint(eid))
    }

    /// Register an endpoint without a description.
    pub fn add_endpoint(&mut self, eid: u32, data_type: DataType) -> Result<&Endpoint> {
        self.add_endpoint_with_description(eid, data_type, "")
    }

    /// Register an endpoint by hand, replacing any endpoint with the same EID.
    pub fn add_endpoint_with_description(
        &mut self,
        eid: u32,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Result<&Endpoint> {
        let eid = checked_eid(eid)?;
        let endpoint = Endpoint::new(self.address, eid, data_type, description);
        self.endpoints.insert(eid, endpoint);
        self.endpoint(u32::from(eid))
    }

    /// Discover the device's endpoints, replacing the known set on success.
    ///
    /// On any failure the previously known endpoints are kept unchanged.
    #[instrument(skip(self), fields(device = %self.address))]
    pub fn fetch_endpoints(&mut self) -> Result<()> {
        let mut found = BTreeMap::new();
        found.insert(0, Endpoint::descriptor(self.address, 0));

        let mut bitmap = self.descriptor_bitmap(0)?;
        let mut offset: u32 = 0;

        loop {
            for i in 1..PAGE_SIZE {
                if bitmap & (1 << (i - 1)) == 0 {
                    continue;
                }
                let Ok(eid) = u8::try_from(offset + i) else {
                    break;
                };
                let endpoint = self.describe(eid)?;
                debug!(endpoint = %endpoint, "Endpoint discovered");
                found.insert(eid, endpoint);
            }

            offset += PAGE_SIZE;
            let Ok(page) = u8::try_from(offset) else {
                break;
            };
            match self.exchange(Packet::Query { eid: page })? {
                Packet::Error { code } => {
                    debug!(offset, %code, "No further descriptor page");
                    break;
                }
                Packet::Info {
                    value: Value::Uint32(bits),
                    ..
                } => {
                    found.insert(page, Endpoint::descriptor(self.address, page));
                    bitmap = bits;
                }
                Packet::Info { value, .. } => {
                    return Err(HexabusError::WrongDataType {
                        expected: DataType::Uint32,
                        actual: value.data_type(),
                    })
                }
                other => return Err(HexabusError::UnexpectedReply(other.packet_type())),
            }
        }

        info!(count = found.len(), "Endpoints fetched");
        self.endpoints = found;
        Ok(())
    }

    /// Read an endpoint as `V`, checking its registered type first.
    #[instrument(skip(self), fields(device = %self.address))]
    pub fn query<V: HexabusValue>(&self, eid: u32) -> Result<V> {
        let eid = self.check_type(eid, V::DATA_TYPE)?;
        let value = self.fetch_value(eid, V::DATA_TYPE)?;
        let actual = value.data_type();
        V::from_value(value).ok_or(HexabusError::WrongDataType {
            expected: V::DATA_TYPE,
            actual,
        })
    }

    /// Read an endpoint using its registered type.
    #[instrument(skip(self), fields(device = %self.address))]
    pub fn query_value(&self, eid: u32) -> Result<Value> {
        let endpoint = self.endpoint(eid)?;
        self.fetch_value(endpoint.eid(), endpoint.data_type())
    }

    /// Write `value` to an endpoint. No reply is awaited.
    pub fn write<V: HexabusValue>(&self, eid: u32, value: V) -> Result<()> {
        self.write_value(eid, value.into_value())
    }

    /// Untyped write; the value's type must match the endpoint's.
    #[instrument(skip(self, value), fields(device = %self.address, data_type = %value.data_type()))]
    pub fn write_value(&self, eid: u32, value: Value) -> Result<()> {
        let eid = self.check_type(eid, value.data_type())?;
        value.validate()?;
        self.transport
            .send_to(&Packet::Write { eid, value }, self.address)
    }

    fn check_type(&self, eid: u32, expected: DataType) -> Result<u8> {
        let endpoint = self.endpoint(eid)?;
        if endpoint.data_type() != expected {
            return Err(HexabusError::WrongDataType {
                expected: endpoint.data_type(),
                actual: expected,
            });
        }
        Ok(endpoint.eid())
    }

    fn fetch_value(&self, eid: u8, expected: DataType) -> Result<Value> {
        match self.exchange(Packet::Query { eid })? {
            Packet::Info { value, .. } if value.data_type() == expected => Ok(value),
            Packet::Info { value, .. } => Err(HexabusError::WrongDataType {
                expected,
                actual: value.data_type(),
            }),
            Packet::Error { code } => Err(HexabusError::Remote(code)),
            other => Err(HexabusError::UnexpectedReply(other.packet_type())),
        }
    }

    fn descriptor_bitmap(&self, eid: u8) -> Result<u32> {
        match self.fetch_value(eid, DataType::Uint32)? {
            Value::Uint32(bits) => Ok(bits),
            other => Err(HexabusError::WrongDataType {
                expected: DataType::Uint32,
                actual: other.data_type(),
            }),
        }
    }

    fn describe(&self, eid: u8) -> Result<Endpoint> {
        match self.exchange(Packet::EndpointQuery { eid })? {
            Packet::EndpointInfo {
                data_type,
                description,
                ..
            } => Ok(Endpoint::new(
                self.address,
                eid,
                data_type,
                description.trim(),
            )),
            Packet::Error { code } => Err(HexabusError::Remote(code)),
            other => Err(HexabusError::UnexpectedReply(other.packet_type())),
        }
    }

    /// Send `request` and wait for the matching reply from this device.
    ///
    /// Replies addressing a different EID are late answers to earlier requests
    /// and are skipped.
    fn exchange(&self, request: Packet) -> Result<Packet> {
        let wanted = request.eid();
        self.transport.send_to(&request, self.address)?;

        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            let remaining = deadline.map_or(self.timeout, |d| {
                d.saturating_duration_since(Instant::now())
            });
            if remaining.is_zero() {
                return Err(HexabusError::NoResponse(self.timeout));
            }
            let reply = match self.transport.receive_from(self.address, remaining) {
                Ok(reply) => reply.packet,
                Err(HexabusError::NoResponse(_)) => {
                    return Err(HexabusError::NoResponse(self.timeout))
                }
                Err(e) => return Err(e),
            };
            match reply.eid() {
                Some(eid) if wanted.is_some() && Some(eid) != wanted => {
                    debug!(eid, ?wanted, "Skipping stale reply");
                }
                _ => return Ok(reply),
            }
        }
    }
}
