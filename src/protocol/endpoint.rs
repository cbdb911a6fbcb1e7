//! Endpoint descriptors.

use crate::core::types::DataType;
use std::fmt;
use std::net::SocketAddr;

/// Description every device gives EID 0 and each page descriptor.
pub const DEVICE_DESCRIPTOR: &str = "Hexabus device descriptor";

/// One addressable value on a device.
///
/// Created by discovery or by [`Device::add_endpoint`](crate::protocol::device::Device::add_endpoint);
/// the device owning it is recorded in [`device`](Endpoint::device).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    device: SocketAddr,
    eid: u8,
    data_type: DataType,
    description: String,
}

impl Endpoint {
    pub(crate) fn new(
        device: SocketAddr,
        eid: u8,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            device,
            eid,
            data_type,
            description: description.into(),
        }
    }

    pub(crate) fn descriptor(device: SocketAddr, eid: u8) -> Self {
        Self::new(device, eid, DataType::Uint32, DEVICE_DESCRIPTOR)
    }

    pub fn device(&self) -> SocketAddr {
        self.device
    }

    pub fn eid(&self) -> u8 {
        self.eid
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether this endpoint is a page descriptor (EID 0, 32, 64, ...).
    pub fn is_descriptor(&self) -> bool {
        self.eid % 32 == 0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {:?}",
            self.eid, self.device, self.data_type, self.description
        )
    }
}
