use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// An opaque frame handed across a link.
///
/// A packet is immutable once built and moves by value: upper layer, then the
/// transmitting device, then the in-flight channel event, then the peer's
/// delivery. Exactly one holder owns it at any instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    uid: u64,
    payload: Bytes,
}

impl Packet {
    /// A packet carrying the given payload, tagged with a fresh uid.
    pub fn from_payload(payload: Bytes) -> Self {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            payload,
        }
    }

    /// A zero-filled packet of `size` bytes, for traffic generation.
    pub fn of_size(size: usize) -> Self {
        Self::from_payload(Bytes::from(vec![0u8; size]))
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Frame size in bytes; this is what serialization time is charged on.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkt#{} ({}B)", self.uid, self.payload.len())
    }
}

/// A 48-bit link-layer address, serialized as colon-hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Mac48(pub [u8; 6]);

impl Mac48 {
    pub const BROADCAST: Mac48 = Mac48([0xff; 6]);

    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

impl fmt::Display for Mac48 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl From<Mac48> for String {
    fn from(mac: Mac48) -> String {
        mac.to_string()
    }
}

impl FromStr for Mac48 {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut octets = s.split(':');
        for byte in &mut bytes {
            let octet = octets.next().ok_or(ParseMacError)?;
            *byte = u8::from_str_radix(octet, 16).map_err(|_| ParseMacError)?;
        }
        if octets.next().is_some() {
            return Err(ParseMacError);
        }
        Ok(Mac48(bytes))
    }
}

impl TryFrom<String> for Mac48 {
    type Error = ParseMacError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseMacError;

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected six colon-separated hex octets")
    }
}

impl std::error::Error for ParseMacError {}
