//! Bolt handshake.
//!
//! The handshake consists of:
//! 1. Client sends the 4-byte magic number (0x6060B017)
//! 2. Client sends 4 x 4-byte big-endian version proposals, preferred first
//! 3. Server responds with the 4-byte agreed version, or 0 if none

use super::error::{BoltError, HandshakeError};

/// Bolt protocol magic number
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Size of the client preamble (magic + 4 versions)
pub const HANDSHAKE_SIZE: usize = 20;

/// Size of the server's answer
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// The only version this client speaks
pub const PROTOCOL_VERSION: u32 = 1;

/// Proposals sent by this client; unused slots are zero
pub const PROPOSED_VERSIONS: [u32; 4] = [PROTOCOL_VERSION, 0, 0, 0];

/// Build the client preamble for the given proposals.
pub fn client_handshake(versions: [u32; 4]) -> [u8; HANDSHAKE_SIZE] {
    let mut data = [0u8; HANDSHAKE_SIZE];
    data[..4].copy_from_slice(&BOLT_MAGIC);
    for (slot, version) in data[4..].chunks_exact_mut(4).zip(versions) {
        slot.copy_from_slice(&version.to_be_bytes());
    }
    data
}

/// Split a client preamble into its proposals.
pub fn parse_client_handshake(data: &[u8]) -> Result<[u32; 4], HandshakeError> {
    if data.len() != HANDSHAKE_SIZE {
        return Err(HandshakeError::InvalidData(format!(
            "expected {} bytes, got {}",
            HANDSHAKE_SIZE,
            data.len()
        )));
    }
    let mut received = [0u8; 4];
    received.copy_from_slice(&data[..4]);
    if received != BOLT_MAGIC {
        return Err(HandshakeError::InvalidMagic {
            expected: BOLT_MAGIC,
            received,
        });
    }
    let mut versions = [0u32; 4];
    for (version, bytes) in versions.iter_mut().zip(data[4..].chunks_exact(4)) {
        *version = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    Ok(versions)
}

/// Check the server's answer and return the agreed version.
pub fn agreed_version(response: [u8; HANDSHAKE_RESPONSE_SIZE]) -> Result<u32, BoltError> {
    match u32::from_be_bytes(response) {
        0 => Err(HandshakeError::NoCompatibleVersion.into()),
        PROTOCOL_VERSION => Ok(PROTOCOL_VERSION),
        other => Err(BoltError::UnsupportedVersion(other)),
    }
}
