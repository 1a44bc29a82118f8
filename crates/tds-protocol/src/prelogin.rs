//! PRELOGIN negotiation.
//!
//! PRELOGIN is the first message exchanged on a TDS 7.x connection: client and
//! server trade protocol version, encryption level, and a handful of optional
//! fields before TLS (if any) or LOGIN7 begins. TDS 8.0 strict mode skips this
//! exchange entirely and negotiates TLS at the transport layer instead.
//!
//! The wire format is a table of 5-byte option headers (`type:1 offset:2
//! length:2`) terminated by `0xFF`, followed by a data section the headers
//! point into. Encoding and decoding both go through [`PreLoginOption`]'s
//! option table rather than per-field code, so adding a new option means
//! adding one match arm, not duplicating the offset bookkeeping.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::prelude::*;
use crate::version::{SqlServerVersion, TdsVersion};

const OPTION_HEADER_SIZE: usize = 5;

/// PRELOGIN option types (MS-TDS 2.2.6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PreLoginOption {
    /// Version information.
    Version = 0x00,
    /// Encryption negotiation.
    Encryption = 0x01,
    /// Instance name (for named instances).
    Instance = 0x02,
    /// Thread ID.
    ThreadId = 0x03,
    /// MARS (Multiple Active Result Sets) support.
    Mars = 0x04,
    /// Trace ID for distributed tracing.
    TraceId = 0x05,
    /// Federated authentication required.
    FedAuthRequired = 0x06,
    /// Nonce for encryption.
    Nonce = 0x07,
    /// Terminator (end of options).
    Terminator = 0xFF,
}

impl PreLoginOption {
    /// Create from raw byte value.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0x00 => Ok(Self::Version),
            0x01 => Ok(Self::Encryption),
            0x02 => Ok(Self::Instance),
            0x03 => Ok(Self::ThreadId),
            0x04 => Ok(Self::Mars),
            0x05 => Ok(Self::TraceId),
            0x06 => Ok(Self::FedAuthRequired),
            0x07 => Ok(Self::Nonce),
            0xFF => Ok(Self::Terminator),
            _ => Err(ProtocolError::InvalidPreloginOption(value)),
        }
    }
}

/// Encryption level negotiated during PRELOGIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EncryptionLevel {
    /// Encryption is off.
    Off = 0x00,
    /// Encryption is on.
    On = 0x01,
    /// Encryption is not supported.
    NotSupported = 0x02,
    /// Encryption is required.
    #[default]
    Required = 0x03,
    /// Client certificate authentication (TDS 8.0+).
    ClientCertAuth = 0x80,
}

impl EncryptionLevel {
    /// Create from raw byte value, defaulting unrecognized bytes to `Off`.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Off,
            0x01 => Self::On,
            0x02 => Self::NotSupported,
            0x03 => Self::Required,
            0x80 => Self::ClientCertAuth,
            _ => Self::Off,
        }
    }

    /// Whether this level requires the handshake to continue into TLS.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self, Self::On | Self::Required | Self::ClientCertAuth)
    }
}

/// Distributed tracing ID (activity GUID + sequence number).
#[derive(Debug, Clone, Copy)]
pub struct TraceId {
    /// Activity ID (GUID).
    pub activity_id: [u8; 16],
    /// Activity sequence.
    pub activity_sequence: u32,
}

/// PRELOGIN message, used for both the client request and the server reply.
///
/// The VERSION field means different things in each direction: a client sets
/// `version` to the TDS version it is requesting; a server response instead
/// populates `server_version` with its product version (the two are decoded
/// from the same wire bytes but are not the same number — the negotiated TDS
/// version for the rest of the session comes from the LOGINACK token, not
/// from here).
#[derive(Debug, Clone, Default)]
pub struct PreLogin {
    /// TDS version requested by the client.
    pub version: TdsVersion,
    /// SQL Server product version, present only on a decoded server reply.
    pub server_version: Option<SqlServerVersion>,
    /// Encryption level.
    pub encryption: EncryptionLevel,
    /// Instance name (for named instances).
    pub instance: Option<String>,
    /// Thread ID.
    pub thread_id: Option<u32>,
    /// MARS enabled.
    pub mars: bool,
    /// Trace ID (Activity ID and Sequence).
    pub trace_id: Option<TraceId>,
    /// Federated authentication required.
    pub fed_auth_required: bool,
    /// Nonce for encryption.
    pub nonce: Option<[u8; 32]>,
}

/// One `(option, payload)` pair ready to be laid out in the option table.
struct OptionEntry {
    option: PreLoginOption,
    data: Bytes,
}

impl PreLogin {
    /// Create a new PRELOGIN request with default values (TDS 7.4, encryption required).
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: TdsVersion::V7_4,
            encryption: EncryptionLevel::Required,
            ..Self::default()
        }
    }

    /// Set the TDS version.
    #[must_use]
    pub fn with_version(mut self, version: TdsVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the encryption level.
    #[must_use]
    pub fn with_encryption(mut self, level: EncryptionLevel) -> Self {
        self.encryption = level;
        self
    }

    /// Enable MARS.
    #[must_use]
    pub fn with_mars(mut self, enabled: bool) -> Self {
        self.mars = enabled;
        self
    }

    /// Set the instance name.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Build the option table this message encodes to, in wire order.
    fn option_entries(&self) -> Vec<OptionEntry> {
        let mut entries = Vec::with_capacity(8);

        let mut version_data = BytesMut::with_capacity(6);
        let version_raw = self.version.raw();
        version_data.put_u32(version_raw);
        version_data.put_u16_le(0); // sub-build, unused by this client
        entries.push(OptionEntry { option: PreLoginOption::Version, data: version_data.freeze() });

        entries.push(OptionEntry {
            option: PreLoginOption::Encryption,
            data: Bytes::copy_from_slice(&[self.encryption as u8]),
        });

        if let Some(ref instance) = self.instance {
            let mut data = BytesMut::from(instance.as_bytes());
            data.put_u8(0); // null terminator
            entries.push(OptionEntry { option: PreLoginOption::Instance, data: data.freeze() });
        }

        if let Some(thread_id) = self.thread_id {
            entries.push(OptionEntry {
                option: PreLoginOption::ThreadId,
                data: Bytes::copy_from_slice(&thread_id.to_be_bytes()),
            });
        }

        entries.push(OptionEntry {
            option: PreLoginOption::Mars,
            data: Bytes::copy_from_slice(&[u8::from(self.mars)]),
        });

        if let Some(ref trace_id) = self.trace_id {
            let mut data = BytesMut::with_capacity(36);
            data.put_slice(&trace_id.activity_id);
            data.put_u32_le(trace_id.activity_sequence);
            data.put_slice(&[0u8; 16]); // connection ID, zero for a client
            entries.push(OptionEntry { option: PreLoginOption::TraceId, data: data.freeze() });
        }

        if self.fed_auth_required {
            entries.push(OptionEntry {
                option: PreLoginOption::FedAuthRequired,
                data: Bytes::copy_from_slice(&[0x01]),
            });
        }

        if let Some(ref nonce) = self.nonce {
            entries.push(OptionEntry { option: PreLoginOption::Nonce, data: Bytes::copy_from_slice(nonce) });
        }

        entries
    }

    /// Encode this message to its wire form: option table, terminator, data section.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let entries = self.option_entries();
        let header_size = entries.len() * OPTION_HEADER_SIZE + 1;

        let mut headers = BytesMut::with_capacity(header_size);
        let mut data = BytesMut::new();
        let mut offset = header_size as u16;

        for entry in &entries {
            let len = entry.data.len() as u16;
            headers.put_u8(entry.option as u8);
            headers.put_u16(offset);
            headers.put_u16(len);
            data.put_slice(&entry.data);
            offset += len;
        }
        headers.put_u8(PreLoginOption::Terminator as u8);

        headers.unsplit(data);
        headers.freeze()
    }

    /// Decode a PRELOGIN message (request or reply) from its wire form.
    ///
    /// Offsets in the option table are absolute from the start of the
    /// PRELOGIN payload; this walks the table first, then resolves each
    /// option's data from the trailing data section.
    pub fn decode(mut src: impl Buf) -> Result<Self, ProtocolError> {
        let mut headers = Vec::new();
        loop {
            if src.remaining() < 1 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let option_byte = src.get_u8();
            if option_byte == PreLoginOption::Terminator as u8 {
                break;
            }
            if src.remaining() < 4 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let offset = src.get_u16();
            let length = src.get_u16();
            headers.push((PreLoginOption::from_u8(option_byte)?, offset as usize, length as usize));
        }

        let data = src.copy_to_bytes(src.remaining());
        let header_size = headers.len() * OPTION_HEADER_SIZE + 1;

        let mut message = Self::default();
        for (option, packet_offset, length) in headers {
            if packet_offset < header_size {
                continue; // offset points back into the header table: malformed, ignore
            }
            let start = packet_offset - header_size;
            let Some(field) = data.get(start..start.saturating_add(length)) else {
                continue; // offset/length runs past the data section: ignore
            };
            message.apply_option(option, field);
        }

        Ok(message)
    }

    fn apply_option(&mut self, option: PreLoginOption, field: &[u8]) {
        match option {
            PreLoginOption::Version if field.len() >= 4 => {
                let version_raw = u32::from_be_bytes([field[0], field[1], field[2], field[3]]);
                let sub_build = if field.len() >= 6 {
                    u16::from_le_bytes([field[4], field[5]])
                } else {
                    0
                };
                self.server_version = Some(SqlServerVersion::from_raw(version_raw, sub_build));
                self.version = TdsVersion::new(version_raw);
            }
            PreLoginOption::Encryption if !field.is_empty() => {
                self.encryption = EncryptionLevel::from_u8(field[0]);
            }
            PreLoginOption::Mars if !field.is_empty() => {
                self.mars = field[0] != 0;
            }
            PreLoginOption::Instance if !field.is_empty() => {
                let name = field.split(|&b| b == 0).next().unwrap_or(field);
                if let Ok(s) = core::str::from_utf8(name) {
                    if !s.is_empty() {
                        self.instance = Some(s.to_string());
                    }
                }
            }
            PreLoginOption::ThreadId if field.len() >= 4 => {
                self.thread_id = Some(u32::from_be_bytes([field[0], field[1], field[2], field[3]]));
            }
            PreLoginOption::FedAuthRequired if !field.is_empty() => {
                self.fed_auth_required = field[0] != 0;
            }
            PreLoginOption::Nonce if field.len() >= 32 => {
                let mut nonce = [0u8; 32];
                nonce.copy_from_slice(&field[..32]);
                self.nonce = Some(nonce);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_starts_with_the_version_option() {
        let prelogin = PreLogin::new().with_encryption(EncryptionLevel::Required);
        let encoded = prelogin.encode();
        assert_eq!(encoded[0], PreLoginOption::Version as u8);
    }

    #[test]
    fn is_required_covers_on_required_and_client_cert_auth() {
        assert!(EncryptionLevel::Required.is_required());
        assert!(EncryptionLevel::On.is_required());
        assert!(EncryptionLevel::ClientCertAuth.is_required());
        assert!(!EncryptionLevel::Off.is_required());
        assert!(!EncryptionLevel::NotSupported.is_required());
    }

    #[test]
    fn decode_roundtrips_through_encode() {
        let original = PreLogin::new().with_encryption(EncryptionLevel::On).with_mars(true);
        let encoded = original.encode();
        let decoded = PreLogin::decode(encoded.as_ref()).unwrap();

        assert_eq!(decoded.version, original.version);
        assert_eq!(decoded.encryption, original.encryption);
        assert_eq!(decoded.mars, original.mars);
    }

    #[test]
    fn decode_resolves_options_out_of_wire_order() {
        // Headers for ENCRYPTION then VERSION, exercising that each option's
        // data offset is honored independently of header order.
        let mut buf = BytesMut::new();
        let header_size: u16 = 11; // 2 options * 5 bytes + 1 terminator byte

        buf.put_u8(PreLoginOption::Encryption as u8);
        buf.put_u16(header_size);
        buf.put_u16(1);

        buf.put_u8(PreLoginOption::Version as u8);
        buf.put_u16(header_size + 1);
        buf.put_u16(6);

        buf.put_u8(PreLoginOption::Terminator as u8);

        buf.put_u8(0x01); // ENCRYPT_ON
        buf.put_u32(0x7400_0004); // TDS 7.4
        buf.put_u16_le(0x0000);

        let decoded = PreLogin::decode(buf.freeze().as_ref()).unwrap();
        assert_eq!(decoded.encryption, EncryptionLevel::On);
        assert_eq!(decoded.version, TdsVersion::V7_4);
    }

    #[test]
    fn decode_ignores_an_option_whose_length_runs_past_the_data_section() {
        let mut buf = BytesMut::new();
        buf.put_u8(PreLoginOption::Instance as u8);
        buf.put_u16(6); // header_size for 1 option
        buf.put_u16(100); // claims far more data than is actually present
        buf.put_u8(PreLoginOption::Terminator as u8);
        buf.put_slice(b"x");

        let decoded = PreLogin::decode(buf.freeze().as_ref()).unwrap();
        assert_eq!(decoded.instance, None);
    }
}
