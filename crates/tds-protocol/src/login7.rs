//! LOGIN7 packet construction (MS-TDS 2.2.6.3).
//!
//! LOGIN7 is the client's authentication request: a 94-byte fixed header of
//! flags and offset/length pairs, followed by a variable-length block the
//! header's pairs point into. [`VariableBlock`] owns that bookkeeping so the
//! field-by-field encode below only has to say what to write, not where.
//!
//! The password and (if changing password) new password fields are
//! obfuscated, never encrypted — MS-TDS 2.2.6.3 mandates nibble-swap + XOR
//! 0xA5 so the bytes aren't plaintext on the wire, but TLS is what actually
//! protects them in transit.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::write_utf16_string;
use crate::prelude::*;
use crate::version::TdsVersion;

/// LOGIN7 fixed header size, before the variable-length block.
pub const LOGIN7_HEADER_SIZE: usize = 94;

/// LOGIN7 `OptionFlags1` (MS-TDS 2.2.6.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags1 {
    /// Use big-endian byte order.
    pub byte_order_be: bool,
    /// Character set (0 = ASCII, 1 = EBCDIC).
    pub char_ebcdic: bool,
    /// Floating point representation (0 = IEEE 754, 1 = VAX, 2 = ND5000).
    pub float_ieee: bool,
    /// Dump/load off.
    pub dump_load_off: bool,
    /// Use DB notification.
    pub use_db_notify: bool,
    /// Database is fatal.
    pub database_fatal: bool,
    /// Set language warning.
    pub set_lang_warn: bool,
}

impl OptionFlags1 {
    /// Pack into the wire byte: bit0 fByteOrder, bit1 fChar, bits2-3 fFloat
    /// (left at 0 for IEEE 754), bit4 fDumpLoad, bit5 fUseDB, bit6 fDatabase,
    /// bit7 fSetLang.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        (self.byte_order_be as u8)
            | (self.char_ebcdic as u8) << 1
            | (self.dump_load_off as u8) << 4
            | (self.use_db_notify as u8) << 5
            | (self.database_fatal as u8) << 6
            | (self.set_lang_warn as u8) << 7
    }
}

/// LOGIN7 `OptionFlags2` (MS-TDS 2.2.6.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags2 {
    /// Language is fatal.
    pub language_fatal: bool,
    /// ODBC driver.
    pub odbc: bool,
    /// Obsolete: transaction boundary.
    pub tran_boundary: bool,
    /// Obsolete: cache connect.
    pub cache_connect: bool,
    /// User type (0 = Normal, 1 = Server, 2 = DQ login, 3 = Replication).
    pub user_type: u8,
    /// Integrated security.
    pub integrated_security: bool,
}

impl OptionFlags2 {
    /// Pack into the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        (self.language_fatal as u8)
            | (self.odbc as u8) << 1
            | (self.tran_boundary as u8) << 2
            | (self.cache_connect as u8) << 3
            | (self.user_type & 0x07) << 4
            | (self.integrated_security as u8) << 7
    }
}

/// LOGIN7 `TypeFlags` (MS-TDS 2.2.6.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeFlags {
    /// SQL type (0 = DFLT, 1 = TSQL).
    pub sql_type: u8,
    /// OLEDB driver.
    pub oledb: bool,
    /// Read-only intent, for routing to a readable secondary.
    pub read_only_intent: bool,
}

impl TypeFlags {
    /// Pack into the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        (self.sql_type & 0x0F) | (self.oledb as u8) << 4 | (self.read_only_intent as u8) << 5
    }
}

/// LOGIN7 `OptionFlags3` (MS-TDS 2.2.6.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags3 {
    /// Change password.
    pub change_password: bool,
    /// User instance.
    pub user_instance: bool,
    /// Send YUKON binary XML.
    pub send_yukon_binary_xml: bool,
    /// Unknown collation handling.
    pub unknown_collation_handling: bool,
    /// A feature extension block follows the variable-length block.
    pub extension: bool,
}

impl OptionFlags3 {
    /// Pack into the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        (self.change_password as u8)
            | (self.user_instance as u8) << 1
            | (self.send_yukon_binary_xml as u8) << 2
            | (self.unknown_collation_handling as u8) << 3
            | (self.extension as u8) << 4
    }
}

/// LOGIN7 feature extension IDs (MS-TDS 2.2.6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeatureId {
    /// Session recovery.
    SessionRecovery = 0x01,
    /// Federated authentication.
    FedAuth = 0x02,
    /// Column encryption.
    ColumnEncryption = 0x04,
    /// Global transactions.
    GlobalTransactions = 0x05,
    /// Azure SQL Support for DB.
    AzureSqlSupport = 0x08,
    /// Data classification.
    DataClassification = 0x09,
    /// UTF-8 support.
    Utf8Support = 0x0A,
    /// Azure SQL DNS Caching.
    AzureSqlDnsCaching = 0x0B,
    /// Terminator.
    Terminator = 0xFF,
}

/// One feature extension entry: ID, 4-byte length, then opaque payload.
#[derive(Debug, Clone)]
pub struct FeatureExtension {
    /// Feature ID.
    pub feature_id: FeatureId,
    /// Feature payload.
    pub data: Bytes,
}

/// Accumulates the LOGIN7 variable-length block, handing back each field's
/// `(offset, length)` pair as it's written so the fixed header can record it.
///
/// Offsets are absolute from the start of the LOGIN7 payload; lengths for
/// string fields are UTF-16 code-unit counts, per MS-TDS 2.2.6.3.
struct VariableBlock {
    buf: BytesMut,
    offset: u16,
}

impl VariableBlock {
    fn new(start_offset: u16) -> Self {
        Self { buf: BytesMut::new(), offset: start_offset }
    }

    fn write_str(&mut self, s: &str) -> (u16, u16) {
        let offset = self.offset;
        write_utf16_string(&mut self.buf, s);
        let len = s.encode_utf16().count() as u16;
        self.offset += len * 2;
        (offset, len)
    }

    fn write_obfuscated_password(&mut self, password: &str) -> (u16, u16) {
        let offset = self.offset;
        let len = password.encode_utf16().count() as u16;
        for unit in password.encode_utf16() {
            let low = unit as u8;
            let high = (unit >> 8) as u8;
            self.buf.put_u8(low.rotate_right(4) ^ 0xA5);
            self.buf.put_u8(high.rotate_right(4) ^ 0xA5);
        }
        self.offset += len * 2;
        (offset, len)
    }

    fn write_bytes(&mut self, data: &[u8]) -> (u16, u16) {
        let offset = self.offset;
        self.buf.put_slice(data);
        let len = data.len() as u16;
        self.offset += len;
        (offset, len)
    }

    /// Reserve the 4-byte feature-extension offset pointer, pointing at
    /// `target` (computed by the caller from the lengths of fields not yet
    /// written).
    fn write_extension_pointer(&mut self, target: u16) -> u16 {
        let offset = self.offset;
        self.buf.put_u32_le(u32::from(target));
        self.offset += 4;
        offset
    }

    fn write_features(&mut self, features: &[FeatureExtension]) {
        for feature in features {
            self.buf.put_u8(feature.feature_id as u8);
            self.buf.put_u32_le(feature.data.len() as u32);
            self.buf.put_slice(&feature.data);
        }
        self.buf.put_u8(FeatureId::Terminator as u8);
    }
}

/// LOGIN7 packet builder.
#[derive(Debug, Clone)]
pub struct Login7 {
    /// TDS version to request.
    pub tds_version: TdsVersion,
    /// Requested packet size.
    pub packet_size: u32,
    /// Client program version.
    pub client_prog_version: u32,
    /// Client process ID.
    pub client_pid: u32,
    /// Connection ID (for connection pooling).
    pub connection_id: u32,
    /// Option flags 1.
    pub option_flags1: OptionFlags1,
    /// Option flags 2.
    pub option_flags2: OptionFlags2,
    /// Type flags.
    pub type_flags: TypeFlags,
    /// Option flags 3.
    pub option_flags3: OptionFlags3,
    /// Client timezone offset in minutes.
    pub client_timezone: i32,
    /// Client LCID (locale ID).
    pub client_lcid: u32,
    /// Hostname (client machine name).
    pub hostname: String,
    /// Username for SQL authentication.
    pub username: String,
    /// Password for SQL authentication.
    pub password: String,
    /// Application name.
    pub app_name: String,
    /// Server name.
    pub server_name: String,
    /// Unused field (written only when no feature extension is present).
    pub unused: String,
    /// Client library name.
    pub library_name: String,
    /// Language.
    pub language: String,
    /// Database name.
    pub database: String,
    /// Client ID (MAC address, typically zeros).
    pub client_id: [u8; 6],
    /// SSPI data for integrated authentication.
    pub sspi_data: Vec<u8>,
    /// Attach DB filename (for LocalDB).
    pub attach_db_file: String,
    /// New password (for password change).
    pub new_password: String,
    /// Feature extensions, written after the variable-length block.
    pub features: Vec<FeatureExtension>,
}

impl Default for Login7 {
    fn default() -> Self {
        #[cfg(feature = "std")]
        let client_pid = std::process::id();
        #[cfg(not(feature = "std"))]
        let client_pid = 0;

        Self {
            tds_version: TdsVersion::V7_4,
            packet_size: 4096,
            client_prog_version: 0,
            client_pid,
            connection_id: 0,
            option_flags1: OptionFlags1 { use_db_notify: true, database_fatal: true, ..Default::default() },
            option_flags2: OptionFlags2 { language_fatal: true, odbc: true, ..Default::default() },
            type_flags: TypeFlags::default(),
            option_flags3: OptionFlags3 { unknown_collation_handling: true, ..Default::default() },
            client_timezone: 0,
            client_lcid: 0x0409, // English (US)
            hostname: String::new(),
            username: String::new(),
            password: String::new(),
            app_name: String::from("tds-core"),
            server_name: String::new(),
            unused: String::new(),
            library_name: String::from("tds-core"),
            language: String::new(),
            database: String::new(),
            client_id: [0u8; 6],
            sspi_data: Vec::new(),
            attach_db_file: String::new(),
            new_password: String::new(),
            features: Vec::new(),
        }
    }
}

impl Login7 {
    /// Create a new LOGIN7 packet builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TDS version.
    #[must_use]
    pub fn with_tds_version(mut self, version: TdsVersion) -> Self {
        self.tds_version = version;
        self
    }

    /// Set SQL authentication credentials.
    #[must_use]
    pub fn with_sql_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self.option_flags2.integrated_security = false;
        self
    }

    /// Enable integrated (Windows) authentication.
    #[must_use]
    pub fn with_integrated_auth(mut self, sspi_data: Vec<u8>) -> Self {
        self.sspi_data = sspi_data;
        self.option_flags2.integrated_security = true;
        self
    }

    /// Set the database to connect to.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the hostname (client machine name).
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Set the server name.
    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    /// Set the requested packet size.
    #[must_use]
    pub fn with_packet_size(mut self, packet_size: u32) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// Enable read-only intent, for routing to a readable secondary.
    #[must_use]
    pub fn with_read_only_intent(mut self, read_only: bool) -> Self {
        self.type_flags.read_only_intent = read_only;
        self
    }

    /// Add a feature extension, flipping on `OptionFlags3::extension`.
    #[must_use]
    pub fn with_feature(mut self, feature: FeatureExtension) -> Self {
        self.option_flags3.extension = true;
        self.features.push(feature);
        self
    }

    /// Encode the LOGIN7 packet to bytes: fixed header followed by the
    /// variable-length block it points into.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut block = VariableBlock::new(LOGIN7_HEADER_SIZE as u16);

        let hostname = block.write_str(&self.hostname);
        let username = block.write_str(&self.username);
        let password = block.write_obfuscated_password(&self.password);
        let app_name = block.write_str(&self.app_name);
        let server_name = block.write_str(&self.server_name);

        // Either an unused string, or (if extending) a 4-byte pointer to
        // where the feature extension block will land once the rest of the
        // variable-length fields have been written.
        let extension = if self.option_flags3.extension {
            // `unused` is never written in this branch (the pointer takes its
            // slot), so it must not be counted among the fields still ahead.
            let remaining_len = utf16_bytes(&self.library_name)
                + utf16_bytes(&self.language)
                + utf16_bytes(&self.database)
                + self.sspi_data.len() as u16
                + utf16_bytes(&self.attach_db_file)
                + utf16_bytes(&self.new_password);
            let target = block.offset + remaining_len;
            (block.write_extension_pointer(target), 4)
        } else {
            block.write_str(&self.unused)
        };

        let library_name = block.write_str(&self.library_name);
        let language = block.write_str(&self.language);
        let database = block.write_str(&self.database);
        let sspi = block.write_bytes(&self.sspi_data);
        let attach_db_file = block.write_str(&self.attach_db_file);
        let new_password = if self.new_password.is_empty() {
            (block.offset, 0)
        } else {
            block.write_obfuscated_password(&self.new_password)
        };

        if self.option_flags3.extension {
            block.write_features(&self.features);
        }

        let total_length = LOGIN7_HEADER_SIZE + block.buf.len();
        let mut header = BytesMut::with_capacity(LOGIN7_HEADER_SIZE);

        header.put_u32_le(total_length as u32);
        header.put_u32_le(self.tds_version.raw());
        header.put_u32_le(self.packet_size);
        header.put_u32_le(self.client_prog_version);
        header.put_u32_le(self.client_pid);
        header.put_u32_le(self.connection_id);

        header.put_u8(self.option_flags1.to_byte());
        header.put_u8(self.option_flags2.to_byte());
        header.put_u8(self.type_flags.to_byte());
        header.put_u8(self.option_flags3.to_byte());

        header.put_i32_le(self.client_timezone);
        header.put_u32_le(self.client_lcid);

        for (offset, len) in [hostname, username, password, app_name, server_name, extension] {
            header.put_u16_le(offset);
            header.put_u16_le(len);
        }

        header.put_u16_le(library_name.0);
        header.put_u16_le(library_name.1);
        header.put_u16_le(language.0);
        header.put_u16_le(language.1);
        header.put_u16_le(database.0);
        header.put_u16_le(database.1);

        header.put_slice(&self.client_id);

        for (offset, len) in [sspi, attach_db_file, new_password] {
            header.put_u16_le(offset);
            header.put_u16_le(len);
        }

        header.put_u32_le(0); // SSPI long (unused; SSPI data is always < 64KiB here)

        header.unsplit(block.buf);
        header.freeze()
    }
}

fn utf16_bytes(s: &str) -> u16 {
    (s.encode_utf16().count() * 2) as u16
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_standard_sql_server_client_flags() {
        let login = Login7::new();
        assert_eq!(login.tds_version, TdsVersion::V7_4);
        assert_eq!(login.packet_size, 4096);
        assert!(login.option_flags2.odbc);
    }

    #[test]
    fn encode_places_the_tds_version_right_after_the_length_field() {
        let login = Login7::new()
            .with_hostname("TESTHOST")
            .with_sql_auth("testuser", "testpass")
            .with_database("testdb")
            .with_app_name("TestApp");

        let encoded = login.encode();
        assert!(encoded.len() >= LOGIN7_HEADER_SIZE);

        let tds_version = u32::from_le_bytes([encoded[4], encoded[5], encoded[6], encoded[7]]);
        assert_eq!(tds_version, TdsVersion::V7_4.raw());
    }

    #[test]
    fn password_obfuscation_swaps_nibbles_before_xor() {
        let mut block = VariableBlock::new(0);
        block.write_obfuscated_password("a");

        // 'a' = 0x0061 UTF-16LE. Low byte 0x61 -> swap nibbles 0x16 -> xor 0xA5 = 0xB3.
        // High byte 0x00 -> swap nibbles 0x00 -> xor 0xA5 = 0xA5.
        assert_eq!(&block.buf[..], [0xB3, 0xA5]);
    }

    #[test]
    fn a_feature_extension_replaces_the_unused_field_with_a_pointer() {
        let login = Login7::new().with_feature(FeatureExtension {
            feature_id: FeatureId::Utf8Support,
            data: Bytes::from_static(&[0x01]),
        });
        assert!(login.option_flags3.extension);
        let encoded = login.encode();
        assert!(encoded.len() > LOGIN7_HEADER_SIZE);
    }

    #[test]
    fn option_flags_pack_into_the_documented_bit_positions() {
        assert_eq!(OptionFlags1::default().to_byte(), 0x00);

        let flags2 = OptionFlags2 { odbc: true, integrated_security: true, ..Default::default() };
        assert_eq!(flags2.to_byte(), 0x82);

        let flags3 = OptionFlags3 { extension: true, ..Default::default() };
        assert_eq!(flags3.to_byte(), 0x10);
    }
}
