//! Memcached binary protocol framing (client side)
//!
//! Header format (24 bytes, network byte order):
//! `[MAGIC][OPCODE][KEY_LEN][EXT_LEN][DATATYPE][VBUCKET|STATUS][BODY_LEN][OPAQUE][CAS]`
//!
//! Requests carry a vbucket id in bytes 6..8; responses carry a status code
//! there instead. The body is extras, then key, then value.

use crate::common::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

pub const REQUEST_MAGIC: u8 = 0x80;
pub const RESPONSE_MAGIC: u8 = 0x81;
pub const HEADER_LEN: usize = 24;

// Admin opcodes used by this tool
pub const OP_SASL_AUTH: u8 = 0x21;
pub const OP_SET_VBUCKET_STATE: u8 = 0x3d;
pub const OP_CREATE_BUCKET: u8 = 0x85;
pub const OP_SELECT_BUCKET: u8 = 0x89;

// Response status codes
pub const STATUS_SUCCESS: u16 = 0x0000;
pub const STATUS_KEY_ENOENT: u16 = 0x0001;
pub const STATUS_KEY_EEXISTS: u16 = 0x0002;
pub const STATUS_EINVAL: u16 = 0x0004;
pub const STATUS_NOT_STORED: u16 = 0x0005;
pub const STATUS_AUTH_ERROR: u16 = 0x0020;
pub const STATUS_UNKNOWN_COMMAND: u16 = 0x0081;

/// SASL mechanism name sent as the auth request key.
pub const MECH_PLAIN: &str = "PLAIN";

/// One outgoing request frame.
#[derive(Debug)]
pub struct Request<'a> {
    pub opcode: u8,
    pub vbucket: u16,
    pub opaque: u32,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl Request<'_> {
    /// Serialize header and body into one buffer.
    pub fn encode(&self) -> Bytes {
        let body_len = self.key.len() + self.value.len();
        let mut buf = BytesMut::with_capacity(HEADER_LEN + body_len);

        buf.put_u8(REQUEST_MAGIC);
        buf.put_u8(self.opcode);
        buf.put_u16(self.key.len() as u16);
        buf.put_u8(0); // extras length
        buf.put_u8(0); // datatype
        buf.put_u16(self.vbucket);
        buf.put_u32(body_len as u32);
        buf.put_u32(self.opaque);
        buf.put_u64(0); // cas

        buf.put_slice(self.key);
        buf.put_slice(self.value);

        buf.freeze()
    }
}

/// Parsed response header.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHeader {
    pub opcode: u8,
    pub key_len: u16,
    pub extras_len: u8,
    pub status: u16,
    pub body_len: u32,
    pub opaque: u32,
    pub cas: u64,
}

impl ResponseHeader {
    pub fn parse(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        if buf[0] != RESPONSE_MAGIC {
            return Err(Error::Protocol(format!(
                "bad response magic: 0x{:02x}",
                buf[0]
            )));
        }

        Ok(Self {
            opcode: buf[1],
            key_len: u16::from_be_bytes([buf[2], buf[3]]),
            extras_len: buf[4],
            status: u16::from_be_bytes([buf[6], buf[7]]),
            body_len: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            opaque: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
            cas: u64::from_be_bytes([
                buf[16], buf[17], buf[18], buf[19], buf[20], buf[21], buf[22], buf[23],
            ]),
        })
    }
}

/// A complete response frame.
#[derive(Debug)]
pub struct Response {
    pub header: ResponseHeader,
    pub body: Vec<u8>,
}

impl Response {
    /// The value section of the body (after extras and key). On error
    /// responses the daemon puts a human-readable message here.
    pub fn value(&self) -> &[u8] {
        let skip = self.header.extras_len as usize + self.header.key_len as usize;
        self.body.get(skip..).unwrap_or(&[])
    }

    /// Error message carried by the response, if any.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(self.value()).into_owned()
    }
}

/// SASL PLAIN initial response: empty authzid, then authcid and password,
/// each NUL-prefixed.
pub fn sasl_plain_payload(username: &str, password: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(username.len() + password.len() + 2);
    payload.push(0);
    payload.extend_from_slice(username.as_bytes());
    payload.push(0);
    payload.extend_from_slice(password.as_bytes());
    payload
}

/// Create-bucket request value: engine module path, NUL, config string. The
/// daemon splits on the first NUL.
pub fn create_bucket_value(engine_path: &str, config: &str) -> Vec<u8> {
    let mut value = Vec::with_capacity(engine_path.len() + config.len() + 1);
    value.extend_from_slice(engine_path.as_bytes());
    value.push(0);
    value.extend_from_slice(config.as_bytes());
    value
}

/// Vbucket lifecycle states understood by the daemon. This tool only ever
/// sets `Active`; the rest are part of the wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VbucketState {
    Active,
    Replica,
    Pending,
    Dead,
}

impl VbucketState {
    /// Does this state serve client traffic?
    pub fn is_live(&self) -> bool {
        matches!(self, VbucketState::Active)
    }
}

impl std::fmt::Display for VbucketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VbucketState::Active => write!(f, "active"),
            VbucketState::Replica => write!(f, "replica"),
            VbucketState::Pending => write!(f, "pending"),
            VbucketState::Dead => write!(f, "dead"),
        }
    }
}
