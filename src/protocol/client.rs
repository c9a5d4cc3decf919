//! Authenticated admin connection to the cache daemon

use crate::common::{Error, Result};
use crate::protocol::codec::{
    create_bucket_value, sasl_plain_payload, Request, Response, ResponseHeader, VbucketState,
    HEADER_LEN, MECH_PLAIN, OP_CREATE_BUCKET, OP_SASL_AUTH, OP_SELECT_BUCKET,
    OP_SET_VBUCKET_STATE, STATUS_AUTH_ERROR, STATUS_KEY_EEXISTS, STATUS_KEY_ENOENT,
    STATUS_SUCCESS,
};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// The administrative surface the provisioner drives. Implemented by
/// [`McClient`] for real daemons and by scripted doubles in tests.
#[async_trait]
pub trait AdminClient: Send {
    /// Make the named bucket the connection's active context.
    async fn select_bucket(&mut self, name: &str) -> Result<()>;

    /// Create a bucket backed by the given engine module and config string.
    async fn create_bucket(&mut self, name: &str, engine_path: &str, config: &str) -> Result<()>;

    /// Set one vbucket's lifecycle state.
    async fn set_vbucket_state(&mut self, vbucket: u16, state: VbucketState) -> Result<()>;
}

/// Binary-protocol client over a single TCP connection.
///
/// The connection is exclusively owned; every call writes one request and
/// blocks on its response, so there is never more than one frame in flight.
#[derive(Debug)]
pub struct McClient {
    stream: TcpStream,
    opaque: u32,
}

impl McClient {
    /// Open a TCP connection to the daemon.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}:{}: {}", host, port, e)))?;

        tracing::debug!(host, port, "connected to cache daemon");

        Ok(Self { stream, opaque: 0 })
    }

    /// Authenticate with SASL PLAIN. Must be called before any admin command.
    pub async fn sasl_auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        let payload = sasl_plain_payload(username, password);
        let resp = self
            .roundtrip(OP_SASL_AUTH, 0, MECH_PLAIN.as_bytes(), &payload)
            .await?;

        match resp.header.status {
            STATUS_SUCCESS => {
                tracing::debug!(username, "authenticated");
                Ok(())
            }
            STATUS_AUTH_ERROR => Err(Error::AuthFailed(format!(
                "daemon rejected credentials for {}",
                username
            ))),
            status => Err(Error::AuthFailed(format!(
                "unexpected status 0x{:04x}: {}",
                status,
                resp.message()
            ))),
        }
    }

    /// Write one request and read its response.
    async fn roundtrip(
        &mut self,
        opcode: u8,
        vbucket: u16,
        key: &[u8],
        value: &[u8],
    ) -> Result<Response> {
        self.opaque = self.opaque.wrapping_add(1);
        let request = Request {
            opcode,
            vbucket,
            opaque: self.opaque,
            key,
            value,
        };
        self.stream.write_all(&request.encode()).await?;

        let mut header_buf = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header_buf).await?;
        let header = ResponseHeader::parse(&header_buf)?;

        if header.opaque != self.opaque {
            return Err(Error::Protocol(format!(
                "opaque mismatch: sent {}, got {}",
                self.opaque, header.opaque
            )));
        }

        let mut body = vec![0u8; header.body_len as usize];
        self.stream.read_exact(&mut body).await?;

        Ok(Response { header, body })
    }
}

#[async_trait]
impl AdminClient for McClient {
    async fn select_bucket(&mut self, name: &str) -> Result<()> {
        let resp = self
            .roundtrip(OP_SELECT_BUCKET, 0, name.as_bytes(), &[])
            .await?;

        match resp.header.status {
            STATUS_SUCCESS => Ok(()),
            STATUS_KEY_ENOENT => Err(Error::BucketNotFound(name.to_string())),
            status => Err(Error::Daemon {
                status,
                message: resp.message(),
            }),
        }
    }

    async fn create_bucket(&mut self, name: &str, engine_path: &str, config: &str) -> Result<()> {
        let value = create_bucket_value(engine_path, config);
        let resp = self
            .roundtrip(OP_CREATE_BUCKET, 0, name.as_bytes(), &value)
            .await?;

        match resp.header.status {
            STATUS_SUCCESS => Ok(()),
            // Lost a race with another provisioner; the bucket is there.
            STATUS_KEY_EEXISTS => {
                tracing::debug!(bucket = name, "bucket already exists");
                Ok(())
            }
            status => Err(Error::Daemon {
                status,
                message: resp.message(),
            }),
        }
    }

    async fn set_vbucket_state(&mut self, vbucket: u16, state: VbucketState) -> Result<()> {
        let key = vbucket.to_string();
        let state_str = state.to_string();
        let resp = self
            .roundtrip(OP_SET_VBUCKET_STATE, 0, key.as_bytes(), state_str.as_bytes())
            .await?;

        match resp.header.status {
            STATUS_SUCCESS => Ok(()),
            status => Err(Error::Daemon {
                status,
                message: resp.message(),
            }),
        }
    }
}
