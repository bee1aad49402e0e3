//! Wire messages for the gateway protocol
//!
//! Two encodings live here:
//! - the handshake hello, framed as magic + length + JSON;
//! - the node-list payload of the ShareNodes RPC, a count-prefixed
//!   sequence of length-prefixed address strings with hard size bounds.
//!
//! The bounds are enforced on read before anything is handed to the
//! caller, so an oversized or malformed message is rejected whole.

use crate::address::NetAddress;
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

/// Protocol version spoken by this build
pub const PROTOCOL_VERSION: u32 = 1;

/// Oldest protocol version we will talk to
pub const MIN_PROTOCOL_VERSION: u32 = 1;

/// Magic bytes for hello framing
pub const MAGIC: [u8; 4] = [0x47, 0x41, 0x54, 0x45]; // "GATE"

/// Most nodes a single ShareNodes response may carry
pub const MAX_SHARED_NODES: usize = 10;

/// Largest accepted encoding of a single address, in bytes
pub const MAX_ENCODED_ADDR_LEN: usize = 100;

/// Largest accepted hello frame, in bytes
pub const MAX_HELLO_LEN: usize = 1024;

/// Wire decoding errors
#[derive(Error, Debug)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("message declares {0} nodes, limit is {MAX_SHARED_NODES}")]
    TooManyEntries(u32),
    #[error("message declares a {0} byte address, limit is {MAX_ENCODED_ADDR_LEN}")]
    EntryTooLong(u32),
    #[error("address entry is not valid UTF-8")]
    InvalidUtf8,
}

/// Handshake hello, exchanged once per connection in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    /// Protocol version
    pub version: u32,
    /// Genesis block ID of the chain this node follows
    pub genesis_id: String,
    /// Whether the dialer wants a lasting session or is only probing
    pub want_conn: bool,
    /// Node's user agent string
    pub user_agent: String,
}

impl Hello {
    pub fn new(genesis_id: String, want_conn: bool) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            genesis_id,
            want_conn,
            user_agent: format!("mini-gateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Codec for hello frames: magic (4) + length (4, big-endian) + JSON.
pub struct HelloCodec;

impl Encoder<Hello> for HelloCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Hello, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = serde_json::to_vec(&item)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        dst.reserve(8 + data.len());
        dst.put_slice(&MAGIC);
        dst.put_u32(data.len() as u32);
        dst.put_slice(&data);

        Ok(())
    }
}

impl Decoder for HelloCodec {
    type Item = Hello;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 8 {
            return Ok(None);
        }

        if src[..4] != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid magic bytes",
            ));
        }

        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if len > MAX_HELLO_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Hello frame too large",
            ));
        }

        if src.len() < 8 + len {
            return Ok(None);
        }

        src.advance(8);
        let data = src.split_to(len);

        let hello = serde_json::from_slice(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        Ok(Some(hello))
    }
}

/// Write a node list: u32 count, then per node u32 length + UTF-8 bytes.
pub async fn write_node_list<W>(w: &mut W, nodes: &[NetAddress]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    w.write_u32(nodes.len() as u32).await?;
    for node in nodes {
        let bytes = node.as_str().as_bytes();
        w.write_u32(bytes.len() as u32).await?;
        w.write_all(bytes).await?;
    }
    w.flush().await
}

/// Read a node list written by [`write_node_list`].
///
/// Rejects the whole message if the declared count exceeds
/// [`MAX_SHARED_NODES`] or any entry exceeds [`MAX_ENCODED_ADDR_LEN`];
/// nothing is returned partially. Addresses are not validated here, only
/// bounded and decoded.
pub async fn read_node_list<R>(r: &mut R) -> Result<Vec<NetAddress>, WireError>
where
    R: AsyncRead + Unpin,
{
    let count = r.read_u32().await?;
    if count as usize > MAX_SHARED_NODES {
        return Err(WireError::TooManyEntries(count));
    }

    let mut nodes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = r.read_u32().await?;
        if len as usize > MAX_ENCODED_ADDR_LEN {
            return Err(WireError::EntryTooLong(len));
        }
        let mut buf = vec![0u8; len as usize];
        r.read_exact(&mut buf).await?;
        let s = String::from_utf8(buf).map_err(|_| WireError::InvalidUtf8)?;
        nodes.push(NetAddress::from(s));
    }
    Ok(nodes)
}
