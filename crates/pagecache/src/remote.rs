//! Redis-compatible network store adapter
//!
//! One TCP connection speaking RESP2, operations serialized behind an async
//! mutex. Expiry is delegated to the server (`SET ... PX`), which owns the
//! guarantee that no read returns an entry past its deadline.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time;

use crate::error::{Error, Result};
use crate::resp::{encode_command, parse_reply, Reply};
use crate::store::KeyValueStore;

/// Network store adapter for any Redis-compatible server
#[derive(Debug)]
pub struct RemoteStore {
    conn: Mutex<Connection>,
    timeout: Duration,
}

#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    buf: BytesMut,
}

impl RemoteStore {
    /// Connect to `addr`, bounding the connect and every later operation by
    /// `timeout`
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let stream = time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::StoreTimeout(timeout))??;

        Ok(Self {
            conn: Mutex::new(Connection {
                stream,
                buf: BytesMut::with_capacity(4096),
            }),
            timeout,
        })
    }

    async fn request(&self, args: &[&[u8]]) -> Result<Reply> {
        let mut conn = self.conn.lock().await;
        time::timeout(self.timeout, conn.roundtrip(args))
            .await
            .map_err(|_| Error::StoreTimeout(self.timeout))?
    }
}

impl Connection {
    async fn roundtrip(&mut self, args: &[&[u8]]) -> Result<Reply> {
        self.stream.write_all(&encode_command(args)).await?;

        loop {
            if let Some(reply) = parse_reply(&mut self.buf)? {
                return Ok(reply);
            }

            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(Error::StoreUnavailable(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RemoteStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        match self.request(&[b"INCR", key.as_bytes()]).await? {
            Reply::Integer(n) => u64::try_from(n)
                .map_err(|_| Error::Protocol(format!("negative counter for '{}': {}", key, n))),
            Reply::Error(msg) => Err(Error::Protocol(msg)),
            other => Err(Error::Protocol(format!(
                "unexpected INCR reply: {:?}",
                other
            ))),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.request(&[b"GET", key.as_bytes()]).await? {
            Reply::Bulk(value) => Ok(value),
            Reply::Error(msg) => Err(Error::Protocol(msg)),
            other => Err(Error::Protocol(format!("unexpected GET reply: {:?}", other))),
        }
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // PX keeps sub-second precision; servers reject an expiry of zero
        let millis = ttl.as_millis().max(1).to_string();

        match self
            .request(&[b"SET", key.as_bytes(), value, b"PX", millis.as_bytes()])
            .await?
        {
            Reply::Simple(s) if s == "OK" => Ok(()),
            Reply::Error(msg) => Err(Error::Protocol(msg)),
            other => Err(Error::Protocol(format!("unexpected SET reply: {:?}", other))),
        }
    }
}
