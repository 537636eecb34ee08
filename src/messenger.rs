//! Request/response framing over a single broker connection.

use std::io::Cursor;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    messages::{
        ReadVersionedError, ReadVersionedType, RequestBody, RequestHeader, ResponseHeader,
        WriteVersionedError, WriteVersionedType,
    },
};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RequestError {
    #[error("Cannot write data: {0}")]
    WriteError(#[from] WriteVersionedError),

    #[error("Cannot read data: {0}")]
    ReadError(#[from] ReadVersionedError),

    #[error("Connection broken: {0}")]
    IO(#[from] std::io::Error),

    #[error("Invalid frame size {size}, limit is {limit} bytes")]
    InvalidFrameSize { size: i32, limit: usize },

    #[error("Correlation ID mismatch: sent {sent}, received {received}")]
    CorrelationMismatch { sent: i32, received: i32 },

    #[error(
        "Data left at the end of the message. Got {message_size} bytes but only read {read} bytes. api_key={api_key:?} api_version={api_version}"
    )]
    TooMuchData {
        message_size: u64,
        read: u64,
        api_key: ApiKey,
        api_version: ApiVersion,
    },

    #[error("No response within {0:?}")]
    Timeout(Duration),
}

/// Sends requests over one stream, one in flight at a time.
#[derive(Debug)]
pub struct Messenger<RW> {
    stream: Mutex<RW>,
    correlation_id: AtomicI32,
    client_id: Arc<str>,
    max_message_size: usize,
    timeout: Duration,
}

impl<RW> Messenger<RW>
where
    RW: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub fn new(stream: RW, client_id: Arc<str>, max_message_size: usize, timeout: Duration) -> Self {
        Self {
            stream: Mutex::new(stream),
            correlation_id: AtomicI32::new(0),
            client_id,
            max_message_size,
            timeout,
        }
    }

    pub async fn request<R>(&self, msg: &R) -> Result<R::ResponseBody, RequestError>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let correlation_id = self.correlation_id.fetch_add(1, Ordering::SeqCst);
        let header = RequestHeader {
            request_api_key: R::API_KEY,
            request_api_version: R::API_VERSION,
            correlation_id,
            client_id: Some(self.client_id.to_string()),
            tagged_fields: None,
        };

        let mut buf = Vec::new();
        header.write_versioned(&mut buf, R::request_header_version())?;
        msg.write_versioned(&mut buf, R::API_VERSION)?;

        let response = {
            let mut stream = self.stream.lock().await;
            tokio::time::timeout(self.timeout, self.roundtrip(&mut *stream, &buf))
                .await
                .map_err(|_| RequestError::Timeout(self.timeout))??
        };

        let message_size = response.len() as u64;
        let mut cursor = Cursor::new(response);
        let header = ResponseHeader::read_versioned(&mut cursor, R::response_header_version())?;
        if header.correlation_id != correlation_id {
            warn!(
                sent = correlation_id,
                received = header.correlation_id,
                "response does not match request",
            );
            return Err(RequestError::CorrelationMismatch {
                sent: correlation_id,
                received: header.correlation_id,
            });
        }

        let body = R::ResponseBody::read_versioned(&mut cursor, R::API_VERSION)?;

        let read = cursor.position();
        if read != message_size {
            return Err(RequestError::TooMuchData {
                message_size,
                read,
                api_key: R::API_KEY,
                api_version: R::API_VERSION,
            });
        }

        debug!(
            api_key = ?R::API_KEY,
            correlation_id,
            message_size,
            "request completed",
        );

        Ok(body)
    }

    async fn roundtrip(&self, stream: &mut RW, payload: &[u8]) -> Result<Vec<u8>, RequestError> {
        let size = i32::try_from(payload.len()).map_err(|_| RequestError::InvalidFrameSize {
            size: i32::MAX,
            limit: self.max_message_size,
        })?;
        stream.write_i32(size).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;

        let size = stream.read_i32().await?;
        let len = usize::try_from(size)
            .ok()
            .filter(|len| *len <= self.max_message_size)
            .ok_or(RequestError::InvalidFrameSize {
                size,
                limit: self.max_message_size,
            })?;

        let mut response = vec![0u8; len];
        stream.read_exact(&mut response).await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio::io::DuplexStream;

    use super::*;
    use crate::protocol::messages::{MetadataRequest, MetadataResponse, MetadataResponseBroker};

    /// Reads one request frame and answers with `response`, echoing the
    /// correlation ID shifted by `correlation_offset`.
    async fn answer<T>(server: &mut DuplexStream, response: &T, correlation_offset: i32)
    where
        T: WriteVersionedType<Vec<u8>>,
    {
        let size = server.read_i32().await.unwrap();
        let mut request = vec![0u8; size as usize];
        server.read_exact(&mut request).await.unwrap();

        let header =
            RequestHeader::read_versioned(&mut Cursor::new(request), ApiVersion::new(1)).unwrap();
        assert_eq!(header.request_api_key, ApiKey::Metadata);
        assert_eq!(header.client_id.as_deref(), Some("test"));

        let mut buf = vec![];
        ResponseHeader {
            correlation_id: header.correlation_id + correlation_offset,
            tagged_fields: None,
        }
        .write_versioned(&mut buf, ApiVersion::new(0))
        .unwrap();
        response
            .write_versioned(&mut buf, MetadataRequest::API_VERSION)
            .unwrap();

        server.write_i32(buf.len() as i32).await.unwrap();
        server.write_all(&buf).await.unwrap();
    }

    fn metadata() -> MetadataResponse {
        MetadataResponse {
            throttle_time_ms: Some(0),
            brokers: vec![MetadataResponseBroker {
                node_id: 1,
                host: "localhost".to_string(),
                port: 9092,
                rack: None,
            }],
            cluster_id: Some("c".to_string()),
            controller_id: Some(1),
            topics: vec![],
        }
    }

    fn messenger(client: DuplexStream) -> Messenger<DuplexStream> {
        Messenger::new(
            client,
            Arc::from("test"),
            1024 * 1024,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn request_response() {
        let (client, mut server) = tokio::io::duplex(4096);
        let messenger = messenger(client);

        let want = metadata();
        let server = tokio::spawn(async move {
            answer(&mut server, &metadata(), 0).await;
            server
        });

        let got = messenger
            .request(&MetadataRequest {
                topics: Some(vec![]),
                allow_auto_topic_creation: Some(false),
            })
            .await
            .unwrap();
        assert_eq!(got, want);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn correlation_mismatch() {
        let (client, mut server) = tokio::io::duplex(4096);
        let messenger = messenger(client);

        let server = tokio::spawn(async move {
            answer(&mut server, &metadata(), 7).await;
            server
        });

        let err = messenger
            .request(&MetadataRequest {
                topics: None,
                allow_auto_topic_creation: Some(false),
            })
            .await
            .unwrap_err();
        assert_matches!(err, RequestError::CorrelationMismatch { sent: 0, received: 7 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_frame() {
        let (client, mut server) = tokio::io::duplex(4096);
        let messenger = Messenger::new(client, Arc::from("test"), 16, Duration::from_secs(5));

        let server = tokio::spawn(async move {
            let size = server.read_i32().await.unwrap();
            let mut request = vec![0u8; size as usize];
            server.read_exact(&mut request).await.unwrap();
            server.write_i32(1_000).await.unwrap();
            server
        });

        let err = messenger
            .request(&MetadataRequest {
                topics: None,
                allow_auto_topic_creation: None,
            })
            .await
            .unwrap_err();
        assert_matches!(err, RequestError::InvalidFrameSize { size: 1_000, limit: 16 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn timeout() {
        let (client, server) = tokio::io::duplex(4096);
        let messenger = Messenger::new(
            client,
            Arc::from("test"),
            1024,
            Duration::from_millis(50),
        );

        let err = messenger
            .request(&MetadataRequest {
                topics: None,
                allow_auto_topic_creation: None,
            })
            .await
            .unwrap_err();
        assert_matches!(err, RequestError::Timeout(_));
        drop(server);
    }
}
