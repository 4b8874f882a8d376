//! Minimal TCP framed-session glue.
//!
//! Connects a [`TcpStream`] for an established binding and announces the
//! assigned session identifier as a `Single` frame. Message encoding beyond
//! the frame-type discriminator is owned by the framed transport layer and
//! deliberately stays out of this crate; what is written here is the tag
//! byte followed by the payload bytes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::{FramedSession, SessionBinding, SessionFactory};
use crate::error::{FlarelinkError, Result};
use crate::frame::FrameType;

/// Opens [`TcpFramedSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpSessionFactory;

impl SessionFactory for TcpSessionFactory {
    fn open(
        &self,
        binding: SessionBinding,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn FramedSession>>> + Send + '_>> {
        Box::pin(async move {
            let stream = TcpStream::connect((binding.host.as_str(), binding.port))
                .await
                .map_err(|e| {
                    FlarelinkError::Session(format!(
                        "failed to connect {}:{}: {e}",
                        binding.host, binding.port
                    ))
                })?;

            let session = TcpFramedSession {
                binding,
                stream: Mutex::new(Some(stream)),
            };
            session
                .write_frame(FrameType::Single, session.binding.assigned_id.to_string().as_bytes())
                .await?;

            tracing::debug!(
                "framed session connected to {}:{}",
                session.binding.host,
                session.binding.port
            );
            Ok(Arc::new(session) as Arc<dyn FramedSession>)
        })
    }
}

/// Framed session over a plain TCP stream.
pub struct TcpFramedSession {
    binding: SessionBinding,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpFramedSession {
    async fn write_frame(&self, frame_type: FrameType, payload: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or(FlarelinkError::SessionNotEstablished)?;
        stream.write_all(&[frame_type.tag() as u8]).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;
        Ok(())
    }
}

impl FramedSession for TcpFramedSession {
    fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    fn send_text(
        &self,
        channel: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let mut payload = Vec::with_capacity(channel.len() + body.len() + 1);
        payload.extend_from_slice(channel.as_bytes());
        payload.push(0);
        payload.extend_from_slice(body.as_bytes());
        Box::pin(async move { self.write_frame(FrameType::Single, &payload).await })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(mut stream) = self.stream.lock().await.take() {
                let _ = stream.shutdown().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use uuid::Uuid;

    fn binding(port: u16) -> SessionBinding {
        SessionBinding {
            host: "127.0.0.1".to_string(),
            port,
            assigned_id: Uuid::new_v4(),
            arguments: Default::default(),
            meta: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_open_announces_assigned_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let binding = binding(port);
        let expected_id = binding.assigned_id;

        let accept = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 37];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let session = TcpSessionFactory.open(binding).await.unwrap();
        let announced = accept.await.unwrap();

        assert_eq!(FrameType::from_bytes(&announced), FrameType::Single);
        assert_eq!(
            String::from_utf8_lossy(&announced[1..]),
            expected_id.to_string()
        );

        session.close().await;
        // Closing twice is a no-op.
        session.close().await;
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Hold the peer open long enough for the close below.
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            drop(stream);
        });

        let session = TcpSessionFactory.open(binding(port)).await.unwrap();
        session.close().await;
        let err = session.send_text("chat", "hello").await.unwrap_err();
        assert!(matches!(err, FlarelinkError::SessionNotEstablished));
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn test_open_fails_when_nothing_listens() {
        // Bind then drop to get a port that is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpSessionFactory.open(binding(port)).await;
        assert!(matches!(result, Err(FlarelinkError::Session(_))));
    }
}
