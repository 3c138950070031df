use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
#[cfg(target_os = "linux")]
use crate::rfcomm::{AsyncRfcomm, RfcommSocket};

/// A freshly connected, still blocking stream.
///
/// Returned by [`connect`]; converted into a [`BtStream`] on the reactor
/// thread with [`BtStream::from_raw`].
#[derive(Debug)]
pub enum RawStream {
    /// Unix domain stream socket.
    Unix(std::os::unix::net::UnixStream),
    /// Bluetooth RFCOMM socket.
    #[cfg(target_os = "linux")]
    Rfcomm(RfcommSocket),
}

/// Open a stream to `endpoint` and perform a blocking connect.
pub fn connect(endpoint: &Endpoint) -> Result<RawStream> {
    let connect_err = |source| TransportError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };

    match endpoint {
        Endpoint::Unix(path) => {
            let stream = std::os::unix::net::UnixStream::connect(path).map_err(connect_err)?;
            debug!(%endpoint, "connected to unix domain socket");
            Ok(RawStream::Unix(stream))
        }
        #[cfg(target_os = "linux")]
        Endpoint::Rfcomm { address, channel } => {
            let socket = RfcommSocket::connect(*address, *channel).map_err(connect_err)?;
            Ok(RawStream::Rfcomm(socket))
        }
        #[cfg(not(target_os = "linux"))]
        Endpoint::Rfcomm { .. } => Err(TransportError::Unsupported(format!(
            "{endpoint}: RFCOMM sockets are only available on Linux"
        ))),
    }
}

/// A connected stream driven by the Tokio reactor. Implements
/// `AsyncRead + AsyncWrite`.
pub struct BtStream {
    inner: BtStreamInner,
}

enum BtStreamInner {
    Unix(tokio::net::UnixStream),
    #[cfg(target_os = "linux")]
    Rfcomm(AsyncRfcomm),
}

impl BtStream {
    /// Register a blocking stream with the current runtime.
    ///
    /// Must be called from within a Tokio runtime context.
    pub fn from_raw(raw: RawStream) -> Result<Self> {
        let inner = match raw {
            RawStream::Unix(stream) => {
                stream.set_nonblocking(true)?;
                BtStreamInner::Unix(tokio::net::UnixStream::from_std(stream)?)
            }
            #[cfg(target_os = "linux")]
            RawStream::Rfcomm(socket) => BtStreamInner::Rfcomm(AsyncRfcomm::new(socket)?),
        };
        Ok(Self { inner })
    }
}

impl AsyncRead for BtStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BtStreamInner::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(target_os = "linux")]
            BtStreamInner::Rfcomm(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BtStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            BtStreamInner::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(target_os = "linux")]
            BtStreamInner::Rfcomm(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BtStreamInner::Unix(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(target_os = "linux")]
            BtStreamInner::Rfcomm(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BtStreamInner::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(target_os = "linux")]
            BtStreamInner::Rfcomm(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for BtStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            BtStreamInner::Unix(_) => "unix",
            #[cfg(target_os = "linux")]
            BtStreamInner::Rfcomm(_) => "rfcomm",
        };
        f.debug_struct("BtStream").field("type", &kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "spherolink-transport-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("device.sock")
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let endpoint = Endpoint::Unix(make_sock_path("missing"));
        let err = connect(&endpoint).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.to_string().contains("unix:"));
    }

    #[test]
    fn unix_stream_roundtrip_through_reactor() {
        let path = make_sock_path("roundtrip");
        let listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
        let raw = connect(&Endpoint::Unix(path.clone())).unwrap();
        let (mut device, _) = listener.accept().unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let mut stream = BtStream::from_raw(raw).unwrap();
            stream.write_all(&[0xFF, 0xFF, 0x00]).await.unwrap();

            let mut received = [0u8; 3];
            std::io::Read::read_exact(&mut device, &mut received).unwrap();
            assert_eq!(received, [0xFF, 0xFF, 0x00]);

            std::io::Write::write_all(&mut device, &[0x01, 0x02]).unwrap();
            let mut reply = [0u8; 2];
            stream.read_exact(&mut reply).await.unwrap();
            assert_eq!(reply, [0x01, 0x02]);
        });

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
