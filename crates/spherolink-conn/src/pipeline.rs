//! Tasks driven by the reactor thread.
//!
//! The receive loop turns socket reads into inbound frames. The write
//! pipeline drains the outbound queue one frame at a time.

use std::sync::Arc;

use bytes::Bytes;
use spherolink_frame::align_to_marker;
use spherolink_transport::BtStream;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::state::Shared;

/// Run both halves of a connected stream until `cancel` fires.
pub(crate) async fn run(
    stream: BtStream,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    read_buffer_size: usize,
) {
    let (reader, writer) = tokio::io::split(stream);
    tokio::join!(
        receive_loop(reader, Arc::clone(&shared), cancel.clone(), read_buffer_size),
        send_loop(writer, shared, cancel),
    );
}

/// Read chunks into a zeroed scratch buffer and queue each one as a frame,
/// starting at its first start marker.
///
/// Read errors are logged and the read re-issued. End of stream closes the
/// connection.
pub(crate) async fn receive_loop<R>(
    mut reader: R,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    buffer_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut scratch = vec![0u8; buffer_size.max(1)];

    while !shared.is_shutting_down() {
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read(&mut scratch) => read,
        };

        match read {
            Ok(0) => {
                info!("device closed the stream");
                shared.begin_close(&cancel);
                break;
            }
            Ok(n) => {
                match align_to_marker(&scratch[..n]) {
                    Some(frame) => {
                        debug!(bytes = n, frame_bytes = frame.len(), "received frame");
                        shared.push_inbound(Bytes::copy_from_slice(frame));
                    }
                    None => debug!(bytes = n, "no start marker in chunk, dropped"),
                }
                scratch[..n].fill(0);
            }
            Err(e) => {
                warn!(error = %e, "read failed, re-issuing");
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Write queued frames in order, one in flight at a time.
///
/// A frame leaves the queue only after it was fully written. Once a graceful
/// shutdown is requested the pipeline stops after the frame in flight and
/// stops the reactor. A write error closes the connection.
pub(crate) async fn send_loop<W>(mut writer: W, shared: Arc<Shared>, cancel: CancellationToken)
where
    W: AsyncWrite + Unpin,
{
    loop {
        if shared.is_shutting_down() {
            debug!(pending = shared.pending_outbound(), "write pipeline stopping");
            cancel.cancel();
            return;
        }

        let Some(frame) = shared.front_outbound() else {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = shared.writer_woken() => continue,
            }
        };

        let written = tokio::select! {
            _ = cancel.cancelled() => return,
            written = write_frame(&mut writer, &frame) => written,
        };

        match written {
            Ok(()) => {
                shared.pop_outbound();
                debug!(bytes = frame.len(), "sent frame");
            }
            Err(e) => {
                error!(error = %e, bytes = frame.len(), "write failed, closing connection");
                shared.begin_close(&cancel);
                return;
            }
        }
    }
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}
