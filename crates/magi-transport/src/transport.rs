// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Transport (C3): owns the TCP socket, a receive queue and a transmit
//! queue, a listener task, and a sender task.
//!
//! Per spec §9's "Concurrency re-architecture" note, this replaces the
//! original's two OS threads, mutex-guarded linked-list queues, and 100 ms
//! sleep-polling with a pair of tokio tasks and `tokio::sync::mpsc`
//! channels — an explicitly endorsed, invisible upgrade. Shutdown is
//! expressed by closing the transmit channel (the sender drains it and
//! exits) and aborting the listener task (spec §5's "cancels the listener
//! immediately").

use magi_wire::AgentRequest;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TransportError;

/// Minimum scratch read size (spec §4.3: "at least 1 KiB").
const SCRATCH_SIZE: usize = 4096;

/// A cheap-to-clone handle for enqueueing outbound requests. Handed to the
/// messenger (C4) and to the agent loop (C6) so callers never need direct
/// access to the socket or the receive side.
#[derive(Clone)]
pub struct TransportHandle {
    pub(crate) tx_queue: mpsc::UnboundedSender<AgentRequest>,
}

impl TransportHandle {
    /// `send_out(req)`: enqueue an outbound request for the sender task.
    /// Never blocks; a closed channel (transport already shutting down)
    /// silently drops the request, matching the original's "write failures
    /// are logged, non-fatal" posture for the shutdown race.
    pub fn send_out(&self, req: AgentRequest) {
        if self.tx_queue.send(req).is_err() {
            tracing::warn!("transport: send_out after shutdown, dropping request");
        }
    }
}

/// Owns the socket and the two queues; provides `next()` to pop inbound
/// requests and a cloneable [`TransportHandle`] for `send_out`.
pub struct Transport {
    handle: TransportHandle,
    rx_queue: mpsc::UnboundedReceiver<AgentRequest>,
    listener_task: JoinHandle<()>,
    sender_task: JoinHandle<()>,
}

impl Transport {
    /// `init_connection` + `start_connection` (spec §4.3), collapsed into
    /// one async call: resolves and dials `host:port`, allocates both
    /// queues, and launches the listener and sender tasks.
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        tracing::debug!(host, port, "transport: connecting");
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, host, port, "transport: connect failed");
                TransportError::Io(e)
            })?;
        stream.set_nodelay(true).ok();
        let (read_half, write_half) = stream.into_split();

        let (tx_tx, tx_rx) = mpsc::unbounded_channel::<AgentRequest>();
        let (rx_tx, rx_rx) = mpsc::unbounded_channel::<AgentRequest>();

        let listener_task = tokio::spawn(listener_loop(read_half, rx_tx));
        let sender_task = tokio::spawn(sender_loop(write_half, tx_rx));

        tracing::info!(host, port, "transport: connected, listener and sender tasks active");

        Ok(Transport {
            handle: TransportHandle { tx_queue: tx_tx },
            rx_queue: rx_rx,
            listener_task,
            sender_task,
        })
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn send_out(&self, req: AgentRequest) {
        self.handle.send_out(req);
    }

    /// `next()`: pop the next inbound request, awaiting one if the queue is
    /// empty. Returns `None` once the listener has exited (socket closed)
    /// and the queue is drained — the agent loop treats this as end of
    /// stream.
    pub async fn next(&mut self) -> Option<AgentRequest> {
        self.rx_queue.recv().await
    }

    /// `close_transport()`: cancels the listener immediately, then lets the
    /// sender drain `tx_queue` (by closing the handle and awaiting the
    /// task) before it exits.
    pub async fn close(self) {
        tracing::info!("transport: shutting down listener task");
        self.listener_task.abort();

        tracing::info!("transport: closing tx_queue, waiting for sender to drain");
        drop(self.handle);
        if let Err(e) = self.sender_task.await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, "transport: sender task join error");
            }
        }
    }
}

/// Find the start of the next preamble in `buf`, or `None` if absent.
fn find_preamble(buf: &[u8]) -> Option<usize> {
    buf.windows(magi_wire::PREAMBLE.len())
        .position(|w| w == magi_wire::PREAMBLE)
}

/// Listener: reads from the socket in a loop, buffers a rolling byte
/// stream, scans for the preamble, and consumes exactly `total_len + 12`
/// bytes per frame (spec §9's "Framing weakness" fix, rather than the
/// original's fixed-scratch re-read).
async fn listener_loop(mut reader: OwnedReadHalf, rx_tx: mpsc::UnboundedSender<AgentRequest>) {
    let mut buf: Vec<u8> = Vec::with_capacity(SCRATCH_SIZE);
    let mut scratch = vec![0u8; SCRATCH_SIZE];

    loop {
        let n = match reader.read(&mut scratch).await {
            Ok(0) => {
                tracing::info!("transport: listener saw EOF, daemon closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "transport: listener read error");
                break;
            }
        };
        buf.extend_from_slice(&scratch[..n]);

        loop {
            let Some(start) = find_preamble(&buf) else {
                // No preamble anywhere yet; keep only a tail long enough to
                // catch a preamble split across reads.
                let keep = magi_wire::PREAMBLE.len().saturating_sub(1);
                if buf.len() > keep {
                    let drop_to = buf.len() - keep;
                    buf.drain(..drop_to);
                }
                break;
            };
            if start > 0 {
                tracing::error!(skipped = start, "transport: discarding bytes before preamble");
                buf.drain(..start);
            }
            if buf.len() < 12 {
                break; // need preamble(8) + total_len(4) to read the frame length
            }
            let total_len = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
            let frame_len = 12usize.saturating_add(total_len);
            if buf.len() < frame_len {
                break; // wait for more bytes
            }

            let frame: Vec<u8> = buf.drain(..frame_len).collect();
            match AgentRequest::decode(&frame) {
                Ok(req) => {
                    tracing::debug!("transport: decoded inbound agent request");
                    if rx_tx.send(req).is_err() {
                        tracing::info!("transport: agent loop gone, stopping listener");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "transport: failed to decode agent request, dropping frame");
                }
            }
        }
    }
}

/// Sender: dequeues from `tx_queue`, encodes, writes to the socket.
async fn sender_loop(mut writer: OwnedWriteHalf, mut tx_rx: mpsc::UnboundedReceiver<AgentRequest>) {
    while let Some(req) = tx_rx.recv().await {
        let (buf, len) = req.encode();
        tracing::debug!(len, "transport: sending agent request");
        if let Err(e) = writer.write_all(&buf).await {
            tracing::error!(error = %e, "transport: write failed");
        }
    }
    tracing::info!("transport: tx_queue drained, sender exiting");
}
