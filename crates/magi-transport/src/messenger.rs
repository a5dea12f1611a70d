// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Messenger (C4): builds well-formed `MAGIMessage` values and hands them
//! to the transport inside a `Message`-kind `AgentRequest`.

use magi_wire::{AgentRequest, ContentType, MagiMessage, RequestKind};

use crate::error::TransportError;
use crate::transport::TransportHandle;

/// Builds and enqueues `AgentRequest`/`MAGIMessage` values. Holds only a
/// cheap-clone [`TransportHandle`], so it can be cloned freely and handed
/// to user callables without exposing the socket or receive queue.
#[derive(Clone)]
pub struct Messenger {
    handle: TransportHandle,
}

impl Messenger {
    pub fn new(handle: TransportHandle) -> Self {
        Self { handle }
    }

    /// `send(msg, options...)` (spec §4.4): encode `msg`, wrap in a
    /// `Message`-kind `AgentRequest`, attach optional key/value options,
    /// enqueue on the transmit queue.
    pub fn send(&self, msg: &MagiMessage, options: &[(&str, &[u8])]) -> Result<(), TransportError> {
        let (buf, _len) = msg.encode()?;
        let mut req = AgentRequest::new(RequestKind::Message, buf);
        for (key, value) in options {
            req.add_option(key, value);
        }
        self.handle.send_out(req);
        Ok(())
    }

    /// `trigger(groups?, docks?, content_type, data)` (spec §4.4):
    /// constructs a `MAGIMessage` addressed by the given destination
    /// headers and sends it with no options.
    pub fn trigger(
        &self,
        group: Option<&str>,
        dock: Option<&str>,
        content_type: ContentType,
        data: Vec<u8>,
    ) -> Result<(), TransportError> {
        let msg = MagiMessage::create(None, None, group, dock, content_type, data);
        self.send(&msg, &[])
    }

    /// `join_group(name)`: a control `AgentRequest` with no inner message.
    pub fn join_group(&self, name: &str) {
        self.handle
            .send_out(AgentRequest::new(RequestKind::JoinGroup, name.as_bytes().to_vec()));
    }

    /// `leave_group(name)`.
    pub fn leave_group(&self, name: &str) {
        self.handle
            .send_out(AgentRequest::new(RequestKind::LeaveGroup, name.as_bytes().to_vec()));
    }

    /// `listen_dock(name)`.
    pub fn listen_dock(&self, name: &str) {
        self.handle
            .send_out(AgentRequest::new(RequestKind::ListenDock, name.as_bytes().to_vec()));
    }

    /// `unlisten_dock(name)`.
    pub fn unlisten_dock(&self, name: &str) {
        self.handle
            .send_out(AgentRequest::new(RequestKind::UnlistenDock, name.as_bytes().to_vec()));
    }
}
