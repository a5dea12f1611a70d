// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Agent loop (C6): lifecycle controller.
//!
//! ```text
//!         NEW
//!          │ initialize
//!          ▼
//!      CONNECTED  ── emits trigger(event=AgentLoadDone, agent=NAME, nodes=HOST) to "control"
//!          │
//!          │ ◀── on inbound MESSAGE: dispatch (C5)
//!          │         if trigger-name present or dispatch returns DICTIONARY: emit trigger
//!          │
//!          │ stop() invoked (via dispatch of the "stop" entry) → stop_flag=1
//!          ▼
//!      DRAINING   ── unlisten_dock(DOCK); trigger(event=AgentUnloadDone, …)
//!          │ close_transport
//!          ▼
//!        TERMINAL
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use magi_config::AgentConfig;
use magi_registry::{FunctionRegistry, ReturnKind, ReturnValue};
use magi_transport::{Messenger, Transport};
use magi_wire::{parse_payload, render_dict, AgentRequest, ContentType, MagiMessage, RequestKind};

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    New,
    Connected,
    Draining,
    Terminal,
}

pub struct Agent {
    config: AgentConfig,
    registry: FunctionRegistry,
    transport: Transport,
    messenger: Messenger,
    stop_flag: Arc<AtomicBool>,
    state: AgentState,
}

impl Agent {
    /// `initialize_agent`: registers the built-in `stop` entry, dials the
    /// transport, sends `LISTEN_DOCK`/`JOIN_GROUP`, and announces
    /// `AgentLoadDone` to group `control`.
    pub async fn initialize(
        config: AgentConfig,
        mut registry: FunctionRegistry,
    ) -> Result<Self, AgentError> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();
        registry
            .register("stop", ReturnKind::Void, vec![], move |_args| {
                flag.store(true, Ordering::SeqCst);
                ReturnValue::Void
            })
            .expect("the built-in stop entry takes 0 arguments, well within the arity cap");

        tracing::info!(host = %config.comm_host, port = config.comm_port, "agent: connecting to daemon");
        let transport = Transport::connect(&config.comm_host, config.comm_port).await?;
        let messenger = Messenger::new(transport.handle());

        tracing::info!(dock = %config.dock_name, "agent: sending listen dock request");
        messenger.listen_dock(&config.dock_name);
        if let Some(group) = &config.comm_group {
            tracing::info!(group, "agent: sending join group request");
            messenger.join_group(group);
        }

        let mut agent = Agent {
            config,
            registry,
            transport,
            messenger,
            stop_flag,
            state: AgentState::New,
        };
        agent.send_lifecycle_trigger("AgentLoadDone")?;
        agent.state = AgentState::Connected;
        Ok(agent)
    }

    /// `sendAgentLoadDoneTrigger`/`sendAgentUnloadDoneTrigger`: the exact
    /// payload shape `{nodes: HOST, event: E, agent: AGENT}` addressed to
    /// group `control` (spec §6).
    fn send_lifecycle_trigger(&self, event: &str) -> Result<(), AgentError> {
        let payload = format!(
            "{{nodes: {}, event: {event}, agent: {}}}",
            self.config.host_name, self.config.agent_name
        );
        self.messenger
            .trigger(Some("control"), None, ContentType::Yaml, payload.into_bytes())
            .map_err(AgentError::Transport)
    }

    /// `run_agent`: the CONNECTED receive loop, then the DRAINING teardown
    /// sequence, ending TERMINAL.
    pub async fn run(mut self) -> Result<(), AgentError> {
        while !self.stop_flag.load(Ordering::SeqCst) {
            match self.transport.next().await {
                Some(req) => self.handle_inbound(req),
                None => {
                    tracing::warn!("agent: transport closed unexpectedly, exiting receive loop");
                    break;
                }
            }
        }

        self.state = AgentState::Draining;
        tracing::info!("agent: draining, unlistening dock and announcing shutdown");
        self.messenger.unlisten_dock(&self.config.dock_name);
        self.send_lifecycle_trigger("AgentUnloadDone")?;

        // `messenger` holds its own clone of the transport's tx_queue
        // sender; `close()` only drops the transport's own clone, so the
        // sender task's `tx_rx.recv()` would otherwise never see the
        // channel close. Drop it before draining.
        drop(self.messenger);
        self.transport.close().await;
        self.state = AgentState::Terminal;
        tracing::info!("agent: terminal");
        Ok(())
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// On each inbound request: decode + dispatch + optional trigger reply
    /// (spec §4.6). A decode failure, an unsupported content type, or a
    /// missing `method` drops the message and logs — it never stops the
    /// agent (spec §7).
    fn handle_inbound(&mut self, req: AgentRequest) {
        if req.kind != RequestKind::Message {
            tracing::debug!(?req.kind, "agent: ignoring non-MESSAGE inbound request");
            return;
        }

        let msg = match MagiMessage::decode(&req.payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "agent: failed to decode inbound MAGIMessage, dropping");
                return;
            }
        };
        if msg.content_type != ContentType::Yaml {
            tracing::error!("agent: content type not supported, dropping message");
            return;
        }

        let text = String::from_utf8_lossy(&msg.data);
        let parsed = parse_payload(&text);
        let Some(method) = parsed.method.clone() else {
            tracing::error!("agent: inbound message has no method, dropping");
            return;
        };

        let result = self.registry.dispatch(&method, &parsed.args);

        // Invariant: no trigger for a message that both omits `trigger` and
        // whose dispatched return kind is not DICTIONARY (spec §8 #7).
        if parsed.trigger.is_none() && result.kind() != ReturnKind::Dictionary {
            return;
        }
        let event = parsed.trigger.as_deref().unwrap_or(&method);
        let payload = Self::render_trigger_payload(event, &result, &self.config.host_name);
        if let Err(e) = self
            .messenger
            .trigger(Some("control"), None, ContentType::Yaml, payload.into_bytes())
        {
            tracing::error!(error = %e, "agent: failed to send trigger");
        }
    }

    /// Spec §4.6 "Trigger formatting": a `DICTIONARY` return renders its
    /// key/value pairs inline; any other return renders `retVal`.
    fn render_trigger_payload(event: &str, result: &ReturnValue, host: &str) -> String {
        match result {
            ReturnValue::Dict(pairs) => {
                format!("{{event: {event}, {}, nodes: {host}}}", render_dict(pairs))
            }
            other => format!("{{event: {event}, retVal: {}, nodes: {host}}}", other.render()),
        }
    }
}
