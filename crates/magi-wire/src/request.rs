// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! *AgentRequest* — the outer envelope exchanged with the daemon.
//!
//! Wire layout (big-endian throughout), immediately after the 8-byte
//! preamble:
//!
//! ```text
//! total_len[4]  = header_len + 2 + |payload|
//! header_len[2] = 1 (kind byte) + options_bytes
//! kind[1]
//! options[]     each: code[1], length[1], value[length]
//! payload[...]  length = total_len - header_len - 2
//! ```

use crate::error::WireError;

/// The 8-byte marker that begins every `AgentRequest` on the wire.
pub const PREAMBLE: [u8; 8] = *b"MAGI\x88MSG";

/// `AgentRequest.kind` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    JoinGroup,
    LeaveGroup,
    ListenDock,
    UnlistenDock,
    Message,
}

impl RequestKind {
    fn to_byte(self) -> u8 {
        match self {
            RequestKind::JoinGroup => 1,
            RequestKind::LeaveGroup => 2,
            RequestKind::ListenDock => 3,
            RequestKind::UnlistenDock => 4,
            RequestKind::Message => 5,
        }
    }

    fn from_byte(b: u8) -> Result<Self, WireError> {
        match b {
            1 => Ok(RequestKind::JoinGroup),
            2 => Ok(RequestKind::LeaveGroup),
            3 => Ok(RequestKind::ListenDock),
            4 => Ok(RequestKind::UnlistenDock),
            5 => Ok(RequestKind::Message),
            other => Err(WireError::UnknownRequestKind(other)),
        }
    }
}

/// Option codes recognized by `add_option` (spec §4.1). Only `TimeStamp`
/// carries a value; the others are flags emitted with `length = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOptionCode {
    Ack,
    SourceOrdering,
    TimeStamp,
}

impl RequestOptionCode {
    fn to_byte(self) -> u8 {
        match self {
            RequestOptionCode::Ack => 1,
            RequestOptionCode::SourceOrdering => 2,
            RequestOptionCode::TimeStamp => 3,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(RequestOptionCode::Ack),
            2 => Some(RequestOptionCode::SourceOrdering),
            3 => Some(RequestOptionCode::TimeStamp),
            _ => None,
        }
    }

    /// Parse a CLI/messenger-supplied option name, as `add_options` does in
    /// the original (`AgentRequest.c`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ACK" => Some(RequestOptionCode::Ack),
            "SOURCE_ORDERING" => Some(RequestOptionCode::SourceOrdering),
            "TIME_STAMP" => Some(RequestOptionCode::TimeStamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestOption {
    pub code: RequestOptionCode,
    /// Only populated (and only ever 4 bytes) for `TimeStamp`.
    pub value: Vec<u8>,
}

impl RequestOption {
    fn encoded_len(&self) -> usize {
        2 + self.value.len()
    }
}

/// The outer envelope exchanged with the daemon.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub kind: RequestKind,
    pub options: Vec<RequestOption>,
    pub payload: Vec<u8>,
}

impl AgentRequest {
    pub fn new(kind: RequestKind, payload: Vec<u8>) -> Self {
        Self {
            kind,
            options: Vec::new(),
            payload,
        }
    }

    /// `add_option(key, value)` (spec §4.1): the value is truncated to 4
    /// bytes if longer, with a warning logged; unrecognized keys are
    /// rejected silently (mirrors `add_options` in the original, which only
    /// logs).
    pub fn add_option(&mut self, key: &str, value: &[u8]) {
        let Some(code) = RequestOptionCode::from_name(key) else {
            tracing::info!(key, "invalid agent request option");
            return;
        };
        let value = match code {
            RequestOptionCode::TimeStamp => {
                if value.len() > 4 {
                    tracing::warn!(
                        len = value.len(),
                        "option value cannot be greater than 4 bytes, truncated"
                    );
                }
                let mut v = value.to_vec();
                v.truncate(4);
                v
            }
            _ => Vec::new(),
        };
        self.options.push(RequestOption { code, value });
    }

    fn options_bytes(&self) -> usize {
        self.options.iter().map(RequestOption::encoded_len).sum()
    }

    /// Encode into an owned buffer, including the preamble. Returns
    /// `(buffer, length)` per spec §4.1's encoding contract.
    pub fn encode(&self) -> (Vec<u8>, u32) {
        let header_len: u16 = 1 + self.options_bytes() as u16;
        let total_len: u32 = header_len as u32 + 2 + self.payload.len() as u32;

        let mut buf = Vec::with_capacity(8 + 4 + 2 + header_len as usize + self.payload.len());
        buf.extend_from_slice(&PREAMBLE);
        buf.extend_from_slice(&total_len.to_be_bytes());
        buf.extend_from_slice(&header_len.to_be_bytes());
        buf.push(self.kind.to_byte());
        for opt in &self.options {
            buf.push(opt.code.to_byte());
            buf.push(opt.value.len() as u8);
            buf.extend_from_slice(&opt.value);
        }
        buf.extend_from_slice(&self.payload);

        let len = buf.len() as u32;
        (buf, len)
    }

    /// Decode a full frame, `buf` starting at the preamble. Rejects any
    /// buffer whose first 8 bytes do not match the preamble with
    /// `InvalidPreamble`, without allocating the output record (invariant
    /// #3, spec §8).
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < 8 {
            return Err(WireError::TooShort {
                need: 8,
                got: buf.len(),
            });
        }
        if buf[..8] != PREAMBLE {
            return Err(WireError::InvalidPreamble);
        }
        let rest = &buf[8..];
        if rest.len() < 7 {
            return Err(WireError::TooShort {
                need: 15,
                got: buf.len(),
            });
        }
        let total_len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let header_len = u16::from_be_bytes([rest[4], rest[5]]) as usize;
        let kind = RequestKind::from_byte(rest[6])?;

        if total_len < header_len + 2 {
            return Err(WireError::HeaderLengthMismatch {
                declared: header_len,
                available: total_len,
            });
        }
        let payload_len = total_len - header_len - 2;
        let needed = 7 + (header_len - 1) + payload_len;
        if rest.len() < needed {
            return Err(WireError::TooShort {
                need: 8 + needed,
                got: buf.len(),
            });
        }

        let mut cursor = 7;
        let mut options_remaining = header_len.saturating_sub(1);
        let mut options = Vec::new();
        while options_remaining > 0 {
            if rest.len() < cursor + 2 {
                return Err(WireError::HeaderLengthMismatch {
                    declared: header_len,
                    available: rest.len(),
                });
            }
            let code_byte = rest[cursor];
            let len = rest[cursor + 1] as usize;
            cursor += 2;
            let value = rest[cursor..cursor + len].to_vec();
            cursor += len;
            options_remaining = options_remaining.saturating_sub(2 + len);
            if let Some(code) = RequestOptionCode::from_byte(code_byte) {
                options.push(RequestOption { code, value });
            }
        }

        let payload = rest[cursor..cursor + payload_len].to_vec();

        Ok(AgentRequest {
            kind,
            options,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: RequestKind, payload: &[u8]) -> AgentRequest {
        let mut req = AgentRequest::new(kind, payload.to_vec());
        req.add_option("ACK", &[]);
        req.add_option("TIME_STAMP", &1234u32.to_be_bytes());
        req
    }

    #[test]
    fn roundtrip_message_kind() {
        let req = sample(RequestKind::Message, b"hello world");
        let (buf, len) = req.encode();
        assert_eq!(len as usize, buf.len());
        let decoded = AgentRequest::decode(&buf).unwrap();
        assert_eq!(decoded.kind, RequestKind::Message);
        assert_eq!(decoded.payload, b"hello world");
        assert_eq!(decoded.options.len(), 2);
    }

    #[test]
    fn roundtrip_control_kind_empty_options() {
        let req = AgentRequest::new(RequestKind::ListenDock, b"dockA".to_vec());
        let (buf, _) = req.encode();
        let decoded = AgentRequest::decode(&buf).unwrap();
        assert_eq!(decoded.kind, RequestKind::ListenDock);
        assert_eq!(decoded.payload, b"dockA");
        assert!(decoded.options.is_empty());
    }

    #[test]
    fn invalid_preamble_rejected_without_decode() {
        let mut buf = vec![0u8; 64];
        buf[0] = b'X';
        let err = AgentRequest::decode(&buf).unwrap_err();
        assert!(matches!(err, WireError::InvalidPreamble));
    }

    #[test]
    fn too_short_buffer_rejected() {
        let err = AgentRequest::decode(&PREAMBLE).unwrap_err();
        assert!(matches!(err, WireError::TooShort { .. }));
    }

    #[test]
    fn unrecognized_option_name_is_dropped_not_panicking() {
        let mut req = AgentRequest::new(RequestKind::JoinGroup, b"g".to_vec());
        req.add_option("NOT_A_REAL_OPTION", b"x");
        assert!(req.options.is_empty());
    }

    #[test]
    fn timestamp_value_truncated_to_four_bytes() {
        let mut req = AgentRequest::new(RequestKind::JoinGroup, b"g".to_vec());
        req.add_option("TIME_STAMP", &[1, 2, 3, 4, 5, 6]);
        assert_eq!(req.options[0].value.len(), 4);
    }
}
