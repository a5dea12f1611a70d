// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Errors raised by the wire codec (C1) and the payload grammar (C2).
///
/// Protocol errors here are non-fatal to the caller: per the error taxonomy,
/// the offending message is logged and dropped, the transport continues.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("buffer does not start with the MAGI preamble")]
    InvalidPreamble,

    #[error("buffer too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(u8),

    #[error("unrecognized agent request kind: {0}")]
    UnknownRequestKind(u8),

    #[error("header length inconsistency: declared {declared}, available {available}")]
    HeaderLengthMismatch { declared: usize, available: usize },

    #[error("option/header value length does not fit in a single byte: {0}")]
    ValueTooLong(usize),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}
