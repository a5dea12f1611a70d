// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] magi_wire::WireError),

    #[error("could not resolve daemon address '{0}'")]
    Resolve(String),

    #[error("transport already closed")]
    Closed,
}
