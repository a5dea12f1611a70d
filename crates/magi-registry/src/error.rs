// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function '{0}' declares {1} arguments, exceeding the hard cap of 10")]
    TooManyArgs(String, usize),
}
