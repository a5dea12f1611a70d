// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The agent-side runtime library backing the `magi-agentd` binary. Exposed
//! as a library (rather than folded directly into `main.rs`) so the root
//! `tests/` suite can drive `Agent` end to end against an in-process mock
//! daemon, the same way `sven-p2p` splits its relay/client binaries from a
//! library the crate's own integration tests exercise.

pub mod agent;
pub mod error;
pub mod logging;
