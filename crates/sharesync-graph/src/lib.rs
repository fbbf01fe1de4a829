// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Share relationship graph for sharesync.
//!
//! Records who shared which asset with whom as triples in a
//! [`TripleStore`](sharesync_core::TripleStore), fronted by a [`ShareCache`]
//! of per-user sender and recipient sets.

pub mod cache;
pub mod graph;

pub use cache::ShareCache;
pub use graph::{ConnectedUser, ShareGraph};
