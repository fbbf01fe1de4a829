// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the sharesync engine.
//!
//! The remote authority, local cache, photo library and crypto primitives are
//! external to the engine. The queue, triple and blacklist stores ship with
//! SQLite implementations in `sharesync-storage`.

pub mod blacklist;
pub mod crypto;
pub mod library;
pub mod local;
pub mod operation;
pub mod queue_store;
pub mod remote;
pub mod triple_store;

pub use blacklist::DownloadBlacklist;
pub use crypto::AssetCrypto;
pub use library::PhotoLibrary;
pub use local::LocalServer;
pub use operation::BackgroundOperation;
pub use queue_store::QueueStore;
pub use remote::RemoteServer;
pub use triple_store::{Predicate, Triple, TripleOp, TriplePattern, TripleStore};
