// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for sharesync integration tests.
//!
//! Provides in-memory collaborators and a harness wired over a temporary
//! SQLite database, so engine tests run without a remote or a photo library.
//!
//! # Components
//!
//! - [`MockRemoteServer`] - Remote authority with injectable descriptors and failures
//! - [`MockLocalServer`] - Local asset and descriptor cache
//! - [`MockPhotoLibrary`] - Photo library keyed by local identifier
//! - [`MockCrypto`] - Reversible stand-in for the crypto primitives
//! - [`RecordingDelegate`] - Captures every delegate callback as a string event
//! - [`TestHarness`] - Full engine over the mocks and temp SQLite stores

pub mod fixtures;
pub mod harness;
pub mod mock_crypto;
pub mod mock_library;
pub mod mock_local;
pub mod mock_remote;
pub mod recorder;

pub use fixtures::{group_info, DescriptorBuilder};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_crypto::MockCrypto;
pub use mock_library::MockPhotoLibrary;
pub use mock_local::MockLocalServer;
pub use mock_remote::MockRemoteServer;
pub use recorder::RecordingDelegate;
