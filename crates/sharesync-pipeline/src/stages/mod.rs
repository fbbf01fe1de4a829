// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concrete pipeline stages.

pub mod encrypt;
pub mod fetch;
pub mod share;
pub mod upload;

pub use encrypt::EncryptStage;
pub use fetch::FetchStage;
pub use share::ShareStage;
pub use upload::UploadStage;
