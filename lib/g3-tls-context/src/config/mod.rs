/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod version;
pub use version::TlsVersion;

mod cert;
pub use cert::{OcspStaple, TlsCertificateConfig};

mod client;
pub use client::ClientContextConfig;

mod server;
pub use server::ServerContextConfig;

pub mod yaml;
