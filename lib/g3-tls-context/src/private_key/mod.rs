/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Delegation of private key operations to external providers.
//!
//! A certificate config may name a provider instead of embedding the raw key.
//! Factories are registered by name in a [`PrivateKeyMethodManager`] at startup,
//! and looked up during context construction.

use std::any::Any;
use std::sync::Arc;

use rustls::sign::SigningKey;
use rustls_pki_types::CertificateDer;

mod config;
pub use config::PrivateKeyProviderConfig;

mod manager;
pub use manager::PrivateKeyMethodManager;

/// Performs private key operations on behalf of one certificate config.
pub trait PrivateKeyMethodProvider: Send + Sync {
    /// Whether the provider can serve requests right now, e.g. its backend is
    /// reachable or its hardware is present.
    fn is_available(&self) -> bool;

    /// The signing key to pair with `certs` in the TLS driver.
    fn signing_key(
        &self,
        certs: &[CertificateDer<'static>],
    ) -> anyhow::Result<Arc<dyn SigningKey>>;

    fn as_any(&self) -> &dyn Any;
}

pub type ArcPrivateKeyMethodProvider = Arc<dyn PrivateKeyMethodProvider>;

pub trait PrivateKeyMethodProviderFactory: Send + Sync {
    fn name(&self) -> &str;

    fn create_provider(
        &self,
        config: &PrivateKeyProviderConfig,
    ) -> anyhow::Result<ArcPrivateKeyMethodProvider>;
}

pub type ArcPrivateKeyMethodProviderFactory = Arc<dyn PrivateKeyMethodProviderFactory>;
