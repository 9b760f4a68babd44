/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Registry and lifecycle management for TLS contexts.
//!
//! Contexts are built once from a typed client or server config, shared through
//! [`ContextHandle`]s, and tracked by a [`TlsContextRegistry`] until retired.
//! Connection handling never touches the registry lock; it works on a handle
//! that was obtained earlier.

mod error;
pub use error::ConfigurationError;

mod time;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};

mod stats;
pub use stats::StatsScope;

pub mod config;
pub mod private_key;

mod context;
pub use context::{
    CertificateDetails, CertificateInfo, ContextHandle, ContextId, TlsContext, TlsContextKind,
};

mod factory;
pub use factory::{RustlsContextFactory, TlsContextFactory};

mod registry;
pub use registry::{ContextAdditionalInit, ContextDetails, TlsContextRegistry};
