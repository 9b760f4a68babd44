/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::config::{ClientContextConfig, ServerContextConfig};
use crate::private_key::PrivateKeyMethodManager;
use crate::{ConfigurationError, StatsScope, TlsContext};

mod resolver;

mod driver;
pub use driver::RustlsContextFactory;

/// Builds fully validated contexts from typed configs.
///
/// Called by the registry before it takes its lock, so implementations may be
/// slow but must not touch the registry.
pub trait TlsContextFactory: Send + Sync {
    fn build_client_context(
        &self,
        scope: &StatsScope,
        config: &ClientContextConfig,
        private_key_methods: &PrivateKeyMethodManager,
    ) -> Result<TlsContext, ConfigurationError>;

    /// Build one server context answering for `server_names`, which is empty
    /// for the default context.
    fn build_server_context(
        &self,
        scope: &StatsScope,
        config: &ServerContextConfig,
        server_names: &[String],
        private_key_methods: &PrivateKeyMethodManager,
    ) -> Result<TlsContext, ConfigurationError>;
}
