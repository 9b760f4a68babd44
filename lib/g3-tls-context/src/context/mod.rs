/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rustls::{ClientConfig, ClientConnection, ServerConfig, ServerConnection};
use rustls_pki_types::ServerName;

use crate::StatsScope;
use crate::private_key::ArcPrivateKeyMethodProvider;

mod cert;
pub use cert::{CertificateDetails, CertificateInfo};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process unique identity of a context.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
pub enum TlsContextKind {
    Client {
        driver: Arc<ClientConfig>,
        server_name: Option<ServerName<'static>>,
        handshake_timeout: Duration,
    },
    Server {
        driver: Arc<ServerConfig>,
        accept_timeout: Duration,
    },
}

impl TlsContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsContextKind::Client { .. } => "client",
            TlsContextKind::Server { .. } => "server",
        }
    }
}

/// Shared handle to a registered context.
pub type ContextHandle = Arc<TlsContext>;

/// Loaded certificate material and negotiation parameters for one TLS role.
///
/// Filled in by a context factory, then frozen behind a [`ContextHandle`].
/// Nothing in here changes once the handle has been created.
pub struct TlsContext {
    id: ContextId,
    kind: TlsContextKind,
    stats_scope: StatsScope,
    server_names: Vec<String>,
    cert_chains: Vec<CertificateInfo>,
    ca_certs: Vec<CertificateInfo>,
    key_providers: Vec<ArcPrivateKeyMethodProvider>,
}

impl TlsContext {
    pub fn new(kind: TlsContextKind, stats_scope: StatsScope) -> Self {
        TlsContext {
            id: ContextId::next(),
            kind,
            stats_scope,
            server_names: Vec::new(),
            cert_chains: Vec::new(),
            ca_certs: Vec::new(),
            key_providers: Vec::new(),
        }
    }

    pub fn set_server_names(&mut self, names: Vec<String>) {
        self.server_names = names;
    }

    /// Record the leaf certificate of a configured chain.
    pub fn push_cert_chain(&mut self, info: CertificateInfo) {
        self.cert_chains.push(info);
    }

    pub fn push_ca_cert(&mut self, info: CertificateInfo) {
        self.ca_certs.push(info);
    }

    pub fn push_private_key_provider(&mut self, provider: ArcPrivateKeyMethodProvider) {
        self.key_providers.push(provider);
    }

    /// Mutable access to the server driver, used by additional init hooks
    /// before the context is shared.
    pub fn server_driver_mut(&mut self) -> Option<&mut ServerConfig> {
        match &mut self.kind {
            TlsContextKind::Server { driver, .. } => Some(Arc::make_mut(driver)),
            TlsContextKind::Client { .. } => None,
        }
    }

    pub fn client_driver_mut(&mut self) -> Option<&mut ClientConfig> {
        match &mut self.kind {
            TlsContextKind::Client { driver, .. } => Some(Arc::make_mut(driver)),
            TlsContextKind::Server { .. } => None,
        }
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &TlsContextKind {
        &self.kind
    }

    #[inline]
    pub fn is_server(&self) -> bool {
        matches!(self.kind, TlsContextKind::Server { .. })
    }

    #[inline]
    pub fn stats_scope(&self) -> &StatsScope {
        &self.stats_scope
    }

    #[inline]
    pub fn server_names(&self) -> &[String] {
        &self.server_names
    }

    #[inline]
    pub fn cert_chains(&self) -> &[CertificateInfo] {
        &self.cert_chains
    }

    #[inline]
    pub fn ca_certs(&self) -> &[CertificateInfo] {
        &self.ca_certs
    }

    #[inline]
    pub fn private_key_providers(&self) -> &[ArcPrivateKeyMethodProvider] {
        &self.key_providers
    }

    pub fn new_client_connection(
        &self,
        server_name: Option<ServerName<'static>>,
    ) -> anyhow::Result<ClientConnection> {
        let TlsContextKind::Client {
            driver,
            server_name: default_name,
            ..
        } = &self.kind
        else {
            return Err(anyhow!("context {} is not a client context", self.id));
        };
        let Some(name) = server_name.or_else(|| default_name.clone()) else {
            return Err(anyhow!("no server name set for context {}", self.id));
        };
        ClientConnection::new(Arc::clone(driver), name)
            .map_err(|e| anyhow!("failed to create client connection: {e}"))
    }

    pub fn new_server_connection(&self) -> anyhow::Result<ServerConnection> {
        let TlsContextKind::Server { driver, .. } = &self.kind else {
            return Err(anyhow!("context {} is not a server context", self.id));
        };
        ServerConnection::new(Arc::clone(driver))
            .map_err(|e| anyhow!("failed to create server connection: {e}"))
    }

    fn all_certs(&self) -> impl Iterator<Item = &CertificateInfo> {
        self.ca_certs.iter().chain(self.cert_chains.iter())
    }

    /// Minimum days left over the CA certificates and every chain leaf.
    /// `None` if the context holds no certificate at all.
    pub fn days_until_first_cert_expires(&self, now: DateTime<Utc>) -> Option<u32> {
        self.all_certs()
            .map(|c| c.days_until_expiration(now))
            .min()
    }

    pub fn seconds_until_first_ocsp_response_expires(&self, now: DateTime<Utc>) -> Option<u64> {
        self.cert_chains
            .iter()
            .filter_map(|c| c.seconds_until_ocsp_response_expires(now))
            .min()
    }

    pub fn cert_chain_details(&self, now: DateTime<Utc>) -> Vec<CertificateDetails> {
        self.cert_chains.iter().map(|c| c.details(now)).collect()
    }

    pub fn ca_cert_details(&self, now: DateTime<Utc>) -> Vec<CertificateDetails> {
        self.ca_certs.iter().map(|c| c.details(now)).collect()
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("id", &self.id)
            .field("kind", &self.kind.as_str())
            .field("stats_scope", &self.stats_scope)
            .field("server_names", &self.server_names)
            .field("cert_chains", &self.cert_chains)
            .field("ca_certs", &self.ca_certs)
            .field("key_providers", &self.key_providers.len())
            .finish()
    }
}
