/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use foldhash::fast::FixedState;
use log::debug;

use crate::config::{ClientContextConfig, ServerContextConfig};
use crate::private_key::PrivateKeyMethodManager;
use crate::{
    CertificateDetails, ConfigurationError, ContextHandle, ContextId, RustlsContextFactory,
    StatsScope, TimeSource, TlsContext, TlsContextFactory,
};

/// Hook run on every freshly built server context before it is registered.
pub type ContextAdditionalInit<'a> = &'a dyn Fn(&mut TlsContext) -> anyhow::Result<()>;

/// Admin view of one registered context.
#[derive(Clone, Debug)]
pub struct ContextDetails {
    pub id: ContextId,
    pub kind: &'static str,
    pub stats_scope: String,
    pub server_names: Vec<String>,
    pub ca_certs: Vec<CertificateDetails>,
    pub cert_chains: Vec<CertificateDetails>,
}

/// The set of live TLS contexts of a process.
///
/// Contexts may be created on any thread and retired on any thread. Creation
/// and retirement are rare, so one lock guards the whole set: writers for
/// membership changes, readers for enumeration and the expiry queries. Context
/// construction runs before the lock is taken, and the lock is never held while
/// a context is being dropped.
///
/// The registry co-owns every context it returns. A context is freed once it
/// has been removed here and every caller has dropped its handle.
pub struct TlsContextRegistry {
    time_source: Arc<dyn TimeSource>,
    factory: Arc<dyn TlsContextFactory>,
    private_key_methods: Arc<PrivateKeyMethodManager>,
    contexts: RwLock<HashMap<ContextId, ContextHandle, FixedState>>,
}

impl TlsContextRegistry {
    pub fn new(
        time_source: Arc<dyn TimeSource>,
        factory: Arc<dyn TlsContextFactory>,
        private_key_methods: Arc<PrivateKeyMethodManager>,
    ) -> Self {
        TlsContextRegistry {
            time_source,
            factory,
            private_key_methods,
            contexts: RwLock::new(HashMap::with_hasher(FixedState::with_seed(0))),
        }
    }

    pub fn with_rustls(
        time_source: Arc<dyn TimeSource>,
        private_key_methods: Arc<PrivateKeyMethodManager>,
    ) -> Self {
        TlsContextRegistry::new(
            time_source,
            Arc::new(RustlsContextFactory::default()),
            private_key_methods,
        )
    }

    #[inline]
    pub fn private_key_method_manager(&self) -> &PrivateKeyMethodManager {
        &self.private_key_methods
    }

    #[inline]
    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.time_source
    }

    pub fn create_client_context(
        &self,
        scope: &StatsScope,
        config: &ClientContextConfig,
    ) -> Result<ContextHandle, ConfigurationError> {
        let context = self
            .factory
            .build_client_context(scope, config, &self.private_key_methods)?;
        let context = Arc::new(context);

        let mut ht = self.contexts.write().unwrap();
        ht.insert(context.id(), Arc::clone(&context));
        drop(ht);

        debug!("added tls client context {} in scope {scope}", context.id());
        Ok(context)
    }

    /// Build one server context per server name, or a single default context
    /// if `server_names` is empty. Either all of them get registered or none.
    pub fn create_server_context(
        &self,
        scope: &StatsScope,
        config: &ServerContextConfig,
        server_names: &[String],
        additional_init: Option<ContextAdditionalInit<'_>>,
    ) -> Result<Vec<ContextHandle>, ConfigurationError> {
        let buckets: Vec<&[String]> = if server_names.is_empty() {
            vec![server_names]
        } else {
            let mut seen = HashSet::with_capacity(server_names.len());
            for name in server_names {
                if !seen.insert(name.to_ascii_lowercase()) {
                    return Err(anyhow!("duplicate server name {name}").into());
                }
            }
            server_names.iter().map(std::slice::from_ref).collect()
        };

        let mut built = Vec::with_capacity(buckets.len());
        for names in buckets {
            let mut context =
                self.factory
                    .build_server_context(scope, config, names, &self.private_key_methods)?;
            if let Some(init) = additional_init {
                init(&mut context).map_err(|source| ConfigurationError::AdditionalInitFailed {
                    server_name: names.first().cloned().unwrap_or_default(),
                    source,
                })?;
            }
            built.push(Arc::new(context));
        }

        let mut ht = self.contexts.write().unwrap();
        for context in &built {
            ht.insert(context.id(), Arc::clone(context));
        }
        drop(ht);

        for context in &built {
            debug!(
                "added tls server context {} for server names {:?} in scope {scope}",
                context.id(),
                context.server_names()
            );
        }
        Ok(built)
    }

    /// Drop the registry's reference to `context`.
    ///
    /// Returns false if it was not registered, which is not an error: owners on
    /// other threads may retire the same context concurrently.
    pub fn remove_context(&self, context: &ContextHandle) -> bool {
        let mut ht = self.contexts.write().unwrap();
        let old = ht.remove(&context.id());
        drop(ht);

        // the registry's Arc, if any, is released here outside the lock
        match old {
            Some(_old) => {
                debug!("removed tls context {}", context.id());
                true
            }
            None => false,
        }
    }

    /// Drop the registry's references to all of `contexts` under one lock
    /// acquisition, so readers see either the whole group or none of it.
    ///
    /// Returns how many of them were still registered.
    pub fn remove_contexts(&self, contexts: &[ContextHandle]) -> usize {
        let mut ht = self.contexts.write().unwrap();
        let old: Vec<ContextHandle> = contexts
            .iter()
            .filter_map(|c| ht.remove(&c.id()))
            .collect();
        drop(ht);

        for context in &old {
            debug!("removed tls context {}", context.id());
        }
        old.len()
    }

    pub fn contains(&self, context: &ContextHandle) -> bool {
        let ht = self.contexts.read().unwrap();
        ht.get(&context.id())
            .map(|c| Arc::ptr_eq(c, context))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        let ht = self.contexts.read().unwrap();
        ht.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every registered context with the registry read locked.
    ///
    /// `f` must not call back into the registry to create or remove contexts,
    /// that would deadlock.
    pub fn foreach<F>(&self, mut f: F)
    where
        F: FnMut(&TlsContext),
    {
        let ht = self.contexts.read().unwrap();
        for context in ht.values() {
            f(context)
        }
    }

    /// Handles of all registered contexts ordered by id, for iteration outside
    /// the lock.
    pub fn snapshot(&self) -> Vec<ContextHandle> {
        let ht = self.contexts.read().unwrap();
        let mut all: Vec<ContextHandle> = ht.values().map(Arc::clone).collect();
        drop(ht);
        all.sort_by_key(|c| c.id());
        all
    }

    /// Fewest whole days until any certificate of any context expires.
    ///
    /// `None` if no registered context holds a certificate.
    pub fn days_until_first_cert_expires(&self) -> Option<u32> {
        let now = self.time_source.now();
        let ht = self.contexts.read().unwrap();
        ht.values()
            .filter_map(|c| c.days_until_first_cert_expires(now))
            .min()
    }

    /// Fewest seconds until any stapled OCSP response expires.
    ///
    /// Contexts without an OCSP response do not count.
    pub fn seconds_until_first_ocsp_response_expires(&self) -> Option<u64> {
        let now = self.time_source.now();
        let ht = self.contexts.read().unwrap();
        ht.values()
            .filter_map(|c| c.seconds_until_first_ocsp_response_expires(now))
            .min()
    }

    pub fn context_details(&self) -> Vec<ContextDetails> {
        let now = self.time_source.now();
        self.snapshot()
            .into_iter()
            .map(|c| ContextDetails {
                id: c.id(),
                kind: c.kind().as_str(),
                stats_scope: c.stats_scope().to_string(),
                server_names: c.server_names().to_vec(),
                ca_certs: c.ca_cert_details(now),
                cert_chains: c.cert_chain_details(now),
            })
            .collect()
    }
}
