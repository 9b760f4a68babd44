/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use rustls::SignatureScheme;
use rustls::client::ResolvesClientCert;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

/// Picks the first key able to sign with one of the offered schemes.
///
/// With server names set, a client hello carrying some other SNI gets no
/// certificate at all. An empty name list is the default bucket and serves
/// every client.
#[derive(Debug, Default)]
pub(super) struct CertifiedKeyResolver {
    keys: Vec<Arc<CertifiedKey>>,
    server_names: Vec<String>,
}

impl CertifiedKeyResolver {
    pub(super) fn with_capacity(cap: usize) -> Self {
        CertifiedKeyResolver {
            keys: Vec::with_capacity(cap),
            server_names: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, key: Arc<CertifiedKey>) {
        self.keys.push(key);
    }

    pub(super) fn set_server_names(&mut self, names: &[String]) {
        self.server_names = names.to_vec();
    }

    fn accepts(&self, sni: Option<&str>) -> bool {
        match sni {
            Some(name) if !self.server_names.is_empty() => self
                .server_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name)),
            _ => true,
        }
    }

    fn select(&self, schemes: &[SignatureScheme]) -> Option<Arc<CertifiedKey>> {
        self.keys
            .iter()
            .find(|ck| ck.key.choose_scheme(schemes).is_some())
            .cloned()
    }
}

impl ResolvesServerCert for CertifiedKeyResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        if !self.accepts(client_hello.server_name()) {
            return None;
        }
        self.select(client_hello.signature_schemes())
    }
}

impl ResolvesClientCert for CertifiedKeyResolver {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        self.select(sigschemes)
    }

    fn has_certs(&self) -> bool {
        !self.keys.is_empty()
    }
}
