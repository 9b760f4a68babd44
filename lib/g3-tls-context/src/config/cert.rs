/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::private_key::PrivateKeyProviderConfig;

/// A stapled OCSP response together with its `nextUpdate` time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspStaple {
    response: Vec<u8>,
    next_update: DateTime<Utc>,
}

impl OcspStaple {
    pub fn new(response: Vec<u8>, next_update: DateTime<Utc>) -> anyhow::Result<Self> {
        if response.is_empty() {
            return Err(anyhow!("empty ocsp response"));
        }
        Ok(OcspStaple {
            response,
            next_update,
        })
    }

    #[inline]
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    #[inline]
    pub fn next_update(&self) -> DateTime<Utc> {
        self.next_update
    }
}

/// One certificate chain and the way to sign with its key.
///
/// The key is either local DER material or delegated to a named private key
/// provider. Both may be set only when the provider config allows falling back
/// to the local key.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct TlsCertificateConfig {
    certs: Vec<CertificateDer<'static>>,
    key: Option<PrivateKeyDer<'static>>,
    key_provider: Option<PrivateKeyProviderConfig>,
    ocsp_staple: Option<OcspStaple>,
}

impl Clone for TlsCertificateConfig {
    fn clone(&self) -> Self {
        TlsCertificateConfig {
            certs: self.certs.clone(),
            key: self.key.as_ref().map(|k| k.clone_key()),
            key_provider: self.key_provider.clone(),
            ocsp_staple: self.ocsp_staple.clone(),
        }
    }
}

impl TlsCertificateConfig {
    pub fn check(&self) -> anyhow::Result<()> {
        if self.certs.is_empty() {
            return Err(anyhow!("no certificate set"));
        }
        match (&self.key, &self.key_provider) {
            (None, None) => Err(anyhow!("no private key or private key provider set")),
            (Some(_), Some(p)) if !p.fallback() => Err(anyhow!(
                "private key and private key provider {} can not be set at the same time without fallback",
                p.name()
            )),
            _ => Ok(()),
        }
    }

    pub fn set_certificates(&mut self, certs: Vec<CertificateDer<'static>>) {
        self.certs = certs;
    }

    pub fn set_private_key(&mut self, key: PrivateKeyDer<'static>) {
        self.key = Some(key);
    }

    pub fn set_private_key_provider(&mut self, provider: PrivateKeyProviderConfig) {
        self.key_provider = Some(provider);
    }

    pub fn set_ocsp_staple(&mut self, staple: OcspStaple) {
        self.ocsp_staple = Some(staple);
    }

    #[inline]
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certs
    }

    pub fn private_key(&self) -> Option<&PrivateKeyDer<'static>> {
        self.key.as_ref()
    }

    pub fn private_key_provider(&self) -> Option<&PrivateKeyProviderConfig> {
        self.key_provider.as_ref()
    }

    pub fn ocsp_staple(&self) -> Option<&OcspStaple> {
        self.ocsp_staple.as_ref()
    }
}
