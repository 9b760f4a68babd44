/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::{Context, anyhow};
use rustls_pki_types::CertificateDer;

use super::{TlsCertificateConfig, TlsVersion};

const MINIMAL_ACCEPT_TIMEOUT: Duration = Duration::from_millis(100);
const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Config for contexts used to terminate TLS connections.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerContextConfig {
    cert_pairs: Vec<TlsCertificateConfig>,
    client_auth: bool,
    client_auth_certs: Vec<CertificateDer<'static>>,
    protocols: Vec<TlsVersion>,
    alpn_protocols: Vec<String>,
    accept_timeout: Duration,
}

impl ServerContextConfig {
    pub fn empty() -> Self {
        ServerContextConfig {
            cert_pairs: Vec::with_capacity(1),
            client_auth: false,
            client_auth_certs: Vec::new(),
            protocols: Vec::new(),
            alpn_protocols: Vec::new(),
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        }
    }

    pub fn check(&mut self) -> anyhow::Result<()> {
        if self.cert_pairs.is_empty() {
            return Err(anyhow!("no cert pair is set"));
        }

        if self.client_auth && self.client_auth_certs.is_empty() {
            return Err(anyhow!(
                "client auth enabled but no client auth certificate set"
            ));
        }

        for v in &self.protocols {
            v.to_rustls()?;
        }

        if self.accept_timeout < MINIMAL_ACCEPT_TIMEOUT {
            self.accept_timeout = MINIMAL_ACCEPT_TIMEOUT;
        }

        Ok(())
    }

    pub fn push_cert_pair(&mut self, cert_pair: TlsCertificateConfig) -> anyhow::Result<()> {
        cert_pair
            .check()
            .context(format!("invalid cert pair #{}", self.cert_pairs.len()))?;
        self.cert_pairs.push(cert_pair);
        Ok(())
    }

    pub fn enable_client_auth(&mut self) {
        self.client_auth = true;
    }

    pub fn set_client_auth_certificates(&mut self, certs: Vec<CertificateDer<'static>>) {
        self.client_auth_certs = certs;
    }

    pub fn set_protocols(&mut self, protocols: Vec<TlsVersion>) {
        self.protocols = protocols;
    }

    pub fn set_alpn_protocols(&mut self, protocols: Vec<String>) {
        self.alpn_protocols = protocols;
    }

    pub fn set_accept_timeout(&mut self, timeout: Duration) {
        self.accept_timeout = timeout;
    }

    #[inline]
    pub fn cert_pairs(&self) -> &[TlsCertificateConfig] {
        &self.cert_pairs
    }

    #[inline]
    pub fn client_auth(&self) -> bool {
        self.client_auth
    }

    #[inline]
    pub fn client_auth_certificates(&self) -> &[CertificateDer<'static>] {
        &self.client_auth_certs
    }

    #[inline]
    pub fn protocols(&self) -> &[TlsVersion] {
        &self.protocols
    }

    #[inline]
    pub fn alpn_protocols(&self) -> &[String] {
        &self.alpn_protocols
    }

    #[inline]
    pub fn accept_timeout(&self) -> Duration {
        self.accept_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls_pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

    fn dummy_pair() -> TlsCertificateConfig {
        let mut pair = TlsCertificateConfig::default();
        pair.set_certificates(vec![CertificateDer::from(vec![0x30, 0x00])]);
        pair.set_private_key(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(vec![
            0x30, 0x00,
        ])));
        pair
    }

    #[test]
    fn no_cert_pair() {
        let mut config = ServerContextConfig::empty();
        assert!(config.check().is_err());
        config.push_cert_pair(dummy_pair()).unwrap();
        assert!(config.check().is_ok());
    }

    #[test]
    fn invalid_cert_pair() {
        let mut config = ServerContextConfig::empty();
        assert!(
            config
                .push_cert_pair(TlsCertificateConfig::default())
                .is_err()
        );
        assert!(config.cert_pairs().is_empty());
    }

    #[test]
    fn client_auth() {
        let mut config = ServerContextConfig::empty();
        config.push_cert_pair(dummy_pair()).unwrap();
        config.enable_client_auth();
        assert!(config.check().is_err());
        config.set_client_auth_certificates(vec![CertificateDer::from(vec![0x30, 0x00])]);
        assert!(config.check().is_ok());
    }
}
