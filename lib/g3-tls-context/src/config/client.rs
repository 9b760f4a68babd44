/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::{Context, anyhow};
use rustls_pki_types::CertificateDer;

use super::{TlsCertificateConfig, TlsVersion};

const MINIMAL_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(100);
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Config for contexts used to originate TLS connections.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientContextConfig {
    cert_pair: Option<TlsCertificateConfig>,
    ca_certs: Vec<CertificateDer<'static>>,
    no_default_ca_certs: bool,
    server_name: Option<String>,
    disable_sni: bool,
    protocols: Vec<TlsVersion>,
    alpn_protocols: Vec<String>,
    handshake_timeout: Duration,
}

impl Default for ClientContextConfig {
    fn default() -> Self {
        ClientContextConfig {
            cert_pair: None,
            ca_certs: Vec::new(),
            no_default_ca_certs: false,
            server_name: None,
            disable_sni: false,
            protocols: Vec::new(),
            alpn_protocols: Vec::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl ClientContextConfig {
    pub fn check(&mut self) -> anyhow::Result<()> {
        if let Some(cert_pair) = &self.cert_pair {
            cert_pair.check().context("invalid client certificate")?;
        }

        if self.no_default_ca_certs && self.ca_certs.is_empty() {
            return Err(anyhow!(
                "default ca certificates disabled but no ca certificate set"
            ));
        }

        for v in &self.protocols {
            v.to_rustls()?;
        }

        if self.handshake_timeout < MINIMAL_HANDSHAKE_TIMEOUT {
            self.handshake_timeout = MINIMAL_HANDSHAKE_TIMEOUT;
        }

        Ok(())
    }

    pub fn set_cert_pair(&mut self, pair: TlsCertificateConfig) -> Option<TlsCertificateConfig> {
        self.cert_pair.replace(pair)
    }

    pub fn set_ca_certificates(&mut self, certs: Vec<CertificateDer<'static>>) {
        self.ca_certs = certs;
    }

    pub fn set_no_default_ca_certificates(&mut self) {
        self.no_default_ca_certs = true;
    }

    pub fn set_server_name(&mut self, name: String) {
        self.server_name = Some(name);
    }

    pub fn set_disable_sni(&mut self) {
        self.disable_sni = true;
    }

    pub fn set_protocols(&mut self, protocols: Vec<TlsVersion>) {
        self.protocols = protocols;
    }

    pub fn set_alpn_protocols(&mut self, protocols: Vec<String>) {
        self.alpn_protocols = protocols;
    }

    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = timeout;
    }

    pub fn cert_pair(&self) -> Option<&TlsCertificateConfig> {
        self.cert_pair.as_ref()
    }

    #[inline]
    pub fn ca_certificates(&self) -> &[CertificateDer<'static>] {
        &self.ca_certs
    }

    #[inline]
    pub fn no_default_ca_certificates(&self) -> bool {
        self.no_default_ca_certs
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    #[inline]
    pub fn sni_disabled(&self) -> bool {
        self.disable_sni
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
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }
}
