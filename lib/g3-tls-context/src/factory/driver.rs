/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::{Context, anyhow};
use log::warn;
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::server::WebPkiClientVerifier;
use rustls::sign::{CertifiedKey, SigningKey};
use rustls::{ClientConfig, RootCertStore, ServerConfig, SupportedProtocolVersion};
use rustls_pki_types::{CertificateDer, ServerName};

use super::TlsContextFactory;
use super::resolver::CertifiedKeyResolver;
use crate::config::{ClientContextConfig, ServerContextConfig, TlsCertificateConfig, TlsVersion};
use crate::private_key::{ArcPrivateKeyMethodProvider, PrivateKeyMethodManager};
use crate::{CertificateInfo, ConfigurationError, StatsScope, TlsContext, TlsContextKind};

fn protocol_versions(
    protocols: &[TlsVersion],
) -> anyhow::Result<Vec<&'static SupportedProtocolVersion>> {
    if protocols.is_empty() {
        return Ok(rustls::DEFAULT_VERSIONS.to_vec());
    }
    let mut versions = Vec::with_capacity(protocols.len());
    for v in protocols {
        versions.push(v.to_rustls()?);
    }
    Ok(versions)
}

fn alpn_protocols(protocols: &[String]) -> Vec<Vec<u8>> {
    protocols.iter().map(|p| p.as_bytes().to_vec()).collect()
}

fn root_store(
    certs: &[CertificateDer<'static>],
    infos: &mut Vec<CertificateInfo>,
) -> anyhow::Result<RootCertStore> {
    let mut store = RootCertStore::empty();
    for (i, cert) in certs.iter().enumerate() {
        store
            .add(cert.clone())
            .map_err(|e| anyhow!("failed to add ca certificate #{i}: {e}"))?;
        let info =
            CertificateInfo::parse(cert).context(format!("invalid ca certificate #{i}"))?;
        infos.push(info);
    }
    Ok(store)
}

/// Context factory backed by rustls drivers.
pub struct RustlsContextFactory {
    crypto_provider: Arc<CryptoProvider>,
}

impl Default for RustlsContextFactory {
    fn default() -> Self {
        RustlsContextFactory::new(Arc::new(rustls::crypto::ring::default_provider()))
    }
}

impl RustlsContextFactory {
    pub fn new(crypto_provider: Arc<CryptoProvider>) -> Self {
        RustlsContextFactory { crypto_provider }
    }

    fn load_signing_key(
        &self,
        pair: &TlsCertificateConfig,
        private_key_methods: &PrivateKeyMethodManager,
        providers: &mut Vec<ArcPrivateKeyMethodProvider>,
    ) -> Result<Arc<dyn SigningKey>, ConfigurationError> {
        if let Some(provider_config) = pair.private_key_provider() {
            let provider = private_key_methods.create_provider(provider_config)?;
            if provider.is_available() {
                let key = provider.signing_key(pair.certificates()).map_err(|e| {
                    ConfigurationError::InvalidConfig(e.context(format!(
                        "failed to get signing key from private key provider {}",
                        provider_config.name()
                    )))
                })?;
                providers.push(provider);
                return Ok(key);
            }
            if !provider_config.fallback() || pair.private_key().is_none() {
                return Err(ConfigurationError::PrivateKeyProviderUnavailable(
                    provider_config.name().to_string(),
                ));
            }
            warn!(
                "private key provider {} is not available, fallback to the local private key",
                provider_config.name()
            );
        }

        let Some(key) = pair.private_key() else {
            return Err(anyhow!("no private key set").into());
        };
        self.crypto_provider
            .key_provider
            .load_private_key(key.clone_key())
            .map_err(|e| anyhow!("failed to load private key: {e}").into())
    }

    fn load_cert_pair(
        &self,
        pair: &TlsCertificateConfig,
        private_key_methods: &PrivateKeyMethodManager,
        providers: &mut Vec<ArcPrivateKeyMethodProvider>,
    ) -> Result<(Arc<CertifiedKey>, CertificateInfo), ConfigurationError> {
        pair.check()?;
        let leaf = &pair.certificates()[0];
        let mut info = CertificateInfo::parse(leaf).context("invalid leaf certificate")?;

        let key = self.load_signing_key(pair, private_key_methods, providers)?;
        let mut certified_key = CertifiedKey::new(pair.certificates().to_vec(), key);
        if let Some(staple) = pair.ocsp_staple() {
            certified_key.ocsp = Some(staple.response().to_vec());
            info.set_ocsp_staple(staple.clone());
        }
        Ok((Arc::new(certified_key), info))
    }
}

impl TlsContextFactory for RustlsContextFactory {
    fn build_client_context(
        &self,
        scope: &StatsScope,
        config: &ClientContextConfig,
        private_key_methods: &PrivateKeyMethodManager,
    ) -> Result<TlsContext, ConfigurationError> {
        let mut config = config.clone();
        config.check().context("invalid client context config")?;

        let versions = protocol_versions(config.protocols())?;
        let builder = ClientConfig::builder_with_provider(Arc::clone(&self.crypto_provider))
            .with_protocol_versions(&versions)
            .map_err(|e| anyhow!("failed to set protocol versions: {e}"))?;

        let mut ca_infos = Vec::new();
        let mut roots = root_store(config.ca_certificates(), &mut ca_infos)?;
        if !config.no_default_ca_certificates() {
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
        let verifier = WebPkiServerVerifier::builder_with_provider(
            Arc::new(roots),
            Arc::clone(&self.crypto_provider),
        )
        .build()
        .map_err(|e| anyhow!("failed to build server cert verifier: {e}"))?;
        let builder = builder.with_webpki_verifier(verifier);

        let mut providers = Vec::new();
        let mut chain_info = None;
        let mut driver = match config.cert_pair() {
            Some(pair) => {
                let (key, info) = self
                    .load_cert_pair(pair, private_key_methods, &mut providers)
                    .map_err(|e| match e {
                        ConfigurationError::InvalidConfig(e) => ConfigurationError::InvalidConfig(
                            e.context("invalid client certificate"),
                        ),
                        e => e,
                    })?;
                chain_info = Some(info);
                let mut resolver = CertifiedKeyResolver::with_capacity(1);
                resolver.push(key);
                builder.with_client_cert_resolver(Arc::new(resolver))
            }
            None => builder.with_no_client_auth(),
        };
        driver.enable_sni = !config.sni_disabled();
        driver.alpn_protocols = alpn_protocols(config.alpn_protocols());

        let server_name = match config.server_name() {
            Some(name) => Some(
                ServerName::try_from(name)
                    .map(|n| n.to_owned())
                    .map_err(|e| anyhow!("invalid server name {name}: {e}"))?,
            ),
            None => None,
        };

        let mut context = TlsContext::new(
            TlsContextKind::Client {
                driver: Arc::new(driver),
                server_name,
                handshake_timeout: config.handshake_timeout(),
            },
            scope.clone(),
        );
        ca_infos
            .into_iter()
            .for_each(|info| context.push_ca_cert(info));
        if let Some(info) = chain_info {
            context.push_cert_chain(info);
        }
        providers
            .into_iter()
            .for_each(|p| context.push_private_key_provider(p));
        Ok(context)
    }

    fn build_server_context(
        &self,
        scope: &StatsScope,
        config: &ServerContextConfig,
        server_names: &[String],
        private_key_methods: &PrivateKeyMethodManager,
    ) -> Result<TlsContext, ConfigurationError> {
        let mut config = config.clone();
        config.check().context("invalid server context config")?;

        let versions = protocol_versions(config.protocols())?;
        let builder = ServerConfig::builder_with_provider(Arc::clone(&self.crypto_provider))
            .with_protocol_versions(&versions)
            .map_err(|e| anyhow!("failed to set protocol versions: {e}"))?;

        let mut ca_infos = Vec::new();
        let builder = if config.client_auth() {
            let roots = root_store(config.client_auth_certificates(), &mut ca_infos)
                .context("invalid client auth certificates")?;
            let verifier = WebPkiClientVerifier::builder_with_provider(
                Arc::new(roots),
                Arc::clone(&self.crypto_provider),
            )
            .build()
            .map_err(|e| anyhow!("failed to build client cert verifier: {e}"))?;
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        let mut providers = Vec::new();
        let mut chain_infos = Vec::with_capacity(config.cert_pairs().len());
        let mut resolver = CertifiedKeyResolver::with_capacity(config.cert_pairs().len());
        resolver.set_server_names(server_names);
        for (i, pair) in config.cert_pairs().iter().enumerate() {
            let (key, info) = self
                .load_cert_pair(pair, private_key_methods, &mut providers)
                .map_err(|e| match e {
                    ConfigurationError::InvalidConfig(e) => ConfigurationError::InvalidConfig(
                        e.context(format!("failed to load server cert pair #{i}")),
                    ),
                    e => e,
                })?;
            resolver.push(key);
            chain_infos.push(info);
        }

        let mut driver = builder.with_cert_resolver(Arc::new(resolver));
        driver.alpn_protocols = alpn_protocols(config.alpn_protocols());

        let mut context = TlsContext::new(
            TlsContextKind::Server {
                driver: Arc::new(driver),
                accept_timeout: config.accept_timeout(),
            },
            scope.clone(),
        );
        context.set_server_names(server_names.to_vec());
        ca_infos
            .into_iter()
            .for_each(|info| context.push_ca_cert(info));
        chain_infos
            .into_iter()
            .for_each(|info| context.push_cert_chain(info));
        providers
            .into_iter()
            .for_each(|p| context.push_private_key_provider(p));
        Ok(context)
    }
}
