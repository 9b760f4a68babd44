/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Loading of context configs from yaml values.
//!
//! Certificates and keys may be given inline as PEM text or as file paths,
//! relative paths being resolved against `lookup_dir`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use humanize_rs::ParseError;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use yaml_rust::{Yaml, yaml};

use super::{
    ClientContextConfig, OcspStaple, ServerContextConfig, TlsCertificateConfig, TlsVersion,
};
use crate::private_key::PrivateKeyProviderConfig;

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(&normalize_key(key), v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn read_file(
    value: &Yaml,
    lookup_dir: Option<&Path>,
    max_size: usize,
) -> anyhow::Result<(Vec<u8>, PathBuf)> {
    let Yaml::String(s) = value else {
        return Err(anyhow!("yaml value type for file path should be 'string'"));
    };
    let path = PathBuf::from(s);
    let path = match lookup_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        None if path.is_relative() => {
            return Err(anyhow!("{} is not an absolute path", path.display()));
        }
        _ => path,
    };
    let file =
        File::open(&path).map_err(|e| anyhow!("failed to open file({}): {e:?}", path.display()))?;
    let mut contents = Vec::with_capacity(4096);
    file.take(max_size as u64)
        .read_to_end(&mut contents)
        .map_err(|e| anyhow!("failed to read contents of file {}: {e}", path.display()))?;
    Ok((contents, path))
}

fn as_bool(value: &Yaml) -> anyhow::Result<bool> {
    match value {
        Yaml::Boolean(b) => Ok(*b),
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid boolean string {s}")),
        },
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!("yaml value type for bool should be 'boolean' or 'string'")),
    }
}

fn as_string(value: &Yaml) -> anyhow::Result<String> {
    match value {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        _ => Err(anyhow!("yaml value type for string should be 'string'")),
    }
}

fn as_string_list(value: &Yaml) -> anyhow::Result<Vec<String>> {
    match value {
        Yaml::Array(seq) => {
            let mut list = Vec::with_capacity(seq.len());
            for (i, v) in seq.iter().enumerate() {
                let s = as_string(v).context(format!("invalid string value for element #{i}"))?;
                list.push(s);
            }
            Ok(list)
        }
        _ => Ok(vec![as_string(value)?]),
    }
}

pub fn as_duration(value: &Yaml) -> anyhow::Result<Duration> {
    match value {
        Yaml::String(s) => match humanize_rs::duration::parse(s) {
            Ok(d) => Ok(d),
            Err(ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(s) {
                    Ok(Duration::from_secs(u))
                } else if let Ok(f) = f64::from_str(s) {
                    Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
                } else {
                    Err(anyhow!("invalid duration string {s}"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string {s}: {e}")),
        },
        Yaml::Integer(i) => {
            let secs = u64::try_from(*i).map_err(|_| anyhow!("negative duration value {i}"))?;
            Ok(Duration::from_secs(secs))
        }
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value {s}: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer' or 'real'"
        )),
    }
}

pub fn as_tls_version(value: &Yaml) -> anyhow::Result<TlsVersion> {
    match value {
        Yaml::String(s) => TlsVersion::from_str(s),
        Yaml::Real(s) => TlsVersion::from_str(s),
        _ => Err(anyhow!(
            "yaml value type for tls version should be 'string' or 'real'"
        )),
    }
}

fn as_tls_versions(value: &Yaml) -> anyhow::Result<Vec<TlsVersion>> {
    if let Yaml::Array(seq) = value {
        let mut versions = Vec::with_capacity(seq.len());
        for (i, v) in seq.iter().enumerate() {
            let version =
                as_tls_version(v).context(format!("invalid tls version for element #{i}"))?;
            versions.push(version);
        }
        Ok(versions)
    } else {
        Ok(vec![as_tls_version(value)?])
    }
}

fn as_certificates_from_single_element(
    value: &Yaml,
    lookup_dir: Option<&Path>,
) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    const MAX_FILE_SIZE: usize = 4_000_000; // 4MB

    let (contents, source) = match value {
        Yaml::String(s) if s.trim_start().starts_with("--") => {
            (s.as_bytes().to_vec(), "string".to_string())
        }
        _ => {
            let (contents, path) = read_file(value, lookup_dir, MAX_FILE_SIZE)?;
            (contents, format!("file {}", path.display()))
        }
    };

    let mut certs = Vec::new();
    for (i, r) in CertificateDer::pem_slice_iter(&contents).enumerate() {
        let cert = r.map_err(|e| anyhow!("invalid certificate #{i} in {source}: {e:?}"))?;
        certs.push(cert);
    }
    if certs.is_empty() {
        Err(anyhow!("no valid certificate found in {source}"))
    } else {
        Ok(certs)
    }
}

pub fn as_rustls_certificates(
    value: &Yaml,
    lookup_dir: Option<&Path>,
) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    if let Yaml::Array(seq) = value {
        let mut certs = Vec::new();
        for (i, v) in seq.iter().enumerate() {
            let this_certs = as_certificates_from_single_element(v, lookup_dir)
                .context(format!("invalid certificates value for element #{i}"))?;
            certs.extend(this_certs);
        }
        Ok(certs)
    } else {
        as_certificates_from_single_element(value, lookup_dir)
    }
}

pub fn as_rustls_private_key(
    value: &Yaml,
    lookup_dir: Option<&Path>,
) -> anyhow::Result<PrivateKeyDer<'static>> {
    const MAX_FILE_SIZE: usize = 256_000; // 256KB

    if let Yaml::String(s) = value {
        if s.trim_start().starts_with("--") {
            return PrivateKeyDer::from_pem_slice(s.as_bytes())
                .map_err(|e| anyhow!("invalid private key string: {e:?}"));
        }
    }

    let (contents, path) = read_file(value, lookup_dir, MAX_FILE_SIZE)?;
    PrivateKeyDer::from_pem_slice(&contents)
        .map_err(|e| anyhow!("invalid private key file({}): {e:?}", path.display()))
}

pub fn as_ocsp_staple(value: &Yaml, lookup_dir: Option<&Path>) -> anyhow::Result<OcspStaple> {
    const MAX_FILE_SIZE: usize = 64_000;

    let Yaml::Hash(map) = value else {
        return Err(anyhow!("yaml value type for ocsp staple should be 'map'"));
    };

    let mut response = None;
    let mut next_update = None;
    foreach_kv(map, |k, v| match k {
        "response" | "response_file" => {
            let (contents, _path) = read_file(v, lookup_dir, MAX_FILE_SIZE)?;
            response = Some(contents);
            Ok(())
        }
        "next_update" => {
            let s = as_string(v)?;
            let dt = DateTime::parse_from_rfc3339(&s)
                .map_err(|e| anyhow!("invalid rfc3339 datetime {s}: {e}"))?;
            next_update = Some(dt.with_timezone(&Utc));
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;

    let Some(response) = response else {
        return Err(anyhow!("no ocsp response set"));
    };
    let Some(next_update) = next_update else {
        return Err(anyhow!("no next update time set"));
    };
    OcspStaple::new(response, next_update)
}

pub fn as_private_key_provider_config(value: &Yaml) -> anyhow::Result<PrivateKeyProviderConfig> {
    match value {
        Yaml::String(name) => Ok(PrivateKeyProviderConfig::new(name)),
        Yaml::Hash(map) => {
            let mut name = None;
            let mut fallback = false;
            let mut settings = Yaml::Null;
            foreach_kv(map, |k, v| match k {
                "name" | "provider" | "provider_name" => {
                    name = Some(as_string(v)?);
                    Ok(())
                }
                "fallback" => {
                    fallback = as_bool(v)?;
                    Ok(())
                }
                "settings" | "config" => {
                    settings = v.clone();
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            let Some(name) = name else {
                return Err(anyhow!("no provider name set"));
            };
            let mut config = PrivateKeyProviderConfig::new(&name);
            config.set_fallback(fallback);
            config.set_settings(settings);
            Ok(config)
        }
        _ => Err(anyhow!(
            "yaml value type for private key provider should be 'string' or 'map'"
        )),
    }
}

pub fn as_tls_certificate_config(
    value: &Yaml,
    lookup_dir: Option<&Path>,
) -> anyhow::Result<TlsCertificateConfig> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for tls certificate config should be 'map'"
        ));
    };

    let mut config = TlsCertificateConfig::default();
    foreach_kv(map, |k, v| match k {
        "certificate" | "cert" => {
            let certs = as_rustls_certificates(v, lookup_dir)
                .context(format!("invalid certificates value for key {k}"))?;
            config.set_certificates(certs);
            Ok(())
        }
        "private_key" | "key" => {
            let key = as_rustls_private_key(v, lookup_dir)
                .context(format!("invalid private key value for key {k}"))?;
            config.set_private_key(key);
            Ok(())
        }
        "private_key_provider" | "key_provider" => {
            let provider = as_private_key_provider_config(v)
                .context(format!("invalid private key provider value for key {k}"))?;
            config.set_private_key_provider(provider);
            Ok(())
        }
        "ocsp_staple" | "ocsp" => {
            let staple = as_ocsp_staple(v, lookup_dir)
                .context(format!("invalid ocsp staple value for key {k}"))?;
            config.set_ocsp_staple(staple);
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;

    config.check()?;
    Ok(config)
}

pub fn as_client_context_config(
    value: &Yaml,
    lookup_dir: Option<&Path>,
) -> anyhow::Result<ClientContextConfig> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for client context config should be 'map'"
        ));
    };

    let mut config = ClientContextConfig::default();
    foreach_kv(map, |k, v| match k {
        "cert_pair" => {
            let pair = as_tls_certificate_config(v, lookup_dir)
                .context(format!("invalid cert pair value for key {k}"))?;
            config.set_cert_pair(pair);
            Ok(())
        }
        "ca_certificate" | "ca_cert" => {
            let certs = as_rustls_certificates(v, lookup_dir)
                .context(format!("invalid certificates value for key {k}"))?;
            config.set_ca_certificates(certs);
            Ok(())
        }
        "no_default_ca_certificate" | "no_default_ca_cert" => {
            if as_bool(v)? {
                config.set_no_default_ca_certificates();
            }
            Ok(())
        }
        "server_name" | "tls_name" => {
            config.set_server_name(as_string(v)?);
            Ok(())
        }
        "disable_sni" => {
            if as_bool(v)? {
                config.set_disable_sni();
            }
            Ok(())
        }
        "protocol" | "protocols" => {
            config.set_protocols(as_tls_versions(v)?);
            Ok(())
        }
        "alpn_protocol" | "alpn_protocols" | "alpn" => {
            config.set_alpn_protocols(as_string_list(v)?);
            Ok(())
        }
        "handshake_timeout" => {
            config.set_handshake_timeout(as_duration(v)?);
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;

    config.check()?;
    Ok(config)
}

pub fn as_server_context_config(
    value: &Yaml,
    lookup_dir: Option<&Path>,
) -> anyhow::Result<ServerContextConfig> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for server context config should be 'map'"
        ));
    };

    let mut config = ServerContextConfig::empty();
    foreach_kv(map, |k, v| match k {
        "cert_pair" | "cert_pairs" => {
            if let Yaml::Array(seq) = v {
                for (i, v) in seq.iter().enumerate() {
                    let pair = as_tls_certificate_config(v, lookup_dir)
                        .context(format!("invalid cert pair value for {k}#{i}"))?;
                    config.push_cert_pair(pair)?;
                }
            } else {
                let pair = as_tls_certificate_config(v, lookup_dir)
                    .context(format!("invalid cert pair value for key {k}"))?;
                config.push_cert_pair(pair)?;
            }
            Ok(())
        }
        "enable_client_auth" => {
            if as_bool(v)? {
                config.enable_client_auth();
            }
            Ok(())
        }
        "client_auth_certificate" | "client_auth_cert" => {
            let certs = as_rustls_certificates(v, lookup_dir)
                .context(format!("invalid certificates value for key {k}"))?;
            config.set_client_auth_certificates(certs);
            Ok(())
        }
        "protocol" | "protocols" => {
            config.set_protocols(as_tls_versions(v)?);
            Ok(())
        }
        "alpn_protocol" | "alpn_protocols" | "alpn" => {
            config.set_alpn_protocols(as_string_list(v)?);
            Ok(())
        }
        "accept_timeout" | "handshake_timeout" => {
            config.set_accept_timeout(as_duration(v)?);
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;

    config.check()?;
    Ok(config)
}
