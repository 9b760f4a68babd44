/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

/// Failure to turn a client or server config into a usable context.
///
/// Nothing is added to the registry when one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid tls context config: {0:#}")]
    InvalidConfig(anyhow::Error),
    #[error("no private key provider named {0} registered")]
    UnknownPrivateKeyProvider(String),
    #[error("private key provider {0} is not available")]
    PrivateKeyProviderUnavailable(String),
    #[error("additional init failed for server name '{server_name}': {source:#}")]
    AdditionalInitFailed {
        server_name: String,
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for ConfigurationError {
    fn from(e: anyhow::Error) -> Self {
        ConfigurationError::InvalidConfig(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn display() {
        let e = ConfigurationError::UnknownPrivateKeyProvider("keyless".to_string());
        assert_eq!(e.to_string(), "no private key provider named keyless registered");

        let e = ConfigurationError::AdditionalInitFailed {
            server_name: "a.example.net".to_string(),
            source: anyhow!("boom"),
        };
        assert!(e.to_string().contains("a.example.net"));
    }

    #[test]
    fn display_single_line() {
        let e: ConfigurationError = anyhow!("no cert pair is set")
            .context("invalid server context config")
            .into();
        assert_eq!(
            e.to_string(),
            "invalid tls context config: invalid server context config: no cert pair is set"
        );

        let e = ConfigurationError::AdditionalInitFailed {
            server_name: "b.example.net".to_string(),
            source: anyhow!("no alpn").context("hook rejected"),
        };
        let s = e.to_string();
        assert!(!s.contains('\n'));
        assert_eq!(
            s,
            "additional init failed for server name 'b.example.net': hook rejected: no alpn"
        );
    }

    #[test]
    fn from_anyhow() {
        let e: ConfigurationError = anyhow!("no cert pair is set").into();
        assert!(matches!(e, ConfigurationError::InvalidConfig(_)));
    }
}
