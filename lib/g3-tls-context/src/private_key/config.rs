/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use yaml_rust::Yaml;

/// Which provider to use for a certificate, and the provider specific settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrivateKeyProviderConfig {
    name: String,
    fallback: bool,
    settings: Yaml,
}

impl PrivateKeyProviderConfig {
    pub fn new(name: &str) -> Self {
        PrivateKeyProviderConfig {
            name: name.to_string(),
            fallback: false,
            settings: Yaml::Null,
        }
    }

    /// Use the local private key if the provider is not available.
    pub fn set_fallback(&mut self, fallback: bool) {
        self.fallback = fallback;
    }

    pub fn set_settings(&mut self, settings: Yaml) {
        self.settings = settings;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fallback(&self) -> bool {
        self.fallback
    }

    #[inline]
    pub fn settings(&self) -> &Yaml {
        &self.settings
    }
}
