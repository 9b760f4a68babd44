/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use foldhash::fast::FixedState;
use log::info;

use super::{
    ArcPrivateKeyMethodProvider, ArcPrivateKeyMethodProviderFactory, PrivateKeyProviderConfig,
};
use crate::ConfigurationError;

/// Name to factory map of private key providers.
///
/// Registration takes `&mut self`, so it can only happen before the manager is
/// shared with the context registry. Lookups are lock free after that.
#[derive(Default)]
pub struct PrivateKeyMethodManager {
    factories: HashMap<String, ArcPrivateKeyMethodProviderFactory, FixedState>,
}

impl PrivateKeyMethodManager {
    pub fn new() -> Self {
        PrivateKeyMethodManager {
            factories: HashMap::with_hasher(FixedState::with_seed(0)),
        }
    }

    pub fn register(&mut self, factory: ArcPrivateKeyMethodProviderFactory) -> anyhow::Result<()> {
        let name = factory.name().to_string();
        if self.factories.contains_key(&name) {
            return Err(anyhow!(
                "private key provider factory {name} is already registered"
            ));
        }
        info!("registered private key provider factory {name}");
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<ArcPrivateKeyMethodProviderFactory> {
        self.factories.get(name).map(Arc::clone)
    }

    pub fn create_provider(
        &self,
        config: &PrivateKeyProviderConfig,
    ) -> Result<ArcPrivateKeyMethodProvider, ConfigurationError> {
        let Some(factory) = self.lookup(config.name()) else {
            return Err(ConfigurationError::UnknownPrivateKeyProvider(
                config.name().to_string(),
            ));
        };
        factory.create_provider(config).map_err(|e| {
            ConfigurationError::InvalidConfig(e.context(format!(
                "failed to create private key provider {}",
                config.name()
            )))
        })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    use rustls::sign::SigningKey;
    use rustls_pki_types::CertificateDer;

    use crate::private_key::{PrivateKeyMethodProvider, PrivateKeyMethodProviderFactory};

    struct NullProvider;

    impl PrivateKeyMethodProvider for NullProvider {
        fn is_available(&self) -> bool {
            false
        }

        fn signing_key(
            &self,
            _certs: &[CertificateDer<'static>],
        ) -> anyhow::Result<Arc<dyn SigningKey>> {
            Err(anyhow!("no key"))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct NullFactory(&'static str);

    impl PrivateKeyMethodProviderFactory for NullFactory {
        fn name(&self) -> &str {
            self.0
        }

        fn create_provider(
            &self,
            config: &PrivateKeyProviderConfig,
        ) -> anyhow::Result<ArcPrivateKeyMethodProvider> {
            if config.settings().as_str() == Some("broken") {
                return Err(anyhow!("broken settings"));
            }
            Ok(Arc::new(NullProvider))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut manager = PrivateKeyMethodManager::new();
        manager.register(Arc::new(NullFactory("null"))).unwrap();
        manager.register(Arc::new(NullFactory("alpha"))).unwrap();
        assert!(manager.register(Arc::new(NullFactory("null"))).is_err());

        assert!(manager.lookup("null").is_some());
        assert!(manager.lookup("absent").is_none());
        assert_eq!(manager.names(), vec!["alpha".to_string(), "null".to_string()]);
    }

    #[test]
    fn create_provider() {
        let mut manager = PrivateKeyMethodManager::new();
        manager.register(Arc::new(NullFactory("null"))).unwrap();

        let provider = manager
            .create_provider(&PrivateKeyProviderConfig::new("null"))
            .unwrap();
        assert!(provider.as_any().downcast_ref::<NullProvider>().is_some());

        let r = manager.create_provider(&PrivateKeyProviderConfig::new("absent"));
        assert!(matches!(
            r,
            Err(ConfigurationError::UnknownPrivateKeyProvider(name)) if name == "absent"
        ));

        let mut config = PrivateKeyProviderConfig::new("null");
        config.set_settings(yaml_rust::Yaml::String("broken".to_string()));
        let r = manager.create_provider(&config);
        assert!(matches!(r, Err(ConfigurationError::InvalidConfig(_))));
    }
}
