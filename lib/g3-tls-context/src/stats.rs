/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;

/// Metrics scope handed through to context construction.
///
/// The registry never looks inside; the context factory may keep it so the
/// stats emitter can name per-context counters.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StatsScope {
    name: Arc<str>,
    tags: Vec<(String, String)>,
}

impl StatsScope {
    pub fn new(name: &str) -> Self {
        StatsScope {
            name: Arc::from(name),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }
}

impl fmt::Display for StatsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.tags {
            write!(f, ",{k}={v}")?;
        }
        Ok(())
    }
}
