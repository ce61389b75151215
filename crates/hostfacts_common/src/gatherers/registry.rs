//! Name → gatherer lookup, built once at startup and passed around explicitly.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::corosync_conf::COROSYNC_CONF_PATH;
use super::{CorosyncCmapctlGatherer, CorosyncConfGatherer, FactsGatherer};
use crate::executor::{CommandExecutor, FileReader};

/// Settings the default gatherers are built with.
#[derive(Debug, Clone)]
pub struct GathererOptions {
    pub corosync_conf_path: PathBuf,
    pub strict_corosync_conf: bool,
}

impl Default for GathererOptions {
    fn default() -> Self {
        Self {
            corosync_conf_path: PathBuf::from(COROSYNC_CONF_PATH),
            strict_corosync_conf: true,
        }
    }
}

#[derive(Default, Clone)]
pub struct GathererRegistry {
    gatherers: BTreeMap<String, Arc<dyn FactsGatherer>>,
}

impl GathererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in gatherer.
    pub fn with_defaults(
        executor: Arc<dyn CommandExecutor>,
        reader: Arc<dyn FileReader>,
        options: &GathererOptions,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CorosyncCmapctlGatherer::new(executor)));
        registry.register(Arc::new(
            CorosyncConfGatherer::new(reader, options.corosync_conf_path.clone())
                .with_strict(options.strict_corosync_conf),
        ));
        registry
    }

    /// Add a gatherer under its own name, returning the one it replaces.
    pub fn register(&mut self, gatherer: Arc<dyn FactsGatherer>) -> Option<Arc<dyn FactsGatherer>> {
        self.gatherers.insert(gatherer.name().to_string(), gatherer)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FactsGatherer>> {
        self.gatherers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gatherers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.gatherers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.gatherers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gatherers.is_empty()
    }
}

impl std::fmt::Debug for GathererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GathererRegistry")
            .field("gatherers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Fact, FactGatheringError, FactRequest};
    use crate::executor::{FsReader, SystemExecutor};
    use crate::gatherers::corosync_cmapctl::COROSYNC_CMAPCTL_GATHERER_NAME;
    use crate::gatherers::corosync_conf::COROSYNC_CONF_GATHERER_NAME;

    struct NamedGatherer(&'static str);

    impl FactsGatherer for NamedGatherer {
        fn name(&self) -> &str {
            self.0
        }

        fn gather(&self, _requests: &[FactRequest]) -> Result<Vec<Fact>, FactGatheringError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = GathererRegistry::with_defaults(
            Arc::new(SystemExecutor),
            Arc::new(FsReader),
            &GathererOptions::default(),
        );

        assert_eq!(
            registry.names(),
            vec![COROSYNC_CMAPCTL_GATHERER_NAME, COROSYNC_CONF_GATHERER_NAME]
        );
        assert!(registry.contains("corosync.conf"));
        assert!(registry.get("pacemaker").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = GathererRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(Arc::new(NamedGatherer("custom"))).is_none());
        assert!(registry.register(Arc::new(NamedGatherer("custom"))).is_some());
        assert_eq!(registry.len(), 1);
    }
}
