//! Gatherer for the corosync configuration file.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::{resolve_requests, FactsGatherer, RequestErrors};
use crate::entities::{Fact, FactGatheringError, FactRequest};
use crate::executor::{FileReader, FsReader};
use crate::parsers::{parse_sections, SectionRules};

pub const COROSYNC_CONF_GATHERER_NAME: &str = "corosync.conf";
pub const COROSYNC_CONF_PATH: &str = "/etc/corosync/corosync.conf";

/// Error kinds reported by this gatherer.
pub mod kinds {
    pub const FILE_ERROR: &str = "corosync-conf-file-error";
    pub const DECODING_ERROR: &str = "corosync-conf-decoding-error";
    pub const MISSING_ARGUMENT: &str = "corosync-conf-missing-argument";
    pub const VALUE_NOT_FOUND: &str = "corosync-conf-value-not-found";
}

pub struct CorosyncConfGatherer {
    reader: Arc<dyn FileReader>,
    config_file: PathBuf,
    rules: SectionRules,
    /// Reject files with unbalanced sections instead of serving a partial tree
    strict: bool,
}

impl CorosyncConfGatherer {
    pub fn new(reader: Arc<dyn FileReader>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            config_file: config_file.into(),
            rules: SectionRules::corosync(),
            strict: true,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for CorosyncConfGatherer {
    fn default() -> Self {
        Self::new(Arc::new(FsReader), COROSYNC_CONF_PATH)
    }
}

impl FactsGatherer for CorosyncConfGatherer {
    fn name(&self) -> &str {
        COROSYNC_CONF_GATHERER_NAME
    }

    fn gather(&self, requests: &[FactRequest]) -> Result<Vec<Fact>, FactGatheringError> {
        info!("Starting {} file facts gathering process", COROSYNC_CONF_GATHERER_NAME);

        let decoding_error =
            FactGatheringError::new(kinds::DECODING_ERROR, "error decoding corosync.conf file");

        let raw = self.reader.read(&self.config_file).map_err(|e| {
            FactGatheringError::new(kinds::FILE_ERROR, "error reading corosync.conf file").wrap(e)
        })?;
        let content = String::from_utf8(raw).map_err(|e| decoding_error.wrap(e))?;

        let parsed = parse_sections(&content, &self.rules).map_err(|e| decoding_error.wrap(e))?;

        let tree = match parsed.diagnostic {
            None => parsed.value,
            Some(diagnostic) if self.strict => return Err(decoding_error.wrap(diagnostic)),
            Some(diagnostic) => {
                warn!(
                    "{}: {}, serving facts from the partial tree",
                    self.config_file.display(),
                    diagnostic
                );
                parsed.value
            }
        };

        let errors = RequestErrors {
            missing_argument: FactGatheringError::new(
                kinds::MISSING_ARGUMENT,
                "missing required argument",
            ),
            value_not_found: FactGatheringError::new(
                kinds::VALUE_NOT_FOUND,
                "requested value not found in corosync.conf file",
            ),
        };
        let facts = resolve_requests(&tree, requests, &errors);

        info!("Requested {} file facts gathered", COROSYNC_CONF_GATHERER_NAME);
        Ok(facts)
    }
}
