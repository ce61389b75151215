//! Gatherer for the runtime cluster database dumped by `corosync-cmapctl -b`.

use std::sync::Arc;

use tracing::info;

use super::{resolve_requests, FactsGatherer, RequestErrors};
use crate::entities::{Fact, FactGatheringError, FactRequest};
use crate::executor::{CommandExecutor, SystemExecutor};
use crate::parsers::parse_cmapctl;

pub const COROSYNC_CMAPCTL_GATHERER_NAME: &str = "corosync-cmapctl";

const COMMAND: &str = "corosync-cmapctl";
const COMMAND_ARGS: &[&str] = &["-b"];

/// Error kinds reported by this gatherer.
pub mod kinds {
    pub const COMMAND_ERROR: &str = "corosync-cmapctl-command-error";
    pub const DECODING_ERROR: &str = "corosync-cmapctl-decoding-error";
    pub const MISSING_ARGUMENT: &str = "corosync-cmapctl-missing-argument";
    pub const VALUE_NOT_FOUND: &str = "corosync-cmapctl-value-not-found";
}

pub struct CorosyncCmapctlGatherer {
    executor: Arc<dyn CommandExecutor>,
}

impl CorosyncCmapctlGatherer {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }
}

impl Default for CorosyncCmapctlGatherer {
    fn default() -> Self {
        Self::new(Arc::new(SystemExecutor))
    }
}

impl FactsGatherer for CorosyncCmapctlGatherer {
    fn name(&self) -> &str {
        COROSYNC_CMAPCTL_GATHERER_NAME
    }

    fn gather(&self, requests: &[FactRequest]) -> Result<Vec<Fact>, FactGatheringError> {
        info!("Starting {} facts gathering process", COROSYNC_CMAPCTL_GATHERER_NAME);

        let output = self.executor.exec(COMMAND, COMMAND_ARGS).map_err(|e| {
            FactGatheringError::new(kinds::COMMAND_ERROR, "error while executing corosync-cmapctl")
                .wrap(e)
        })?;

        let decoding_error =
            FactGatheringError::new(kinds::DECODING_ERROR, "error decoding corosync-cmapctl output");
        let text = String::from_utf8(output).map_err(|e| decoding_error.wrap(e))?;
        let tree = parse_cmapctl(&text).map_err(|e| decoding_error.wrap(e))?;

        let errors = RequestErrors {
            missing_argument: FactGatheringError::new(
                kinds::MISSING_ARGUMENT,
                "missing required argument",
            ),
            value_not_found: FactGatheringError::new(
                kinds::VALUE_NOT_FOUND,
                "requested value not found in corosync-cmapctl output",
            ),
        };
        let facts = resolve_requests(&tree, requests, &errors);

        info!("Requested {} facts gathered", COROSYNC_CMAPCTL_GATHERER_NAME);
        Ok(facts)
    }
}
