//! Fact gatherers.
//!
//! A gatherer fetches one source (command output or file), parses it into
//! a `FactValue` tree once, and answers a batch of requests against it.
//!
//! Failures come in two tiers:
//! - the source can't be fetched or decoded: `gather` returns `Err` and no facts
//! - a single request can't be answered: that fact carries the error, the rest are unaffected

pub mod corosync_cmapctl;
pub mod corosync_conf;
pub mod registry;

pub use corosync_cmapctl::CorosyncCmapctlGatherer;
pub use corosync_conf::CorosyncConfGatherer;
pub use registry::{GathererOptions, GathererRegistry};

use tracing::error;

use crate::entities::{Fact, FactGatheringError, FactRequest};
use crate::value::FactValue;

pub trait FactsGatherer: Send + Sync {
    /// Stable name requests use to address this gatherer.
    fn name(&self) -> &str;

    /// Answer every request, in order, or fail the whole batch.
    fn gather(&self, requests: &[FactRequest]) -> Result<Vec<Fact>, FactGatheringError>;
}

/// Per-request errors a gatherer reports while resolving paths.
pub(crate) struct RequestErrors {
    pub missing_argument: FactGatheringError,
    pub value_not_found: FactGatheringError,
}

/// Resolve each request's argument against an already built tree.
pub(crate) fn resolve_requests(
    tree: &FactValue,
    requests: &[FactRequest],
    errors: &RequestErrors,
) -> Vec<Fact> {
    requests
        .iter()
        .map(|request| {
            if request.argument.is_empty() {
                let err = errors.missing_argument.wrap(&request.name);
                error!("{}", err);
                return Fact::with_error(request, err);
            }

            match tree.get_path(&request.argument) {
                Ok(value) => Fact::with_value(request, value.clone()),
                Err(not_found) => {
                    let err = errors.value_not_found.wrap(&not_found.path);
                    error!("{}", err);
                    Fact::with_error(request, err)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cmapctl;

    fn errors() -> RequestErrors {
        RequestErrors {
            missing_argument: FactGatheringError::new("missing", "missing required argument"),
            value_not_found: FactGatheringError::new("not-found", "requested value not found"),
        }
    }

    #[test]
    fn test_resolve_isolates_failures() {
        let tree = parse_cmapctl("quorum.provider (str) = corosync_votequorum\ntotem.token (u32) = 30000\n").unwrap();
        let requests = vec![
            FactRequest::new("provider", "corosync-cmapctl", "quorum.provider"),
            FactRequest::new("empty", "corosync-cmapctl", ""),
            FactRequest::new("token", "corosync-cmapctl", "totem.token"),
            FactRequest::new("missing", "corosync-cmapctl", "totem.nope"),
        ];

        let facts = resolve_requests(&tree, &requests, &errors());

        assert_eq!(facts.len(), 4);
        assert_eq!(
            facts[0].value().and_then(|v| v.as_str()),
            Some("corosync_votequorum")
        );
        assert_eq!(facts[1].error().map(|e| e.kind.as_str()), Some("missing"));
        assert_eq!(facts[2].value(), Some(&FactValue::Int(30000)));

        let not_found = facts[3].error().unwrap();
        assert_eq!(not_found.kind, "not-found");
        assert_eq!(not_found.message, "requested value not found: totem.nope");
    }
}
