//! Facts gathering for a whole execution.
//!
//! Splits an execution's requests by gatherer, runs each gatherer batch on
//! the blocking pool with a timeout, and puts the facts back in request
//! order. A batch that fails as a whole turns into one error fact per
//! request of that batch, so the execution always reports every request.

use hostfacts_common::{Fact, FactGatheringError, FactRequest, GathererRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Discovery type facts are published under.
pub const FACTS_DISCOVERY_TYPE: &str = "facts_gathered";

pub mod kinds {
    pub const GATHERER_NOT_FOUND: &str = "gatherer-not-found";
    pub const GATHERING_TIMEOUT: &str = "gathering-timeout";
    pub const GATHERING_TASK_ERROR: &str = "gathering-task-error";
    pub const MISSING_FACT: &str = "missing-fact";
}

/// One execution's worth of requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactsGatheringRequest {
    #[serde(default = "new_execution_id")]
    pub execution_id: String,
    #[serde(default)]
    pub group_id: String,
    pub facts_requests: Vec<FactRequest>,
}

fn new_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Facts for one execution, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactsGathered {
    pub agent_id: String,
    pub execution_id: String,
    pub group_id: String,
    pub facts_gathered: Vec<Fact>,
}

impl FactsGathered {
    pub fn error_count(&self) -> usize {
        self.facts_gathered.iter().filter(|f| f.is_error()).count()
    }
}

type BatchOutcome = (Vec<usize>, Result<Vec<Fact>, FactGatheringError>);

/// Gather every requested fact.
pub async fn gather_facts(
    registry: &GathererRegistry,
    request: FactsGatheringRequest,
    agent_id: &str,
    batch_timeout: Duration,
) -> FactsGathered {
    let FactsGatheringRequest {
        execution_id,
        group_id,
        facts_requests,
    } = request;

    info!(
        "Gathering {} facts for execution {}",
        facts_requests.len(),
        execution_id
    );

    let mut slots: Vec<Option<Fact>> = vec![None; facts_requests.len()];

    let mut batches: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, fact_request) in facts_requests.iter().enumerate() {
        batches.entry(fact_request.gatherer.as_str()).or_default().push(index);
    }

    let mut tasks: JoinSet<BatchOutcome> = JoinSet::new();
    for (name, indices) in batches {
        let Some(gatherer) = registry.get(name) else {
            warn!("Requested gatherer {} is not registered", name);
            let err = FactGatheringError::new(kinds::GATHERER_NOT_FOUND, "gatherer not found")
                .wrap(name);
            for index in indices {
                slots[index] = Some(Fact::with_error(&facts_requests[index], err.clone()));
            }
            continue;
        };

        let batch: Vec<FactRequest> = indices.iter().map(|&i| facts_requests[i].clone()).collect();
        let gatherer_name = name.to_string();

        tasks.spawn(async move {
            let handle = tokio::task::spawn_blocking(move || gatherer.gather(&batch));
            let outcome = match timeout(batch_timeout, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(FactGatheringError::new(
                    kinds::GATHERING_TASK_ERROR,
                    "gathering task failed",
                )
                .wrap(format!("{}: {}", gatherer_name, e))),
                Err(_) => Err(FactGatheringError::new(
                    kinds::GATHERING_TIMEOUT,
                    "gathering timed out",
                )
                .wrap(&gatherer_name)),
            };
            (indices, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (indices, outcome) = match joined {
            Ok(batch) => batch,
            Err(e) => {
                // the slots of this batch are filled below as missing facts
                error!("Gathering task panicked: {}", e);
                continue;
            }
        };

        match outcome {
            Ok(facts) => {
                if facts.len() != indices.len() {
                    warn!(
                        "Gatherer returned {} facts for {} requests",
                        facts.len(),
                        indices.len()
                    );
                }
                for (index, fact) in indices.into_iter().zip(facts) {
                    slots[index] = Some(fact);
                }
            }
            Err(err) => {
                error!("{}", err);
                for index in indices {
                    slots[index] = Some(Fact::with_error(&facts_requests[index], err.clone()));
                }
            }
        }
    }

    let facts_gathered: Vec<Fact> = slots
        .into_iter()
        .zip(&facts_requests)
        .map(|(slot, fact_request)| {
            slot.unwrap_or_else(|| {
                Fact::with_error(
                    fact_request,
                    FactGatheringError::new(kinds::MISSING_FACT, "no fact returned for request")
                        .wrap(&fact_request.name),
                )
            })
        })
        .collect();

    let gathered = FactsGathered {
        agent_id: agent_id.to_string(),
        execution_id,
        group_id,
        facts_gathered,
    };

    info!(
        "Gathered {} facts ({} errors) for execution {}",
        gathered.facts_gathered.len(),
        gathered.error_count(),
        gathered.execution_id
    );
    gathered
}
