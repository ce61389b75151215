//! End-to-end gathering with the built-in gatherers.

use std::sync::Arc;
use std::time::Duration;

use hostfacts_common::{
    CommandExecutor, ExecError, FactValue, FsReader, GathererOptions, GathererRegistry,
};
use hostfactsd::facts_service::{gather_facts, FactsGatheringRequest};

const COROSYNC_CONF: &str = "totem {
    version: 2
    token: 30000
}

quorum {
    provider: corosync_votequorum
    two_node: 1
}
";

struct DownCluster;

impl CommandExecutor for DownCluster {
    fn exec(&self, program: &str, _args: &[&str]) -> Result<Vec<u8>, ExecError> {
        Err(ExecError::Failed {
            program: program.to_string(),
            status: "exit status: 1".to_string(),
            stderr: "Failed to initialize the cmap API. Error CS_ERR_LIBRARY".to_string(),
        })
    }
}

#[tokio::test]
async fn test_conf_served_while_cmapctl_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let conf_path = dir.path().join("corosync.conf");
    std::fs::write(&conf_path, COROSYNC_CONF).unwrap();

    let options = GathererOptions {
        corosync_conf_path: conf_path,
        strict_corosync_conf: true,
    };
    let registry = GathererRegistry::with_defaults(Arc::new(DownCluster), Arc::new(FsReader), &options);

    let request: FactsGatheringRequest = serde_json::from_str(
        r#"{
            "execution_id": "e1",
            "group_id": "g1",
            "facts_requests": [
                {"name": "token", "gatherer": "corosync.conf", "argument": "totem.token", "check_id": "156F64"},
                {"name": "runtime_token", "gatherer": "corosync-cmapctl", "argument": "runtime.config.totem.token"},
                {"name": "provider", "gatherer": "corosync.conf", "argument": "quorum.provider"}
            ]
        }"#,
    )
    .unwrap();

    let gathered = gather_facts(&registry, request, "agent-1", Duration::from_secs(5)).await;
    let facts = &gathered.facts_gathered;

    assert_eq!(facts.len(), 3);
    assert_eq!(facts[0].check_id, "156F64");
    assert_eq!(facts[0].value(), Some(&FactValue::Int(30000)));
    assert_eq!(
        facts[1].error().map(|e| e.kind.as_str()),
        Some("corosync-cmapctl-command-error")
    );
    assert_eq!(
        facts[2].value().and_then(|v| v.as_str()),
        Some("corosync_votequorum")
    );

    let json = serde_json::to_value(&gathered).unwrap();
    assert_eq!(json["facts_gathered"][0]["value"], 30000);
    assert_eq!(
        json["facts_gathered"][1]["error"]["type"],
        "corosync-cmapctl-command-error"
    );
}
