use super::{
    ApplyStep, ChainResult, ChainState, FetchRoundReply, FetchRoundRequest, Orchestrator,
    RoundKind, RoundVariant, UnitProgress,
};
use crate::config::EngineConfig;
use crate::error::FailureKind;
use crate::model::{
    Connector, CredentialKind, GitProvider, ManifestSpec, OciStore, ScopeContext, StoreConfig,
};
use crate::ports::UnitStatus;
use crate::render::VariableRenderer;
use crate::testing::{
    connector, file_store, git, helm, http_repo, inline, k8s, kustomize, openshift, script,
    values, FakeConnectors, LogEvent, MemoryFiles, MemoryLog,
};
use std::collections::BTreeMap;

const UNIT: &str = "Fetch Files";

struct Harness {
    connectors: FakeConnectors,
    renderer: VariableRenderer,
    files: MemoryFiles,
    log: MemoryLog,
    config: EngineConfig,
}

impl Harness {
    fn new(connectors: Vec<Connector>) -> Self {
        Self {
            connectors: FakeConnectors::with(connectors),
            renderer: VariableRenderer::default(),
            files: MemoryFiles::default(),
            log: MemoryLog::default(),
            config: EngineConfig::default(),
        }
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator {
            connectors: &self.connectors,
            renderer: &self.renderer,
            files: &self.files,
            log: &self.log,
            config: &self.config,
        }
    }
}

fn step(manifests: Vec<ManifestSpec>) -> ApplyStep {
    ApplyStep {
        scope: ScopeContext {
            account_id: "acct".to_string(),
            org_id: Some("default".to_string()),
            project_id: Some("payments".to_string()),
        },
        manifests,
        step_overrides: Vec::new(),
        timeout: None,
        delegate_selectors: Vec::new(),
        infrastructure: BTreeMap::new(),
    }
}

fn expect_continue(result: ChainResult) -> (FetchRoundRequest, ChainState) {
    match result {
        ChainResult::Continue { request, state } => (*request, *state),
        other => panic!("expected continue, got {other:?}"),
    }
}

fn contents(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(key, files)| {
            (
                key.to_string(),
                files.iter().map(|file| file.to_string()).collect(),
            )
        })
        .collect()
}

fn git_primary() -> ManifestSpec {
    k8s(
        "svc",
        git(GitProvider::Github, "gh", &["k8s/app"]),
        &["env/prod/values.yaml"],
    )
}

#[test]
fn single_git_round_covers_default_and_declared_paths() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();

    let (request, state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));
    assert_eq!(request.round_kind, RoundKind::VersionControl);
    assert_eq!(request.timeout_ms, 600_000);
    assert!(request.open_log_stream);
    assert!(request.close_log_stream);
    let keys: Vec<(&str, Vec<String>)> = request
        .instructions
        .iter()
        .map(|instruction| (instruction.identifier.as_str(), instruction.paths().to_vec()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("svc#default", vec!["k8s/app/values.yaml".to_string()]),
            ("svc", vec!["env/prod/values.yaml".to_string()]),
        ]
    );
    assert!(!request.instructions[0].required_if_missing);
    assert!(request.instructions[1].required_if_missing);
    assert_eq!(state.awaiting, Some(RoundKind::VersionControl));
    assert!(state.remaining_rounds.is_empty());

    let reply = FetchRoundReply::success(
        RoundKind::VersionControl,
        contents(&[
            ("svc#default", &["replicas: 1"]),
            ("svc", &["replicas: 4"]),
        ]),
    );
    match orchestrator.resume(state, reply) {
        ChainResult::Done { merged } => assert_eq!(merged, vec!["replicas: 1", "replicas: 4"]),
        other => panic!("expected done, got {other:?}"),
    }
    assert_eq!(
        harness.log.closes(),
        vec![(UNIT.to_string(), UnitStatus::Success)]
    );
}

#[test]
fn helm_repo_round_uses_sub_chart_default() {
    let harness = Harness::new(vec![connector("charts", CredentialKind::HttpHelm)]);
    let primary = helm("api", http_repo("charts"), Some("charts/api"), &[]);
    let (request, _) = expect_continue(harness.orchestrator().start(&step(vec![primary])));
    assert_eq!(request.round_kind, RoundKind::HelmRepo);
    assert_eq!(request.variant, RoundVariant::Standard);
    assert_eq!(
        request.instructions[0].paths().to_vec(),
        vec!["charts/api/values.yaml".to_string()]
    );
}

#[test]
fn mismatched_connector_fails_before_dispatch() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::OciHelm)]);
    let primary = k8s("svc", git(GitProvider::Git, "gh", &["k8s"]), &[]);
    match harness.orchestrator().start(&step(vec![primary])) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ConnectorMismatch);
            assert!(failure.message.contains("Select Git connector"));
            assert!(failure.completed_rounds.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(harness.log.events.borrow().is_empty());
}

#[test]
fn primary_connector_is_checked_without_override_entries() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::OciHelm)]);
    let primary = openshift("tmpl", git(GitProvider::Git, "gh", &["openshift/app.yaml"]), &[]);
    match harness.orchestrator().start(&step(vec![primary])) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ConnectorMismatch);
            assert!(failure.message.contains("Openshift Template with Id [tmpl]"));
            assert!(failure.message.contains("Select Git connector"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(harness.log.events.borrow().is_empty());

    let harness = Harness::new(Vec::new());
    let primary = kustomize("kz", git(GitProvider::Github, "gh", &[]), &[]);
    match harness.orchestrator().start(&step(vec![primary])) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ConnectorNotFound)
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn primaries_without_override_entries_per_backend() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Git)]);
    let primary = openshift("tmpl", git(GitProvider::Git, "gh", &["openshift/app.yaml"]), &[]);
    match harness.orchestrator().start(&step(vec![primary])) {
        ChainResult::Done { merged } => assert!(merged.is_empty()),
        other => panic!("expected done, got {other:?}"),
    }
    assert_eq!(
        harness.log.closes(),
        vec![(UNIT.to_string(), UnitStatus::Success)]
    );

    let harness = Harness::new(vec![connector("charts", CredentialKind::HttpHelm)]);
    for primary in [
        kustomize("kz", http_repo("charts"), &[]),
        openshift("tmpl", http_repo("charts"), &[]),
    ] {
        match harness.orchestrator().start(&step(vec![primary])) {
            ChainResult::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::UnsupportedManifestKind)
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
    assert!(harness.log.events.borrow().is_empty());

    let harness = Harness::new(Vec::new());
    let primary = kustomize("kz", file_store(&["/kz"]), &[]);
    match harness.orchestrator().start(&step(vec![primary])) {
        ChainResult::Done { merged } => assert!(merged.is_empty()),
        other => panic!("expected done, got {other:?}"),
    }
}

#[test]
fn custom_round_runs_before_git_round() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let manifests = vec![
        git_primary(),
        values("generated", 1, script("out/values.yaml")),
    ];

    let (first, state) = expect_continue(orchestrator.start(&step(manifests)));
    assert_eq!(first.round_kind, RoundKind::Custom);
    assert!(first.open_log_stream);
    assert!(!first.close_log_stream);
    assert_eq!(first.delegate_selectors, vec!["build-pool".to_string()]);
    assert_eq!(state.remaining_rounds, vec![RoundKind::VersionControl]);

    let reply = FetchRoundReply::success(
        RoundKind::Custom,
        contents(&[("generated", &["image: v2"])]),
    );
    let (second, state) = expect_continue(orchestrator.resume(state, reply));
    assert_eq!(second.round_kind, RoundKind::VersionControl);
    assert!(!second.open_log_stream);
    assert!(second.close_log_stream);
    assert_eq!(
        state.custom_results.get("generated"),
        Some(&vec!["image: v2".to_string()])
    );
    assert_eq!(state.completed_rounds, vec![RoundKind::Custom]);

    let reply = FetchRoundReply::success(
        RoundKind::VersionControl,
        contents(&[("svc#default", &["a: 1"]), ("svc", &["b: 2"])]),
    );
    match orchestrator.resume(state, reply) {
        ChainResult::Done { merged } => assert_eq!(merged, vec!["a: 1", "b: 2", "image: v2"]),
        other => panic!("expected done, got {other:?}"),
    }
}

#[test]
fn soft_paths_may_be_missing_but_hard_paths_fail() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let (_, state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));

    let reply = FetchRoundReply::success(
        RoundKind::VersionControl,
        contents(&[("svc", &["replicas: 4"])]),
    );
    match orchestrator.resume(state.clone(), reply) {
        ChainResult::Done { merged } => assert_eq!(merged, vec!["replicas: 4"]),
        other => panic!("expected done, got {other:?}"),
    }

    let reply = FetchRoundReply::success(
        RoundKind::VersionControl,
        contents(&[("svc#default", &["replicas: 1"])]),
    );
    match orchestrator.resume(state, reply) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::MissingRequiredPath);
            assert!(failure.message.contains("env/prod/values.yaml"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        harness.log.closes().last(),
        Some(&(UNIT.to_string(), UnitStatus::Failure))
    );
}

#[test]
fn required_key_with_no_files_fails() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let (_, state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));

    let reply = FetchRoundReply::success(
        RoundKind::VersionControl,
        contents(&[("svc#default", &["a: 1"]), ("svc", &[])]),
    );
    match orchestrator.resume(state.clone(), reply) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::MissingRequiredPath);
            assert!(failure.message.contains("0 of 1 file(s) returned"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let reply = FetchRoundReply::success(
        RoundKind::VersionControl,
        contents(&[("svc#default", &[]), ("svc", &["b: 2"])]),
    );
    match orchestrator.resume(state, reply) {
        ChainResult::Done { merged } => assert_eq!(merged, vec!["b: 2"]),
        other => panic!("expected done, got {other:?}"),
    }
}

#[test]
fn merged_order_follows_layers_across_rounds() {
    let mut harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    harness.files = MemoryFiles::default().file("account:/shared/values.yaml", "from: store");
    let orchestrator = harness.orchestrator();
    let mut apply = step(vec![
        git_primary(),
        values("store", 2, file_store(&["account:/shared/values.yaml"])),
        values("text", 1, inline("from: inline")),
        values("generated", 3, script("out/values.yaml")),
    ]);
    apply.step_overrides = vec![values("late", 0, inline("from: step"))];

    let (_, state) = expect_continue(orchestrator.start(&apply));
    let (_, state) = expect_continue(orchestrator.resume(
        state,
        FetchRoundReply::success(
            RoundKind::Custom,
            contents(&[("generated", &["from: script"])]),
        ),
    ));
    let done = orchestrator.resume(
        state,
        FetchRoundReply::success(
            RoundKind::VersionControl,
            contents(&[("svc#default", &["from: default"]), ("svc", &["from: declared"])]),
        ),
    );
    match done {
        ChainResult::Done { merged } => assert_eq!(
            merged,
            vec![
                "from: default",
                "from: declared",
                "from: inline",
                "from: store",
                "from: script",
                "from: step",
            ]
        ),
        other => panic!("expected done, got {other:?}"),
    }
}

#[test]
fn local_only_chain_finishes_in_process() {
    let mut harness = Harness::new(Vec::new());
    harness.files = MemoryFiles::default().file("/svc/prod.yaml", "replicas: 2");
    let primary = k8s("svc", file_store(&["/svc"]), &["/svc/prod.yaml"]);
    match harness.orchestrator().start(&step(vec![primary])) {
        ChainResult::Done { merged } => assert_eq!(merged, vec!["replicas: 2"]),
        other => panic!("expected done, got {other:?}"),
    }
    let events = harness.log.events.borrow();
    assert_eq!(events.first(), Some(&LogEvent::Open(UNIT.to_string())));
    assert_eq!(
        events.last(),
        Some(&LogEvent::Close(UNIT.to_string(), UnitStatus::Success))
    );
}

#[test]
fn snapshot_resumes_in_another_process() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let manifests = vec![
        git_primary(),
        values("generated", 1, script("out/values.yaml")),
    ];
    let (_, state) = expect_continue(harness.orchestrator().start(&step(manifests)));
    let reply = FetchRoundReply::success(
        RoundKind::Custom,
        contents(&[("generated", &["image: v2"])]),
    );

    let direct = harness.orchestrator().resume(state.clone(), reply.clone());

    let encoded = serde_json::to_string(&state).expect("encode state");
    let decoded: ChainState = serde_json::from_str(&encoded).expect("decode state");
    assert_eq!(decoded, state);
    let other = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let resumed = other.orchestrator().resume(decoded, reply);
    assert_eq!(resumed, direct);
}

#[test]
fn edited_snapshot_is_rejected() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let (_, mut state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));
    state.entries[1].required_if_missing = false;
    let reply = FetchRoundReply::success(RoundKind::VersionControl, BTreeMap::new());
    match orchestrator.resume(state, reply) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ChainStateCorruption)
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn reply_for_another_round_is_corruption() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let (_, state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));
    let reply = FetchRoundReply::success(RoundKind::HelmRepo, BTreeMap::new());
    match orchestrator.resume(state, reply) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::ChainStateCorruption);
            assert!(failure.message.contains("awaiting the version_control round"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn worker_failure_closes_every_running_unit() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let (_, state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));
    let mut reply = FetchRoundReply::failure(RoundKind::VersionControl, "authentication failed");
    reply.unit_progress = vec![UnitProgress {
        unit_name: "Git Fetch".to_string(),
        status: UnitStatus::Running,
    }];
    match orchestrator.resume(state, reply) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::RemoteFetchFailure);
            assert_eq!(failure.message, "authentication failed");
            assert_eq!(failure.unit_progress[0].status, UnitStatus::Failure);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    let closes = harness.log.closes();
    assert!(closes.contains(&(UNIT.to_string(), UnitStatus::Failure)));
    assert!(closes.contains(&("Git Fetch".to_string(), UnitStatus::Failure)));
}

#[test]
fn abort_discards_partial_results() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let orchestrator = harness.orchestrator();
    let (_, state) = expect_continue(orchestrator.start(&step(vec![git_primary()])));
    match orchestrator.abort(state, "step cancelled") {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::RemoteFetchFailure);
            assert_eq!(failure.message, "fetch chain aborted: step cancelled");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        harness.log.closes(),
        vec![(UNIT.to_string(), UnitStatus::Failure)]
    );
}

#[test]
fn aws_authenticated_registry_uses_ecr_variant() {
    let mut registry = connector("ecr", CredentialKind::OciHelm);
    registry.aws_auth = true;
    let mut harness = Harness::new(vec![registry]);
    harness.config.capabilities.oci_helm_enabled = true;
    harness.config.capabilities.oci_ecr_task_variant = true;
    let store = StoreConfig::OciRegistry(OciStore {
        connector_ref: "ecr".to_string(),
        base_path: "charts".to_string(),
    });
    let (request, _) = expect_continue(
        harness
            .orchestrator()
            .start(&step(vec![helm("api", store, None, &[])])),
    );
    assert_eq!(request.variant, RoundVariant::Ecr);
}

#[test]
fn delegate_selectors_are_deduplicated() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let mut apply = step(vec![
        git_primary(),
        values("generated", 1, script("out/values.yaml")),
    ]);
    apply.delegate_selectors = vec![" edge ".to_string(), "build-pool".to_string()];
    let (request, state) = expect_continue(harness.orchestrator().start(&apply));
    let expected = vec!["edge".to_string(), "build-pool".to_string()];
    assert_eq!(request.delegate_selectors, expected);
    assert_eq!(state.delegate_selectors, expected);
}

#[test]
fn invalid_step_timeout_is_configuration_error() {
    let harness = Harness::new(vec![connector("gh", CredentialKind::Github)]);
    let mut apply = step(vec![git_primary()]);
    apply.timeout = Some("soon".to_string());
    match harness.orchestrator().start(&apply) {
        ChainResult::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::InvalidManifestSet)
        }
        other => panic!("expected failure, got {other:?}"),
    }

    apply.timeout = Some("90s".to_string());
    let (request, _) = expect_continue(harness.orchestrator().start(&apply));
    assert_eq!(request.timeout_ms, 90_000);
}

#[test]
fn chain_result_serializes_with_status_tag() {
    let done = ChainResult::Done {
        merged: vec!["a: 1".to_string()],
    };
    let value = serde_json::to_value(&done).expect("encode result");
    assert_eq!(value["status"], "done");
    assert_eq!(done.status(), "done");
    let back: ChainResult = serde_json::from_value(value).expect("decode result");
    assert_eq!(back, done);
}
