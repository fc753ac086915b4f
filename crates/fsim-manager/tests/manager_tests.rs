//! Entry-point behavior: environment check, task lookup, `managerinit` and
//! dispatch through the default handlers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fsim_manager::{cli, ErrorKind, ManagerError, ManagerResult, TaskHandler, TaskInvocation, TaskRegistry};
use fsim_test_utils::{expect_failure, ConfigBundle, Invocation, StubHandler, TestEnv};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_yaml::Value;

#[test]
fn test_unsourced_environment_rejected() {
    let env = TestEnv::new();
    let mut registry = TaskRegistry::with_defaults();
    let stub = StubHandler::install(&mut registry, "buildafi");
    let bundle = env.build_bundle();
    bundle.write().unwrap();

    let result = Invocation::with_bundle("buildafi", &bundle).run(&env.unsourced_ctx(), &registry);

    expect_failure(result, ErrorKind::Environment, Some("source the environment script"));
    stub.assert_not_called();
}

#[test]
fn test_unknown_task_rejected_by_parser() {
    let err = cli::parse_args(["buildbitstream"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_unregistered_task_is_lookup_error() {
    let env = TestEnv::new();
    let result = Invocation::new("managerinit").run(env.ctx(), &TaskRegistry::new());
    let err = expect_failure(result, ErrorKind::Lookup, Some("managerinit"));
    assert!(matches!(err, ManagerError::UnknownTask(_)));
    assert!(!env.path().join("config_build.yaml").exists());
}

#[test]
fn test_managerinit_writes_defaults() {
    let env = TestEnv::new();
    env.managerinit();
    for name in [
        cli::defaults::BUILD,
        cli::defaults::BUILD_RECIPES,
        cli::defaults::BUILD_FARM,
        cli::defaults::HWDB,
        cli::defaults::RUNTIME,
    ] {
        let written = std::fs::read_to_string(env.path().join(name)).unwrap();
        let sample = std::fs::read_to_string(fsim_test_utils::sample_backup_configs().join(format!("sample_{name}"))).unwrap();
        assert_eq!(written, sample);
    }
}

#[test]
fn test_managerinit_refuses_to_overwrite() {
    let env = TestEnv::new();
    std::fs::write(env.path().join(cli::defaults::RUNTIME), "# mine\n").unwrap();

    let result = Invocation::new("managerinit").run(env.ctx(), &TaskRegistry::with_defaults());

    expect_failure(result, ErrorKind::Io, Some("refusing to overwrite"));
    let kept = std::fs::read_to_string(env.path().join(cli::defaults::RUNTIME)).unwrap();
    assert_eq!(kept, "# mine\n");
    assert!(!env.path().join(cli::defaults::BUILD).exists());
}

#[test]
fn test_default_flags_resolve_against_config_dir() {
    let env = TestEnv::new();
    env.managerinit();
    let mut registry = TaskRegistry::with_defaults();
    let stub = StubHandler::install(&mut registry, "buildafi");

    Invocation::new("buildafi").run(env.ctx(), &registry).unwrap();

    let call = stub.assert_called_once();
    let expected: Vec<_> = [
        cli::defaults::BUILD,
        cli::defaults::BUILD_RECIPES,
        cli::defaults::BUILD_FARM,
        cli::defaults::HWDB,
    ]
    .iter()
    .map(|name| env.path().join(name))
    .collect();
    assert_eq!(call.config_paths, expected);
}

#[test]
fn test_default_handlers_accept_samples() {
    let env = TestEnv::new();
    env.managerinit();
    let registry = TaskRegistry::with_defaults();
    for task in [
        "buildafi",
        "shareagfi",
        "launchrunfarm",
        "infrasetup",
        "boot",
        "kill",
        "terminaterunfarm",
        "runworkload",
        "runcheck",
        "checkconfig",
    ] {
        Invocation::new(task)
            .run(env.ctx(), &registry)
            .unwrap_or_else(|e| panic!("{task}: {e}"));
    }
}

#[test]
fn test_shareagfi_requires_published_agfi() {
    let env = TestEnv::new();
    let mut bundle = env.build_bundle();
    bundle.hwdb.data["firesim-boom-singlecore-no-nic-l2-llc4mb-ddr3"]["agfi"] = Value::Null;
    bundle.write().unwrap();

    let result = Invocation::with_bundle("shareagfi", &bundle).run(env.ctx(), &TaskRegistry::with_defaults());

    expect_failure(result, ErrorKind::Task, Some("no agfi recorded for 'firesim-boom-singlecore-no-nic-l2-llc4mb-ddr3'"));
}

#[test]
fn test_stub_state_is_per_registry() {
    let mut first = TaskRegistry::with_defaults();
    let stub = StubHandler::install(&mut first, "runcheck");
    let second = TaskRegistry::with_defaults();

    let env = TestEnv::new();
    let bundle = env.run_bundle();
    bundle.write().unwrap();
    Invocation::with_bundle("runcheck", &bundle).run(env.ctx(), &second).unwrap();

    stub.assert_not_called();
}

#[test]
fn test_overflowing_instance_counts_rejected() {
    let env = TestEnv::new();
    let mut bundle = env.run_bundle();
    for key in ["f1_16xlarges", "m4_16xlarges", "f1_4xlarges"] {
        bundle.runtime.data["run-farm"][key] = Value::from(i64::MAX);
    }
    bundle.write().unwrap();

    let result = Invocation::with_bundle("runcheck", &bundle).run(env.ctx(), &TaskRegistry::with_defaults());

    expect_failure(result, ErrorKind::Value, Some("instance count overflows"));
}

/// Records the link latency the handler was given
struct LatencyRecorder(Arc<AtomicU64>);

impl TaskHandler for LatencyRecorder {
    fn run(&self, invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
        if let Some(config) = invocation.runtime_config() {
            self.0.store(config.target.link_latency, Ordering::SeqCst);
        }
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_link_latency_override_reaches_handler(latency in 1u64..100_000) {
        let env = TestEnv::new();
        let bundle = env.run_bundle();
        bundle.write().unwrap();
        let seen = Arc::new(AtomicU64::new(0));
        let mut registry = TaskRegistry::with_defaults();
        registry.substitute("runcheck", LatencyRecorder(Arc::clone(&seen)));

        let result = Invocation::with_bundle("runcheck", &bundle)
            .arg("-x")
            .arg(format!("target-config link-latency {latency}"))
            .run(env.ctx(), &registry);

        prop_assert!(result.is_ok());
        prop_assert_eq!(seen.load(Ordering::SeqCst), latency);
    }
}
