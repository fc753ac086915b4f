//! Built-in task handlers
//!
//! Orchestration backends are not part of this crate. Build and run handlers
//! report the plan the validated configs describe; `managerinit` is the only
//! task with side effects.

use std::path::PathBuf;

use crate::config::BuildFarm;
use crate::error::{ManagerError, ManagerResult};
use crate::registry::TaskInvocation;

/// Sample configs `managerinit` writes, as `(file name, contents)`
pub const SAMPLE_CONFIGS: &[(&str, &str)] = &[
    (
        "sample_config_build.yaml",
        include_str!("../sample-backup-configs/sample_config_build.yaml"),
    ),
    (
        "sample_config_build_recipes.yaml",
        include_str!("../sample-backup-configs/sample_config_build_recipes.yaml"),
    ),
    (
        "sample_config_build_farm.yaml",
        include_str!("../sample-backup-configs/sample_config_build_farm.yaml"),
    ),
    (
        "sample_config_hwdb.yaml",
        include_str!("../sample-backup-configs/sample_config_hwdb.yaml"),
    ),
    (
        "sample_config_runtime.yaml",
        include_str!("../sample-backup-configs/sample_config_runtime.yaml"),
    ),
];

fn wrong_config(invocation: &TaskInvocation<'_>) -> ManagerError {
    ManagerError::task(invocation.task, "task received configs for a different task family")
}

/// Write the sample configs into the config directory
///
/// # Errors
/// Returns error if a config already exists or a write fails
pub fn managerinit(invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
    let ctx = invocation.ctx;
    std::fs::create_dir_all(&ctx.config_dir).map_err(|e| ManagerError::io_error(&ctx.config_dir, e))?;

    let targets: Vec<(PathBuf, &str)> = SAMPLE_CONFIGS
        .iter()
        .map(|&(name, contents)| {
            let name = name.strip_prefix("sample_").unwrap_or(name);
            (ctx.config_dir.join(name), contents)
        })
        .collect();
    if let Some((path, _)) = targets.iter().find(|(path, _)| path.exists()) {
        return Err(ManagerError::AlreadyInitialized { path: path.clone() });
    }

    for (path, contents) in &targets {
        std::fs::write(path, contents).map_err(|e| ManagerError::io_error(path, e))?;
        tracing::info!(path = %path.display(), "wrote default config");
    }
    std::fs::create_dir_all(&ctx.workloads_dir).map_err(|e| ManagerError::io_error(&ctx.workloads_dir, e))?;
    println!("Initialized configs in {}", ctx.config_dir.display());
    Ok(())
}

fn farm_summary(farm: &BuildFarm) -> String {
    match farm {
        BuildFarm::AwsEc2F1(args) => {
            format!("{} {} instance", args.market.as_str(), args.instance_type)
        }
        BuildFarm::ExternallyProvisioned(args) => format!("hosts [{}]", args.hosts.join(", ")),
    }
}

/// Report the builds `config_build.yaml` requests
///
/// # Errors
/// Returns error if invoked without a build config
pub fn buildafi(invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
    let config = invocation.build_config().ok_or_else(|| wrong_config(invocation))?;
    tracing::info!(builds = config.builds.len(), "planning builds");
    for job in &config.builds {
        let farm = config
            .farms
            .get(&job.farm)
            .ok_or_else(|| ManagerError::task(invocation.task, format!("farm '{}' not resolved", job.farm)))?;
        println!(
            "build {} ({}) on {} [{}] in {}, upload to s3://{}",
            job.recipe.name,
            job.recipe.triplet(),
            job.farm,
            farm_summary(farm),
            farm.default_build_dir(),
            job.recipe.s3_bucket_name,
        );
        if let Some(hook) = &job.recipe.post_build_hook {
            println!("  post-build hook: {hook}");
        }
    }
    Ok(())
}

/// Report which published images would be shared with which accounts
///
/// # Errors
/// Returns error if a shared recipe has no agfi in the hardware database
pub fn shareagfi(invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
    let config = invocation.build_config().ok_or_else(|| wrong_config(invocation))?;
    for recipe in &config.agfis_to_share {
        let agfi = config
            .hwdb
            .get(recipe)
            .and_then(|hw| hw.agfi.as_deref())
            .ok_or_else(|| ManagerError::task(invocation.task, format!("no agfi recorded for '{recipe}'")))?;
        for (account, id) in &config.share_with_accounts {
            println!("share {agfi} ({recipe}) with {account} ({id})");
        }
    }
    Ok(())
}

/// Report that the run configs are valid
///
/// # Errors
/// Returns error if invoked without a runtime config
pub fn runcheck(invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
    let config = invocation.runtime_config().ok_or_else(|| wrong_config(invocation))?;
    println!(
        "config ok: topology {}, default hw {}, {} run farm instance(s), workload {}",
        config.target.topology,
        config.target.default_hw_config,
        config.run_farm.total_instances(),
        config.workload.name,
    );
    Ok(())
}

/// Report what a run-farm task would do
///
/// # Errors
/// Returns error if invoked without a runtime config
pub fn plan_run_task(invocation: &TaskInvocation<'_>) -> ManagerResult<()> {
    let config = invocation.runtime_config().ok_or_else(|| wrong_config(invocation))?;
    let farm = &config.run_farm;
    let action = match invocation.task {
        "launchrunfarm" => format!("launch {} instance(s)", farm.total_instances()),
        "infrasetup" => format!("set up simulation infrastructure for {}", config.target.topology),
        "boot" => format!("boot {} on {}", config.workload.name, config.target.topology),
        "kill" => "kill running simulations".to_string(),
        "terminaterunfarm" => "terminate run farm instances".to_string(),
        "runworkload" => format!("run {} to completion", config.workload.name),
        other => return Err(ManagerError::task(other, "no run plan for this task")),
    };
    tracing::info!(task = invocation.task, tag = %farm.tag, "planning run farm task");
    println!("{}: would {action} (run farm '{}')", invocation.task, farm.tag);
    Ok(())
}
