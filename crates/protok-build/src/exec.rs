//! One-shot protoc execution.

use protok_util::errors::{ProtokError, ProtokResult};
use protok_util::process::CommandBuilder;

use crate::plan::InvocationPlan;

/// Run protoc with the plan's argument file.
///
/// The child starts with a cleared environment; nothing from the build
/// leaks into generators. stdout and stderr are forwarded to the logger.
/// When the plan has nothing to compile, protoc is not spawned at all.
pub fn execute(plan: &InvocationPlan) -> ProtokResult<()> {
    if plan.sources_to_compile.is_empty() {
        tracing::info!("nothing to compile, skipping protoc");
        return Ok(());
    }

    tracing::info!(
        "invoking {} with {} source file(s)",
        plan.protoc.display(),
        plan.sources_to_compile.len()
    );

    let output = CommandBuilder::new(&plan.protoc)
        .arg(format!("@{}", plan.argfile_path.display()))
        .clear_env()
        .exec()?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        tracing::info!("protoc: {line}");
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        tracing::warn!("protoc: {line}");
    }

    if !output.status.success() {
        let detail = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        return Err(ProtokError::Execution {
            message: format!("{} failed with {detail}", plan.protoc.display()),
        }
        .into());
    }
    Ok(())
}
