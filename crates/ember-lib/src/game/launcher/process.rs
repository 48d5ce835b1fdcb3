use crate::game::launcher::types::LaunchPlan;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{ExitStatus, Stdio};

/// Spawn the game and wait for it to exit.
///
/// The child runs in `game_dir` and shares this process's stdout/stderr. It is
/// killed if the returned future is dropped before the child exits.
pub async fn launch_game(plan: &LaunchPlan, java: &Path, game_dir: &Path) -> Result<ExitStatus> {
    let mut command = tokio::process::Command::new(java);
    command
        .args(&plan.jvm_args)
        .arg(&plan.main_class)
        .args(&plan.game_args)
        .current_dir(game_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    log::info!(
        "Launching {} with {} JVM arguments and {} game arguments",
        plan.main_class,
        plan.jvm_args.len(),
        plan.game_args.len()
    );
    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to start {:?}", java))?;
    log::info!(
        "Game process started (PID: {}). Waiting for exit...",
        child.id().map(|id| id.to_string()).unwrap_or_else(|| "?".into())
    );

    let status = child.wait().await.context("Failed to wait for game process")?;
    log::info!("Game process exited with {}", status);
    Ok(status)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_in_game_directory() {
        let dir = tempfile::tempdir().unwrap();
        let plan = LaunchPlan {
            jvm_args: vec!["-c".into()],
            main_class: "pwd > cwd.txt; exit 3".into(),
            game_args: vec![],
        };

        let status = launch_game(&plan, Path::new("/bin/sh"), dir.path()).await.unwrap();
        assert_eq!(status.code(), Some(3));

        let cwd = std::fs::read_to_string(dir.path().join("cwd.txt")).unwrap();
        assert_eq!(
            dunce::canonicalize(cwd.trim()).unwrap(),
            dunce::canonicalize(dir.path()).unwrap()
        );
    }
}
