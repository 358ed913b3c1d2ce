use anyhow::{Context, Result, bail};
use std::process::ExitCode;
use tokio::process::{Child, Command};

use tutormate::config::Config;
use tutormate::startup::{HealthPoll, UiCommand, wait_until_healthy};

#[tokio::main]
async fn main() -> ExitCode {
    Config::load_dotenv();
    tutormate::init_tracing(Config::debug_requested());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::load();

    let server_bin = std::env::current_exe()
        .context("cannot locate launcher executable")?
        .with_file_name(format!("tutormate{}", std::env::consts::EXE_SUFFIX));
    tracing::info!("Starting API server: {}", server_bin.display());
    let mut server = Command::new(&server_bin)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {}", server_bin.display()))?;

    let url = config.health_url();
    let poll = HealthPoll::from_config(&config.startup);
    tracing::info!(
        attempts = poll.max_attempts,
        interval_ms = poll.interval.as_millis() as u64,
        "Waiting for {}",
        url
    );
    if let Err(e) = wait_until_healthy(&reqwest::Client::new(), &url, poll).await {
        stop(&mut server).await;
        bail!(e);
    }

    let ui_command = match UiCommand::parse(&config.startup.ui_command) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => {
            tracing::info!("No presentation-layer command configured; serving API only");
            let status = server.wait().await?;
            tracing::info!("API server exited with {}", status);
            return Ok(());
        }
        Err(e) => {
            stop(&mut server).await;
            bail!(e);
        }
    };

    tracing::info!("Starting presentation layer: {}", config.startup.ui_command);
    let mut ui = match Command::new(&ui_command.program)
        .args(&ui_command.args)
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            stop(&mut server).await;
            bail!(
                "failed to start presentation layer `{}`: {}",
                config.startup.ui_command,
                e
            );
        }
    };

    tokio::select! {
        status = ui.wait() => {
            tracing::info!("Presentation layer exited with {:?}", status);
        }
        status = server.wait() => {
            tracing::warn!("API server exited early with {:?}", status);
            stop(&mut ui).await;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            stop(&mut ui).await;
        }
    }
    stop(&mut server).await;
    Ok(())
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::debug!("Child already stopped: {}", e);
    }
}
