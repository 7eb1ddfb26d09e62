//! Firmware build and load through the external build tool
//!
//! The tool is modelled as a typed collaborator. `NewtTool` drives the Mynewt
//! `newt` command line; tests substitute their own `FirmwareBuilder`.

use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use tokio::process::Command as TokioCommand;

use crate::config::FirmwareConfig;
use crate::errors::{HarnessError, Result};

/// Application image flashed onto a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareApp {
    /// Boot-loader image
    Boot,
    /// Watchdog acceptance-test application
    Watchdog,
    /// Any other application under the project's app directory
    Named(String),
}

impl FirmwareApp {
    pub fn name(&self) -> &str {
        match self {
            FirmwareApp::Boot => "boot",
            FirmwareApp::Watchdog => "watchdog",
            FirmwareApp::Named(name) => name,
        }
    }

    pub fn is_boot(&self) -> bool {
        matches!(self, FirmwareApp::Boot)
    }
}

/// Fully specified build target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub name: String,
    pub app: String,
    pub bsp: String,
    pub build_profile: String,
}

impl TargetSpec {
    pub fn new(config: &FirmwareConfig, board: &str, app: &FirmwareApp) -> Self {
        let (app_path, build_profile) = if app.is_boot() {
            (config.boot_app.clone(), config.boot_build_profile.clone())
        } else {
            (
                format!("{}{}", config.app_prefix, app.name()),
                config.build_profile.clone(),
            )
        };
        Self {
            name: target_name(board, app),
            app: app_path,
            bsp: format!("{}{}", config.bsp_prefix, board),
            build_profile,
        }
    }
}

/// Target names are `<board>-<app>`
pub fn target_name(board: &str, app: &FirmwareApp) -> String {
    format!("{}-{}", board, app.name())
}

/// Captured output of a successful tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
}

/// Build tool operations
#[async_trait]
pub trait FirmwareBuilder: Send + Sync {
    async fn target_exists(&self, name: &str) -> bool;
    async fn create_target(&self, name: &str) -> Result<ToolOutput>;
    async fn configure_target(&self, target: &TargetSpec) -> Result<ToolOutput>;
    async fn build(&self, name: &str) -> Result<ToolOutput>;
    async fn create_image(&self, name: &str) -> Result<ToolOutput>;
    async fn load_image(&self, name: &str) -> Result<ToolOutput>;
}

/// Create (if needed), configure, build, image and load one application.
///
/// Boot-loader targets are loaded without creating a versioned image.
pub async fn build_and_load(
    builder: &dyn FirmwareBuilder,
    config: &FirmwareConfig,
    board: &str,
    app: &FirmwareApp,
) -> Result<()> {
    let target = TargetSpec::new(config, board, app);

    if builder.target_exists(&target.name).await {
        debug!("Target {} already exists", target.name);
    } else {
        info!("Creating target {}", target.name);
        builder.create_target(&target.name).await?;
    }
    builder.configure_target(&target).await?;

    info!("Building target {}", target.name);
    builder.build(&target.name).await?;
    if !app.is_boot() {
        info!("Creating image for target {}", target.name);
        builder.create_image(&target.name).await?;
    }

    info!("Loading target {}", target.name);
    builder.load_image(&target.name).await?;
    Ok(())
}

/// `newt` command line driver
#[derive(Debug, Clone)]
pub struct NewtTool {
    tool: String,
    project_dir: Option<PathBuf>,
}

impl NewtTool {
    pub fn new(config: &FirmwareConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            project_dir: config.project_dir.clone(),
        }
    }

    /// Locate the tool executable on `PATH`
    pub fn check_available(&self) -> Result<PathBuf> {
        which::which(&self.tool).map_err(|e| {
            HarnessError::Config(format!("build tool '{}' not found: {}", self.tool, e))
        })
    }

    async fn run(&self, target: &str, args: &[&str]) -> Result<ToolOutput> {
        debug!("Running {} {}", self.tool, args.join(" "));

        let mut command = TokioCommand::new(&self.tool);
        command.args(args);
        if let Some(dir) = &self.project_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| HarnessError::FlashFailure {
                target: target.to_string(),
                message: format!("failed to run {}: {}", self.tool, e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            debug!("{}", stdout.trim_end());
            Ok(ToolOutput { stdout })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("{} {} exited with {}", self.tool, args.join(" "), output.status)
            } else {
                stderr.trim().to_string()
            };
            Err(HarnessError::FlashFailure {
                target: target.to_string(),
                message,
            })
        }
    }
}

#[async_trait]
impl FirmwareBuilder for NewtTool {
    async fn target_exists(&self, name: &str) -> bool {
        self.run(name, &["target", "show", name]).await.is_ok()
    }

    async fn create_target(&self, name: &str) -> Result<ToolOutput> {
        self.run(name, &["target", "create", name]).await
    }

    async fn configure_target(&self, target: &TargetSpec) -> Result<ToolOutput> {
        let app = format!("app={}", target.app);
        let bsp = format!("bsp={}", target.bsp);
        let profile = format!("build_profile={}", target.build_profile);
        self.run(&target.name, &["target", "set", &target.name, &app, &bsp, &profile])
            .await
    }

    async fn build(&self, name: &str) -> Result<ToolOutput> {
        self.run(name, &["build", name]).await
    }

    async fn create_image(&self, name: &str) -> Result<ToolOutput> {
        self.run(name, &["create-image", name, "timestamp"]).await
    }

    async fn load_image(&self, name: &str) -> Result<ToolOutput> {
        self.run(name, &["load", name]).await
    }
}
