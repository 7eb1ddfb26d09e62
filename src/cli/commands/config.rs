//! Config command implementation

use anyhow::Result;

use crate::cli::args::ConfigAction;
use crate::config::HarnessConfig;

pub fn execute_config_command(config: &HarnessConfig, action: ConfigAction) -> Result<()> {
    let rendered = match action {
        ConfigAction::Init => HarnessConfig::default().to_toml()?,
        ConfigAction::Show => config.to_toml()?,
    };
    print!("{}", rendered);
    Ok(())
}
