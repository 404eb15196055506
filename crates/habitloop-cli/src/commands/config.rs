use std::path::PathBuf;

use clap::Subcommand;

use habitloop_core::EngineConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show {
        /// Configuration file
        #[arg(long)]
        path: PathBuf,
    },
    /// Write a configuration file with the default values
    Init {
        /// Configuration file
        #[arg(long)]
        path: PathBuf,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show { path } => {
            let config = EngineConfig::load(&path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init { path } => {
            EngineConfig::default().save(&path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
