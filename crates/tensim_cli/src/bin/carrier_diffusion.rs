use anyhow::Result;
use tensim_cli::config::{load_config, DiffusionScenario};
use tensim_cli::{logging, scenarios};

fn main() -> Result<()> {
    logging::init();
    let config = load_config(DiffusionScenario::default())?;
    let results = scenarios::carrier_diffusion(&config)?;
    scenarios::save_tensor(&config.output, &results);
    Ok(())
}
