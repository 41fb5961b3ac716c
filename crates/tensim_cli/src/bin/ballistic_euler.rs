use anyhow::Result;
use tensim_cli::config::{load_config, BallisticScenario};
use tensim_cli::{logging, scenarios};

fn main() -> Result<()> {
    logging::init();
    let config = load_config(BallisticScenario::euler())?;
    let results = scenarios::ballistic_euler(&config)?;
    scenarios::save_matrix(&config.output, &results, config.layout);
    Ok(())
}
