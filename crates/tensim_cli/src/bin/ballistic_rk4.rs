use anyhow::Result;
use tensim_cli::config::{load_config, BallisticScenario};
use tensim_cli::{logging, scenarios};

fn main() -> Result<()> {
    logging::init();
    let config = load_config(BallisticScenario::rk4())?;
    let results = scenarios::ballistic_rk4(&config)?;
    scenarios::save_matrix(&config.output, &results, config.layout);
    Ok(())
}
