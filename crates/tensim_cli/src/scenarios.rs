use crate::config::{BallisticScenario, DiffusionScenario};
use anyhow::{Context, Result};
use std::path::Path;
use tensim_core::ballistics::{DragField, UpdateMatrixEuler};
use tensim_core::binary::{write_matrix, write_tensor, MatrixLayout};
use tensim_core::diffusion::{self, CONCENTRATION};
use tensim_core::linalg::{LabeledVector, Matrix};
use tensim_core::solvers::{ForwardEuler, RK4};
use tensim_core::trajectory::{integrate_trajectory, record_trajectory};
use tensim_core::traits::Steppable;
use tensim_core::Tensor;

const STEP_WARNING_THRESHOLD: usize = 1000;
const STATE_HEADER: &str = "\tx,\ty,\tvx,\tvy,";

fn announce_steps(steps: usize) {
    println!("Number of steps: {steps}");
    if steps > STEP_WARNING_THRESHOLD {
        log::warn!("Simulating more than {STEP_WARNING_THRESHOLD} steps.");
    }
}

/// Update-matrix Euler with the operator rebuilt from the current speed
/// after every step.
pub fn ballistic_linear_euler(config: &BallisticScenario) -> Result<Matrix> {
    config.validate()?;
    announce_steps(config.steps);
    let mut stepper = UpdateMatrixEuler::<f32>::from_params(&config.params)?;
    stepper.prepare(&config.initial_state, config.dt)?;
    println!("{}", stepper.update().labeled("Update Matrix"));
    println!("{}", LabeledVector::new("Force Vector", stepper.force()));
    println!("{}", LabeledVector::new("Initial State", &config.initial_state));

    let dt = config.dt;
    let results = record_trajectory(&config.initial_state, config.steps, |state| {
        stepper.step(state, dt)
    })?;
    println!("{}", results.labeled("Results"));
    Ok(results)
}

fn integrate_with(
    config: &BallisticScenario,
    stepper: &mut impl Steppable<f32>,
) -> Result<Matrix> {
    config.validate()?;
    announce_steps(config.steps);
    let field = DragField::<f32>::from_params(&config.params)?;
    println!("{}", LabeledVector::new("Force Vector", field.force()));
    println!("{}", LabeledVector::new("Initial State", &config.initial_state));

    let results = integrate_trajectory(
        stepper,
        &field,
        &config.initial_state,
        config.dt,
        config.steps,
    )?;
    println!("{STATE_HEADER}");
    println!("{}", results.labeled("Results"));
    Ok(results)
}

pub fn ballistic_euler(config: &BallisticScenario) -> Result<Matrix> {
    integrate_with(config, &mut ForwardEuler::new(config.initial_state.len()))
}

pub fn ballistic_rk4(config: &BallisticScenario) -> Result<Matrix> {
    integrate_with(config, &mut RK4::new(config.initial_state.len()))
}

/// Runs the diffusion grid and returns the `[steps, 2, num_points]` record.
pub fn carrier_diffusion(config: &DiffusionScenario) -> Result<Tensor> {
    config.validate()?;
    println!("Number of steps: {}", config.steps);
    let mut grid = diffusion::injection_profile(config.num_points, config.injection_level)?;
    println!(
        "{}",
        LabeledVector::new("Initial Concentration", grid.slab(CONCENTRATION)?)
    );

    let results = diffusion::run_diffusion(config.params, &mut grid, config.steps)?;
    println!("{}", concentration_history(&results)?.labeled("Concentration"));
    Ok(results)
}

/// `steps x num_points` matrix of the concentration row of every recorded
/// grid.
pub fn concentration_history(results: &Tensor) -> Result<Matrix> {
    let shape = results.shape();
    if shape.len() != 3 {
        anyhow::bail!("Expected a rank-3 diffusion record, got shape {:?}.", shape);
    }
    let mut history = Matrix::zeros(shape[0], shape[2])?;
    for step in 0..shape[0] {
        let grid = results.slice(step)?;
        history.place_vector(grid.slab(CONCENTRATION)?, step)?;
    }
    Ok(history)
}

/// Writes the results file. Failure is reported but does not end the run.
pub fn save_matrix(path: &Path, results: &Matrix, layout: MatrixLayout) -> bool {
    match write_matrix(path, results, layout).context("Failed to write results") {
        Ok(()) => true,
        Err(err) => {
            log::error!("{:#}", err);
            false
        }
    }
}

pub fn save_tensor(path: &Path, results: &Tensor) -> bool {
    match write_tensor(path, results).context("Failed to write results") {
        Ok(()) => true,
        Err(err) => {
            log::error!("{:#}", err);
            false
        }
    }
}
