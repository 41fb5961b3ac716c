//! Explicit finite-difference stepper for 1-D minority-carrier diffusion with
//! recombination, `dn/dt = D d²n/dx² - n/tau`.
//!
//! The grid is a rank-2 tensor shaped `[2, num_points]`: row 0 holds the
//! concentration `n`, row 1 the rate `dn` last applied to it. Each step reads
//! only from a snapshot of the previous grid, so the update does not depend
//! on the order in which points are visited. The first and last points are
//! pinned and never updated.

use crate::error::{Result, SimError};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

pub const CONCENTRATION: usize = 0;
pub const RATE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionParams {
    /// Diffusion coefficient `D` (cm^2/s).
    pub diffusion_coefficient: f64,
    /// Carrier lifetime `tau` (s).
    pub lifetime: f64,
    /// Grid spacing (cm).
    pub dx: f64,
    /// Time step (s).
    pub dt: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            diffusion_coefficient: 35.0,
            lifetime: 1e-3,
            dx: 0.01,
            dt: 1e-6,
        }
    }
}

impl DiffusionParams {
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64, name: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidParameter(format!(
                    "{name} must be finite and positive (got {value})"
                )))
            }
        };
        if !self.diffusion_coefficient.is_finite() || self.diffusion_coefficient < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "diffusion_coefficient must be finite and non-negative (got {})",
                self.diffusion_coefficient
            )));
        }
        positive(self.lifetime, "lifetime")?;
        positive(self.dx, "dx")?;
        positive(self.dt, "dt")
    }

    /// `2 D dt / dx² + dt / tau`. The explicit scheme keeps concentrations
    /// non-negative and bounded only while this stays at or below 1.
    pub fn stability_number(&self) -> f64 {
        2.0 * self.diffusion_coefficient * self.dt / (self.dx * self.dx) + self.dt / self.lifetime
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub n: f32,
    pub dn: f32,
}

/// Number of points in a `[2, num_points]` grid.
pub fn grid_points(grid: &Tensor) -> Result<usize> {
    if grid.ndims() != 2 {
        return Err(SimError::DimensionMismatch {
            op: "diffusion_grid",
            expected: 2,
            actual: grid.ndims(),
        });
    }
    if grid.shape()[0] != 2 {
        return Err(SimError::ShapeMismatch {
            op: "diffusion_grid",
            expected: vec![2, grid.shape()[1]],
            actual: grid.shape().to_vec(),
        });
    }
    Ok(grid.shape()[1])
}

pub fn new_grid(num_points: usize) -> Result<Tensor> {
    Tensor::new(&[2, num_points])
}

pub fn point(grid: &Tensor, i: usize) -> Result<GridPoint> {
    Ok(GridPoint {
        n: grid.get(&[CONCENTRATION, i])?,
        dn: grid.get(&[RATE, i])?,
    })
}

pub fn set_point(grid: &mut Tensor, i: usize, value: GridPoint) -> Result<()> {
    grid.set(&[CONCENTRATION, i], value.n)?;
    grid.set(&[RATE, i], value.dn)
}

/// Every point but the last starts at `(n0, 0)`; the last is held at zero.
pub fn injection_profile(num_points: usize, n0: f32) -> Result<Tensor> {
    let mut grid = new_grid(num_points)?;
    let injected = GridPoint { n: n0, dn: 0.0 };
    for i in 0..num_points.saturating_sub(1) {
        set_point(&mut grid, i, injected)?;
    }
    Ok(grid)
}

#[derive(Debug, Clone, Copy)]
struct Coefficients {
    d_over_dx2: f32,
    inv_tau: f32,
    dt: f32,
}

impl Coefficients {
    fn rate(&self, left: f32, center: f32, right: f32) -> f32 {
        self.d_over_dx2 * (left - 2.0 * center + right) - center * self.inv_tau
    }
}

pub struct DiffusionStepper {
    coefficients: Coefficients,
    snapshot: Option<Tensor>,
}

impl DiffusionStepper {
    pub fn new(params: DiffusionParams) -> Result<Self> {
        params.validate()?;
        let stability = params.stability_number();
        if stability > 1.0 {
            log::warn!(
                "explicit diffusion step is outside its stability bound ({stability:.3} > 1); \
                 reduce dt or increase dx"
            );
        }
        Ok(Self {
            coefficients: Coefficients {
                d_over_dx2: (params.diffusion_coefficient / (params.dx * params.dx)) as f32,
                inv_tau: (1.0 / params.lifetime) as f32,
                dt: params.dt as f32,
            },
            snapshot: None,
        })
    }

    /// Copies `grid` into the snapshot buffer, reallocating it only when the
    /// grid shape changes.
    fn refresh_snapshot(&mut self, grid: &Tensor) -> Result<&Tensor> {
        let snapshot = match self.snapshot.take() {
            Some(mut previous) if previous.shape() == grid.shape() => {
                previous.copy_from(grid)?;
                previous
            }
            _ => grid.try_clone()?,
        };
        Ok(&*self.snapshot.insert(snapshot))
    }

    /// Advances every interior point by one time step.
    pub fn step(&mut self, grid: &mut Tensor) -> Result<()> {
        let num_points = grid_points(grid)?;
        if num_points < 3 {
            return Ok(());
        }
        let c = self.coefficients;
        let previous = self.refresh_snapshot(grid)?;
        let n = previous.slab(CONCENTRATION)?;

        for i in 1..num_points - 1 {
            let rate = c.rate(n[i - 1], n[i], n[i + 1]);
            set_point(
                grid,
                i,
                GridPoint {
                    n: n[i] + c.dt * rate,
                    dn: rate,
                },
            )?;
        }
        Ok(())
    }
}

/// Runs `steps` records of the diffusion process from `grid`.
///
/// Returns a `[steps, 2, num_points]` accumulator whose slab `k` is the grid
/// after `k` updates, so slab 0 is the initial grid and `grid` itself ends
/// after `steps - 1` updates.
pub fn run_diffusion(params: DiffusionParams, grid: &mut Tensor, steps: usize) -> Result<Tensor> {
    let num_points = grid_points(grid)?;
    let mut stepper = DiffusionStepper::new(params)?;
    let mut results = Tensor::new(&[steps, 2, num_points])?;
    for step in 0..steps {
        results.copy_into_slab(grid, step)?;
        if step + 1 < steps {
            stepper.step(grid)?;
        }
    }
    log::debug!("diffusion: {steps} records over {num_points} grid points");
    Ok(results)
}
