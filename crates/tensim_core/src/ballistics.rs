//! Point-mass flight under uniform gravity and quadratic-speed drag.
//!
//! The state vector is `(x, y, vx, vy)`. [`DragField`] is the slope function
//! shared by [`crate::solvers::ForwardEuler`] and [`crate::solvers::RK4`];
//! [`UpdateMatrixEuler`] is the linearised variant that freezes drag at the
//! current speed and applies a 4x4 update operator.

use crate::error::{ensure_len, Result, SimError};
use crate::linalg::{add, matrix_vector_multiply, squared_norm, Matrix};
use crate::traits::{Scalar, SlopeField};
use serde::{Deserialize, Serialize};

pub const STATE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallisticParams {
    /// Downward gravitational acceleration.
    pub gravity: f64,
    /// Drag coefficient divided by mass. For the linearised Euler variant this
    /// is the per-step drag factor multiplied by speed.
    pub drag_per_mass: f64,
}

impl Default for BallisticParams {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            drag_per_mass: 0.02,
        }
    }
}

impl BallisticParams {
    pub fn validate(&self) -> Result<()> {
        if !self.gravity.is_finite() {
            return Err(SimError::InvalidParameter(
                "gravity must be finite".to_string(),
            ));
        }
        if !self.drag_per_mass.is_finite() || self.drag_per_mass < 0.0 {
            return Err(SimError::InvalidParameter(
                "drag_per_mass must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn cast<T: Scalar>(value: f64, name: &str) -> Result<T> {
    T::from_f64(value)
        .ok_or_else(|| SimError::InvalidParameter(format!("{name} is not representable")))
}

/// `sqrt(vx^2 + vy^2)`.
pub fn speed<T: Scalar>(state: &[T]) -> Result<T> {
    ensure_len("ballistic_speed", STATE_LEN, state.len())?;
    Ok(squared_norm(&state[2..4]).sqrt())
}

/// `(vx, vy, -|v| k vx + fx, -|v| k vy + fy)` where `(fx, fy)` are the last two
/// components of the external acceleration vector.
pub struct DragField<T: Scalar> {
    drag_per_mass: T,
    force: Vec<T>,
}

impl<T: Scalar> DragField<T> {
    pub fn new(drag_per_mass: T, force: Vec<T>) -> Self {
        Self {
            drag_per_mass,
            force,
        }
    }

    /// Gravity acting on `vy` only.
    pub fn from_params(params: &BallisticParams) -> Result<Self> {
        params.validate()?;
        let g: T = cast(params.gravity, "gravity")?;
        let z = T::zero();
        Ok(Self::new(
            cast(params.drag_per_mass, "drag_per_mass")?,
            vec![z, z, z, -g],
        ))
    }

    pub fn force(&self) -> &[T] {
        &self.force
    }
}

impl<T: Scalar> SlopeField<T> for DragField<T> {
    fn dimension(&self) -> usize {
        STATE_LEN
    }

    fn slope(&self, _t: T, x: &[T], out: &mut [T]) -> Result<()> {
        ensure_len("ballistic_slope", self.force.len(), x.len())?;
        ensure_len("ballistic_slope", STATE_LEN, x.len())?;
        ensure_len("ballistic_slope", STATE_LEN, out.len())?;
        let vx = x[2];
        let vy = x[3];
        let drag = speed(x)? * self.drag_per_mass;
        out[0] = vx;
        out[1] = vy;
        out[2] = -drag * vx + self.force[2];
        out[3] = -drag * vy + self.force[3];
        Ok(())
    }
}

/// Fills `out` with the one-step operator
///
/// ```text
/// [1, 0, dt,       0      ]
/// [0, 1, 0,        dt     ]
/// [0, 0, 1 - drag, 0      ]
/// [0, 0, 0,        1 - drag]
/// ```
///
/// with `drag = speed(state) * drag_coefficient`.
pub fn update_matrix<T: Scalar>(
    out: &mut Matrix<T>,
    state: &[T],
    dt: T,
    drag_coefficient: T,
) -> Result<()> {
    ensure_len("update_matrix", STATE_LEN, out.rows())?;
    ensure_len("update_matrix", STATE_LEN, out.cols())?;
    let drag = speed(state)? * drag_coefficient;
    let z = T::zero();
    let o = T::one();
    let damped = o - drag;
    out.as_mut_slice().copy_from_slice(&[
        o, z, dt, z, //
        z, o, z, dt, //
        z, z, damped, z, //
        z, z, z, damped,
    ]);
    Ok(())
}

/// Linearised Euler: `state = U(state) * state + (0, 0, 0, -g dt)`.
///
/// The operator is rebuilt from the current speed on every step.
pub struct UpdateMatrixEuler<T: Scalar> {
    drag_coefficient: T,
    gravity: T,
    update: Matrix<T>,
    force: Vec<T>,
    next: Vec<T>,
}

impl<T: Scalar> UpdateMatrixEuler<T> {
    pub fn new(drag_coefficient: T, gravity: T) -> Result<Self> {
        Ok(Self {
            drag_coefficient,
            gravity,
            update: Matrix::zeros(STATE_LEN, STATE_LEN)?,
            force: vec![T::zero(); STATE_LEN],
            next: vec![T::zero(); STATE_LEN],
        })
    }

    pub fn from_params(params: &BallisticParams) -> Result<Self> {
        params.validate()?;
        Self::new(
            cast(params.drag_per_mass, "drag_per_mass")?,
            cast(params.gravity, "gravity")?,
        )
    }

    /// Rebuilds the operator for `state` without stepping.
    pub fn prepare(&mut self, state: &[T], dt: T) -> Result<&Matrix<T>> {
        update_matrix(&mut self.update, state, dt, self.drag_coefficient)?;
        self.force[3] = -self.gravity * dt;
        Ok(&self.update)
    }

    pub fn update(&self) -> &Matrix<T> {
        &self.update
    }

    /// Per-step gravitational impulse added after the multiply.
    pub fn force(&self) -> &[T] {
        &self.force
    }

    pub fn step(&mut self, state: &mut [T], dt: T) -> Result<()> {
        self.prepare(state, dt)?;
        matrix_vector_multiply(&mut self.next, &self.update, state)?;
        add(state, &self.next, &self.force)
    }
}
