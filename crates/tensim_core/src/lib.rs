//! The `tensim_core` crate provides the numerical engine behind the tensim
//! scenario drivers.
//!
//! Key components:
//! - **Tensor**: owned, contiguous, row-major `f32` arrays with copy-out slicing.
//! - **Linalg**: `Vector`/`Matrix` and slice-level dot, add, scale and matrix-vector multiply.
//! - **Traits**: `Scalar` (numeric type abstraction), `SlopeField` (ODE
//!   right-hand sides), `Steppable` (Solvers).
//! - **Solvers**: Forward Euler and RK4, plus the update-matrix Euler in `ballistics`.
//! - **Diffusion**: explicit grid stepper for carrier diffusion with recombination.
//! - **Binary**: the flat tensor file format.
pub mod ballistics;
pub mod binary;
pub mod diffusion;
pub mod error;
pub mod linalg;
pub mod solvers;
pub mod tensor;
pub mod traits;
pub mod trajectory;

pub use error::{Result, SimError};
pub use linalg::{Matrix, Vector};
pub use tensor::Tensor;
