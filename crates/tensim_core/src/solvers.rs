use crate::error::{ensure_len, Result};
use crate::linalg::{add_assign, scalar_multiply, scalar_multiply_copy};
use crate::traits::{Scalar, SlopeField, Steppable};

/// Forward Euler: `y_next = y + dt * f(t, y)`.
pub struct ForwardEuler<T: Scalar> {
    slope: Vec<T>,
}

impl<T: Scalar> ForwardEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            slope: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for ForwardEuler<T> {
    fn step(
        &mut self,
        field: &impl SlopeField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        ensure_len("forward_euler_step", self.slope.len(), state.len())?;
        field.slope(*t, state, &mut self.slope)?;
        scalar_multiply(dt, &mut self.slope);
        add_assign(state, &self.slope)?;
        *t = *t + dt;
        Ok(())
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(
        &mut self,
        field: &impl SlopeField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        ensure_len("rk4_step", self.tmp.len(), state.len())?;
        let half = T::from_f64(0.5).unwrap_or_else(T::zero);
        let sixth = T::from_f64(1.0 / 6.0).unwrap_or_else(T::zero);
        let two = T::one() + T::one();

        let t0 = *t;

        // k1 = f(t, y)
        field.slope(t0, state, &mut self.k1)?;

        // k2 = f(t + dt/2, y + dt*k1/2)
        scalar_multiply_copy(&mut self.tmp, dt * half, &self.k1)?;
        add_assign(&mut self.tmp, state)?;
        field.slope(t0 + dt * half, &self.tmp, &mut self.k2)?;

        // k3 = f(t + dt/2, y + dt*k2/2)
        scalar_multiply_copy(&mut self.tmp, dt * half, &self.k2)?;
        add_assign(&mut self.tmp, state)?;
        field.slope(t0 + dt * half, &self.tmp, &mut self.k3)?;

        // k4 = f(t + dt, y + dt*k3)
        scalar_multiply_copy(&mut self.tmp, dt, &self.k3)?;
        add_assign(&mut self.tmp, state)?;
        field.slope(t0 + dt, &self.tmp, &mut self.k4)?;

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ForwardEuler, RK4};
    use crate::error::{Result, SimError};
    use crate::traits::{SlopeField, Steppable};

    struct Decay {
        rate: f64,
    }

    impl SlopeField<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn slope(&self, _t: f64, x: &[f64], out: &mut [f64]) -> Result<()> {
            out[0] = -self.rate * x[0];
            Ok(())
        }
    }

    fn integrate(stepper: &mut impl Steppable<f64>, steps: usize, dt: f64) -> f64 {
        let field = Decay { rate: 1.0 };
        let mut t = 0.0;
        let mut state = [1.0];
        for _ in 0..steps {
            stepper
                .step(&field, &mut t, &mut state, dt)
                .expect("step should succeed");
        }
        assert!((t - steps as f64 * dt).abs() < 1e-12);
        state[0]
    }

    #[test]
    fn euler_is_first_order_on_exponential_decay() {
        let exact = (-1.0f64).exp();
        let coarse = (integrate(&mut ForwardEuler::new(1), 100, 0.01) - exact).abs();
        let fine = (integrate(&mut ForwardEuler::new(1), 200, 0.005) - exact).abs();
        let ratio = coarse / fine;
        assert!((ratio - 2.0).abs() < 0.1, "ratio was {ratio}");
    }

    #[test]
    fn rk4_is_fourth_order_on_exponential_decay() {
        let exact = (-1.0f64).exp();
        let coarse = (integrate(&mut RK4::new(1), 10, 0.1) - exact).abs();
        let fine = (integrate(&mut RK4::new(1), 20, 0.05) - exact).abs();
        let ratio = coarse / fine;
        assert!((ratio - 16.0).abs() < 1.5, "ratio was {ratio}");
    }

    #[test]
    fn stepper_rejects_state_of_wrong_length() {
        let field = Decay { rate: 1.0 };
        let mut t = 0.0;
        let mut state = [1.0, 2.0];
        let err = RK4::new(1)
            .step(&field, &mut t, &mut state, 0.1)
            .expect_err("length mismatch");
        assert!(matches!(err, SimError::DimensionMismatch { .. }));
        assert_eq!(state, [1.0, 2.0]);
        assert_eq!(t, 0.0);
    }
}
