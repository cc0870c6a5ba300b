//! Constant-velocity Kalman filter over a 2D position

use anyhow::Result;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};

#[derive(Debug, Clone)]
pub struct KalmanFilterParams {
    pub x: Vector4<f32>, // Initial state [px, py, vx, vy]
    pub p: Matrix4<f32>, // Initial state covariance
    pub r: Matrix2<f32>, // Observation noise covariance
    pub q: Matrix4<f32>, // Process noise covariance
}

impl KalmanFilterParams {
    /// Zero state with identity-shaped covariances multiplied by the given scales
    pub fn scaled_identity(measurement_noise: f32, initial_uncertainty: f32, process_noise: f32) -> Self {
        Self {
            x: Vector4::zeros(),
            p: Matrix4::identity() * initial_uncertainty,
            r: Matrix2::identity() * measurement_noise,
            q: Matrix4::identity() * process_noise,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    pub x: Vector4<f32>,   // State vector
    pub p: Matrix4<f32>,   // State covariance matrix
    pub f: Matrix4<f32>,   // State transition matrix
    pub h: Matrix2x4<f32>, // Observation matrix
    pub r: Matrix2<f32>,   // Observation noise covariance
    pub q: Matrix4<f32>,   // Process noise covariance
    pub y: Vector2<f32>,   // Residual
    pub s: Matrix2<f32>,   // Innovation covariance
    pub k: Matrix4x2<f32>, // Kalman gain
}

impl KalmanFilter {
    pub fn new(params: KalmanFilterParams) -> Self {
        #[rustfmt::skip]
        let f = Matrix4::new(
            1.0, 0.0, 1.0, 0.0, // px' = px + vx
            0.0, 1.0, 0.0, 1.0, // py' = py + vy
            0.0, 0.0, 1.0, 0.0, // vx' = vx
            0.0, 0.0, 0.0, 1.0, // vy' = vy
        );
        #[rustfmt::skip]
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            x: params.x,
            p: params.p,
            f,
            h,
            r: params.r,
            q: params.q,
            y: Vector2::zeros(),
            s: Matrix2::zeros(),
            k: Matrix4x2::zeros(),
        }
    }

    /// Advance the state by one unit time step
    pub fn predict(&mut self) {
        // x = F * x
        self.x = self.f * self.x;

        // P = F * P * F^T + Q
        self.p = self.f * self.p * self.f.transpose() + self.q;
    }

    /// Correct the state with an observed position
    pub fn update(&mut self, z: Vector2<f32>) -> Result<()> {
        // Residual: y = z - H * x
        self.y = z - self.h * self.x;

        // Innovation covariance: S = H * P * H^T + R
        self.s = self.h * self.p * self.h.transpose() + self.r;

        // Kalman gain: K = P * H^T * S^-1
        let s_inv = self
            .s
            .try_inverse()
            .ok_or_else(|| anyhow::anyhow!("Failed to invert innovation covariance matrix"))?;
        self.k = self.p * self.h.transpose() * s_inv;

        // x = x + K * y
        self.x += self.k * self.y;

        // Joseph form keeps P symmetric: P = (I - KH) P (I - KH)^T + K R K^T
        let i_kh = Matrix4::identity() - self.k * self.h;
        self.p = i_kh * self.p * i_kh.transpose() + self.k * self.r * self.k.transpose();

        Ok(())
    }

    /// Filtered position `(px, py)`
    pub fn position(&self) -> (f32, f32) {
        (self.x[0], self.x[1])
    }

    /// Estimated velocity `(vx, vy)` in units per step
    pub fn velocity(&self) -> (f32, f32) {
        (self.x[2], self.x[3])
    }

    pub fn get_covariance(&self) -> &Matrix4<f32> {
        &self.p
    }
}
