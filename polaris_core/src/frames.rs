// polaris_core/src/frames.rs

use nalgebra::{DMatrix, DVector, Quaternion, UnitQuaternion, Vector3};

pub use crate::types::FrameHandle;

pub mod layout;

/// A unique, hashable identifier for any coordinate frame the filter talks about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameId {
    /// The gravity-aligned frame in which the spherical sensor measures.
    World,
    /// The body frame the filter estimates (IMU centered).
    Body(FrameHandle),
    /// The reference point of a sensor.
    Sensor(FrameHandle),
}

/// An enum that defines every possible variable that can exist in a state vector.
/// The FrameId specifies which frame the variable is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateVariable {
    // --- Cartesian Position ---
    Px(FrameId),
    Py(FrameId),
    Pz(FrameId),
    // --- Cartesian Velocity ---
    Vx(FrameId),
    Vy(FrameId),
    Vz(FrameId),
    // --- Cartesian Acceleration ---
    Ax(FrameId),
    Ay(FrameId),
    Az(FrameId),
    // --- Orientation (as a quaternion) ---
    // Represents the rotation FROM the first frame TO the second frame.
    Qx(FrameId, FrameId),
    Qy(FrameId, FrameId),
    Qz(FrameId, FrameId),
    Qw(FrameId, FrameId),
    // --- Angular Velocity ---
    Wx(FrameId),
    Wy(FrameId),
    Wz(FrameId),
}

/// The state object handed around by estimator cores. It bundles the state
/// vector with its schema (the layout), covariance, and timestamp.
#[derive(Debug, Clone)]
pub struct FrameAwareState {
    /// The ordered "schema" of the state vector.
    pub layout: Vec<StateVariable>,
    /// The actual numerical data vector `x`.
    pub vector: DVector<f64>,
    /// The covariance matrix `P`.
    pub covariance: DMatrix<f64>,
    /// The timestamp of the last update.
    pub last_update_timestamp: f64,
}

impl FrameAwareState {
    /// Creates a new state with a given layout, initializing the vector to zero
    /// (with a valid identity quaternion) and the covariance to a scaled identity matrix.
    pub fn new(layout: Vec<StateVariable>, initial_covariance_val: f64, timestamp: f64) -> Self {
        let dim = layout.len();
        let mut vector = DVector::zeros(dim);

        // A zero quaternion is not a rotation; start from identity.
        if let Some(i) = layout
            .iter()
            .position(|var| matches!(var, StateVariable::Qw(_, _)))
        {
            vector[i] = 1.0;
        }

        Self {
            layout,
            vector,
            covariance: DMatrix::identity(dim, dim) * initial_covariance_val,
            last_update_timestamp: timestamp,
        }
    }

    /// Returns the dimension (number of rows) of the state vector.
    pub fn dim(&self) -> usize {
        self.layout.len()
    }

    /// Finds the index of a specific `StateVariable` in the layout.
    pub fn find_idx(&self, var: &StateVariable) -> Option<usize> {
        self.layout.iter().position(|v| v == var)
    }

    /// Reads three consecutive entries starting at `first`.
    pub fn get_vector3(&self, first: &StateVariable) -> Option<Vector3<f64>> {
        let idx = self.find_idx(first)?;
        if idx + 3 > self.dim() {
            return None;
        }
        Some(self.vector.fixed_rows::<3>(idx).into_owned())
    }

    /// Writes three consecutive entries starting at `first`. Returns false if
    /// the variable is not part of the layout.
    pub fn set_vector3(&mut self, first: &StateVariable, value: &Vector3<f64>) -> bool {
        match self.find_idx(first) {
            Some(idx) if idx + 3 <= self.dim() => {
                self.vector.fixed_rows_mut::<3>(idx).copy_from(value);
                true
            }
            _ => false,
        }
    }

    /// Returns the orientation stored as `[x, y, z, w]`, if the layout has one.
    pub fn get_orientation(&self) -> Option<UnitQuaternion<f64>> {
        let idx = self
            .layout
            .iter()
            .position(|var| matches!(var, StateVariable::Qx(_, _)))?;
        if idx + 4 > self.dim() {
            return None;
        }
        let q = Quaternion::new(
            self.vector[idx + 3],
            self.vector[idx],
            self.vector[idx + 1],
            self.vector[idx + 2],
        );
        Some(UnitQuaternion::new_normalize(q))
    }

    /// Stores an orientation as `[x, y, z, w]`. Returns false if the layout has none.
    pub fn set_orientation(&mut self, q: &UnitQuaternion<f64>) -> bool {
        match self
            .layout
            .iter()
            .position(|var| matches!(var, StateVariable::Qx(_, _)))
        {
            Some(idx) if idx + 4 <= self.dim() => {
                self.vector
                    .fixed_rows_mut::<4>(idx)
                    .copy_from(&q.quaternion().coords);
                true
            }
            _ => false,
        }
    }
}
