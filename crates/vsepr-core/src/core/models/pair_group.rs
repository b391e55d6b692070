use super::bond::Bond;
use super::element::Element;
use nalgebra::Vector3;

/// Resting distance between an atom and a bonded neighbor, in model units.
pub const BONDED_PAIR_DISTANCE: f64 = 10.0;
/// Resting distance between an atom and one of its lone pairs, in model units.
pub const LONE_PAIR_DISTANCE: f64 = 7.0;
pub const ELECTRON_PAIR_REPULSION_SCALE: f64 = 30_000.0;
pub const ANGLE_REPULSION_SCALE: f64 = 3.0;
/// Fraction of velocity lost per reference frame.
pub const DAMPING_FACTOR: f64 = 0.1;

/// Frame duration the damping and impulse tuning were calibrated against.
const REFERENCE_FRAME_TIME: f64 = 0.017;
const DISTANCE_ATTRACTION_RATE: f64 = 0.1;
const DISTANCE_ATTRACTION_FRAME: f64 = 0.016;
const COINCIDENT_DISTANCE: f64 = 1e-6;

/// Scales an impulse so that its effect is roughly independent of the frame
/// length, while damping the response to unusually long frames.
pub fn timescale_impulse_factor(dt: f64) -> f64 {
    dt * (REFERENCE_FRAME_TIME / dt).min(1.0).sqrt()
}

/// An electron domain around a center: either a bonded atom or a lone pair.
///
/// Positions are in model units relative to the molecule origin, where the
/// central atom sits. `orientation` always holds the normalized position unless
/// the group sits exactly at the origin, in which case the previous orientation
/// is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct PairGroup {
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    orientation: Vector3<f64>,
    is_lone_pair: bool,
    is_central_atom: bool,
    user_controlled: bool,
    element: Option<Element>,
}

impl PairGroup {
    pub fn new(position: Vector3<f64>, is_lone_pair: bool) -> Self {
        let mut group = Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: Vector3::zeros(),
            is_lone_pair,
            is_central_atom: false,
            user_controlled: false,
            element: None,
        };
        group.set_position(position);
        group
    }

    pub fn atom(position: Vector3<f64>, element: Option<Element>) -> Self {
        Self {
            element,
            ..Self::new(position, false)
        }
    }

    pub fn lone_pair(position: Vector3<f64>) -> Self {
        Self::new(position, true)
    }

    /// An atom fixed at the origin that every radial group is arranged around.
    pub fn central_atom(element: Option<Element>) -> Self {
        Self {
            is_central_atom: true,
            ..Self::atom(Vector3::zeros(), element)
        }
    }

    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    #[inline]
    pub fn orientation(&self) -> Vector3<f64> {
        self.orientation
    }

    #[inline]
    pub fn is_lone_pair(&self) -> bool {
        self.is_lone_pair
    }

    #[inline]
    pub fn is_central_atom(&self) -> bool {
        self.is_central_atom
    }

    #[inline]
    pub fn is_user_controlled(&self) -> bool {
        self.user_controlled
    }

    #[inline]
    pub fn element(&self) -> Option<Element> {
        self.element
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.velocity.iter()).all(|v| v.is_finite())
    }

    pub(crate) fn mark_central(&mut self) {
        self.is_central_atom = true;
    }

    pub fn set_user_controlled(&mut self, user_controlled: bool) {
        self.user_controlled = user_controlled;
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
        let magnitude = position.norm();
        if magnitude > 0.0 {
            self.orientation = position / magnitude;
        }
    }

    /// Adds `delta` to the velocity unless the group is pinned.
    pub fn add_velocity(&mut self, delta: Vector3<f64>) {
        if !self.user_controlled && !self.is_central_atom {
            self.velocity += delta;
        }
    }

    /// Moves the group by `delta` unless it is pinned.
    pub fn add_position(&mut self, delta: Vector3<f64>) {
        if !self.user_controlled && !self.is_central_atom {
            self.set_position(self.position + delta);
        }
    }

    /// Places the group under direct control, discarding any momentum.
    pub fn drag_to_position(&mut self, position: Vector3<f64>) {
        self.set_position(position);
        self.velocity = Vector3::zeros();
    }

    /// Integrates one frame of tangential motion followed by damping.
    ///
    /// The radial velocity component is removed first: distance from the
    /// center is governed only by [`attract_to_ideal_distance`](Self::attract_to_ideal_distance).
    pub fn step_forward(&mut self, dt: f64) {
        if self.user_controlled || self.is_central_atom {
            return;
        }

        let outward = self.velocity.dot(&self.orientation);
        self.velocity -= self.orientation * outward;

        self.set_position(self.position + self.velocity * dt);
        self.velocity *= (1.0 - DAMPING_FACTOR).powf(dt / REFERENCE_FRAME_TIME);
    }

    /// Pulls the group toward `bond.length` from its parent.
    ///
    /// If the frame moved the group further from its ideal distance than it was
    /// at `old_distance`, it is first snapped back onto the old-distance sphere.
    /// Lone pairs on terminal atoms jump straight to the ideal distance.
    pub fn attract_to_ideal_distance(
        &mut self,
        dt: f64,
        old_distance: f64,
        bond: &Bond,
        parent_position: Vector3<f64>,
    ) {
        if self.user_controlled {
            return;
        }

        let ideal_distance = bond.length;
        let offset = self.position - parent_position;
        let current_error = (offset.norm() - ideal_distance).abs();
        let old_error = (old_distance - ideal_distance).abs();

        if current_error > old_error {
            if let Some(direction) = offset.try_normalize(COINCIDENT_DISTANCE) {
                self.set_position(parent_position + direction * old_distance);
            }
        }

        let offset = self.position - parent_position;
        let distance = offset.norm();
        if distance < COINCIDENT_DISTANCE {
            return;
        }
        let direction = offset / distance;

        let is_terminal = parent_position.norm_squared() > 0.0;
        let ratio = if self.is_lone_pair && is_terminal {
            1.0
        } else {
            (DISTANCE_ATTRACTION_RATE * dt / DISTANCE_ATTRACTION_FRAME).min(1.0)
        };

        self.add_position(direction * (ideal_distance - distance) * ratio);
    }

    /// Pseudo-Coulomb impulse this group receives from `other`.
    ///
    /// `true_lengths_ratio` blends between treating both groups as sitting at
    /// [`BONDED_PAIR_DISTANCE`] (`0`) and using their actual distances (`1`).
    pub fn repulsion_impulse(
        &self,
        other: &PairGroup,
        dt: f64,
        true_lengths_ratio: f64,
    ) -> Vector3<f64> {
        let delta = self.position - other.position;
        if delta.norm() < COINCIDENT_DISTANCE {
            return Vector3::zeros();
        }

        let adjusted = |group: &PairGroup| {
            let radius = (1.0 - true_lengths_ratio) * BONDED_PAIR_DISTANCE
                + true_lengths_ratio * group.position.norm();
            group.orientation * radius
        };
        let adjusted_delta = adjusted(self) - adjusted(other);
        let distance_squared = adjusted_delta.norm_squared();
        if distance_squared < COINCIDENT_DISTANCE * COINCIDENT_DISTANCE {
            return Vector3::zeros();
        }

        adjusted_delta.normalize() * ELECTRON_PAIR_REPULSION_SCALE * timescale_impulse_factor(dt)
            / distance_squared
    }
}
