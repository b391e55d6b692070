use super::error::EngineError;
use crate::core::math::matrix3::{
    DEFAULT_JACOBI_ITERATIONS, columns_from_vectors, permute_columns_into, svd3,
};
use crate::core::math::permutation::Permutation;
use crate::core::models::pair_group::{ANGLE_REPULSION_SCALE, PairGroup, timescale_impulse_factor};
use itertools::Itertools;
use nalgebra::{Matrix3, Matrix3xX, Vector3};
use std::f64::consts::PI;
use tracing::trace;

const DIRECTION_EPSILON: f64 = 1e-12;
const CLOSE_PUSH_RATE: f64 = 2.0;
const FAR_PULL_RATE: f64 = 0.5;
const FLIP_DAMPING: f64 = 0.5;

/// Best assignment of current groups to template slots.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMapping {
    /// Sum of squared distances between current orientations and `target`.
    pub error: f64,
    /// Rotated, permuted template: column `i` is where group `i` should point.
    pub target: Matrix3xX<f64>,
    /// Group `i` occupies template slot `permutation[i]`.
    pub permutation: Permutation,
    /// Rotation taking template orientations onto the current frame.
    pub rotation: Matrix3<f64>,
}

impl ResultMapping {
    pub fn rotate_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * v
    }

    pub fn target_orientation(&self, index: usize) -> Vector3<f64> {
        self.target.column(index).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingOptions {
    pub jacobi_iterations: usize,
    pub prune: bool,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            jacobi_iterations: DEFAULT_JACOBI_ITERATIONS,
            prune: true,
        }
    }
}

/// The rotation `R` minimizing `Σ‖Y − R·X‖²` for matching column sets.
pub fn optimal_rotation(
    x: &Matrix3xX<f64>,
    y: &Matrix3xX<f64>,
    jacobi_iterations: usize,
) -> Matrix3<f64> {
    let s: Matrix3<f64> = x * y.transpose();
    let svd = svd3(&s, jacobi_iterations);
    svd.v * svd.u.transpose()
}

/// Fits one candidate. The permuted template is left in `permuted`.
fn fit_candidate(
    ideal: &Matrix3xX<f64>,
    current: &Matrix3xX<f64>,
    permutation: &Permutation,
    jacobi_iterations: usize,
    permuted: &mut Matrix3xX<f64>,
) -> (f64, Matrix3<f64>) {
    permute_columns_into(ideal, permutation, permuted);
    let rotation = optimal_rotation(permuted, current, jacobi_iterations);
    let error: f64 = current
        .column_iter()
        .zip(permuted.column_iter())
        .map(|(c, p)| (c - rotation * p).norm_squared())
        .sum();
    (error, rotation)
}

fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Finds the permutation and rotation that best align `ideal` with `current`.
///
/// `last_permutation`, when it is one of `allowed_permutations`, is evaluated
/// first so that the previous frame's answer seeds the pruning bound. A
/// candidate only replaces the current best with a strictly smaller error.
///
/// With more than two groups, candidates are skipped when the angular mismatch
/// between the first two groups alone guarantees a worse error than the best
/// seen so far. An empty neighborhood matches trivially with zero error.
pub fn find_closest_matching_configuration(
    current: &[Vector3<f64>],
    ideal: &[Vector3<f64>],
    allowed_permutations: &[Permutation],
    last_permutation: Option<&Permutation>,
    options: MatchingOptions,
) -> Result<ResultMapping, EngineError> {
    let n = current.len();
    if ideal.len() != n {
        return Err(EngineError::Matching(format!(
            "{n} current orientations cannot match {} ideal orientations",
            ideal.len()
        )));
    }
    if let Some(bad) = allowed_permutations.iter().find(|p| p.size() != n) {
        return Err(EngineError::Matching(format!(
            "permutation {bad} does not act on {n} groups"
        )));
    }
    if n == 0 {
        return Ok(ResultMapping {
            error: 0.0,
            target: Matrix3xX::zeros(0),
            permutation: Permutation::identity(0),
            rotation: Matrix3::identity(),
        });
    }

    let current_matrix = columns_from_vectors(current);
    let ideal_matrix = columns_from_vectors(ideal);
    let mut permuted = Matrix3xX::zeros(n);
    let mut best: Option<(f64, Matrix3<f64>, &Permutation)> = None;

    if let Some(seed) = last_permutation.filter(|p| allowed_permutations.contains(p)) {
        let (error, rotation) = fit_candidate(
            &ideal_matrix,
            &current_matrix,
            seed,
            options.jacobi_iterations,
            &mut permuted,
        );
        best = Some((error, rotation, seed));
    }

    let current_angle = (n > 2).then(|| angle_between(&current[0], &current[1]));

    for permutation in allowed_permutations {
        if options.prune {
            if let (Some((best_error, _, _)), Some(current_angle)) = (&best, current_angle) {
                let ideal_angle =
                    angle_between(&ideal[permutation.get(0)], &ideal[permutation.get(1)]);
                let half_gap = (ideal_angle - current_angle).abs() / 2.0;
                let lower_bound = 4.0 - 4.0 * half_gap.cos();
                if lower_bound > *best_error {
                    continue;
                }
            }
        }

        let (error, rotation) = fit_candidate(
            &ideal_matrix,
            &current_matrix,
            permutation,
            options.jacobi_iterations,
            &mut permuted,
        );
        let improves = match &best {
            Some((best_error, _, _)) => error < *best_error,
            None => true,
        };
        if improves {
            best = Some((error, rotation, permutation));
        }
    }

    let (error, rotation, permutation) =
        best.ok_or_else(|| EngineError::Matching("no candidate permutations".to_string()))?;
    permute_columns_into(&ideal_matrix, permutation, &mut permuted);
    Ok(ResultMapping {
        error,
        target: rotation * permuted,
        permutation: permutation.clone(),
        rotation,
    })
}

/// Frame-level inputs to [`apply_attractor_forces`].
#[derive(Debug, Clone, Copy)]
pub struct ForceRequest<'a> {
    pub dt: f64,
    /// Position of the atom the groups are arranged around.
    pub center: Vector3<f64>,
    pub angle_repulsion: bool,
    pub last_permutation: Option<&'a Permutation>,
    pub options: MatchingOptions,
}

#[derive(Debug, Clone)]
pub struct AttractorOutcome {
    pub mapping: ResultMapping,
    /// Root of the summed squared position deltas toward the fitted targets.
    pub error: f64,
}

/// Nudges `groups` toward the best-fitting placement of `ideal` around `request.center`.
///
/// Groups keep their current distance from the center; only their direction
/// is attracted. When `angle_repulsion` is set, every pair of groups is also
/// pushed toward its ideal angular separation.
pub fn apply_attractor_forces(
    groups: &mut [PairGroup],
    ideal: &[Vector3<f64>],
    allowed_permutations: &[Permutation],
    request: &ForceRequest<'_>,
) -> Result<AttractorOutcome, EngineError> {
    let dt = request.dt;
    let center = request.center;
    let current: Vec<Vector3<f64>> = groups
        .iter()
        .map(|group| {
            (group.position() - center)
                .try_normalize(DIRECTION_EPSILON)
                .unwrap_or_else(|| group.orientation())
        })
        .collect();

    let mapping = find_closest_matching_configuration(
        &current,
        ideal,
        allowed_permutations,
        request.last_permutation,
        request.options,
    )?;

    let around_origin = center == Vector3::zeros();
    let mut squared_error = 0.0;

    for (index, group) in groups.iter_mut().enumerate() {
        let distance = (group.position() - center).norm();
        let target_position = mapping.target_orientation(index) * distance + center;
        let delta = target_position - group.position();
        squared_error += delta.norm_squared();

        let strength = dt * 3.0 * delta.norm();
        if around_origin {
            if group.is_lone_pair() || !group.is_central_atom() {
                group.add_velocity(delta * strength);
            }
            if !group.is_central_atom() {
                group.add_position(delta * 2.0 * dt);
            }
        } else if !group.is_central_atom() {
            group.add_position(delta * (20.0 * dt).min(1.0));
        }
    }

    if request.angle_repulsion {
        let flipped = request
            .last_permutation
            .is_some_and(|last| *last != mapping.permutation);
        if flipped {
            trace!(permutation = %mapping.permutation, "Best-fit permutation changed");
        }
        let damping = if flipped { FLIP_DAMPING } else { 1.0 };
        let time_factor = timescale_impulse_factor(dt);

        for (a, b) in (0..groups.len()).tuple_combinations() {
            let current_angle = angle_between(&current[a], &current[b]);
            let target_angle = angle_between(
                &mapping.target_orientation(a),
                &mapping.target_orientation(b),
            );
            let delta = groups[a].position() - groups[b].position();
            let Some(direction) = delta.try_normalize(DIRECTION_EPSILON) else {
                continue;
            };

            let rate = if current_angle < target_angle {
                CLOSE_PUSH_RATE
            } else {
                FAR_PULL_RATE
            };
            let close_push = (3.0 * (PI - current_angle).powi(2) / (PI * PI)).clamp(1.0, 3.0);
            let push = direction
                * time_factor
                * (target_angle - current_angle)
                * ANGLE_REPULSION_SCALE
                * rate
                * close_push
                * damping;

            groups[a].add_velocity(push);
            groups[b].add_velocity(-push);
        }
    }

    Ok(AttractorOutcome {
        mapping,
        error: squared_error.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::ElectronGeometry;
    use crate::core::math::permutation::{permutations, restricted_permutations};
    use crate::core::models::pair_group::BONDED_PAIR_DISTANCE;
    use nalgebra::{Rotation3, Unit};

    fn all_permutations(n: usize) -> Vec<Permutation> {
        permutations(&(0..n).collect::<Vec<_>>())
            .into_iter()
            .filter_map(Permutation::from_indices)
            .collect()
    }

    fn test_rotation() -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::new(0.3, -1.0, 0.7)), 1.234)
    }

    fn brute_force(
        current: &[Vector3<f64>],
        ideal: &[Vector3<f64>],
        allowed: &[Permutation],
    ) -> ResultMapping {
        let options = MatchingOptions {
            prune: false,
            ..MatchingOptions::default()
        };
        find_closest_matching_configuration(current, ideal, allowed, None, options).unwrap()
    }

    #[test]
    fn optimal_rotation_recovers_a_known_rotation() {
        let ideal = ElectronGeometry::Octahedral.unit_vectors();
        let rotation = test_rotation();
        let rotated: Vec<_> = ideal.iter().map(|v| rotation * v).collect();

        let found = optimal_rotation(
            &columns_from_vectors(&ideal),
            &columns_from_vectors(&rotated),
            DEFAULT_JACOBI_ITERATIONS,
        );
        assert!((found - rotation.matrix()).abs().max() < 1e-9);
    }

    #[test]
    fn matching_recovers_a_rotated_and_permuted_tetrahedron() {
        let ideal = ElectronGeometry::Tetrahedral.unit_vectors();
        let hidden = Permutation::from_indices(vec![2, 0, 3, 1]).unwrap();
        let rotation = test_rotation();
        let current: Vec<_> = hidden.apply(&ideal).iter().map(|v| rotation * v).collect();

        let mapping = find_closest_matching_configuration(
            &current,
            &ideal,
            &all_permutations(4),
            None,
            MatchingOptions::default(),
        )
        .unwrap();

        assert!(mapping.error < 1e-12, "error was {}", mapping.error);
        for (i, orientation) in current.iter().enumerate() {
            assert!((mapping.target_orientation(i) - orientation).norm() < 1e-6);
        }
    }

    #[test]
    fn matching_finds_zero_error_with_lone_pair_restrictions() {
        let ideal = ElectronGeometry::TrigonalBipyramidal.unit_vectors();
        let allowed = restricted_permutations(5, &[vec![0, 1], vec![2, 3, 4]]);
        let hidden = Permutation::from_indices(vec![1, 0, 4, 2, 3]).unwrap();
        let rotation = test_rotation();
        let current: Vec<_> = hidden.apply(&ideal).iter().map(|v| rotation * v).collect();

        let options = MatchingOptions::default();
        let mapping =
            find_closest_matching_configuration(&current, &ideal, &allowed, None, options).unwrap();
        assert!(mapping.error < 1e-12);
        assert!(mapping.permutation.indices()[..2].iter().all(|&slot| slot < 2));
    }

    #[test]
    fn pruned_search_agrees_with_brute_force() {
        let ideal = ElectronGeometry::Octahedral.unit_vectors();
        let allowed = all_permutations(6);
        let current: Vec<_> = [
            Vector3::new(0.2, 0.1, 1.0),
            Vector3::new(1.0, 0.3, -0.2),
            Vector3::new(-0.1, 1.0, 0.4),
            Vector3::new(-1.0, 0.2, 0.1),
            Vector3::new(0.3, -1.0, -0.3),
            Vector3::new(-0.2, 0.1, -1.0),
        ]
        .iter()
        .map(|v| v.normalize())
        .collect();

        let exhaustive = brute_force(&current, &ideal, &allowed);
        let options = MatchingOptions::default();
        let pruned =
            find_closest_matching_configuration(&current, &ideal, &allowed, None, options).unwrap();
        assert!((exhaustive.error - pruned.error).abs() < 1e-9);
        assert!((exhaustive.target.clone() - pruned.target).abs().max() < 1e-6);

        let seeded = find_closest_matching_configuration(
            &current,
            &ideal,
            &allowed,
            Some(&allowed[17]),
            MatchingOptions::default(),
        )
        .unwrap();
        assert!((exhaustive.error - seeded.error).abs() < 1e-9);
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let ideal = ElectronGeometry::Linear.unit_vectors();
        let result = find_closest_matching_configuration(
            &[Vector3::x()],
            &ideal,
            &all_permutations(2),
            None,
            MatchingOptions::default(),
        );
        assert!(matches!(result, Err(EngineError::Matching(_))));
    }

    #[test]
    fn empty_neighborhood_matches_with_zero_error() {
        let mapping = find_closest_matching_configuration(
            &[],
            &ElectronGeometry::Empty.unit_vectors(),
            &[Permutation::identity(0)],
            None,
            MatchingOptions::default(),
        )
        .unwrap();
        assert_eq!(mapping.error, 0.0);
        assert_eq!(mapping.target.ncols(), 0);
        assert_eq!(mapping.rotation, Matrix3::identity());
    }

    #[test]
    fn disallowed_seed_cannot_win() {
        let ideal = ElectronGeometry::TrigonalBipyramidal.unit_vectors();
        let allowed = restricted_permutations(5, &[vec![0], vec![1, 2, 3, 4]]);
        // Group 0 sits in an axial slot, which only a disallowed permutation reaches.
        let axial = Permutation::from_indices(vec![3, 1, 2, 0, 4]).unwrap();
        let current = axial.apply(&ideal);
        assert!(!allowed.contains(&axial));

        let mapping = find_closest_matching_configuration(
            &current,
            &ideal,
            &allowed,
            Some(&axial),
            MatchingOptions::default(),
        )
        .unwrap();
        assert!(allowed.contains(&mapping.permutation));
        assert_eq!(mapping.permutation.get(0), 0);
        assert!(mapping.error > 1e-3);
    }

    #[test]
    fn single_group_matching_maps_onto_the_target() {
        let ideal = [Vector3::new(0.0, 0.0, -1.0)];
        let current = [Vector3::new(0.6, 0.8, 0.0)];
        let mapping = find_closest_matching_configuration(
            &current,
            &ideal,
            &[Permutation::identity(1)],
            None,
            MatchingOptions::default(),
        )
        .unwrap();
        assert!((mapping.rotate_vector(&ideal[0]) - current[0]).norm() < 1e-9);
        assert!((mapping.rotation.determinant() - 1.0).abs() < 1e-9);
    }

    fn groups_at(orientations: &[Vector3<f64>]) -> Vec<PairGroup> {
        orientations
            .iter()
            .map(|o| PairGroup::atom(o * BONDED_PAIR_DISTANCE, None))
            .collect()
    }

    #[test]
    fn groups_already_in_place_are_left_alone() {
        let ideal = ElectronGeometry::Tetrahedral.unit_vectors();
        let mut groups = groups_at(&ideal);
        let before = groups.clone();
        let identity = Permutation::identity(4);

        let outcome = apply_attractor_forces(
            &mut groups,
            &ideal,
            &all_permutations(4),
            &ForceRequest {
                dt: 0.016,
                center: Vector3::zeros(),
                angle_repulsion: true,
                last_permutation: Some(&identity),
                options: MatchingOptions::default(),
            },
        )
        .unwrap();

        assert!(outcome.error < 1e-9);
        for (after, before) in groups.iter().zip(&before) {
            assert!((after.position() - before.position()).norm() < 1e-9);
            assert!(after.velocity().norm() < 1e-9);
        }
    }

    #[test]
    fn displaced_groups_are_pulled_toward_the_template() {
        let ideal = ElectronGeometry::Linear.unit_vectors();
        let mut groups = groups_at(&[Vector3::x(), Vector3::new(-1.0, 0.0, 0.3).normalize()]);
        let opening = |groups: &[PairGroup]| {
            angle_between(&groups[0].orientation(), &groups[1].orientation())
        };
        let before = opening(&groups);

        let outcome = apply_attractor_forces(
            &mut groups,
            &ideal,
            &all_permutations(2),
            &ForceRequest {
                dt: 0.016,
                center: Vector3::zeros(),
                angle_repulsion: false,
                last_permutation: None,
                options: MatchingOptions::default(),
            },
        )
        .unwrap();

        assert!(outcome.error > 0.0);
        assert!(opening(&groups) > before);
        assert!(groups[0].velocity().z < 0.0);
        assert!(groups[1].velocity().z < 0.0);
    }

    #[test]
    fn angle_repulsion_separates_crowded_groups() {
        let ideal = ElectronGeometry::TrigonalPlanar.unit_vectors();
        let crowded = [
            Vector3::x(),
            Vector3::new(1.0, 0.2, 0.0).normalize(),
            Vector3::new(-1.0, 0.0, 0.0),
        ];
        let mut groups = groups_at(&crowded);

        apply_attractor_forces(
            &mut groups,
            &ideal,
            &all_permutations(3),
            &ForceRequest {
                dt: 0.016,
                center: Vector3::zeros(),
                angle_repulsion: true,
                last_permutation: None,
                options: MatchingOptions::default(),
            },
        )
        .unwrap();

        let separating = (groups[1].velocity() - groups[0].velocity()).dot(&Vector3::y());
        assert!(separating > 0.0);
    }

    #[test]
    fn central_atom_is_never_moved_off_center() {
        let ideal = ElectronGeometry::Linear.unit_vectors();
        let center = Vector3::x() * 10.0;
        let mut groups = vec![
            PairGroup::central_atom(None),
            PairGroup::lone_pair(center + Vector3::new(3.0, 6.0, 0.0)),
        ];

        apply_attractor_forces(
            &mut groups,
            &ideal,
            &[Permutation::identity(2)],
            &ForceRequest {
                dt: 0.016,
                center,
                angle_repulsion: false,
                last_permutation: None,
                options: MatchingOptions::default(),
            },
        )
        .unwrap();

        assert_eq!(groups[0].position(), Vector3::zeros());
        let lone_pair_direction = (groups[1].position() - center).normalize();
        assert!(lone_pair_direction.x > (Vector3::new(3.0, 6.0, 0.0)).normalize().x);
    }
}
