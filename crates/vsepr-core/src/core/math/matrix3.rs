//! Fixed-size 3×3 and 3×N kernels, and the signed 3×3 SVD.
//!
//! Kernels either read shared inputs and write a distinct `&mut` output, or
//! rewrite a single `&mut` buffer in place. Output buffers never alias inputs;
//! the borrow checker rejects any call that tries.

use nalgebra::{Matrix3, Matrix3xX, Vector3};

use super::permutation::Permutation;

/// Number of Jacobi sweeps used when no other value is configured.
pub const DEFAULT_JACOBI_ITERATIONS: usize = 5;

const QR_DEGENERATE_EPSILON: f64 = 1e-10;
const JACOBI_SKIP_EPSILON: f64 = 1e-300;
const COLUMN_COLLAPSE_EPSILON: f64 = 1e-9;

/// A signed singular value decomposition `A = U * Σ * Vᵀ` of a 3×3 matrix.
///
/// Both `U` and `V` are proper rotations (determinant `+1`). To keep them that
/// way the last singular value carries the sign of `det(A)`, so `Σ[2][2]` can be
/// negative for reflecting inputs. The first two are non-negative and the
/// magnitudes are sorted in descending order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Svd3 {
    pub u: Matrix3<f64>,
    pub sigma: Matrix3<f64>,
    pub v: Matrix3<f64>,
}

impl Svd3 {
    pub fn singular_values(&self) -> Vector3<f64> {
        self.sigma.diagonal()
    }

    pub fn reconstruct(&self) -> Matrix3<f64> {
        self.u * self.sigma * self.v.transpose()
    }
}

#[inline]
pub fn mult3(a: &Matrix3<f64>, b: &Matrix3<f64>, out: &mut Matrix3<f64>) {
    a.mul_to(b, out);
}

/// `out = a * bᵀ`
#[inline]
pub fn mult3_right_transpose(a: &Matrix3<f64>, b: &Matrix3<f64>, out: &mut Matrix3<f64>) {
    *out = a * b.transpose();
}

/// `out = aᵀ * b`
#[inline]
pub fn mult3_left_transpose(a: &Matrix3<f64>, b: &Matrix3<f64>, out: &mut Matrix3<f64>) {
    a.tr_mul_to(b, out);
}

#[inline]
pub fn transpose3(a: &Matrix3<f64>, out: &mut Matrix3<f64>) {
    a.transpose_to(out);
}

#[inline]
pub fn det3(a: &Matrix3<f64>) -> f64 {
    a.determinant()
}

/// Writes the Givens rotation acting on the `(idx0, idx1)` plane into `out`.
///
/// Layout: `G[idx0][idx0] = G[idx1][idx1] = cos`, `G[idx0][idx1] = sin`,
/// `G[idx1][idx0] = -sin`, identity elsewhere.
pub fn set_givens3(out: &mut Matrix3<f64>, cos: f64, sin: f64, idx0: usize, idx1: usize) {
    out.fill_with_identity();
    out[(idx0, idx0)] = cos;
    out[(idx1, idx1)] = cos;
    out[(idx0, idx1)] = sin;
    out[(idx1, idx0)] = -sin;
}

/// In-place `M = G * M` for the Givens rotation described by [`set_givens3`].
///
/// Only rows `idx0` and `idx1` of `m` change.
pub fn pre_mult3_givens(m: &mut Matrix3<f64>, cos: f64, sin: f64, idx0: usize, idx1: usize) {
    for col in 0..3 {
        let a = m[(idx0, col)];
        let b = m[(idx1, col)];
        m[(idx0, col)] = cos * a + sin * b;
        m[(idx1, col)] = cos * b - sin * a;
    }
}

/// In-place `M = M * Gᵀ` for the Givens rotation described by [`set_givens3`].
///
/// Only columns `idx0` and `idx1` of `m` change.
pub fn post_mult3_givens(m: &mut Matrix3<f64>, cos: f64, sin: f64, idx0: usize, idx1: usize) {
    for row in 0..3 {
        let a = m[(row, idx0)];
        let b = m[(row, idx1)];
        m[(row, idx0)] = cos * a + sin * b;
        m[(row, idx1)] = cos * b - sin * a;
    }
}

/// In place, moves column `idx1` into `idx0` and stores the negated old `idx0`
/// in `idx1`.
///
/// The determinant is unchanged.
pub fn swap_negate_column(m: &mut Matrix3<f64>, idx0: usize, idx1: usize) {
    for row in 0..3 {
        let previous = m[(row, idx0)];
        m[(row, idx0)] = m[(row, idx1)];
        m[(row, idx1)] = -previous;
    }
}

/// Reorders the columns of a 3×N matrix: column `i` of the result is column
/// `permutation[i]` of `matrix`.
pub fn permute_columns(matrix: &Matrix3xX<f64>, permutation: &Permutation) -> Matrix3xX<f64> {
    let mut out = Matrix3xX::zeros(permutation.size());
    permute_columns_into(matrix, permutation, &mut out);
    out
}

/// [`permute_columns`] writing into `out`, which is only reallocated when its
/// column count differs from the permutation size.
pub fn permute_columns_into(
    matrix: &Matrix3xX<f64>,
    permutation: &Permutation,
    out: &mut Matrix3xX<f64>,
) {
    if out.ncols() != permutation.size() {
        *out = Matrix3xX::zeros(permutation.size());
    }
    for col in 0..permutation.size() {
        out.set_column(col, &matrix.column(permutation.get(col)));
    }
}

/// Builds a 3×N matrix whose columns are the given vectors. An empty slice
/// gives a 3×0 matrix.
pub fn columns_from_vectors(vectors: &[Vector3<f64>]) -> Matrix3xX<f64> {
    Matrix3xX::from_fn(vectors.len(), |row, col| vectors[col][row])
}

/// One cyclic Jacobi rotation zeroing `S[p][q]` of the symmetric matrix `s`.
///
/// Applies `S = G * S * Gᵀ` and accumulates `Q = G * Q`.
fn jacobi_rotate(s: &mut Matrix3<f64>, q: &mut Matrix3<f64>, p: usize, r: usize) {
    let off_diagonal = s[(p, r)];
    if off_diagonal.abs() < JACOBI_SKIP_EPSILON {
        return;
    }
    let angle = 0.5 * (2.0 * off_diagonal).atan2(s[(p, p)] - s[(r, r)]);
    let (sin, cos) = angle.sin_cos();
    pre_mult3_givens(s, cos, sin, p, r);
    post_mult3_givens(s, cos, sin, p, r);
    pre_mult3_givens(q, cos, sin, p, r);
}

/// Zeroes `R[row][col]` (with `row > col`) and accumulates the transpose of the
/// rotation into `q`, so that `Q * R` is preserved.
fn qr_annihilate(q: &mut Matrix3<f64>, r: &mut Matrix3<f64>, row: usize, col: usize) {
    let diagonal = r[(col, col)];
    let target = r[(row, col)];
    let norm_squared = diagonal * diagonal + target * target;
    let (cos, sin) = if norm_squared < QR_DEGENERATE_EPSILON {
        (1.0, 0.0)
    } else {
        let inverse = norm_squared.sqrt().recip();
        (diagonal * inverse, target * inverse)
    };
    pre_mult3_givens(r, cos, sin, col, row);
    post_mult3_givens(q, cos, sin, col, row);
}

/// Computes the signed SVD of `a` with `jacobi_iterations` cyclic Jacobi sweeps
/// over `AᵀA` followed by a Givens QR of `A * V`.
///
/// The result never contains a collapsed column in `U`: if numerical trouble
/// produces a near-zero or non-finite column, it is replaced with the matching
/// basis vector so that callers always get a usable frame.
pub fn svd3(a: &Matrix3<f64>, jacobi_iterations: usize) -> Svd3 {
    let mut symmetric = Matrix3::zeros();
    mult3_left_transpose(a, a, &mut symmetric);

    let mut q = Matrix3::identity();
    for _ in 0..jacobi_iterations {
        jacobi_rotate(&mut symmetric, &mut q, 0, 1);
        jacobi_rotate(&mut symmetric, &mut q, 0, 2);
        jacobi_rotate(&mut symmetric, &mut q, 1, 2);
    }

    let mut v = Matrix3::zeros();
    transpose3(&q, &mut v);

    let mut r = Matrix3::zeros();
    mult3(a, &v, &mut r);

    sort_columns_by_magnitude(&mut r, &mut v);

    q.fill_with_identity();
    qr_annihilate(&mut q, &mut r, 1, 0);
    qr_annihilate(&mut q, &mut r, 2, 0);
    qr_annihilate(&mut q, &mut r, 2, 1);

    for index in 0..3 {
        let column = q.column(index);
        if !column.iter().all(|value| value.is_finite())
            || column.norm_squared() < COLUMN_COLLAPSE_EPSILON
        {
            q.set_column(index, &Vector3::ith(index, 1.0));
        }
    }

    Svd3 { u: q, sigma: r, v }
}

fn sort_columns_by_magnitude(r: &mut Matrix3<f64>, v: &mut Matrix3<f64>) {
    let mut magnitudes = [
        r.column(0).norm_squared(),
        r.column(1).norm_squared(),
        r.column(2).norm_squared(),
    ];
    for (idx0, idx1) in [(0, 1), (0, 2), (1, 2)] {
        if magnitudes[idx0] < magnitudes[idx1] {
            swap_negate_column(r, idx0, idx1);
            swap_negate_column(v, idx0, idx1);
            magnitudes.swap(idx0, idx1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOLERANCE: f64 = 1e-9;

    fn random_matrix(rng: &mut StdRng) -> Matrix3<f64> {
        Matrix3::from_fn(|_, _| rng.random_range(-1.0..1.0))
    }

    fn assert_matrix_close(a: &Matrix3<f64>, b: &Matrix3<f64>, tolerance: f64) {
        let difference = (a - b).abs().max();
        assert!(
            difference < tolerance,
            "matrices differ by {difference}:\n{a}\n{b}"
        );
    }

    fn assert_proper_rotation(m: &Matrix3<f64>) {
        assert_matrix_close(&(m.transpose() * m), &Matrix3::identity(), 1e-9);
        assert!((det3(m) - 1.0).abs() < 1e-9, "determinant was {}", det3(m));
    }

    #[test]
    fn givens_helpers_match_explicit_products() {
        let mut rng = StdRng::seed_from_u64(7);
        let m = random_matrix(&mut rng);
        let (sin, cos) = 0.37_f64.sin_cos();

        for (idx0, idx1) in [(0, 1), (0, 2), (1, 2)] {
            let mut g = Matrix3::zeros();
            set_givens3(&mut g, cos, sin, idx0, idx1);

            let mut pre = m;
            pre_mult3_givens(&mut pre, cos, sin, idx0, idx1);
            assert_matrix_close(&pre, &(g * m), TOLERANCE);

            let mut post = m;
            post_mult3_givens(&mut post, cos, sin, idx0, idx1);
            assert_matrix_close(&post, &(m * g.transpose()), TOLERANCE);
        }
    }

    #[test]
    fn givens_matrix_is_a_rotation() {
        let mut g = Matrix3::zeros();
        let (sin, cos) = 1.1_f64.sin_cos();
        set_givens3(&mut g, cos, sin, 0, 2);
        assert_proper_rotation(&g);
    }

    #[test]
    fn transpose_products_agree_with_nalgebra() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = random_matrix(&mut rng);
        let b = random_matrix(&mut rng);
        let mut out = Matrix3::zeros();

        mult3(&a, &b, &mut out);
        assert_matrix_close(&out, &(a * b), TOLERANCE);
        mult3_left_transpose(&a, &b, &mut out);
        assert_matrix_close(&out, &(a.transpose() * b), TOLERANCE);
        mult3_right_transpose(&a, &b, &mut out);
        assert_matrix_close(&out, &(a * b.transpose()), TOLERANCE);
    }

    #[test]
    fn swap_negate_column_preserves_determinant() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut m = random_matrix(&mut rng);
        let before = det3(&m);
        let original = m;
        swap_negate_column(&mut m, 0, 2);
        assert!((det3(&m) - before).abs() < TOLERANCE);
        assert_eq!(m.column(0), original.column(2));
        assert_eq!(m.column(2), -original.column(0));
    }

    #[test]
    fn svd_reconstructs_random_matrices() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let a = random_matrix(&mut rng);
            let svd = svd3(&a, DEFAULT_JACOBI_ITERATIONS);

            assert_matrix_close(&svd.reconstruct(), &a, 1e-6);
            assert_proper_rotation(&svd.u);
            assert_proper_rotation(&svd.v);

            let scale = a.abs().max().max(1.0);
            for row in 0..3 {
                for col in 0..3 {
                    if row != col {
                        assert!(
                            svd.sigma[(row, col)].abs() < 1e-5 * scale,
                            "sigma not diagonal:\n{}",
                            svd.sigma
                        );
                    }
                }
            }

            let values = svd.singular_values();
            assert!(values[0] >= -1e-9 && values[1] >= -1e-9);
            assert!(values[0].abs() + 1e-9 >= values[1].abs());
            assert!(values[1].abs() + 1e-9 >= values[2].abs());
        }
    }

    #[test]
    fn last_singular_value_carries_the_determinant_sign() {
        let reflection = Matrix3::new(1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, -3.0);
        let svd = svd3(&reflection, DEFAULT_JACOBI_ITERATIONS);
        let values = svd.singular_values();

        assert!((values[0] - 3.0).abs() < 1e-9);
        assert!((values[1] - 2.0).abs() < 1e-9);
        assert!((values[2] + 1.0).abs() < 1e-9);
        assert_matrix_close(&svd.reconstruct(), &reflection, 1e-9);
    }

    #[test]
    fn rank_one_input_still_yields_a_full_frame() {
        let x = Vector3::new(0.0, 0.6, 0.8);
        let y = Vector3::new(1.0, 0.0, 0.0);
        let a = x * y.transpose();
        let svd = svd3(&a, DEFAULT_JACOBI_ITERATIONS);

        assert_proper_rotation(&svd.u);
        assert_proper_rotation(&svd.v);
        assert_matrix_close(&svd.reconstruct(), &a, 1e-9);
    }

    #[test]
    fn zero_matrix_decomposes_to_identity_frames() {
        let svd = svd3(&Matrix3::zeros(), DEFAULT_JACOBI_ITERATIONS);
        assert_eq!(svd.u, Matrix3::identity());
        assert_eq!(svd.v, Matrix3::identity());
        assert_eq!(svd.sigma, Matrix3::zeros());
    }

    #[test]
    fn non_finite_input_does_not_produce_collapsed_u_columns() {
        let mut a = Matrix3::identity();
        a[(0, 0)] = f64::NAN;
        let svd = svd3(&a, DEFAULT_JACOBI_ITERATIONS);
        for column in svd.u.column_iter() {
            assert!(column.iter().all(|value| value.is_finite()));
            assert!(column.norm_squared() > 0.5);
        }
    }

    #[test]
    fn permute_columns_takes_column_at_permuted_index() {
        let vectors = [Vector3::x(), Vector3::y(), Vector3::z()];
        let matrix = columns_from_vectors(&vectors);
        let permutation = Permutation::from_indices(vec![2, 0, 1]).unwrap();
        let permuted = permute_columns(&matrix, &permutation);

        assert_eq!(permuted.column(0), Vector3::z());
        assert_eq!(permuted.column(1), Vector3::x());
        assert_eq!(permuted.column(2), Vector3::y());
    }

    #[test]
    fn permute_columns_into_reuses_the_output_buffer() {
        let vectors = [Vector3::x(), Vector3::y(), Vector3::z()];
        let matrix = columns_from_vectors(&vectors);
        let mut out = Matrix3xX::zeros(3);
        let buffer = out.as_ptr();

        for indices in [vec![1, 2, 0], vec![2, 1, 0]] {
            let permutation = Permutation::from_indices(indices).unwrap();
            permute_columns_into(&matrix, &permutation, &mut out);
            assert_eq!(out, permute_columns(&matrix, &permutation));
            assert_eq!(out.as_ptr(), buffer);
        }

        let shorter = Permutation::from_indices(vec![1, 0]).unwrap();
        permute_columns_into(&columns_from_vectors(&vectors[..2]), &shorter, &mut out);
        assert_eq!(out.ncols(), 2);
        assert_eq!(out.column(0), Vector3::y());
    }

    #[test]
    fn empty_vector_lists_give_empty_matrices() {
        let matrix = columns_from_vectors(&[]);
        assert_eq!(matrix.ncols(), 0);
        assert_eq!(permute_columns(&matrix, &Permutation::identity(0)).ncols(), 0);
    }
}
