//! Dense linear solves for the small systems arising in filter design.
use csi_pulse_common::Real;
use ndarray::{Array2, s};

/// Pivots smaller than this are treated as zero.
const PIVOT_TOLERANCE: Real = 1e-12;

/// Solves `a · x = b` for `x` by Gauss-Jordan elimination with partial pivoting.
///
/// Returns [None] if `a` is not square, the shapes disagree, or `a` is singular.
/// # Parameters
/// - a: square coefficient matrix.
/// - b: right hand side, one column per system.
pub(super) fn solve(mut a: Array2<Real>, mut b: Array2<Real>) -> Option<Array2<Real>> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return None;
    }
    let scale = a.iter().fold(0.0, |max: Real, v| max.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot_row, col]].abs() < PIVOT_TOLERANCE * scale {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap([pivot_row, k], [col, k]);
            }
            for k in 0..b.ncols() {
                b.swap([pivot_row, k], [col, k]);
            }
        }

        let pivot = a[[col, col]];
        a.row_mut(col).mapv_inplace(|v| v / pivot);
        b.row_mut(col).mapv_inplace(|v| v / pivot);

        let pivot_a = a.row(col).to_owned();
        let pivot_b = b.row(col).to_owned();
        for row in (0..n).filter(|&row| row != col) {
            let factor = a[[row, col]];
            if factor != 0.0 {
                a.row_mut(row).scaled_add(-factor, &pivot_a);
                b.row_mut(row).scaled_add(-factor, &pivot_b);
            }
        }
    }
    Some(b)
}

/// Solves `a · x = b` for a single right hand side.
pub(super) fn solve_vector(a: Array2<Real>, b: &[Real]) -> Option<Vec<Real>> {
    let rhs = Array2::from_shape_vec((b.len(), 1), b.to_vec()).ok()?;
    solve(a, rhs).map(|x| x.slice(s![.., 0]).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn solves_with_pivoting() {
        // The leading zero forces a row exchange.
        let a = array![[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let x = solve_vector(a, &[5.0, 3.0, 4.0]).unwrap();
        assert_approx_eq!(x[0], 1.0);
        assert_approx_eq!(x[1], 2.0);
        assert_approx_eq!(x[2], 1.0);
    }

    #[test]
    fn multiple_right_hand_sides_give_inverse() {
        let a = array![[4.0, 7.0], [2.0, 6.0]];
        let inverse = solve(a, Array2::eye(2)).unwrap();
        assert_approx_eq!(inverse[[0, 0]], 0.6);
        assert_approx_eq!(inverse[[0, 1]], -0.7);
        assert_approx_eq!(inverse[[1, 0]], -0.2);
        assert_approx_eq!(inverse[[1, 1]], 0.4);
    }

    #[test]
    fn singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(solve_vector(a, &[1.0, 2.0]).is_none());
    }

    #[test]
    fn shape_mismatch() {
        let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 5.0]];
        assert!(solve_vector(a, &[1.0, 2.0]).is_none());
    }
}
