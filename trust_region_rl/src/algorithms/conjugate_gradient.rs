//! Conjugate gradient solver and flat-vector helpers.
//!
//! The policy step solves `F x = g` where `F` is only available through
//! matrix-vector products, so the solver takes a closure instead of a matrix.

/// Residual below which the solver stops early.
pub const RESIDUAL_TOL: f32 = 1e-10;

/// Inner product of two equally sized vectors.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// y ← y + alpha · x
#[inline]
pub fn axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Solve `A x = b` for symmetric positive definite `A` given `f_ax(v) = A v`.
///
/// Starts from x = 0 and runs at most `iters` iterations.
pub fn conjugate_gradient<F>(mut f_ax: F, b: &[f32], iters: usize) -> Vec<f32>
where
    F: FnMut(&[f32]) -> Vec<f32>,
{
    let mut p = b.to_vec();
    let mut r = b.to_vec();
    let mut x = vec![0.0f32; b.len()];
    let mut rdotr = dot(&r, &r);

    for _ in 0..iters {
        if rdotr < RESIDUAL_TOL {
            break;
        }
        let z = f_ax(&p);
        let pz = dot(&p, &z);
        if pz <= 0.0 || !pz.is_finite() {
            log::warn!("conjugate gradient hit non-positive curvature ({}), stopping", pz);
            break;
        }
        let v = rdotr / pz;
        axpy(v, &p, &mut x);
        axpy(-v, &z, &mut r);

        let new_rdotr = dot(&r, &r);
        let mu = new_rdotr / rdotr;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + mu * *pi;
        }
        rdotr = new_rdotr;
    }

    x
}
