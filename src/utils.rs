//! General utilities that don't have a specific home: model problems used by
//! the tests and the command line driver, and a few dense vector helpers.

use rand::distributions::Uniform;
use rand::Rng;
use sprs::TriMat;

use crate::{CsrMatrix, Vector};

pub fn random_vec<R: Rng>(size: usize, rng: &mut R) -> Vector {
    let distribution = Uniform::new(-1.0_f64, 1.0_f64);
    Vector::from_iter((0..size).map(|_| rng.sample(distribution)))
}

pub fn norm(vec: &Vector) -> f64 {
    vec.dot(vec).sqrt()
}

/// 1D Poisson with Dirichlet boundaries: `tridiag(-1, 2, -1)` of size `n`.
pub fn poisson_1d(n: usize) -> CsrMatrix {
    let mut mat = TriMat::new((n, n));
    for i in 0..n {
        if i > 0 {
            mat.add_triplet(i, i - 1, -1.0);
        }
        mat.add_triplet(i, i, 2.0);
        if i + 1 < n {
            mat.add_triplet(i, i + 1, -1.0);
        }
    }
    mat.to_csr::<usize>()
}

/// Graph Laplacian of a path with `n` vertices. Row sums are zero so the
/// constant vector is in the null space.
pub fn neumann_1d(n: usize) -> CsrMatrix {
    let mut mat = TriMat::new((n, n));
    for i in 0..n {
        let mut degree = 0.0;
        if i > 0 {
            mat.add_triplet(i, i - 1, -1.0);
            degree += 1.0;
        }
        if i + 1 < n {
            mat.add_triplet(i, i + 1, -1.0);
            degree += 1.0;
        }
        mat.add_triplet(i, i, degree);
    }
    mat.to_csr::<usize>()
}

/// Five point Laplacian on an `nx x nx` grid with Dirichlet boundaries.
/// `epsilon` scales the couplings in the y direction (1.0 is isotropic).
pub fn poisson_2d(nx: usize, epsilon: f64) -> CsrMatrix {
    let n = nx * nx;
    let mut mat = TriMat::new((n, n));
    for y in 0..nx {
        for x in 0..nx {
            let i = y * nx + x;
            if y > 0 {
                mat.add_triplet(i, i - nx, -epsilon);
            }
            if x > 0 {
                mat.add_triplet(i, i - 1, -1.0);
            }
            mat.add_triplet(i, i, 2.0 + 2.0 * epsilon);
            if x + 1 < nx {
                mat.add_triplet(i, i + 1, -1.0);
            }
            if y + 1 < nx {
                mat.add_triplet(i, i + nx, -epsilon);
            }
        }
    }
    mat.to_csr::<usize>()
}
