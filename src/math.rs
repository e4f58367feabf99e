use glam::{Mat3, Vec3};

// The deformation math here follows the row-vector convention: the matrix
// rows are the per-axis probe deltas, and displacements multiply on the
// left, `v · m`. glam only ships column-vector multiplication, so these
// helpers paper over the difference.

/// Multiplies a row vector against a matrix, `v · m`.
pub fn row_mul(v: Vec3, m: &Mat3) -> Vec3 {
    Vec3::new(v.dot(m.x_axis), v.dot(m.y_axis), v.dot(m.z_axis))
}

/// Builds a matrix out of its three rows.
pub fn mat3_from_rows(x: Vec3, y: Vec3, z: Vec3) -> Mat3 {
    Mat3::from_cols(x, y, z).transpose()
}

/// Inverse of `m`, or the identity when `m` is singular or non-finite.
pub fn inverse_or_identity(m: &Mat3) -> Mat3 {
    let det = m.determinant();
    if det.is_finite() && det != 0.0 {
        m.inverse()
    } else {
        Mat3::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn row_mul_uses_rows() {
        let m = mat3_from_rows(
            vec3(1.0, 2.0, 3.0),
            vec3(4.0, 5.0, 6.0),
            vec3(7.0, 8.0, 9.0),
        );

        // (1, 0, 0) · m picks out the first row, and so on.
        assert_eq!(row_mul(Vec3::X, &m), vec3(1.0, 2.0, 3.0));
        assert_eq!(row_mul(Vec3::Y, &m), vec3(4.0, 5.0, 6.0));
        assert_eq!(row_mul(Vec3::Z, &m), vec3(7.0, 8.0, 9.0));
    }

    #[test]
    fn inverse_round_trips() {
        let m = mat3_from_rows(
            vec3(2.0, 0.0, 0.0),
            vec3(0.0, 3.0, 1.0),
            vec3(0.0, 0.0, 4.0),
        );
        let inv = inverse_or_identity(&m);

        let v = vec3(1.0, -2.0, 0.5);
        let there_and_back = row_mul(row_mul(v, &m), &inv);
        assert_relative_eq!(there_and_back.x, v.x, max_relative = 1e-6);
        assert_relative_eq!(there_and_back.y, v.y, max_relative = 1e-6);
        assert_relative_eq!(there_and_back.z, v.z, max_relative = 1e-6);
    }

    #[test]
    fn singular_inverse_falls_back_to_identity() {
        let m = mat3_from_rows(Vec3::X, Vec3::X, Vec3::X);
        assert_eq!(inverse_or_identity(&m), Mat3::IDENTITY);

        let m = mat3_from_rows(Vec3::NAN, Vec3::NAN, Vec3::NAN);
        assert_eq!(inverse_or_identity(&m), Mat3::IDENTITY);
    }
}
