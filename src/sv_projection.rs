use serde::Deserialize;

use crate::sv_interface::{Point3, Rgb};

/// Depth of every point drawn on the plane
pub const PLANE_Z: f64 = 0.0;

/// Divisor of the far-side dimming rate on the sphere
pub const SPHERE_SHADE_DIVISOR: f32 = 1.2;

/// How logical node coordinates map into render space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// `(x, y)` drawn as-is
    #[default]
    Plane,
    /// `x` is longitude and `y` latitude (radians) on the unit sphere
    Sphere,
}

impl Projection {
    pub fn project(self, x: f64, y: f64) -> Point3 {
        match self {
            Projection::Plane => Point3::new(x, y, PLANE_Z),
            Projection::Sphere => Point3::new(x.cos() * y.cos(), y.sin(), x.sin() * y.cos()),
        }
    }

    /// Color of `base` at depth `z`.
    ///
    /// On the sphere, points deeper into the screen (larger z, the back of the
    /// globe) blend toward white. This stands in for a depth buffer. The plane
    /// has no depth.
    pub fn shade(self, base: Rgb, z: f64) -> Rgb {
        match self {
            Projection::Plane => base,
            Projection::Sphere => {
                let rate = (-z as f32 + 1.0) / SPHERE_SHADE_DIVISOR;
                Rgb::new(
                    1.0 - (1.0 - base.r) * rate,
                    1.0 - (1.0 - base.g) * rate,
                    1.0 - (1.0 - base.b) * rate,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_plane_is_identity() {
        assert_eq!(Projection::Plane.project(2.0, 3.0), Point3::new(2.0, 3.0, PLANE_Z));
    }

    #[test]
    fn test_sphere_origin() {
        let p = Projection::Sphere.project(0.0, 0.0);
        assert!(close(p.x, 1.0) && close(p.y, 0.0) && close(p.z, 0.0));
    }

    #[test]
    fn test_sphere_pole_and_unit_radius() {
        let pole = Projection::Sphere.project(1.3, FRAC_PI_2);
        assert!(close(pole.y, 1.0));

        for (x, y) in [(0.3, 0.2), (2.0, -1.0), (-3.0, 0.7)] {
            let p = Projection::Sphere.project(x, y);
            assert!(close(p.x * p.x + p.y * p.y + p.z * p.z, 1.0));
        }
    }

    #[test]
    fn test_sphere_longitude_quarter_turn() {
        let p = Projection::Sphere.project(FRAC_PI_2, 0.0);
        assert!(close(p.x, 0.0) && close(p.z, 1.0));
    }

    #[test]
    fn test_plane_shade_keeps_color() {
        let base = Rgb::new(0.2, 0.4, 0.6);
        assert_eq!(Projection::Plane.shade(base, -1.0), base);
    }

    #[test]
    fn test_sphere_shade_fades_back_side() {
        let base = Rgb::new(0.0, 0.2, 1.0);

        // back of the globe: rate 0, washed out to white
        let back = Projection::Sphere.shade(base, 1.0);
        assert_eq!(back, Rgb::new(1.0, 1.0, 1.0));

        // z = 0.2 gives rate (0.8 / 1.2)
        let mid = Projection::Sphere.shade(base, 0.2);
        assert!((mid.r - (1.0 - 0.8 / 1.2)).abs() < 1e-6);
        assert!((mid.b - 1.0).abs() < 1e-6);

        // channels already at 1.0 never change
        let front = Projection::Sphere.shade(base, -1.0);
        assert!((front.b - 1.0).abs() < 1e-6);
        assert!(front.r < mid.r);
    }

    #[test]
    fn test_projection_from_yaml() {
        let p: Projection = serde_yaml::from_str("sphere").unwrap();
        assert_eq!(p, Projection::Sphere);
    }
}
