//! Geostationary satellite projection.
//!
//! The satellite views Earth from a fixed position above the equator, and
//! coordinates are expressed as scan angles in radians from nadir. Two
//! instrument geometries exist and differ in which mirror axis moves fastest:
//!
//! - sweep `y` (Himawari AHI, Meteosat SEVIRI), the CGMS normalized
//!   geostationary projection
//! - sweep `x` (GOES-R ABI)
//!
//! References: CGMS LRIT/HRIT Global Specification section 4.4,
//! GOES-R Product Definition and Users' Guide (PUG) Volume 4 section 4.2.8.

use serde::{Deserialize, Serialize};

/// Which scan angle is the outer (slow) rotation of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepAxis {
    X,
    Y,
}

/// Geostationary projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geostationary {
    /// Satellite height above the Earth surface (meters)
    pub perspective_point_height: f64,
    /// Earth equatorial radius (meters)
    pub semi_major_axis: f64,
    /// Earth polar radius (meters)
    pub semi_minor_axis: f64,
    /// Longitude of the sub-satellite point (degrees, east positive)
    pub longitude_origin: f64,
    pub sweep: SweepAxis,
}

impl Geostationary {
    /// Himawari-8/9 AHI at the given sub-satellite longitude (140.7°E nominal).
    pub fn himawari(longitude_origin: f64) -> Self {
        Self {
            perspective_point_height: 35_785_863.0,
            semi_major_axis: 6_378_137.0,
            semi_minor_axis: 6_356_752.3,
            longitude_origin,
            sweep: SweepAxis::Y,
        }
    }

    /// GOES-R series ABI at the given sub-satellite longitude (-75.0 for GOES-East).
    pub fn goes(longitude_origin: f64) -> Self {
        Self {
            perspective_point_height: 35_786_023.0,
            semi_major_axis: 6_378_137.0,
            semi_minor_axis: 6_356_752.31414,
            longitude_origin,
            sweep: SweepAxis::X,
        }
    }

    /// Satellite distance from the Earth center (meters).
    #[inline]
    fn h(&self) -> f64 {
        self.perspective_point_height + self.semi_major_axis
    }

    #[inline]
    fn lambda_0(&self) -> f64 {
        self.longitude_origin.to_radians()
    }

    /// (req / rpol)^2
    #[inline]
    fn axis_ratio_sq(&self) -> f64 {
        (self.semi_major_axis / self.semi_minor_axis).powi(2)
    }

    /// Convert geographic coordinates (degrees) to scan angles (radians).
    ///
    /// Returns None if the point is not visible from the satellite.
    pub fn geo_to_scan(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        if !lon_deg.is_finite() || !lat_deg.is_finite() {
            return None;
        }
        let req = self.semi_major_axis;
        let rpol = self.semi_minor_axis;
        let h = self.h();

        let lat_rad = lat_deg.to_radians();
        let dlon = lon_deg.to_radians() - self.lambda_0();

        // Geocentric latitude and distance from Earth center to the surface point
        let phi_c = ((rpol / req).powi(2) * lat_rad.tan()).atan();
        let e2 = 1.0 - (rpol / req).powi(2);
        let rc = rpol / (1.0 - e2 * phi_c.cos().powi(2)).sqrt();

        // Satellite-to-point vector
        let sx = h - rc * phi_c.cos() * dlon.cos();
        let sy = -rc * phi_c.cos() * dlon.sin();
        let sz = rc * phi_c.sin();

        // Point lies on the far side of the limb
        if h * (h - sx) < sy.powi(2) + self.axis_ratio_sq() * sz.powi(2) {
            return None;
        }

        let rn = (sx * sx + sy * sy + sz * sz).sqrt();
        let (x, y) = match self.sweep {
            SweepAxis::Y => ((-sy).atan2(sx), (sz / rn).asin()),
            SweepAxis::X => ((-sy / rn).asin(), sz.atan2(sx)),
        };
        Some((x, y))
    }

    /// Convert scan angles (radians) to geographic coordinates (lon, lat degrees).
    ///
    /// Returns None if the scan angle points to space (off Earth).
    pub fn scan_to_geo(&self, x_rad: f64, y_rad: f64) -> Option<(f64, f64)> {
        let (sin_x, cos_x) = x_rad.sin_cos();
        let (sin_y, cos_y) = y_rad.sin_cos();
        let k = self.axis_ratio_sq();
        let h = self.h();

        // Quadratic in the distance from satellite to surface
        let a = match self.sweep {
            SweepAxis::Y => cos_y.powi(2) + k * sin_y.powi(2),
            SweepAxis::X => sin_x.powi(2) + cos_x.powi(2) * (cos_y.powi(2) + k * sin_y.powi(2)),
        };
        let b = -2.0 * h * cos_x * cos_y;
        let c = h.powi(2) - self.semi_major_axis.powi(2);

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let rs = (-b - discriminant.sqrt()) / (2.0 * a);

        let (sx, sy, sz) = match self.sweep {
            SweepAxis::Y => (rs * cos_x * cos_y, -rs * sin_x * cos_y, rs * sin_y),
            SweepAxis::X => (rs * cos_x * cos_y, -rs * sin_x, rs * cos_x * sin_y),
        };

        let lat = (k * sz / (h - sx).hypot(sy)).atan();
        let lon = self.lambda_0() - sy.atan2(h - sx);

        Some((normalize_lon(lon.to_degrees()), lat.to_degrees()))
    }

    /// Projection coordinates in meters (scan angle times perspective height),
    /// the unit of area extents.
    pub fn geo_to_xy(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        let (x, y) = self.geo_to_scan(lon_deg, lat_deg)?;
        Some((
            x * self.perspective_point_height,
            y * self.perspective_point_height,
        ))
    }

    /// Inverse of [`Geostationary::geo_to_xy`].
    pub fn xy_to_geo(&self, x_m: f64, y_m: f64) -> Option<(f64, f64)> {
        self.scan_to_geo(
            x_m / self.perspective_point_height,
            y_m / self.perspective_point_height,
        )
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nadir_is_origin() {
        for proj in [Geostationary::himawari(140.7), Geostationary::goes(-75.0)] {
            let (x, y) = proj.geo_to_scan(proj.longitude_origin, 0.0).unwrap();
            assert!(x.abs() < 1e-12 && y.abs() < 1e-12, "nadir scan angle {:?}", (x, y));

            let (lon, lat) = proj.scan_to_geo(0.0, 0.0).unwrap();
            assert!((lon - proj.longitude_origin).abs() < 1e-9);
            assert!(lat.abs() < 1e-9);
        }
    }

    #[test]
    fn test_roundtrip_both_sweeps() {
        let cases = [
            (Geostationary::himawari(140.7), [(120.45537, 14.77083), (151.2, -33.9), (100.5, 13.7)]),
            (Geostationary::goes(-75.0), [(-95.0, 39.0), (-58.4, -34.6), (-122.4, 37.8)]),
        ];

        for (proj, points) in cases {
            for (lon, lat) in points {
                let (x, y) = proj.geo_to_scan(lon, lat).unwrap();
                let (lon2, lat2) = proj.scan_to_geo(x, y).unwrap();
                assert!((lon - lon2).abs() < 1e-6, "{:?} lon {} vs {}", proj.sweep, lon, lon2);
                assert!((lat - lat2).abs() < 1e-6, "{:?} lat {} vs {}", proj.sweep, lat, lat2);
            }
        }
    }

    #[test]
    fn test_sweep_axes_differ_off_axis() {
        // Away from both axes the two geometries give different scan angles
        let y_sweep = Geostationary { sweep: SweepAxis::Y, ..Geostationary::himawari(140.7) };
        let x_sweep = Geostationary { sweep: SweepAxis::X, ..y_sweep };
        let a = y_sweep.geo_to_scan(170.0, 40.0).unwrap();
        let b = x_sweep.geo_to_scan(170.0, 40.0).unwrap();
        assert!((a.0 - b.0).abs() > 1e-4 || (a.1 - b.1).abs() > 1e-4);
    }

    #[test]
    fn test_bataan_projection_coordinates() {
        let proj = Geostationary::himawari(140.7);
        let (x, y) = proj.geo_to_xy(120.45537, 14.77083).unwrap();
        // West of and north of nadir
        assert!((x - (-2_097_494.6)).abs() < 100.0, "x = {}", x);
        assert!((y - 1_585_599.7).abs() < 100.0, "y = {}", y);
    }

    #[test]
    fn test_not_visible() {
        let proj = Geostationary::himawari(140.7);
        // Opposite side of the Earth
        assert!(proj.geo_to_scan(-39.3, 0.0).is_none());
        // Just beyond the limb to the east (~81.3° great-circle from nadir)
        assert!(proj.geo_to_scan(140.7 + 85.0, 0.0).is_none());
        assert!(proj.geo_to_scan(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_off_earth_scan() {
        let proj = Geostationary::goes(-75.0);
        // ~28 degrees off nadir points into space
        assert!(proj.scan_to_geo(0.5, 0.5).is_none());
    }
}
