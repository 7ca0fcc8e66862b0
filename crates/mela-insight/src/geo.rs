//! Naive proximity filters.
//!
//! One degree of latitude or longitude is treated as 111 km everywhere.
//! This is a bounding box, not a geodesic distance.

use mela_state::GeoPoint;

pub const KM_PER_DEGREE: f64 = 111.0;

/// Square box centred on a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub center: GeoPoint,
    /// Half the side length, in degrees.
    pub half_span: f64,
}

impl BoundingBox {
    pub fn around_km(center: GeoPoint, radius_km: f64) -> Self {
        Self {
            center,
            half_span: radius_km / KM_PER_DEGREE,
        }
    }

    pub fn around_meters(center: GeoPoint, radius_m: f64) -> Self {
        Self::around_km(center, radius_m / 1000.0)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (point.lat - self.center.lat).abs() <= self.half_span
            && (point.lng - self.center.lng).abs() <= self.half_span
    }
}

/// Parse `"lat,lng"` or `"lat,lng,radius"`. Returns `None` for malformed input.
pub fn parse_point_radius(raw: &str) -> Option<(GeoPoint, Option<f64>)> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    match parts.as_slice() {
        [lat, lng] => Some((GeoPoint::new(parse(lat)?, parse(lng)?), None)),
        [lat, lng, radius] => Some((
            GeoPoint::new(parse(lat)?, parse(lng)?),
            Some(parse(radius)?.abs()),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_includes_points_within_radius() {
        let center = GeoPoint::new(25.4358, 81.8463);
        // 1000 m is roughly 0.009 degrees.
        let bbox = BoundingBox::around_meters(center, 1000.0);
        assert!(bbox.contains(&GeoPoint::new(25.4368, 81.8473)));
        assert!(bbox.contains(&center));
        assert!(!bbox.contains(&GeoPoint::new(25.4458, 81.8463)));
        assert!(!bbox.contains(&GeoPoint::new(25.4358, 81.8363)));
    }

    #[test]
    fn km_box_matches_degree_conversion() {
        let bbox = BoundingBox::around_km(GeoPoint::new(0.0, 0.0), 111.0);
        assert!((bbox.half_span - 1.0).abs() < 1e-9);
        assert!(bbox.contains(&GeoPoint::new(0.99, -0.99)));
        assert!(!bbox.contains(&GeoPoint::new(1.01, 0.0)));
    }

    #[test]
    fn parses_point_with_optional_radius() {
        let (p, r) = parse_point_radius("25.43, 81.84").unwrap();
        assert_eq!(p, GeoPoint::new(25.43, 81.84));
        assert_eq!(r, None);

        let (_, r) = parse_point_radius("25.43,81.84,500").unwrap();
        assert_eq!(r, Some(500.0));

        assert!(parse_point_radius("25.43").is_none());
        assert!(parse_point_radius("a,b").is_none());
        assert!(parse_point_radius("1,2,3,4").is_none());
    }
}
