use glam::DVec3;

/// Longitude/latitude pair in degrees
pub type LonLat = (f64, f64);

/// Unit-sphere vector for a lon/lat point (degrees)
#[inline(always)]
pub fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

/// Lon/lat (degrees) of a non-zero vector
#[inline(always)]
pub fn vec3_to_lonlat(v: DVec3) -> LonLat {
    let n = v.normalize();
    let lat = n.z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = n.y.atan2(n.x).to_degrees();
    (lon, lat)
}

/// True for a finite point inside the lon/lat domain
#[inline(always)]
pub fn is_valid_lonlat(lon: f64, lat: f64) -> bool {
    lon.is_finite() && lat.is_finite() && (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
}

/// Central angle (radians) between two lon/lat points.
/// atan2 form stays accurate for both tiny and near-antipodal separations.
#[inline(always)]
pub fn great_circle_distance(a: LonLat, b: LonLat) -> f64 {
    let u = lonlat_to_vec3(a.0, a.1);
    let v = lonlat_to_vec3(b.0, b.1);
    u.cross(v).length().atan2(u.dot(v))
}

/// Signed solid angle of a ring plus the area-weighted direction sum of its
/// triangles. The ring is fanned from its first vertex; the sign follows the
/// winding order.
fn ring_moments(ring: &[LonLat]) -> (f64, DVec3) {
    if ring.len() < 3 {
        return (0.0, DVec3::ZERO);
    }

    let p0 = lonlat_to_vec3(ring[0].0, ring[0].1);
    let mut area = 0.0;
    let mut weighted = DVec3::ZERO;

    let mut prev = lonlat_to_vec3(ring[1].0, ring[1].1);
    for &(lon, lat) in &ring[2..] {
        let next = lonlat_to_vec3(lon, lat);

        // Van Oosterom-Strackee: tan(E/2) = det / (1 + a.b + b.c + c.a)
        let det = p0.dot(prev.cross(next));
        let denom = 1.0 + p0.dot(prev) + prev.dot(next) + next.dot(p0);
        let excess = 2.0 * det.atan2(denom);

        area += excess;
        weighted += (p0 + prev + next).normalize_or_zero() * excess;
        prev = next;
    }

    (area, weighted)
}

/// Solid angle (steradians) enclosed by a ring, in either winding order.
/// Returns the smaller of the two complementary areas.
pub fn ring_area(ring: &[LonLat]) -> f64 {
    ring_moments(ring).0.abs()
}

/// Area and area-weighted direction of a polygon (exterior ring first, holes after)
pub fn polygon_moments(rings: &[Vec<LonLat>]) -> (f64, DVec3) {
    let mut area = 0.0;
    let mut weighted = DVec3::ZERO;

    for (i, ring) in rings.iter().enumerate() {
        let (signed, w) = ring_moments(ring);
        // Normalise each ring to positive orientation before combining
        let (a, w) = if signed < 0.0 { (-signed, -w) } else { (signed, w) };
        if i == 0 {
            area += a;
            weighted += w;
        } else {
            area -= a;
            weighted -= w;
        }
    }

    (area.max(0.0), weighted)
}

/// Area-weighted spherical centroid of a set of polygons.
/// Falls back to the vertex mean for degenerate (zero-area) input.
pub fn polygons_centroid(polygons: &[Vec<Vec<LonLat>>]) -> Option<LonLat> {
    let mut weighted = DVec3::ZERO;
    for rings in polygons {
        weighted += polygon_moments(rings).1;
    }

    if weighted.length_squared() > 1e-30 {
        return Some(vec3_to_lonlat(weighted));
    }

    let mut sum = DVec3::ZERO;
    for &(lon, lat) in polygons.iter().flat_map(|rings| rings.first()).flatten() {
        sum += lonlat_to_vec3(lon, lat);
    }
    (sum.length_squared() > 1e-30).then(|| vec3_to_lonlat(sum))
}

/// Unit direction weighted centroid of lon/lat points (weights are areas)
pub fn weighted_centroid(points: impl Iterator<Item = (LonLat, f64)>) -> Option<LonLat> {
    let mut sum = DVec3::ZERO;
    for ((lon, lat), weight) in points {
        sum += lonlat_to_vec3(lon, lat) * weight;
    }
    (sum.length_squared() > 1e-30).then(|| vec3_to_lonlat(sum))
}
