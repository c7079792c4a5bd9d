/*!
Planar geometry predicates and constructions.

All functions work on [`DVec2`], where the vector's `y` component holds the
world's `z` coordinate. Orientation follows the usual convention: a positive
[`orient2d`] means the three points wind counter-clockwise.
*/

use glam::DVec2;

/// Twice the signed area of the triangle `(a, b, c)`. Positive when `c` is to
/// the left of the directed line `a -> b`.
pub fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Signed distance of `p` from the line through `a` and `b`. Positive on the
/// left. Falls back to the distance from `a` when the line is degenerate.
pub fn signed_distance(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    let len = a.distance(b);
    if len > 0. {
        orient2d(a, b, p) / len
    } else {
        a.distance(p)
    }
}

/// The classic in-circle determinant. Positive when `d` lies inside the
/// circumcircle of the counter-clockwise triangle `(a, b, c)`.
pub fn incircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    let (ad, bd, cd) = (a - d, b - d, c - d);
    let (alift, blift, clift) = (ad.length_squared(), bd.length_squared(), cd.length_squared());
    alift * bd.perp_dot(cd) + blift * cd.perp_dot(ad) + clift * ad.perp_dot(bd)
}

/// Check if `d` lies strictly inside the circumcircle of `(a, b, c)`, by more
/// than `eps`, in either winding. Points on the circle are not inside, so
/// cocircular configurations never flip back and forth.
pub fn in_circumcircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2, eps: f64) -> bool {
    let area = orient2d(a, b, c);
    if area == 0. {
        return false;
    }
    // The determinant is area * (r^2 - |d - center|^2), and the longest side
    // stands in for r + |d - center|.
    let longest = a.distance(b).max(b.distance(c)).max(c.distance(a));
    incircle(a, b, c, d) * area.signum() > eps * area.abs() * longest
}

/// Check if the angle at `b` in the corner `a, b, c` is at least 90 degrees.
pub fn is_obtuse(a: DVec2, b: DVec2, c: DVec2) -> bool {
    (a - b).dot(c - b) <= 0.
}

pub fn closest_point_on_segment(p: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0. {
        return a;
    }
    a + ab * ((p - a).dot(ab) / len2).clamp(0., 1.)
}

pub fn point_segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    p.distance(closest_point_on_segment(p, a, b))
}

/// Check if `p` lies inside or on the boundary of the triangle `(a, b, c)`,
/// irrespective of its winding.
pub fn point_in_triangle(p: DVec2, a: DVec2, b: DVec2, c: DVec2, eps: f64) -> bool {
    let sign = if orient2d(a, b, c) < 0. { -1. } else { 1. };
    sign * signed_distance(a, b, p) >= -eps
        && sign * signed_distance(b, c, p) >= -eps
        && sign * signed_distance(c, a, p) >= -eps
}

/// Signed area of a closed polygon. Positive for counter-clockwise winding.
pub fn signed_area(poly: &[DVec2]) -> f64 {
    0.5 * poly
        .iter()
        .zip(poly.iter().cycle().skip(1))
        .map(|(a, b)| a.perp_dot(*b))
        .sum::<f64>()
}

/// Even-odd point in polygon test.
pub fn point_in_polygon(p: DVec2, poly: &[DVec2]) -> bool {
    let mut inside = false;
    for (a, b) in poly.iter().zip(poly.iter().cycle().skip(1)) {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Relation between two segments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Intersection {
    /// The segments don't meet.
    None,
    /// The segments are parallel and don't overlap.
    Parallel,
    /// The segments are collinear and share more than a point.
    FullyOverlaps,
    /// The segments meet at a single point. `t` and `u` are the parameters
    /// of that point along the first and second segment.
    Cross { point: DVec2, t: f64, u: f64 },
}

/// Classify the intersection of the segments `a -> b` and `c -> d`.
pub fn segment_intersection(a: DVec2, b: DVec2, c: DVec2, d: DVec2, eps: f64) -> Intersection {
    let (r, s) = (b - a, d - c);
    let (rlen, slen) = (r.length(), s.length());
    if rlen == 0. || slen == 0. {
        return Intersection::None;
    }
    let denom = r.perp_dot(s);
    let ca = c - a;
    if denom.abs() <= eps * rlen * slen {
        if (ca.perp_dot(r) / rlen).abs() > eps {
            return Intersection::Parallel;
        }
        // Collinear, project onto the first segment.
        let rr = rlen * rlen;
        let t0 = ca.dot(r) / rr;
        let t1 = (d - a).dot(r) / rr;
        let (lo, hi) = (t0.min(t1).max(0.), t0.max(t1).min(1.));
        let tol = eps / rlen;
        return if hi - lo > tol {
            Intersection::FullyOverlaps
        } else if hi - lo >= -tol {
            let t = lo.clamp(0., 1.);
            let point = a + r * t;
            Intersection::Cross {
                point,
                t,
                u: (point - c).dot(s) / (slen * slen),
            }
        } else {
            Intersection::Parallel
        };
    }
    let t = ca.perp_dot(s) / denom;
    let u = ca.perp_dot(r) / denom;
    let (ttol, utol) = (eps / rlen, eps / slen);
    if t < -ttol || t > 1. + ttol || u < -utol || u > 1. + utol {
        Intersection::None
    } else {
        Intersection::Cross {
            point: a + r * t,
            t,
            u,
        }
    }
}

/// Side of a directed line on which a circle is kept.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

fn rotate(v: DVec2, angle: f64) -> DVec2 {
    let (sin, cos) = angle.sin_cos();
    DVec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Unit normal pointing to the right of the direction `u`.
fn right_normal(u: DVec2) -> DVec2 {
    DVec2::new(u.y, -u.x)
}

/// Tangent point on the circle `(center, radius)` of the line leaving `p`
/// that keeps the circle on `side`. Returns `center` when `p` is inside the
/// circle.
pub fn tangent_from_point(p: DVec2, center: DVec2, radius: f64, side: Side) -> DVec2 {
    let v = center - p;
    let d = v.length();
    if radius <= 0. || d <= radius {
        return center;
    }
    let alpha = (radius / d).asin();
    let dir = rotate(
        v / d,
        match side {
            Side::Left => -alpha,
            Side::Right => alpha,
        },
    );
    p + dir * (d * d - radius * radius).sqrt()
}

/// Tangent point on the circle `(center, radius)` of the line arriving at
/// `p`, when travelling from the circle keeps it on `side`.
pub fn tangent_to_point(center: DVec2, radius: f64, side: Side, p: DVec2) -> DVec2 {
    tangent_from_point(p, center, radius, side.flip())
}

/// Tangent segment from the first circle to the second, both of the same
/// `radius`. Keeping both circles on the same side gives an outer tangent,
/// opposite sides give an inner tangent.
pub fn tangent_between_circles(
    c1: DVec2,
    side1: Side,
    c2: DVec2,
    side2: Side,
    radius: f64,
) -> (DVec2, DVec2) {
    let d = c1.distance(c2);
    if radius <= 0. || d == 0. {
        return (c1, c2);
    }
    if side1 == side2 {
        let n = right_normal((c2 - c1) / d)
            * match side1 {
                Side::Left => radius,
                Side::Right => -radius,
            };
        return (c1 + n, c2 + n);
    }
    let mid = (c1 + c2) * 0.5;
    if d <= 2. * radius {
        return (mid, mid);
    }
    let t2 = tangent_from_point(mid, c2, radius, side2);
    (2. * mid - t2, t2)
}

#[cfg(test)]
mod test {
    use glam::DVec2;

    use super::*;
    use crate::macros::{assert_float_eq, assert_point_eq};

    fn v(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    #[test]
    fn t_orientation() {
        assert!(orient2d(v(0., 0.), v(1., 0.), v(0., 1.)) > 0.);
        assert!(orient2d(v(0., 0.), v(1., 0.), v(0., -1.)) < 0.);
        assert_eq!(orient2d(v(0., 0.), v(1., 0.), v(3., 0.)), 0.);
        assert_float_eq!(signed_distance(v(0., 0.), v(2., 0.), v(5., 3.)), 3.);
    }

    #[test]
    fn t_incircle() {
        let (a, b, c) = (v(0., 0.), v(2., 0.), v(0., 2.));
        assert!(incircle(a, b, c, v(1., 1.)) > 0.);
        assert!(incircle(a, b, c, v(3., 3.)) < 0.);
        assert!(in_circumcircle(a, b, c, v(1.5, 1.5), 1e-9));
        // Cocircular.
        assert!(!in_circumcircle(a, b, c, v(2., 2.), 1e-9));
        // Clockwise triangles give the same answer.
        assert!(in_circumcircle(a, c, b, v(1.5, 1.5), 1e-9));
        assert!(!in_circumcircle(a, c, b, v(3., 3.), 1e-9));
        assert!(!in_circumcircle(a, b, v(4., 0.), v(1., 0.), 1e-9));
    }

    #[test]
    fn t_segment_intersection() {
        let eps = 1e-9;
        match segment_intersection(v(0., 0.), v(2., 2.), v(0., 2.), v(2., 0.), eps) {
            Intersection::Cross { point, t, u } => {
                assert_point_eq!(point, v(1., 1.));
                assert_float_eq!(t, 0.5);
                assert_float_eq!(u, 0.5);
            }
            other => panic!("Unexpected {:?}", other),
        }
        assert_eq!(
            segment_intersection(v(0., 0.), v(1., 0.), v(0., 1.), v(1., 1.), eps),
            Intersection::Parallel
        );
        assert_eq!(
            segment_intersection(v(0., 0.), v(2., 0.), v(1., 0.), v(3., 0.), eps),
            Intersection::FullyOverlaps
        );
        assert_eq!(
            segment_intersection(v(0., 0.), v(1., 0.), v(2., -1.), v(2., 1.), eps),
            Intersection::None
        );
        // Touching at an endpoint counts as a crossing.
        assert!(matches!(
            segment_intersection(v(0., 0.), v(1., 0.), v(1., 0.), v(1., 1.), eps),
            Intersection::Cross { .. }
        ));
    }

    #[test]
    fn t_polygon_predicates() {
        let square = [v(0., 0.), v(2., 0.), v(2., 2.), v(0., 2.)];
        assert_float_eq!(signed_area(&square), 4.);
        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert_float_eq!(signed_area(&reversed), -4.);
        assert!(point_in_polygon(v(1., 1.), &square));
        assert!(!point_in_polygon(v(3., 1.), &square));
        assert!(point_in_triangle(v(0.5, 0.5), v(0., 0.), v(2., 0.), v(0., 2.), 1e-9));
        assert!(point_in_triangle(v(1., 0.), v(0., 0.), v(0., 2.), v(2., 0.), 1e-9));
        assert!(!point_in_triangle(v(2., 2.), v(0., 0.), v(2., 0.), v(0., 2.), 1e-9));
        assert_float_eq!(point_segment_distance(v(1., 1.), v(0., 0.), v(2., 0.)), 1.);
        assert_float_eq!(point_segment_distance(v(3., 0.), v(0., 0.), v(2., 0.)), 1.);
        assert!(is_obtuse(v(-1., 0.1), v(0., 0.), v(1., 0.1)));
        assert!(!is_obtuse(v(1., 1.), v(0., 0.), v(1., 0.)));
    }

    #[test]
    fn t_point_tangent() {
        let center = v(5., 0.);
        let t = tangent_from_point(v(0., 0.), center, 3., Side::Left);
        assert_float_eq!(t.distance(center), 3.);
        // Radius is perpendicular to the tangent line.
        assert_float_eq!((t - center).dot(t), 0., 1e-9);
        // Circle center is on the left of the travel direction.
        assert!(orient2d(v(0., 0.), t, center) > 0.);
        let t = tangent_from_point(v(0., 0.), center, 3., Side::Right);
        assert!(orient2d(v(0., 0.), t, center) < 0.);
        let back = tangent_to_point(center, 3., Side::Left, v(0., 0.));
        assert!(orient2d(back, v(0., 0.), center) > 0.);
        // Inside the circle.
        assert_point_eq!(tangent_from_point(v(4., 0.), center, 3., Side::Left), center);
    }

    #[test]
    fn t_circle_tangents() {
        let (c1, c2) = (v(0., 0.), v(10., 0.));
        let (a, b) = tangent_between_circles(c1, Side::Left, c2, Side::Left, 1.);
        assert_point_eq!(a, v(0., -1.));
        assert_point_eq!(b, v(10., -1.));
        let (a, b) = tangent_between_circles(c1, Side::Right, c2, Side::Right, 1.);
        assert_point_eq!(a, v(0., 1.));
        assert_point_eq!(b, v(10., 1.));
        let (a, b) = tangent_between_circles(c1, Side::Left, c2, Side::Right, 1.);
        assert_float_eq!(a.distance(c1), 1.);
        assert_float_eq!(b.distance(c2), 1.);
        assert!(orient2d(a, b, c1) > 0.);
        assert!(orient2d(a, b, c2) < 0.);
        // Tangent at both ends.
        assert_float_eq!((b - a).dot(a - c1), 0., 1e-9);
        assert_float_eq!((b - a).dot(b - c2), 0., 1e-9);
    }
}
