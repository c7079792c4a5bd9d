use glam::DVec2;

use crate::{error::Error, math};

/// Vertices of a polygon being clipped, linked into a ring through arrays so
/// that neighbours can be found and unlinked in constant time.
struct Ring<'a> {
    points: &'a [DVec2],
    prev: Vec<usize>,
    next: Vec<usize>,
    ear: Vec<bool>,
    len: usize,
}

impl<'a> Ring<'a> {
    fn new(points: &'a [DVec2]) -> Self {
        let n = points.len();
        let mut ring = Ring {
            points,
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            next: (0..n).map(|i| (i + 1) % n).collect(),
            ear: vec![false; n],
            len: n,
        };
        ring.classify_all();
        ring
    }

    fn is_reflex(&self, i: usize) -> bool {
        let (a, b, c) = (
            self.points[self.prev[i]],
            self.points[i],
            self.points[self.next[i]],
        );
        math::orient2d(a, b, c) <= 0.
    }

    /// A convex corner whose triangle contains no other vertex of the ring.
    fn is_ear(&self, i: usize) -> bool {
        if self.is_reflex(i) {
            return false;
        }
        let (pi, ni) = (self.prev[i], self.next[i]);
        let (a, b, c) = (self.points[pi], self.points[i], self.points[ni]);
        let mut j = self.next[ni];
        while j != pi {
            // Only reflex corners can poke into a convex corner's triangle.
            if self.is_reflex(j) && math::point_in_triangle(self.points[j], a, b, c, 0.) {
                return false;
            }
            j = self.next[j];
        }
        true
    }

    fn classify_all(&mut self) {
        let mut i = 0;
        for _ in 0..self.len {
            i = self.next[i];
            self.ear[i] = self.is_ear(i);
        }
    }

    fn find_ear(&self, start: usize) -> Option<usize> {
        let mut i = start;
        for _ in 0..self.len {
            if self.ear[i] {
                return Some(i);
            }
            i = self.next[i];
        }
        None
    }

    fn unlink(&mut self, i: usize) -> [usize; 3] {
        let (p, n) = (self.prev[i], self.next[i]);
        self.next[p] = n;
        self.prev[n] = p;
        self.len -= 1;
        [p, i, n]
    }
}

/// Triangulate a simple counter-clockwise polygon by clipping ears. Returns
/// triangles as counter-clockwise triples of indices into `points`.
///
/// After every clip only the two neighbours of the removed corner are
/// reclassified. A full reclassification is attempted once before giving up
/// when no ear is left.
pub fn ear_clip(points: &[DVec2]) -> Result<Vec<[usize; 3]>, Error> {
    let n = points.len();
    if n < 3 {
        return Err(Error::EarClippingFailed(n));
    }
    let mut ring = Ring::new(points);
    let mut out = Vec::with_capacity(n - 2);
    let mut cursor = 0;
    while ring.len > 3 {
        let i = match ring.find_ear(cursor) {
            Some(i) => i,
            None => {
                ring.classify_all();
                ring.find_ear(cursor)
                    .ok_or(Error::EarClippingFailed(ring.len))?
            }
        };
        let tri = ring.unlink(i);
        out.push(tri);
        let [p, _, n] = tri;
        ring.ear[p] = ring.is_ear(p);
        ring.ear[n] = ring.is_ear(n);
        cursor = n;
    }
    out.push([ring.prev[cursor], cursor, ring.next[cursor]]);
    Ok(out)
}

#[cfg(test)]
mod test {
    use arrayvec::ArrayVec;
    use glam::DVec2;

    use super::ear_clip;
    use crate::{error::Error, math};

    fn area(points: &[DVec2], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|[a, b, c]| {
                let o = math::orient2d(points[*a], points[*b], points[*c]);
                assert!(o > 0., "Triangle is not counter-clockwise");
                0.5 * o
            })
            .sum()
    }

    #[test]
    fn t_ear_clip_convex() {
        let points: ArrayVec<DVec2, 6> = (0..6)
            .map(|i| {
                let t = i as f64 * std::f64::consts::PI / 3.;
                DVec2::new(t.cos(), t.sin())
            })
            .collect();
        let tris = ear_clip(&points).expect("Unable to triangulate");
        assert_eq!(tris.len(), 4);
        assert!((area(&points, &tris) - math::signed_area(&points)).abs() < 1e-12);
    }

    #[test]
    fn t_ear_clip_concave() {
        // An L shape, and a comb with deep notches.
        let lshape = [
            DVec2::new(0., 0.),
            DVec2::new(2., 0.),
            DVec2::new(2., 1.),
            DVec2::new(1., 1.),
            DVec2::new(1., 2.),
            DVec2::new(0., 2.),
        ];
        let tris = ear_clip(&lshape).expect("Unable to triangulate");
        assert_eq!(tris.len(), 4);
        assert!((area(&lshape, &tris) - 3.).abs() < 1e-12);
        let mut comb = vec![DVec2::new(0., 0.), DVec2::new(7., 0.)];
        for i in (0..4).rev() {
            let x = i as f64 * 2.;
            comb.push(DVec2::new(x + 1., 5.));
            comb.push(DVec2::new(x + 0.5, 1.));
            comb.push(DVec2::new(x, 5.));
        }
        comb.dedup();
        assert!(math::signed_area(&comb) > 0.);
        let tris = ear_clip(&comb).expect("Unable to triangulate");
        assert_eq!(tris.len(), comb.len() - 2);
        assert!((area(&comb, &tris) - math::signed_area(&comb)).abs() < 1e-9);
    }

    #[test]
    fn t_ear_clip_too_small() {
        assert!(matches!(
            ear_clip(&[DVec2::ZERO, DVec2::X]),
            Err(Error::EarClippingFailed(2))
        ));
    }
}
