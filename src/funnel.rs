/*!
Path smoothing through a corridor of portals.

This is the simple stupid funnel algorithm, generalized to agents with a
radius. Every portal vertex is inflated into a circle of the agent's radius,
and the directions the funnel narrows along are tangents to those circles
rather than segments between raw points. With a zero radius it reduces to the
classic string pulling.
*/

use glam::DVec2;

use crate::math::{self, Side};

/// A point the path bends around. Portal vertices keep their circle on the
/// given side of the path, plain points have no circle.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Corner {
    pos: DVec2,
    side: Option<Side>,
}

impl Corner {
    fn point(pos: DVec2) -> Self {
        Corner { pos, side: None }
    }
}

/// Tangent segment leaving `from` and arriving at `to`.
fn tangent(from: Corner, to: Corner, radius: f64) -> (DVec2, DVec2) {
    match (from.side, to.side) {
        (None, None) => (from.pos, to.pos),
        (None, Some(side)) => (
            from.pos,
            math::tangent_from_point(from.pos, to.pos, radius, side),
        ),
        (Some(side), None) => (
            math::tangent_to_point(from.pos, radius, side, to.pos),
            to.pos,
        ),
        (Some(s1), Some(s2)) => math::tangent_between_circles(from.pos, s1, to.pos, s2, radius),
    }
}

fn direction(from: Corner, to: Corner, radius: f64) -> DVec2 {
    let (a, b) = tangent(from, to, radius);
    b - a
}

fn push_point(path: &mut Vec<DVec2>, p: DVec2) {
    if path.last().is_none_or(|last| last.distance(p) > 1e-12) {
        path.push(p);
    }
}

/// Shortest path from `start` to `goal` through the portals, keeping at least
/// `radius` away from every portal vertex it bends around. Each portal is a
/// `(left, right)` pair as seen when walking towards the goal.
pub fn smooth(start: DVec2, goal: DVec2, portals: &[(DVec2, DVec2)], radius: f64) -> Vec<DVec2> {
    let radius = radius.max(0.);
    let mut corners: Vec<(Corner, Corner)> = Vec::with_capacity(portals.len() + 2);
    corners.push((Corner::point(start), Corner::point(start)));
    corners.extend(portals.iter().map(|(l, r)| {
        (
            Corner {
                pos: *l,
                side: Some(Side::Left),
            },
            Corner {
                pos: *r,
                side: Some(Side::Right),
            },
        )
    }));
    corners.push((Corner::point(goal), Corner::point(goal)));

    let mut path = vec![start];
    let mut apex = Corner::point(start);
    let (mut left_index, mut right_index) = (0usize, 0usize);
    let (mut left_dir, mut right_dir) = (DVec2::ZERO, DVec2::ZERO);
    let mut i = 1;
    while i < corners.len() {
        let (left, right) = corners[i];
        // Right side of the funnel.
        let dir = direction(apex, right, radius);
        if right_dir.perp_dot(dir) >= 0. {
            if left_dir.perp_dot(dir) > 0. {
                // Crossed over the left side, which becomes the new apex.
                let next = corners[left_index].0;
                let (a, b) = tangent(apex, next, radius);
                push_point(&mut path, a);
                push_point(&mut path, b);
                apex = next;
                right_index = left_index;
                left_dir = DVec2::ZERO;
                right_dir = DVec2::ZERO;
                i = left_index + 1;
                continue;
            }
            right_index = i;
            right_dir = dir;
        }
        // Left side of the funnel.
        let dir = direction(apex, left, radius);
        if left_dir.perp_dot(dir) <= 0. {
            if right_dir.perp_dot(dir) < 0. {
                // Crossed over the right side, which becomes the new apex.
                let next = corners[right_index].1;
                let (a, b) = tangent(apex, next, radius);
                push_point(&mut path, a);
                push_point(&mut path, b);
                apex = next;
                left_index = right_index;
                left_dir = DVec2::ZERO;
                right_dir = DVec2::ZERO;
                i = right_index + 1;
                continue;
            }
            left_index = i;
            left_dir = dir;
        }
        i += 1;
    }
    let (a, b) = tangent(apex, Corner::point(goal), radius);
    push_point(&mut path, a);
    push_point(&mut path, b);
    path
}
