//! Path types for navigation.
//!
//! A [`Path`] is the output of the A* planner: a sequence of waypoints from
//! the planning start to the goal. It is replaced wholesale on replanning.

use serde::{Deserialize, Serialize};

use crate::core::math::project_onto_segment;
use crate::core::types::Point2D;

/// A waypoint along a planned path, world coordinates (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
}

impl Waypoint {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_to(&self, other: &Waypoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading from this waypoint to another, in [-π, π].
    #[inline]
    pub fn heading_to(&self, other: &Waypoint) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl From<Point2D> for Waypoint {
    fn from(point: Point2D) -> Self {
        Self::new(point.x, point.y)
    }
}

/// Closest point on a path to a query position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProjection {
    /// Index of the segment start waypoint.
    pub segment: usize,
    /// Closest point on the path.
    pub point: Waypoint,
    /// Distance from the query to `point` (cross-track error).
    pub distance: f32,
}

/// A planned path to the goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Waypoints from start to goal.
    pub waypoints: Vec<Waypoint>,

    /// Total path length in meters.
    pub total_length: f32,
}

impl Path {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        let total_length = waypoints
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum();
        Self {
            waypoints,
            total_length,
        }
    }

    /// Path with no waypoints; the controller stops on it.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[inline]
    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    /// Final waypoint (the goal).
    #[inline]
    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Closest point on the polyline to `(x, y)`.
    ///
    /// Earliest segment wins ties. A single-waypoint path projects onto that
    /// waypoint. `None` for an empty path.
    pub fn project(&self, x: f32, y: f32) -> Option<PathProjection> {
        match self.waypoints.as_slice() {
            [] => None,
            [only] => Some(PathProjection {
                segment: 0,
                point: *only,
                distance: only.distance_to(&Waypoint::new(x, y)),
            }),
            waypoints => {
                let mut best: Option<PathProjection> = None;
                for (i, w) in waypoints.windows(2).enumerate() {
                    let ((px, py), _) = project_onto_segment(x, y, (w[0].x, w[0].y), (w[1].x, w[1].y));
                    let point = Waypoint::new(px, py);
                    let distance = point.distance_to(&Waypoint::new(x, y));
                    if best.is_none_or(|b| distance < b.distance) {
                        best = Some(PathProjection {
                            segment: i,
                            point,
                            distance,
                        });
                    }
                }
                best
            }
        }
    }

    /// Point `distance` meters further along the path from a projection.
    ///
    /// Clamps to the final waypoint.
    pub fn advance(&self, from: &PathProjection, distance: f32) -> Option<Waypoint> {
        let last = *self.last()?;
        let mut remaining = distance;
        let mut cursor = from.point;
        for next in self.waypoints.iter().skip(from.segment + 1) {
            let leg = cursor.distance_to(next);
            if leg >= remaining && leg > 0.0 {
                let t = remaining / leg;
                return Some(Waypoint::new(
                    cursor.x + t * (next.x - cursor.x),
                    cursor.y + t * (next.y - cursor.y),
                ));
            }
            remaining -= leg;
            cursor = *next;
        }
        Some(last)
    }

    /// Path length from a projection to the end.
    pub fn remaining_length(&self, from: &PathProjection) -> f32 {
        let mut cursor = from.point;
        let mut length = 0.0;
        for next in self.waypoints.iter().skip(from.segment + 1) {
            length += cursor.distance_to(next);
            cursor = *next;
        }
        length
    }
}
