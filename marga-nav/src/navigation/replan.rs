//! Replanning decisions.
//!
//! Evaluated once per tick. A replan happens when no path is held, when the
//! robot has drifted off the held path, or when a c-space rebuild blocks the
//! part of the path still ahead. Otherwise the held path is kept as is.
//!
//! A failed attempt is not repeated until the map revision or the robot's
//! c-space cell changes: the same inputs would fail the same way.

use super::Path;
use crate::algorithms::planning::CSpace;
use crate::core::types::Pose2D;

/// Why the held path is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplanReason {
    NoPath,
    Deviated,
    Blocked,
}

impl std::fmt::Display for ReplanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplanReason::NoPath => write!(f, "no path"),
            ReplanReason::Deviated => write!(f, "deviated from path"),
            ReplanReason::Blocked => write!(f, "path blocked"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplanPolicy {
    deviation_tolerance: f32,
    /// Map revision and robot cell of the last failed attempt.
    last_failure: Option<(u64, (usize, usize))>,
}

impl ReplanPolicy {
    pub fn new(deviation_tolerance: f32) -> Self {
        Self {
            deviation_tolerance,
            last_failure: None,
        }
    }

    /// False while the inputs match the last failed attempt.
    pub fn should_attempt(&self, revision: u64, cell: Option<(usize, usize)>) -> bool {
        match (self.last_failure, cell) {
            (Some(failed), Some(cell)) => failed != (revision, cell),
            _ => true,
        }
    }

    pub fn record_failure(&mut self, revision: u64, cell: Option<(usize, usize)>) {
        self.last_failure = cell.map(|cell| (revision, cell));
    }

    pub fn record_success(&mut self) {
        self.last_failure = None;
    }

    /// Decide whether to replan.
    ///
    /// `cspace_rebuilt` is true when the map's occupied revision moved since
    /// the held path was last checked; the corridor test only runs then.
    pub fn evaluate(
        &self,
        pose: &Pose2D,
        path: &Path,
        cspace: &CSpace,
        cspace_rebuilt: bool,
    ) -> Option<ReplanReason> {
        let Some(projection) = path.project(pose.x, pose.y) else {
            return Some(ReplanReason::NoPath);
        };
        if projection.distance > self.deviation_tolerance {
            return Some(ReplanReason::Deviated);
        }
        if cspace_rebuilt && !remaining_is_clear(pose, path, cspace) {
            return Some(ReplanReason::Blocked);
        }
        None
    }

    /// On a failed replan: keep the held path only if what remains of it is
    /// still clear in the current c-space.
    pub fn retain_on_no_route(&self, pose: &Pose2D, path: &Path, cspace: &CSpace) -> bool {
        !path.is_empty() && remaining_is_clear(pose, path, cspace)
    }
}

/// True if the path from the robot's projection onward is free.
fn remaining_is_clear(pose: &Pose2D, path: &Path, cspace: &CSpace) -> bool {
    let Some(projection) = path.project(pose.x, pose.y) else {
        return false;
    };
    let mut cursor = (projection.point.x, projection.point.y);
    for next in path.waypoints.iter().skip(projection.segment + 1) {
        if !cspace.segment_is_free(cursor, (next.x, next.y)) {
            return false;
        }
        cursor = (next.x, next.y);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Waypoint;

    fn space() -> CSpace {
        CSpace::new((0.0, 0.0), 4.0, 4.0, 0.05, 0.1)
    }

    fn path() -> Path {
        Path::new(vec![
            Waypoint::new(0.5, 0.5),
            Waypoint::new(3.5, 0.5),
            Waypoint::new(3.5, 3.5),
        ])
    }

    #[test]
    fn test_no_path_triggers() {
        let policy = ReplanPolicy::new(0.4);
        assert_eq!(
            policy.evaluate(&Pose2D::identity(), &Path::empty(), &space(), false),
            Some(ReplanReason::NoPath)
        );
    }

    #[test]
    fn test_on_path_is_idempotent() {
        let policy = ReplanPolicy::new(0.4);
        let pose = Pose2D::new(1.0, 0.6, 0.0);
        assert_eq!(policy.evaluate(&pose, &path(), &space(), false), None);
        assert_eq!(policy.evaluate(&pose, &path(), &space(), true), None);
    }

    #[test]
    fn test_deviation_triggers() {
        let policy = ReplanPolicy::new(0.4);
        let pose = Pose2D::new(1.0, 1.5, 0.0);
        assert_eq!(
            policy.evaluate(&pose, &path(), &space(), false),
            Some(ReplanReason::Deviated)
        );
    }

    #[test]
    fn test_blocked_ahead_triggers_only_after_rebuild() {
        let policy = ReplanPolicy::new(0.4);
        let mut cs = space();
        cs.add_obstacle(3.5, 2.0);
        let pose = Pose2D::new(1.0, 0.5, 0.0);

        assert_eq!(policy.evaluate(&pose, &path(), &cs, false), None);
        assert_eq!(
            policy.evaluate(&pose, &path(), &cs, true),
            Some(ReplanReason::Blocked)
        );
        assert!(!policy.retain_on_no_route(&pose, &path(), &cs));
    }

    #[test]
    fn test_failed_attempt_waits_for_new_inputs() {
        let mut policy = ReplanPolicy::new(0.4);
        assert!(policy.should_attempt(3, Some((10, 10))));

        policy.record_failure(3, Some((10, 10)));
        assert!(!policy.should_attempt(3, Some((10, 10))));
        // Map changed
        assert!(policy.should_attempt(4, Some((10, 10))));
        // Robot moved
        assert!(policy.should_attempt(3, Some((11, 10))));
        // Off the grid: nothing to compare against
        assert!(policy.should_attempt(3, None));

        policy.record_success();
        assert!(policy.should_attempt(3, Some((10, 10))));
    }

    #[test]
    fn test_blocked_behind_is_ignored() {
        let policy = ReplanPolicy::new(0.4);
        let mut cs = space();
        cs.add_obstacle(0.6, 0.5);
        let pose = Pose2D::new(3.5, 1.5, 0.0);

        assert_eq!(policy.evaluate(&pose, &path(), &cs, true), None);
        assert!(policy.retain_on_no_route(&pose, &path(), &cs));
        assert!(!policy.retain_on_no_route(&pose, &Path::empty(), &cs));
    }
}
