//! Line-of-sight filter for what a client is allowed to perceive.
//!
//! A point is visible when it lies inside the current viewport polygon and
//! the segment from the observer to it crosses no obstacle edge. There is
//! no partial occlusion.
//!
//! Nothing is cached between calls to [`VisibleArea::contains`]; callers
//! refresh the area with [`VisibleArea::update`] only when the observer
//! moves.

use crate::geometry::{point_in_polygon, segments_intersect, Point, Segment};
use crate::objects::Obstacle;

#[derive(Debug, Clone, Default)]
pub struct VisibleArea {
    observer_position: Point,
    visible_polygon: Vec<Point>,
    walls: Vec<Segment>,
}

impl VisibleArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the observer, the viewport and the candidate obstacles.
    /// Obstacles are flattened into edges here so `contains` is a single
    /// pass over segments.
    pub fn update<'a, I>(&mut self, observer_position: Point, visible_area: &[Point], obstacles: I)
    where
        I: IntoIterator<Item = &'a Obstacle>,
    {
        self.observer_position = observer_position;
        self.visible_polygon.clear();
        self.visible_polygon.extend_from_slice(visible_area);
        self.walls.clear();
        for obstacle in obstacles {
            self.walls.extend(obstacle.edges());
        }
    }

    pub fn observer_position(&self) -> Point {
        self.observer_position
    }

    pub fn walls(&self) -> &[Segment] {
        &self.walls
    }

    pub fn contains(&self, point: Point) -> bool {
        let (x, y) = point;
        if !point_in_polygon(x, y, &self.visible_polygon) {
            return false;
        }
        let observer = self.observer_position;
        !self
            .walls
            .iter()
            .any(|&(a, b)| segments_intersect(observer, point, a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Vec<Point> {
        vec![(0.0, 0.0), (500.0, 0.0), (500.0, 500.0), (0.0, 500.0)]
    }

    fn wall() -> Obstacle {
        Obstacle::new(
            vec![(300.0, 300.0), (500.0, 300.0), (500.0, 310.0), (300.0, 310.0)],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_area_sees_nothing() {
        let area = VisibleArea::new();
        assert!(!area.contains((0.0, 0.0)));
    }

    #[test]
    fn test_walls_include_closing_edge() {
        let mut area = VisibleArea::new();
        let obstacle = wall();
        area.update((250.0, 250.0), &screen(), [&obstacle]);
        assert_eq!(area.walls().len(), 4);
        assert_eq!(area.walls()[3], ((300.0, 310.0), (300.0, 300.0)));
    }

    #[test]
    fn test_outside_viewport_is_never_visible() {
        let mut area = VisibleArea::new();
        area.update((250.0, 250.0), &screen(), std::iter::empty());
        assert!(!area.contains((600.0, 250.0)));
        assert!(!area.contains((-1.0, -1.0)));
    }

    #[test]
    fn test_clear_line_is_visible() {
        let mut area = VisibleArea::new();
        let obstacle = wall();
        area.update((250.0, 250.0), &screen(), [&obstacle]);
        assert!(area.contains((100.0, 100.0)));
        assert!(area.contains((250.0, 450.0)));
    }

    #[test]
    fn test_wall_occludes() {
        let mut area = VisibleArea::new();
        let obstacle = wall();
        area.update((400.0, 250.0), &screen(), [&obstacle]);
        assert!(!area.contains((400.0, 450.0)));
        assert!(area.contains((100.0, 350.0)));
    }

    #[test]
    fn test_update_replaces_previous_state() {
        let mut area = VisibleArea::new();
        let obstacle = wall();
        area.update((400.0, 250.0), &screen(), [&obstacle]);
        assert!(!area.contains((400.0, 450.0)));

        area.update((400.0, 250.0), &screen(), std::iter::empty());
        assert!(area.walls().is_empty());
        assert!(area.contains((400.0, 450.0)));
    }
}
