//! Arena obstacles and the subset of them that falls inside a viewport.

use crate::geometry::{point_in_polygon, Point};
use crate::objects::{Obstacle, ShapeError};

/// Static world geometry plus the subset of it that touches the viewport.
#[derive(Debug, Clone)]
pub struct Map {
    obstacles: Vec<Obstacle>,
    visible: Vec<usize>,
}

impl Default for Map {
    fn default() -> Self {
        Self::with_obstacles(default_obstacles())
    }
}

impl Map {
    pub fn with_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self {
            obstacles,
            visible: Vec::new(),
        }
    }

    /// Builds a map from raw vertex lists, failing on any degenerate shape.
    pub fn from_vertices(shapes: Vec<(Vec<Point>, bool)>) -> Result<Self, ShapeError> {
        let obstacles = shapes
            .into_iter()
            .map(|(vertices, destructible)| Obstacle::new(vertices, destructible))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_obstacles(obstacles))
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// An obstacle is visible when any of its vertices lies in the viewport.
    pub fn update_visible_map_area(&mut self, viewport: &[Point]) {
        self.visible = self
            .obstacles
            .iter()
            .enumerate()
            .filter(|(_, obstacle)| {
                obstacle
                    .vertices()
                    .iter()
                    .any(|&(x, y)| point_in_polygon(x, y, viewport))
            })
            .map(|(index, _)| index)
            .collect();
    }

    pub fn visible_obstacles(&self) -> impl Iterator<Item = &Obstacle> + '_ {
        self.visible.iter().map(move |&index| &self.obstacles[index])
    }
}

fn default_obstacles() -> Vec<Obstacle> {
    let wall = vec![(300.0, 300.0), (500.0, 300.0), (500.0, 310.0), (300.0, 310.0)];
    Obstacle::new(wall, false).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(left: f32, bottom: f32, width: f32, height: f32) -> Vec<Point> {
        vec![
            (left, bottom),
            (left + width, bottom),
            (left + width, bottom + height),
            (left, bottom + height),
        ]
    }

    #[test]
    fn test_default_map_has_wall() {
        let map = Map::default();
        assert_eq!(map.obstacles().len(), 1);
        assert_eq!(map.obstacles()[0].len(), 4);
        assert_eq!(map.visible_obstacles().count(), 0);
    }

    #[test]
    fn test_visible_obstacles_follow_viewport() {
        let mut map = Map::default();

        map.update_visible_map_area(&viewport(0.0, 0.0, 500.0, 500.0));
        assert_eq!(map.visible_obstacles().count(), 1);

        map.update_visible_map_area(&viewport(1000.0, 1000.0, 500.0, 500.0));
        assert_eq!(map.visible_obstacles().count(), 0);
    }

    #[test]
    fn test_from_vertices_rejects_degenerate_shapes() {
        let result = Map::from_vertices(vec![(vec![(0.0, 0.0), (1.0, 0.0)], false)]);
        assert_eq!(result.unwrap_err(), ShapeError::TooFewVertices(2));
    }
}
