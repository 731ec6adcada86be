use super::vehicle::Position;
use serde::{Deserialize, Serialize};

/// Rectangular world the vehicle lives in, with its origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// Axis-aligned bounding box of the vehicle sprite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleExtent {
    pub width: f32,
    pub height: f32,
}

impl VehicleExtent {
    pub fn margin_x(&self) -> f32 {
        self.width / 2.0
    }

    pub fn margin_y(&self) -> f32 {
        self.height / 2.0
    }
}

impl Default for VehicleExtent {
    // 80x120 sprite drawn at 5% scale
    fn default() -> Self {
        Self {
            width: 4.0,
            height: 6.0,
        }
    }
}

impl WorldBounds {
    /// Clamps each axis independently so the vehicle box stays inside the
    /// world. Already-valid positions are returned unchanged.
    pub fn clamp(&self, position: Position, extent: &VehicleExtent) -> Position {
        let (mx, my) = (extent.margin_x(), extent.margin_y());
        Position {
            x: position.x.max(mx).min(self.width - mx),
            y: position.y.max(my).min(self.height - my),
        }
    }

    pub fn contains(&self, position: Position, extent: &VehicleExtent) -> bool {
        let (mx, my) = (extent.margin_x(), extent.margin_y());
        (mx..=self.width - mx).contains(&position.x) && (my..=self.height - my).contains(&position.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pulls_each_axis_inside() {
        let world = WorldBounds::default();
        let extent = VehicleExtent {
            width: 40.0,
            height: 60.0,
        };

        let clamped = world.clamp(Position::new(-100.0, 5000.0), &extent);
        assert_eq!(clamped, Position::new(20.0, 1050.0));

        let clamped = world.clamp(Position::new(1919.0, 0.0), &extent);
        assert_eq!(clamped, Position::new(1900.0, 30.0));
    }

    #[test]
    fn clamp_is_idempotent() {
        let world = WorldBounds::default();
        let extent = VehicleExtent::default();

        let inside = Position::new(500.0, 400.0);
        assert_eq!(world.clamp(inside, &extent), inside);

        let once = world.clamp(Position::new(3000.0, -3000.0), &extent);
        assert_eq!(world.clamp(once, &extent), once);
        assert!(world.contains(once, &extent));
    }
}
