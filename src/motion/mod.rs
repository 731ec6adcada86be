//! Vehicle motion model
//!
//! - [`vehicle`] - pose, speed and gear of the single vehicle
//! - [`gear`] - gear numbers and the per-gear speed table
//! - [`bounds`] - world rectangle and wall clamping
//! - [`controller`] - the per-tick update that ties them together
//!
//! Forward, reverse and stopped are not stored anywhere; they follow
//! from the sign and magnitude of the speed.

pub mod bounds;
pub mod controller;
pub mod gear;
pub mod vehicle;

pub use bounds::{VehicleExtent, WorldBounds};
pub use controller::{MotionController, MotionParams};
pub use gear::{Gear, GearTable};
pub use vehicle::{DriveMode, Position, VehicleState};
