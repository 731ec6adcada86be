use serde::{Deserialize, Serialize};
use std::fmt;

/// Forward gear of the vehicle.
///
/// Only `1..=3` are representable. Reverse is not a gear; it is implied by a
/// negative speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Gear(u8);

impl Gear {
    pub const FIRST: Gear = Gear(1);
    pub const TOP: Gear = Gear(3);

    pub fn new(value: u8) -> Option<Self> {
        (Self::FIRST.0..=Self::TOP.0)
            .contains(&value)
            .then_some(Gear(value))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Next gear up, or the same gear when already in top.
    pub fn shifted_up(self) -> Self {
        if self < Self::TOP {
            Gear(self.0 + 1)
        } else {
            self
        }
    }

    /// Next gear down, or the same gear when already in first.
    pub fn shifted_down(self) -> Self {
        if self > Self::FIRST {
            Gear(self.0 - 1)
        } else {
            self
        }
    }
}

impl Default for Gear {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Gear {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Gear::new(value).ok_or_else(|| format!("gear {} is outside 1..=3", value))
    }
}

impl From<Gear> for u8 {
    fn from(gear: Gear) -> Self {
        gear.0
    }
}

/// Speed limits per gear plus the single reverse limit.
///
/// Index 0 of `forward_caps` is unused and kept at zero so gear numbers index
/// the table directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearTable {
    pub forward_caps: [f32; 4],
    pub reverse_cap: f32,
}

impl GearTable {
    pub fn cap(&self, gear: Gear) -> f32 {
        self.forward_caps[usize::from(gear.number())]
    }
}

impl Default for GearTable {
    fn default() -> Self {
        Self {
            forward_caps: [0.0, 2.07, 2.88, 4.05],
            reverse_cap: -1.38,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_range_is_one_to_three() {
        assert_eq!(Gear::new(0), None);
        assert_eq!(Gear::new(4), None);
        assert_eq!(Gear::new(2).map(Gear::number), Some(2));
    }

    #[test]
    fn shifting_saturates_at_the_ends() {
        assert_eq!(Gear::TOP.shifted_up(), Gear::TOP);
        assert_eq!(Gear::FIRST.shifted_down(), Gear::FIRST);
        assert_eq!(Gear::FIRST.shifted_up().number(), 2);
        assert_eq!(Gear::TOP.shifted_down().number(), 2);
    }

    #[test]
    fn default_table_caps() {
        let table = GearTable::default();
        assert_eq!(table.cap(Gear::FIRST), 2.07);
        assert_eq!(table.cap(Gear::FIRST.shifted_up()), 2.88);
        assert_eq!(table.cap(Gear::TOP), 4.05);
        assert_eq!(table.reverse_cap, -1.38);
    }

    #[test]
    fn gear_deserializes_from_number_and_rejects_out_of_range() {
        #[derive(Deserialize)]
        struct Holder {
            gear: Gear,
        }
        let ok: Holder = toml::from_str("gear = 3").unwrap();
        assert_eq!(ok.gear, Gear::TOP);
        assert!(toml::from_str::<Holder>("gear = 5").is_err());
    }
}
