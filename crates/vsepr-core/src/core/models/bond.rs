use super::ids::PairGroupId;
use super::pair_group::{BONDED_PAIR_DISTANCE, LONE_PAIR_DISTANCE};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Order of a bond. Order zero links a lone pair to its owning atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BondOrder {
    LonePair = 0,
    Single = 1,
    Double = 2,
    Triple = 3,
}

impl Default for BondOrder {
    fn default() -> Self {
        BondOrder::Single
    }
}

impl BondOrder {
    #[inline]
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn is_lone_pair(self) -> bool {
        self == BondOrder::LonePair
    }

    /// Resting length used when no explicit length is requested.
    pub fn default_length(self) -> f64 {
        if self.is_lone_pair() {
            LONE_PAIR_DISTANCE
        } else {
            BONDED_PAIR_DISTANCE
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid bond order '{0}' (expected 0-3 or lone-pair/single/double/triple)")]
pub struct ParseBondOrderError(pub String);

impl TryFrom<u8> for BondOrder {
    type Error = ParseBondOrderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::LonePair),
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            3 => Ok(Self::Triple),
            other => Err(ParseBondOrderError(other.to_string())),
        }
    }
}

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "lp" | "lone-pair" => Ok(Self::LonePair),
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            _ => Err(ParseBondOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::LonePair => "Lone pair",
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
            }
        )
    }
}

/// An undirected link between two pair groups with a resting length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub a: PairGroupId,
    pub b: PairGroupId,
    pub order: BondOrder,
    pub length: f64,
}

impl Bond {
    pub fn new(a: PairGroupId, b: PairGroupId, order: BondOrder, length: f64) -> Self {
        Self {
            a,
            b,
            order,
            length,
        }
    }

    pub fn contains(&self, id: PairGroupId) -> bool {
        self.a == id || self.b == id
    }

    /// The opposite endpoint, or `None` if `id` is not part of this bond.
    pub fn other(&self, id: PairGroupId) -> Option<PairGroupId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }

    /// Whether this bond joins `x` and `y`, in either direction.
    pub fn connects(&self, x: PairGroupId, y: PairGroupId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_group_id(n: u64) -> PairGroupId {
        PairGroupId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn bond_order_parses_numbers_and_names() {
        assert_eq!("0".parse::<BondOrder>().unwrap(), BondOrder::LonePair);
        assert_eq!("lone-pair".parse::<BondOrder>().unwrap(), BondOrder::LonePair);
        assert_eq!("S".parse::<BondOrder>().unwrap(), BondOrder::Single);
        assert_eq!("double".parse::<BondOrder>().unwrap(), BondOrder::Double);
        assert_eq!("3".parse::<BondOrder>().unwrap(), BondOrder::Triple);
        assert!("4".parse::<BondOrder>().is_err());
        assert!("aromatic".parse::<BondOrder>().is_err());
    }

    #[test]
    fn bond_order_converts_from_integers() {
        assert_eq!(BondOrder::try_from(2).unwrap(), BondOrder::Double);
        assert_eq!(BondOrder::Triple.value(), 3);
        assert!(BondOrder::try_from(4).is_err());
    }

    #[test]
    fn default_lengths_depend_on_order() {
        assert_eq!(BondOrder::LonePair.default_length(), LONE_PAIR_DISTANCE);
        assert_eq!(BondOrder::Single.default_length(), BONDED_PAIR_DISTANCE);
        assert_eq!(BondOrder::Triple.default_length(), BONDED_PAIR_DISTANCE);
    }

    #[test]
    fn bond_endpoints_are_unordered() {
        let a = dummy_group_id(1);
        let b = dummy_group_id(2);
        let c = dummy_group_id(3);
        let bond = Bond::new(a, b, BondOrder::Single, 10.0);

        assert!(bond.contains(a) && bond.contains(b));
        assert!(!bond.contains(c));
        assert_eq!(bond.other(a), Some(b));
        assert_eq!(bond.other(b), Some(a));
        assert_eq!(bond.other(c), None);
        assert!(bond.connects(b, a));
        assert!(!bond.connects(a, c));
    }
}
