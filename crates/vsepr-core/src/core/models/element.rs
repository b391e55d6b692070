use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements that can appear in a VSEPR molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Element {
    H,
    He,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Si,
    P,
    S,
    Cl,
    Ar,
    As,
    Se,
    Br,
    Kr,
    Te,
    I,
    Xe,
}

static SYMBOL_MAP: Map<&'static str, Element> = phf_map! {
    "H" => Element::H,
    "HE" => Element::He,
    "BE" => Element::Be,
    "B" => Element::B,
    "C" => Element::C,
    "N" => Element::N,
    "O" => Element::O,
    "F" => Element::F,
    "NE" => Element::Ne,
    "SI" => Element::Si,
    "P" => Element::P,
    "S" => Element::S,
    "CL" => Element::Cl,
    "AR" => Element::Ar,
    "AS" => Element::As,
    "SE" => Element::Se,
    "BR" => Element::Br,
    "KR" => Element::Kr,
    "TE" => Element::Te,
    "I" => Element::I,
    "XE" => Element::Xe,
};

impl Element {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::H => "H",
            Self::He => "He",
            Self::Be => "Be",
            Self::B => "B",
            Self::C => "C",
            Self::N => "N",
            Self::O => "O",
            Self::F => "F",
            Self::Ne => "Ne",
            Self::Si => "Si",
            Self::P => "P",
            Self::S => "S",
            Self::Cl => "Cl",
            Self::Ar => "Ar",
            Self::As => "As",
            Self::Se => "Se",
            Self::Br => "Br",
            Self::Kr => "Kr",
            Self::Te => "Te",
            Self::I => "I",
            Self::Xe => "Xe",
        }
    }

    pub fn atomic_number(self) -> u8 {
        match self {
            Self::H => 1,
            Self::He => 2,
            Self::Be => 4,
            Self::B => 5,
            Self::C => 6,
            Self::N => 7,
            Self::O => 8,
            Self::F => 9,
            Self::Ne => 10,
            Self::Si => 14,
            Self::P => 15,
            Self::S => 16,
            Self::Cl => 17,
            Self::Ar => 18,
            Self::As => 33,
            Self::Se => 34,
            Self::Br => 35,
            Self::Kr => 36,
            Self::Te => 52,
            Self::I => 53,
            Self::Xe => 54,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SYMBOL_MAP
            .get(s.trim().to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl TryFrom<String> for Element {
    type Error = ParseElementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Element> for String {
    fn from(element: Element) -> Self {
        element.symbol().to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
