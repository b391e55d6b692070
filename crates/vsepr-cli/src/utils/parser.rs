use thiserror::Error;

const MAX_GROUPS: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty AXE notation. Expected something like 'AX3E' or 'AX2E2'.")]
    Empty,

    #[error("AXE notation '{0}' must start with the central atom 'A'.")]
    MissingCentralAtom(String),

    #[error("Unexpected character '{found}' at position {position} in AXE notation '{notation}'.")]
    UnexpectedCharacter {
        notation: String,
        found: char,
        position: usize,
    },

    #[error("Term '{term}' appears more than once in AXE notation '{notation}'.")]
    RepeatedTerm { notation: String, term: char },

    #[error("AXE notation '{notation}' has {total} groups; at most {MAX_GROUPS} are supported.")]
    TooManyGroups { notation: String, total: usize },
}

/// Bonded-atom and lone-pair counts around the central atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxeNotation {
    pub bonded_atoms: usize,
    pub lone_pairs: usize,
}

/// Parses `AXₓEₑ` notation, case-insensitively.
///
/// A term without a count stands for one group (`AXE` is `AX1E1`), and an absent
/// term for none.
pub fn parse_axe(input: &str) -> Result<AxeNotation, ParseError> {
    let notation = input.trim();
    if notation.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut chars = notation.char_indices().peekable();
    match chars.next() {
        Some((_, 'A' | 'a')) => {}
        _ => return Err(ParseError::MissingCentralAtom(notation.to_string())),
    }

    let mut bonded_atoms = None;
    let mut lone_pairs = None;
    while let Some((position, c)) = chars.next() {
        let term = c.to_ascii_uppercase();
        let slot = match term {
            'X' => &mut bonded_atoms,
            'E' => &mut lone_pairs,
            _ => {
                return Err(ParseError::UnexpectedCharacter {
                    notation: notation.to_string(),
                    found: c,
                    position,
                });
            }
        };
        if slot.is_some() {
            return Err(ParseError::RepeatedTerm {
                notation: notation.to_string(),
                term,
            });
        }

        let mut digits = String::new();
        while let Some(&(_, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }
        let count = if digits.is_empty() {
            1
        } else {
            digits.parse::<usize>().map_err(|_| ParseError::TooManyGroups {
                notation: notation.to_string(),
                total: usize::MAX,
            })?
        };
        *slot = Some(count);
    }

    let parsed = AxeNotation {
        bonded_atoms: bonded_atoms.unwrap_or(0),
        lone_pairs: lone_pairs.unwrap_or(0),
    };
    let total = parsed.bonded_atoms.saturating_add(parsed.lone_pairs);
    if total > MAX_GROUPS {
        return Err(ParseError::TooManyGroups {
            notation: notation.to_string(),
            total,
        });
    }
    Ok(parsed)
}
