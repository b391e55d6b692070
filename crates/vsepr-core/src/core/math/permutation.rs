use std::fmt;

/// A bijection on `0..n`, stored as the image of each index.
///
/// Applied to a list, a permutation produces a list whose `i`-th element is the
/// `indices[i]`-th element of the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    pub fn identity(size: usize) -> Self {
        Self {
            indices: (0..size).collect(),
        }
    }

    /// Returns `None` unless `indices` contains every value in `0..indices.len()` exactly once.
    pub fn from_indices(indices: Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; indices.len()];
        for &index in &indices {
            if index >= seen.len() || seen[index] {
                return None;
            }
            seen[index] = true;
        }
        Some(Self { indices })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> usize {
        self.indices[index]
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_identity(&self) -> bool {
        self.indices.iter().enumerate().all(|(i, &p)| i == p)
    }

    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.indices.iter().map(|&i| items[i].clone()).collect()
    }

    /// Every permutation obtained by rearranging the values this permutation
    /// holds at `positions` among those same positions. The unchanged
    /// arrangement comes first.
    pub fn with_indices_permuted(&self, positions: &[usize]) -> Vec<Permutation> {
        LexicographicPermutations::new(positions.len())
            .map(|arrangement| {
                let mut indices = self.indices.clone();
                for (slot, &source) in arrangement.iter().enumerate() {
                    indices[positions[slot]] = self.indices[positions[source]];
                }
                Permutation { indices }
            })
            .collect()
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P[")?;
        for (i, index) in self.indices.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, "]")
    }
}

/// Iterates every ordering of `0..n` in lexicographic order, starting from the identity.
#[derive(Debug, Clone)]
pub struct LexicographicPermutations {
    current: Option<Vec<usize>>,
}

impl LexicographicPermutations {
    pub fn new(n: usize) -> Self {
        Self {
            current: Some((0..n).collect()),
        }
    }
}

impl Iterator for LexicographicPermutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let mut successor = current.clone();
        if advance(&mut successor) {
            self.current = Some(successor);
        }
        Some(current)
    }
}

/// Rearranges `values` into the next lexicographic ordering. Returns `false`
/// once the last ordering has been reached.
fn advance(values: &mut [usize]) -> bool {
    let Some(pivot) = values.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        return false;
    };
    let Some(successor) = values.iter().rposition(|&value| value > values[pivot]) else {
        return false;
    };
    values.swap(pivot, successor);
    values[pivot + 1..].reverse();
    true
}

/// All orderings of `items`, following the lexicographic order of their indices.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    LexicographicPermutations::new(items.len())
        .map(|order| order.into_iter().map(|i| items[i].clone()).collect())
        .collect()
}

/// Expands every base permutation by all rearrangements of the values at `positions`.
///
/// The output is grouped by base, in input order. With fewer than two
/// positions there is nothing to rearrange and the input is returned as is.
pub fn permute_list_with_indices(bases: &[Permutation], positions: &[usize]) -> Vec<Permutation> {
    if positions.len() < 2 {
        return bases.to_vec();
    }
    bases
        .iter()
        .flat_map(|base| base.with_indices_permuted(positions))
        .collect()
}

/// Starts from the identity on `size` elements and successively frees each
/// group of interchangeable positions.
pub fn restricted_permutations(size: usize, interchangeable: &[Vec<usize>]) -> Vec<Permutation> {
    interchangeable
        .iter()
        .fold(vec![Permutation::identity(size)], |acc, positions| {
            permute_list_with_indices(&acc, positions)
        })
}
