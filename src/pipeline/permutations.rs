//! Exhaustive permutation generation for phase settings.

/// Iterator over every ordering of a slice, in lexicographic order of
/// positions (the first ordering is the input itself).
#[derive(Debug, Clone)]
pub struct Permutations {
    items: Vec<i64>,
    /// Current index arrangement; `None` once exhausted.
    indices: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(items: &[i64]) -> Self {
        Self {
            items: items.to_vec(),
            indices: Some((0..items.len()).collect()),
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.indices.as_mut()?;
        let current = indices.iter().map(|&i| self.items[i]).collect();

        // Advance to the next arrangement of indices
        match indices.windows(2).rposition(|w| w[0] < w[1]) {
            Some(pivot) => {
                let successor = indices
                    .iter()
                    .rposition(|&i| i > indices[pivot])
                    .unwrap_or(pivot + 1);
                indices.swap(pivot, successor);
                indices[pivot + 1..].reverse();
            }
            None => self.indices = None,
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_small() {
        let all: Vec<Vec<i64>> = Permutations::new(&[1, 2, 3]).collect();
        assert_eq!(
            all,
            vec![
                vec![1, 2, 3],
                vec![1, 3, 2],
                vec![2, 1, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![3, 2, 1],
            ]
        );
    }

    #[test]
    fn test_five_phases() {
        let all: Vec<Vec<i64>> = Permutations::new(&[5, 6, 7, 8, 9]).collect();
        assert_eq!(all.len(), 120);

        let distinct: HashSet<Vec<i64>> = all.into_iter().collect();
        assert_eq!(distinct.len(), 120);
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(Permutations::new(&[]).collect::<Vec<_>>(), vec![Vec::<i64>::new()]);
        assert_eq!(Permutations::new(&[7]).collect::<Vec<_>>(), vec![vec![7]]);
    }
}
