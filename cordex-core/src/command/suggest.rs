use std::collections::BTreeSet;

use cordex_common::config::config::Suggestions;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub name: String,
    pub distance: usize,
}

/// Edit distance between two strings, counted in chars.
///
/// Insertions, deletions, substitutions and swaps of two adjacent chars each cost one edit
/// (optimal string alignment), so `pign` is a single edit away from `ping`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // rows i - 2, i - 1 and i of the distance matrix
    let mut prev2 = vec![0; b.len() + 1];
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);

            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                curr[j] = curr[j].min(prev2[j - 2] + 1);
            }
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Known names within `max_distance` edits of `input`, closest first and then alphabetically.
///
/// The comparison is case-insensitive; names are expected to be lowercase already.
pub fn suggest<'a>(
    input: &str,
    known: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
    max_results: Option<usize>,
) -> Vec<Suggestion> {
    let input = input.to_lowercase();
    let input_len = input.chars().count();

    let mut suggestions = known
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        // the length difference is a lower bound of the distance
        .filter(|name| name.chars().count().abs_diff(input_len) <= max_distance)
        .filter_map(|name| {
            let distance = edit_distance(&input, name);
            (distance <= max_distance).then(|| Suggestion {
                name: name.to_owned(),
                distance,
            })
        })
        .collect::<Vec<_>>();

    // stable sort keeps the alphabetical order within equal distances
    suggestions.sort_by_key(|s| s.distance);
    if let Some(max) = max_results {
        suggestions.truncate(max);
    }
    suggestions
}

/// [`suggest`] with its limits taken from configuration.
pub struct Suggester {
    pub max_distance: usize,
    pub max_results: Option<usize>,
    /// Inputs longer than this (in chars) are not worth comparing and get no suggestions.
    pub max_input_length: usize,
}

impl From<&Suggestions> for Suggester {
    fn from(config: &Suggestions) -> Self {
        Self {
            max_distance: config.max_distance,
            max_results: config.max_results,
            max_input_length: config.max_input_length,
        }
    }
}

impl Suggester {
    pub fn suggest<'a>(&self, input: &str, known: impl IntoIterator<Item = &'a str>) -> Vec<Suggestion> {
        if input.chars().count() > self.max_input_length {
            return Vec::new();
        }
        suggest(input, known, self.max_distance, self.max_results)
    }
}
