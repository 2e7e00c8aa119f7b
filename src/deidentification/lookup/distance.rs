//! Edit distance used for fuzzy name matching

/// Maximum number of edits tolerated for a string of `len` characters
///
/// Short strings must match exactly; longer strings allow one edit per eight
/// characters, with a minimum of one.
pub fn edit_budget(len: usize) -> usize {
    if len <= 3 {
        0
    } else {
        (len / 8).max(1)
    }
}

/// Optimal string alignment distance between `a` and `b`
///
/// Insertions, deletions, substitutions and transpositions of two adjacent
/// characters each count as one edit.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    osa(&a, &b, usize::MAX).unwrap_or(usize::MAX)
}

/// Returns true when `a` and `b` are at most `max_edits` edits apart
///
/// Stops early as soon as every alignment exceeds the budget.
pub fn within_distance(a: &str, b: &str, max_edits: usize) -> bool {
    if max_edits == 0 {
        return a == b;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max_edits {
        return false;
    }

    osa(&a, &b, max_edits).is_some()
}

fn osa(a: &[char], b: &[char], cutoff: usize) -> Option<usize> {
    let width = b.len() + 1;
    let mut prev_prev: Vec<usize> = vec![0; width];
    let mut prev: Vec<usize> = (0..width).collect();
    let mut current: Vec<usize> = vec![0; width];

    for i in 1..=a.len() {
        current[0] = i;
        let mut row_min = current[0];

        for j in 1..width {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut value = (prev[j] + 1).min(current[j - 1] + 1).min(prev[j - 1] + cost);

            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                value = value.min(prev_prev[j - 2] + 1);
            }

            current[j] = value;
            row_min = row_min.min(value);
        }

        if row_min > cutoff {
            return None;
        }

        std::mem::swap(&mut prev_prev, &mut prev);
        std::mem::swap(&mut prev, &mut current);
    }

    let distance = prev[b.len()];
    (distance <= cutoff).then_some(distance)
}
