//! Bounded Levenshtein edit distance with early abort.
//!
//! Grounded on `distance.h`'s `CalEditDistance(s, t, limit)`: the header
//! only gives the signature, not a body, so the DP itself is a standard
//! single-row implementation, generalized to bail out once the distance is
//! provably going to reach `limit`.

/// Computes the edit distance between `s` and `t`, capped at `limit`: if the
/// true distance is `>= limit`, returns `limit` without finishing the
/// computation.
pub fn bounded_edit_distance(s: &str, t: &str, limit: usize) -> usize {
    let s: Vec<char> = s.chars().collect();
    let t: Vec<char> = t.chars().collect();

    if s.is_empty() {
        return t.len().min(limit);
    }
    if t.is_empty() {
        return s.len().min(limit);
    }
    if s.len().abs_diff(t.len()) >= limit {
        return limit;
    }

    let mut prev: Vec<usize> = (0..=t.len()).collect();
    let mut curr = vec![0usize; t.len() + 1];

    for i in 1..=s.len() {
        curr[0] = i;
        let mut row_min = curr[0];
        for j in 1..=t.len() {
            let cost = if s[i - 1] == t[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min >= limit {
            return limit;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[t.len()].min(limit)
}
