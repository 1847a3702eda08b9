// ==============================================================================
// "Did You Mean" Suggestions
// ==============================================================================
//
// Edit-distance helpers used when an argument references an interface that
// was never declared: the closest registered wire name is offered as a hint.

/// Levenshtein edit distance between two strings, over `char`s.
///
/// Two-row dynamic programming; interface names are short.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr_row[j + 1] = (prev_row[j] + cost)
                .min(prev_row[j + 1] + 1)
                .min(curr_row[j] + 1);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b_len]
}

/// Largest distance still worth suggesting: 1 for names of up to four
/// characters, 2 otherwise.
pub(crate) fn max_edit_distance(name_len: usize) -> usize {
    if name_len <= 4 { 1 } else { 2 }
}
