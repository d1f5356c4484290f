//! Name normalisation shared by the roster index and answer matching

use unicode_normalization::UnicodeNormalization;
use zhconv::{zhconv, Variant};

/// NFKC fold, lowercase, then traditional -> simplified Chinese.
///
/// Every name stored in the roster index and every user submission goes
/// through this before comparison.
pub fn normalize_name(raw: &str) -> String {
    let folded: String = raw.trim().nfkc().collect();
    zhconv(&folded.to_lowercase(), Variant::ZhHans)
}

/// Similarity in `0.0..=1.0`: twice the longest common subsequence over
/// the combined length, counted in characters. "镜" against "镜华" is 2/3.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // row[j] = LCS of the prefix of `a` seen so far and b[..j]
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diag = 0;
        for (j, cb) in b.iter().enumerate() {
            let up = row[j + 1];
            row[j + 1] = if ca == cb { diag + 1 } else { up.max(row[j]) };
            diag = up;
        }
    }
    (2 * row[b.len()]) as f64 / total as f64
}
