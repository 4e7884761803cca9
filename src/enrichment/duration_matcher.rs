//! DurationSequenceMatcher (C8): match a folder's track durations against a
//! set of candidate releases using DTW, with a folder-name boost.

use crate::model::{CandidateRelease, MatchQuality};

/// Seconds of slack before a duration difference counts as cost (§4.6).
const TOLERANCE_SECS: f64 = 3.0;

/// Minimum combined score to accept a candidate as a match.
pub const MIN_MATCH_THRESHOLD: f64 = 0.7;

/// A scored candidate, ready for `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub candidate: &'a CandidateRelease,
    pub similarity: f64,
    pub quality: MatchQuality,
}

/// DTW similarity between two duration sequences, with per-step cost
/// `max(0, |a-b| - TOLERANCE_SECS)`, normalized by `maxLen * avgDuration`.
pub fn dtw_similarity(folder: &[u32], candidate: &[u32]) -> f64 {
    if folder.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let m = folder.len();
    let n = candidate.len();
    // dp[i][j] = minimal cumulative cost aligning folder[..i] with candidate[..j]
    let mut dp = vec![vec![f64::INFINITY; n + 1]; m + 1];
    dp[0][0] = 0.0;

    for i in 1..=m {
        for j in 1..=n {
            let cost = ((folder[i - 1] as f64 - candidate[j - 1] as f64).abs() - TOLERANCE_SECS).max(0.0);
            let best_prev = dp[i - 1][j].min(dp[i][j - 1]).min(dp[i - 1][j - 1]);
            dp[i][j] = cost + best_prev;
        }
    }

    let total_cost = dp[m][n];
    let avg_duration = {
        let all: Vec<u32> = folder.iter().chain(candidate.iter()).copied().collect();
        all.iter().sum::<u32>() as f64 / all.len() as f64
    };
    let max_len = m.max(n) as f64;
    let normalized = if max_len * avg_duration > 0.0 {
        total_cost / (max_len * avg_duration)
    } else {
        0.0
    };
    1.0 / (1.0 + normalized)
}

/// Cheaper alternative: Levenshtein edit distance where two durations are
/// "equal" iff within `TOLERANCE_SECS`.
pub fn edit_distance_similarity(folder: &[u32], candidate: &[u32]) -> f64 {
    let m = folder.len();
    let n = candidate.len();
    if m == 0 && n == 0 {
        return 1.0;
    }
    if m == 0 || n == 0 {
        return 0.0;
    }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let equal = (folder[i - 1] as f64 - candidate[j - 1] as f64).abs() <= TOLERANCE_SECS;
            if equal {
                dp[i][j] = dp[i - 1][j - 1];
            } else {
                dp[i][j] = 1 + dp[i - 1][j - 1].min(dp[i - 1][j]).min(dp[i][j - 1]);
            }
        }
    }

    let edit_dist = dp[m][n] as f64;
    1.0 - edit_dist / m.max(n) as f64
}

/// Lowercase, strip bracketed suffixes (`[...]`, `(...)`), collapse
/// punctuation to spaces, and trim — used before comparing a folder name to
/// a candidate album title.
pub fn normalize_name(name: &str) -> String {
    let mut stripped = String::with_capacity(name.len());
    let mut depth: u32 = 0;
    for c in name.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ => stripped.push(c),
        }
    }
    let lowered = stripped.to_lowercase();
    let normalized: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            if a[i - 1] == b[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            } else {
                dp[i][j] = 1 + dp[i - 1][j - 1].min(dp[i - 1][j]).min(dp[i][j - 1]);
            }
        }
    }
    dp[m][n]
}

/// Name-similarity between a normalized folder name and a candidate album
/// title: `max(jaccard-of-word-sets, 0.8 * (1 - levenshtein/maxLen))`, floored
/// at `0.8` when one string contains the other.
pub fn name_similarity(folder_name: &str, candidate_title: &str) -> f64 {
    let a = normalize_name(folder_name);
    let b = normalize_name(candidate_title);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let words_a: std::collections::HashSet<&str> = a.split(' ').collect();
    let words_b: std::collections::HashSet<&str> = b.split(' ').collect();
    let intersection = words_a.intersection(&words_b).count() as f64;
    let union = words_a.union(&words_b).count() as f64;
    let jaccard = if union > 0.0 { intersection / union } else { 0.0 };

    let max_len = a.len().max(b.len()) as f64;
    let lev_sim = if max_len > 0.0 {
        0.8 * (1.0 - levenshtein(&a, &b) as f64 / max_len)
    } else {
        0.0
    };

    let mut score = jaccard.max(lev_sim);
    if a.contains(&b) || b.contains(&a) {
        score = score.max(0.8);
    }
    score
}

/// Combined score: `0.7*durationSim + 0.3*nameSim`, plus a `+0.1` boost when
/// `nameSim >= 0.8`.
pub fn combined_score(duration_sim: f64, name_sim: f64) -> f64 {
    let mut score = 0.7 * duration_sim + 0.3 * name_sim;
    if name_sim >= 0.8 {
        score += 0.1;
    }
    score
}

/// Run the full matcher: DTW against every candidate, folder-name boost
/// applied, keep the best; accept only if `>= MIN_MATCH_THRESHOLD`.
pub fn select<'a>(
    folder_durations: &[u32],
    folder_name: &str,
    candidates: &'a [CandidateRelease],
) -> Option<MatchResult<'a>> {
    candidates
        .iter()
        .map(|candidate| {
            let duration_sim = dtw_similarity(folder_durations, &candidate.durations);
            let name_sim = name_similarity(folder_name, &candidate.title);
            let similarity = combined_score(duration_sim, name_sim).min(1.0);
            MatchResult {
                candidate,
                similarity,
                quality: MatchQuality::from_similarity(similarity),
            }
        })
        .max_by(|a, b| a.similarity.partial_cmp(&b.similarity).unwrap_or(std::cmp::Ordering::Equal))
        .filter(|m| m.similarity >= MIN_MATCH_THRESHOLD)
}
