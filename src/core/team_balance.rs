//! Balanced team assignment for a room.

use super::models::{Player, UserId};

/// Split players into two equal teams whose session win totals differ the least.
///
/// Every subset of `n / 2` player indices is visited in lexicographic order and
/// the first subset with the smallest `|total - 2 * subset|` becomes team A.
/// Both teams keep the input order. Returns `None` for empty or odd-sized input.
#[must_use]
pub fn split_min_diff(players: &[Player]) -> Option<(Vec<UserId>, Vec<UserId>)> {
    let n = players.len();
    if n == 0 || n % 2 != 0 {
        return None;
    }
    let k = n / 2;
    let total: i64 = players.iter().map(|p| p.wins).sum();

    let mut best: Option<(i64, Vec<usize>)> = None;
    let mut comb: Vec<usize> = (0..k).collect();
    loop {
        let sum_a: i64 = comb.iter().map(|&i| players[i].wins).sum();
        let diff = (total - 2 * sum_a).abs();
        if best.as_ref().is_none_or(|(best_diff, _)| diff < *best_diff) {
            best = Some((diff, comb.clone()));
        }
        if !next_combination(&mut comb, n) {
            break;
        }
    }

    let (_, chosen) = best?;
    let team_a = chosen.iter().map(|&i| players[i].user_id).collect();
    let team_b = (0..n)
        .filter(|i| !chosen.contains(i))
        .map(|i| players[i].user_id)
        .collect();
    Some((team_a, team_b))
}

/// Advance `comb` to the next k-combination of `0..n` in lexicographic order.
fn next_combination(comb: &mut [usize], n: usize) -> bool {
    let k = comb.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if comb[i] < n - k + i {
            comb[i] += 1;
            for j in i + 1..k {
                comb[j] = comb[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
