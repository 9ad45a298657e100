// File: statistics.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::sample_set::Token;
use std::collections::HashMap;

/// Upper-tail standard normal quantile for p = 0.001.
pub const Z_FAIL: f64 = 3.090;
/// Upper-tail standard normal quantile for p = 0.01.
pub const Z_WARN: f64 = 2.326;
/// Two-sided p = 0.001.
pub const Z_FAIL_TWO_SIDED: f64 = 3.291;
/// Two-sided p = 0.01.
pub const Z_WARN_TWO_SIDED: f64 = 2.576;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Shannon entropy in bits of a distribution given by raw counts.
pub fn shannon_entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize>,
{
    let counts: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Chi-square statistic of `counts` against a uniform distribution over
/// `categories` cells. Cells missing from `counts` are treated as zero.
pub fn chi_square_uniform(counts: &[usize], categories: usize) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 || categories == 0 {
        return 0.0;
    }
    let expected = total as f64 / categories as f64;
    let observed: f64 = counts
        .iter()
        .map(|&c| (c as f64 - expected).powi(2) / expected)
        .sum();
    let empty_cells = categories.saturating_sub(counts.len()) as f64;
    observed + empty_cells * expected
}

/// Wilson-Hilferty approximation of the chi-square critical value for
/// `df` degrees of freedom at the upper-tail normal quantile `z`.
pub fn chi_square_critical(df: usize, z: f64) -> f64 {
    if df == 0 {
        return 0.0;
    }
    let df = df as f64;
    let a = 2.0 / (9.0 * df);
    df * (1.0 - a + z * a.sqrt()).powi(3)
}

/// Probability that two independent draws from `counts` coincide.
pub fn collision_probability<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize>,
{
    let counts: Vec<usize> = counts.into_iter().collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts.iter().map(|&c| (c as f64 / total).powi(2)).sum()
}

/// Rank of every character in the sorted `alphabet`.
pub fn alphabet_ranks(alphabet: &[char]) -> HashMap<char, usize> {
    alphabet.iter().enumerate().map(|(i, &c)| (c, i)).collect()
}

/// Number of whole bits each symbol of an alphabet of `size` can carry.
pub fn bits_per_symbol(size: usize) -> u32 {
    if size < 2 {
        0
    } else {
        usize::BITS - 1 - size.leading_zeros()
    }
}

/// Flattens the tokens into a bit sequence: each character contributes
/// the low `bits_per_symbol` bits of its alphabet rank, MSB first. Ranks
/// that do not fit are dropped so that every emitted pattern is equally
/// likely for a uniform source.
pub fn token_bitstream(tokens: &[Token], alphabet: &[char]) -> Vec<bool> {
    let width = bits_per_symbol(alphabet.len());
    if width == 0 {
        return Vec::new();
    }
    let limit = 1usize << width;
    let ranks = alphabet_ranks(alphabet);

    let mut bits = Vec::new();
    for token in tokens {
        for ch in token.value.chars() {
            let Some(&rank) = ranks.get(&ch) else {
                continue;
            };
            if rank >= limit {
                continue;
            }
            for shift in (0..width).rev() {
                bits.push((rank >> shift) & 1 == 1);
            }
        }
    }
    bits
}

/// Absolute z-score of the ones/zeros balance.
pub fn monobit_z(bits: &[bool]) -> Option<f64> {
    if bits.is_empty() {
        return None;
    }
    let n = bits.len() as f64;
    let ones = bits.iter().filter(|&&b| b).count() as f64;
    Some((2.0 * ones - n).abs() / n.sqrt())
}

/// Wald-Wolfowitz runs test z-score. `None` when the sequence is constant.
pub fn runs_z(bits: &[bool]) -> Option<f64> {
    if bits.len() < 2 {
        return None;
    }
    let ones = bits.iter().filter(|&&b| b).count() as f64;
    let zeros = bits.len() as f64 - ones;
    if ones == 0.0 || zeros == 0.0 {
        return None;
    }
    let n = bits.len() as f64;
    let runs = 1 + bits.windows(2).filter(|w| w[0] != w[1]).count();
    let expected = 2.0 * ones * zeros / n + 1.0;
    let variance = (expected - 1.0) * (expected - 2.0) / (n - 1.0);
    if variance <= 0.0 {
        return None;
    }
    Some((runs as f64 - expected) / variance.sqrt())
}
