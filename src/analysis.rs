// File: analysis.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::sample_set::{FrequencyTable, SampleSnapshot, Token};
use crate::statistics::{
    self, chi_square_critical, chi_square_uniform, collision_probability, shannon_entropy,
    Z_FAIL, Z_FAIL_TWO_SIDED, Z_WARN, Z_WARN_TWO_SIDED,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Number of tests in the battery. Fixed before any run starts.
pub const TEST_COUNT: usize = 9;

pub const TEST_NAMES: [&str; TEST_COUNT] = [
    "token_count",
    "length_distribution",
    "character_set",
    "character_uniformity",
    "effective_entropy",
    "character_transitions",
    "sequential_correlation",
    "monobit",
    "runs",
];

const MIN_ENTROPY_BITS_FAIL: f64 = 64.0;
const MIN_ENTROPY_BITS_WARN: f64 = 112.0;
const UNIFORMITY_FAIL_SHARE: f64 = 0.25;
const UNIFORMITY_WARN_SHARE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Warn => write!(f, "WARN"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub verdict: Verdict,
    pub score: Option<f64>,
    pub description: String,
}

impl TestResult {
    pub fn new(name: &str, verdict: Verdict, score: Option<f64>, description: String) -> Self {
        Self {
            test_name: name.to_string(),
            verdict,
            score,
            description,
        }
    }

    fn insufficient(name: &str, description: &str) -> Self {
        Self::new(name, Verdict::Warn, None, description.to_string())
    }
}

/// Notified once per produced result, in battery order.
pub trait AnalysisListener: Send + Sync {
    fn on_result(&self, result: &TestResult);
}

impl<F> AnalysisListener for F
where
    F: Fn(&TestResult) + Send + Sync,
{
    fn on_result(&self, result: &TestResult) {
        self(result)
    }
}

/// Intermediate statistics shared between the tests of one battery run.
struct AnalysisContext {
    tokens: Vec<Token>,
    frequencies: FrequencyTable,
    alphabet: Vec<char>,
    bits: Option<Vec<bool>>,
}

impl AnalysisContext {
    fn new(snapshot: SampleSnapshot) -> Self {
        let alphabet = snapshot.frequencies.alphabet().into_iter().collect();
        Self {
            tokens: snapshot.tokens,
            frequencies: snapshot.frequencies,
            alphabet,
            bits: None,
        }
    }

    fn bits(&mut self) -> &[bool] {
        if self.bits.is_none() {
            self.bits = Some(statistics::token_bitstream(&self.tokens, &self.alphabet));
        }
        self.bits.as_deref().unwrap_or_default()
    }

    fn position_counts(&self, position: usize) -> Vec<usize> {
        self.frequencies
            .counts_at(position)
            .map(|counts| counts.values().copied().collect())
            .unwrap_or_default()
    }
}

type TestFn = fn(&mut AnalysisContext) -> TestResult;

const BATTERY: [TestFn; TEST_COUNT] = [
    test_token_count,
    test_length_distribution,
    test_character_set,
    test_character_uniformity,
    test_effective_entropy,
    test_character_transitions,
    test_sequential_correlation,
    test_monobit,
    test_runs,
];

/// Runs the fixed test battery over a sample snapshot, one test at a time.
#[derive(Clone, Default)]
pub struct AnalysisEngine {
    listeners: Vec<Arc<dyn AnalysisListener>>,
    cancel: CancellationToken,
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine observing an externally owned cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            listeners: Vec::new(),
            cancel,
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn AnalysisListener>) {
        self.listeners.push(listener);
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Takes effect before the next test starts.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn run(&self, snapshot: SampleSnapshot) -> Vec<TestResult> {
        info!("Analysing {} tokens", snapshot.tokens.len());
        let mut ctx = AnalysisContext::new(snapshot);
        let mut results = Vec::with_capacity(TEST_COUNT);

        for test in BATTERY.iter() {
            if self.cancel.is_cancelled() {
                info!("Analysis cancelled after {} of {} tests", results.len(), TEST_COUNT);
                break;
            }
            let result = test(&mut ctx);
            debug!(
                "{}: {} ({})",
                result.test_name, result.verdict, result.description
            );
            for listener in &self.listeners {
                listener.on_result(&result);
            }
            results.push(result);
        }
        results
    }

    /// Runs the battery on a blocking worker thread, apart from the
    /// async runtime serving the collectors.
    pub fn spawn(self, snapshot: SampleSnapshot) -> JoinHandle<Vec<TestResult>> {
        tokio::task::spawn_blocking(move || self.run(snapshot))
    }
}

fn test_token_count(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[0];
    let total = ctx.tokens.len();
    let distinct = ctx
        .tokens
        .iter()
        .map(|t| t.value.as_str())
        .collect::<HashSet<_>>()
        .len();
    let duplicates = total - distinct;
    let score = Some(distinct as f64);

    if total < 2 {
        return TestResult::new(
            name,
            Verdict::Warn,
            score,
            format!("Only {} token(s) collected, at least 2 are needed", total),
        );
    }
    if duplicates > 0 {
        return TestResult::new(
            name,
            Verdict::Fail,
            score,
            format!(
                "{} duplicate value(s) among {} tokens ({} distinct)",
                duplicates, total, distinct
            ),
        );
    }
    TestResult::new(
        name,
        Verdict::Pass,
        score,
        format!("{} tokens collected, all distinct", total),
    )
}

fn test_length_distribution(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[1];
    if ctx.tokens.is_empty() {
        return TestResult::insufficient(name, "No tokens to measure");
    }
    let lengths: Vec<f64> = ctx
        .tokens
        .iter()
        .map(|t| t.value.chars().count() as f64)
        .collect();
    let min = lengths.iter().copied().fold(f64::INFINITY, f64::min);
    let max = lengths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sd = statistics::std_dev(&lengths);

    if min == max {
        TestResult::new(
            name,
            Verdict::Pass,
            Some(0.0),
            format!("All tokens are {} characters long", min),
        )
    } else {
        TestResult::new(
            name,
            Verdict::Warn,
            Some(sd),
            format!(
                "Token length varies from {} to {} (mean {:.1}, std-dev {:.2})",
                min,
                max,
                statistics::mean(&lengths),
                sd
            ),
        )
    }
}

fn classify_alphabet(alphabet: &[char]) -> &'static str {
    if alphabet.iter().all(|c| c.is_ascii_digit()) {
        "numeric"
    } else if alphabet.iter().all(|c| c.is_ascii_hexdigit()) {
        "hexadecimal"
    } else if alphabet.iter().all(|c| c.is_ascii_alphanumeric()) {
        "alphanumeric"
    } else if alphabet
        .iter()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_'))
    {
        "base64-like"
    } else {
        "mixed"
    }
}

fn test_character_set(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[2];
    let size = ctx.alphabet.len();
    if size == 0 {
        return TestResult::insufficient(name, "No characters observed");
    }
    let class = classify_alphabet(&ctx.alphabet);
    let verdict = if size < 10 {
        Verdict::Fail
    } else if size < 16 {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    TestResult::new(
        name,
        verdict,
        Some(size as f64),
        format!("{} distinct characters observed ({})", size, class),
    )
}

fn test_character_uniformity(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[3];
    let categories = ctx.alphabet.len();
    let positions = ctx.frequencies.positions();
    if ctx.tokens.len() < 2 || positions == 0 {
        return TestResult::insufficient(name, "Not enough tokens to test uniformity");
    }
    if categories < 2 {
        return TestResult::new(
            name,
            Verdict::Fail,
            Some(1.0),
            "Every position holds the same single character".to_string(),
        );
    }

    let critical = chi_square_critical(categories - 1, Z_FAIL);
    let mut tested = 0;
    let mut skewed = Vec::new();
    for pos in 0..positions {
        if ctx.frequencies.total_at(pos) < 2 {
            continue;
        }
        tested += 1;
        let chi = chi_square_uniform(&ctx.position_counts(pos), categories);
        if chi > critical {
            skewed.push(pos);
        }
    }
    if tested == 0 {
        return TestResult::insufficient(name, "No position has enough samples");
    }

    let share = skewed.len() as f64 / tested as f64;
    let verdict = if share > UNIFORMITY_FAIL_SHARE {
        Verdict::Fail
    } else if share > UNIFORMITY_WARN_SHARE {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    let description = if skewed.is_empty() {
        format!("No skewed positions among {} tested", tested)
    } else {
        format!(
            "{} of {} positions deviate from a uniform distribution (positions {:?})",
            skewed.len(),
            tested,
            skewed
        )
    };
    TestResult::new(name, verdict, Some(share), description)
}

fn test_effective_entropy(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[4];
    let size = ctx.alphabet.len();
    if ctx.tokens.len() < 2 || size < 2 {
        return TestResult::insufficient(name, "Not enough variation to estimate entropy");
    }
    let symbol_bits = (size as f64).log2();

    let mut max_bits = 0.0;
    let mut estimated_bits = 0.0;
    for pos in 0..ctx.frequencies.positions() {
        let total = ctx.frequencies.total_at(pos);
        if total < 2 {
            continue;
        }
        // A sample of n values can never show more than log2(n) bits.
        let ceiling = symbol_bits.min((total as f64).log2());
        let counts = ctx.position_counts(pos);
        // Miller-Madow correction for the downward bias of small samples.
        let observed = shannon_entropy(counts.iter().copied())
            + (counts.len() as f64 - 1.0) / (2.0 * total as f64 * std::f64::consts::LN_2);
        max_bits += symbol_bits;
        estimated_bits += symbol_bits * (observed / ceiling).min(1.0);
    }

    let verdict = if estimated_bits < MIN_ENTROPY_BITS_FAIL {
        Verdict::Fail
    } else if estimated_bits < MIN_ENTROPY_BITS_WARN {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    TestResult::new(
        name,
        verdict,
        Some(estimated_bits),
        format!(
            "Estimated {:.1} bits of entropy out of a maximum of {:.1}",
            estimated_bits, max_bits
        ),
    )
}

/// Pools the rank differences between adjacent characters of every token;
/// an unpredictable generator spreads them evenly over the alphabet.
fn test_character_transitions(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[5];
    let size = ctx.alphabet.len();
    if size < 2 {
        return TestResult::insufficient(name, "Not enough distinct characters");
    }
    let ranks = statistics::alphabet_ranks(&ctx.alphabet);
    let mut deltas = vec![0usize; size];
    let mut pairs = 0usize;
    for token in &ctx.tokens {
        let chars: Vec<usize> = token.value.chars().filter_map(|c| ranks.get(&c).copied()).collect();
        for w in chars.windows(2) {
            deltas[(w[1] + size - w[0]) % size] += 1;
            pairs += 1;
        }
    }
    if pairs < size {
        return TestResult::insufficient(name, "Not enough character pairs");
    }

    let chi = chi_square_uniform(&deltas, size);
    let fail = chi_square_critical(size - 1, Z_FAIL);
    let warn = chi_square_critical(size - 1, Z_WARN);
    let verdict = if chi > fail {
        Verdict::Fail
    } else if chi > warn {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    let (common_delta, common_count) = deltas
        .iter()
        .copied()
        .enumerate()
        .max_by_key(|&(_, count)| count)
        .unwrap_or((0, 0));
    TestResult::new(
        name,
        verdict,
        Some(chi / fail),
        format!(
            "Chi-square {:.1} over {} adjacent pairs (critical {:.1}); most common step {} seen {} times",
            chi, pairs, fail, common_delta, common_count
        ),
    )
}

/// Compares consecutive tokens position by position against the match
/// rate expected from the per-position frequencies alone.
fn test_sequential_correlation(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[6];
    if ctx.tokens.len() < 3 {
        return TestResult::insufficient(name, "Not enough consecutive token pairs");
    }
    let collision: Vec<f64> = (0..ctx.frequencies.positions())
        .map(|pos| collision_probability(ctx.position_counts(pos)))
        .collect();

    let mut compared = 0usize;
    let mut matches = 0usize;
    let mut expected = 0.0;
    let mut variance = 0.0;
    for pair in ctx.tokens.windows(2) {
        for (pos, (a, b)) in pair[0].value.chars().zip(pair[1].value.chars()).enumerate() {
            let q = collision[pos];
            compared += 1;
            expected += q;
            variance += q * (1.0 - q);
            if a == b {
                matches += 1;
            }
        }
    }
    if compared == 0 {
        return TestResult::insufficient(name, "No comparable positions");
    }
    if variance <= f64::EPSILON {
        return TestResult::new(
            name,
            Verdict::Pass,
            Some(0.0),
            "Positions show no variation, ordering cannot be assessed".to_string(),
        );
    }

    let z = (matches as f64 - expected) / variance.sqrt();
    let verdict = if z > Z_FAIL {
        Verdict::Fail
    } else if z > Z_WARN {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    TestResult::new(
        name,
        verdict,
        Some(z),
        format!(
            "{} of {} positions repeat between consecutive tokens, {:.1} expected (z = {:.2})",
            matches, compared, expected, z
        ),
    )
}

fn test_monobit(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[7];
    let bits = ctx.bits();
    let Some(z) = statistics::monobit_z(bits) else {
        return TestResult::insufficient(name, "No bits could be derived from the tokens");
    };
    let ones = bits.iter().filter(|&&b| b).count();
    let verdict = if z > Z_FAIL_TWO_SIDED {
        Verdict::Fail
    } else if z > Z_WARN_TWO_SIDED {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    TestResult::new(
        name,
        verdict,
        Some(z),
        format!("{} ones in {} bits (z = {:.2})", ones, bits.len(), z),
    )
}

fn test_runs(ctx: &mut AnalysisContext) -> TestResult {
    let name = TEST_NAMES[8];
    let bits = ctx.bits();
    let Some(z) = statistics::runs_z(bits) else {
        return TestResult::insufficient(name, "Bit sequence too short or constant");
    };
    let verdict = if z.abs() > Z_FAIL_TWO_SIDED {
        Verdict::Fail
    } else if z.abs() > Z_WARN_TWO_SIDED {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    TestResult::new(
        name,
        verdict,
        Some(z),
        format!("Runs z-score {:.2} over {} bits", z, bits.len()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_set::SampleSet;
    use parking_lot::Mutex;

    /// SplitMix64, good enough to stand in for a sound token generator.
    struct SplitMix(u64);

    impl SplitMix {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = self.0;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^ (z >> 31)
        }

        fn hex_token(&mut self) -> String {
            format!("{:016x}{:016x}", self.next(), self.next())
        }
    }

    fn snapshot_of<I, S>(values: I) -> SampleSnapshot
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = SampleSet::new();
        for v in values {
            set.append(v);
        }
        set.snapshot_with_frequencies()
    }

    fn random_snapshot(count: usize) -> SampleSnapshot {
        let mut rng = SplitMix(0x5EED);
        snapshot_of((0..count).map(|_| rng.hex_token()))
    }

    fn verdict_of(results: &[TestResult], name: &str) -> Verdict {
        results
            .iter()
            .find(|r| r.test_name == name)
            .map(|r| r.verdict)
            .unwrap()
    }

    #[test]
    fn test_battery_order_and_size() {
        let results = AnalysisEngine::new().run(random_snapshot(50));
        assert_eq!(results.len(), TEST_COUNT);
        let names: Vec<&str> = results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, TEST_NAMES.to_vec());
    }

    #[test]
    fn test_random_hex_tokens_do_not_fail() {
        let results = AnalysisEngine::new().run(random_snapshot(500));
        for result in &results {
            assert_ne!(result.verdict, Verdict::Fail, "{:?}", result);
        }
        assert_eq!(verdict_of(&results, "token_count"), Verdict::Pass);
        assert_eq!(verdict_of(&results, "length_distribution"), Verdict::Pass);
        assert_eq!(verdict_of(&results, "character_set"), Verdict::Pass);
    }

    #[test]
    fn test_sequential_counter_is_flagged() {
        let results = AnalysisEngine::new().run(snapshot_of((1000..1400).map(|n| n.to_string())));
        assert_eq!(verdict_of(&results, "character_set"), Verdict::Warn);
        assert_eq!(verdict_of(&results, "character_uniformity"), Verdict::Fail);
        assert_eq!(verdict_of(&results, "effective_entropy"), Verdict::Fail);
        assert_eq!(verdict_of(&results, "sequential_correlation"), Verdict::Fail);
    }

    #[test]
    fn test_duplicates_fail_token_count() {
        let results = AnalysisEngine::new().run(snapshot_of(["abc", "abd", "abc"]));
        assert_eq!(verdict_of(&results, "token_count"), Verdict::Fail);
    }

    #[test]
    fn test_variable_length_warns() {
        let results = AnalysisEngine::new().run(snapshot_of(["abcd", "abcde", "xyz"]));
        assert_eq!(verdict_of(&results, "length_distribution"), Verdict::Warn);
    }

    #[test]
    fn test_repeating_pattern_fails_transitions() {
        // Each character is always followed by its successor in the alphabet.
        let alphabet: Vec<char> = "0123456789abcdef".chars().collect();
        let tokens = (0..200).map(|i| {
            (0..32)
                .map(|p| alphabet[(i * 7 + p) % alphabet.len()])
                .collect::<String>()
        });
        let results = AnalysisEngine::new().run(snapshot_of(tokens));
        assert_eq!(verdict_of(&results, "character_transitions"), Verdict::Fail);
    }

    #[test]
    fn test_empty_snapshot_warns_everywhere() {
        let results = AnalysisEngine::new().run(SampleSnapshot::default());
        assert_eq!(results.len(), TEST_COUNT);
        assert!(results.iter().all(|r| r.verdict == Verdict::Warn));
    }

    #[test]
    fn test_listeners_receive_every_result_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AnalysisEngine::new();
        let sink = Arc::clone(&seen);
        engine.add_listener(Arc::new(move |r: &TestResult| sink.lock().push(r.test_name.clone())));
        let second = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&second);
        engine.add_listener(Arc::new(move |_: &TestResult| *counter.lock() += 1));

        engine.run(random_snapshot(20));
        assert_eq!(*seen.lock(), TEST_NAMES.to_vec());
        assert_eq!(*second.lock(), TEST_COUNT);
    }

    #[test]
    fn test_cancel_before_run_produces_nothing() {
        let engine = AnalysisEngine::new();
        engine.cancel();
        assert!(engine.run(random_snapshot(20)).is_empty());
    }

    #[test]
    fn test_cancel_between_tests_keeps_earlier_results() {
        let mut engine = AnalysisEngine::new();
        let token = engine.cancellation_token();
        engine.add_listener(Arc::new(move |r: &TestResult| {
            if r.test_name == "character_set" {
                token.cancel();
            }
        }));

        let results = engine.run(random_snapshot(20));
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].test_name, "character_set");
    }

    #[tokio::test]
    async fn test_spawned_engine_completes() {
        let results = AnalysisEngine::new().spawn(random_snapshot(30)).await.unwrap();
        assert_eq!(results.len(), TEST_COUNT);
    }
}
