//! Progress, WPM and accuracy math. Pure and clamping: malformed input
//! (empty target, negative elapsed time) degrades to a sane value instead
//! of panicking.

/// What one progress sample looks like after evaluating typed input
/// against the target passage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypingStats {
    /// 0..=100, floor of the typed/target length ratio.
    pub progress: u8,
    pub wpm: u32,
    pub accuracy: u32,
}

/// Completion percentage: `floor(min(100, 100 * typed / target))`.
pub fn progress(typed: &str, target: &str) -> u8 {
    let typed_len = typed.chars().count() as u64;
    let target_len = (target.chars().count() as u64).max(1);
    (100 * typed_len / target_len).min(100) as u8
}

/// Words per minute under the "5 characters = 1 word" convention, rounded
/// to the nearest whole number. Zero until any time has elapsed.
pub fn wpm(typed_chars: usize, elapsed_seconds: f64) -> u32 {
    if elapsed_seconds <= 0.0 {
        return 0;
    }
    let words = typed_chars as f64 / 5.0;
    (words / (elapsed_seconds / 60.0)).round() as u32
}

/// Position-by-position accuracy percentage; 100 when nothing was typed.
pub fn accuracy(typed: &str, target: &str) -> u32 {
    let typed_len = typed.chars().count();
    if typed_len == 0 {
        return 100;
    }
    let correct = typed
        .chars()
        .zip(target.chars())
        .filter(|(t, e)| t == e)
        .count();
    (100.0 * correct as f64 / typed_len as f64).round() as u32
}

/// One-shot evaluation of a typing sample.
pub fn evaluate(typed: &str, target: &str, elapsed_seconds: f64) -> TypingStats {
    TypingStats {
        progress: progress(typed, target),
        wpm: wpm(typed.chars().count(), elapsed_seconds),
        accuracy: accuracy(typed, target),
    }
}
