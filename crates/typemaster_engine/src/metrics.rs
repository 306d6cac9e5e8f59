//! 速度与准确率计算
//!
//! 全部是纯函数：每次调用都从 `(原文, 输入, 已用毫秒)` 重新计算，不保存任何状态，
//! 可以按任意频率调用。

use typemaster_core::SessionMetrics;

/// 输入中以空白分隔的单词数（空输入或全空白为 0）
pub fn words_typed(input: &str) -> usize {
    input.split_whitespace().count()
}

/// WPM = round(单词数 / 分钟数)
///
/// 原始结果不是有限正数时（未计时、耗时为零或负数、没有单词）返回 0。
pub fn wpm(words: usize, elapsed_ms: i64) -> u32 {
    let minutes = elapsed_ms as f64 / 60_000.0;
    let raw = words as f64 / minutes;

    if raw.is_finite() && raw > 0.0 {
        raw.round() as u32
    } else {
        0
    }
}

/// 准确率 = round(正确字符数 / 原文长度 * 100)
///
/// 分母是整段原文而不是已输入的长度。空原文视为 100。
pub fn accuracy(target: &str, input: &str) -> u32 {
    let target_len = target.chars().count();
    if target_len == 0 {
        return 100;
    }

    let correct = target
        .chars()
        .zip(input.chars())
        .filter(|(expected, typed)| expected == typed)
        .count();

    (correct as f64 / target_len as f64 * 100.0).round() as u32
}

/// 四舍五入到秒，负数按 0 计
pub fn elapsed_seconds(elapsed_ms: i64) -> u64 {
    if elapsed_ms <= 0 {
        return 0;
    }
    (elapsed_ms as f64 / 1000.0).round() as u64
}

/// 一次性算出全部指标
pub fn calculate(target: &str, input: &str, elapsed_ms: i64) -> SessionMetrics {
    SessionMetrics {
        wpm: wpm(words_typed(input), elapsed_ms),
        accuracy: accuracy(target, input),
        elapsed_seconds: elapsed_seconds(elapsed_ms),
    }
}
