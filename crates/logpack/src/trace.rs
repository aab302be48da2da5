//! Best-effort call-site trace capture.

use backtrace::Backtrace;

/// How many symbolized frames a stack must have before it is trusted; below
/// this the capture machinery itself dominates and the trace is useless.
const MIN_FRAMES: usize = 6;

/// Captures the current call stack as `function@file:line:column` frames,
/// oldest caller last, with capture and logging infrastructure removed.
///
/// Capture is best-effort: when symbols are unavailable or the stack is too
/// shallow to contain anything beyond the logging machinery, the trace is
/// empty and formatting degrades to an empty call-site annotation.
///
/// Resolving symbols is expensive (a full backtrace plus symbolication per
/// log call), which is the going rate for call-site reporting in this style
/// of logger.
#[must_use]
pub fn capture() -> Vec<String> {
    let bt = Backtrace::new();
    let mut frames = Vec::new();

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let name = symbol
                .name()
                .map_or_else(|| "<unknown>".to_string(), |n| n.to_string());
            let file = symbol
                .filename()
                .and_then(|p| p.to_str())
                .unwrap_or("<unknown>");
            let line = symbol.lineno().unwrap_or(0);
            let column = symbol.colno().unwrap_or(0);
            frames.push((name, format!("{file}:{line}:{column}")));
        }
    }

    if frames.len() < MIN_FRAMES {
        return Vec::new();
    }

    frames
        .into_iter()
        .filter(|(name, _)| !name.contains("logpack::") && !name.contains("backtrace::"))
        .map(|(name, location)| format!("{name}@{location}"))
        .collect()
}
