//! Custom panic hook for structured crash reports.
//!
//! A crash report names the triage phase, the input source and the test case
//! being processed, plus how many failures were already classified.

use super::context::{get_current_context, get_progress, TriageContext};
use std::panic::PanicHookInfo;
use tracing::Span;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const WIDTH: usize = 78;

/// Install the crash-report hook. Call early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        print_crash_report(info);
    }));
}

fn print_crash_report(info: &PanicHookInfo<'_>) {
    let context = get_current_context();
    let (processed, total) = get_progress();

    eprintln!();
    for line in crash_report_lines(&context, processed, total, &extract_panic_message(info)) {
        eprintln!("{line}");
    }
    if let Some(location) = info.location() {
        eprintln!(
            "Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    if std::env::var("RUST_BACKTRACE").is_ok() {
        eprintln!("{}", std::backtrace::Backtrace::capture());
    } else {
        eprintln!("Run with RUST_BACKTRACE=1 for a stack trace");
    }
}

fn boxed(text: &str) -> String {
    format!("║  {:<width$}║", truncate(text, WIDTH - 3), width = WIDTH - 2)
}

fn rule(left: char, right: char) -> String {
    format!("{left}{}{right}", "═".repeat(WIDTH))
}

fn crash_report_lines(
    context: &TriageContext,
    processed: usize,
    total: usize,
    message: &str,
) -> Vec<String> {
    let mut lines = vec![
        rule('╔', '╗'),
        boxed("FAILTRIAGE CRASH REPORT"),
        rule('╠', '╣'),
        boxed(&format!("Version: {VERSION}")),
        boxed(&format!("Platform: {}", std::env::consts::OS)),
        boxed(&format!(
            "Time: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )),
        boxed(&format!("PANIC: {message}")),
        rule('╠', '╣'),
        boxed("TRIAGE CONTEXT:"),
    ];

    match &context.phase {
        Some(phase) => lines.push(boxed(&format!("  Phase: {phase}"))),
        None => lines.push(boxed("  Phase: (not set - crash occurred before triage started)")),
    }
    if let Some(metadata) = Span::current().metadata() {
        lines.push(boxed(&format!("  Span: {}", metadata.name())));
    }
    if let Some(source) = &context.current_source {
        lines.push(boxed(&format!("  Source: {source}")));
    }
    if let Some(test) = &context.current_test {
        lines.push(boxed(&format!("  Test: {test}")));
    }
    if total > 0 {
        lines.push(boxed(&format!(
            "  Progress: {processed} / {total} failing tests"
        )));
    }
    lines.push(rule('╚', '╝'));
    lines
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
