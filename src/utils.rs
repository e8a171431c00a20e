use crate::population::GenerationStats;

/// Log an info line, keeping ANSI colours only when `$colorful` is true
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        if $colorful {
            log::info!("{}", message);
        } else {
            log::info!("{}", $crate::utils::strip_ansi(&message));
        }
    }};
}

/// Remove `ESC[...m` colour sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for d in chars.by_ref() {
                if d == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn display_epoch_legend() -> String {
    format!(
        "\x1b[1;97m{:>5} | {:>12} | {:>12} | {:>12} | {:>7}\x1b[0m",
        "#gen", "min", "median", "max", "evals"
    )
}

/// One line per generation; a zero minimum is highlighted.
pub fn display_epoch(stats: &GenerationStats) -> String {
    let min_color = if stats.min == 0.0 { "\x1b[1;92m" } else { "\x1b[1;93m" };
    format!(
        "{:>5} | {}{:>12.4}\x1b[0m | {:>12.4} | {:>12.4} | {:>7}",
        stats.generation, min_color, stats.min, stats.median, stats.max, stats.evaluations
    )
}
