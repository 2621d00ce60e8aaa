use std::io::Write;
use std::time::Instant;

use log::LevelFilter;

/// Installs an stderr logger stamping each line with the time since start-up.
/// `RUST_LOG` overrides the level picked from `verbose`.
pub fn init_logging(verbose: bool) {
    let t0 = Instant::now();
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_module("dh_template_bridge", level)
        .parse_default_env()
        .format(move |f, record| {
            let ts = fmt_elapsed(t0.elapsed().as_secs_f64());
            writeln!(f, "[{ts}] {:<5} {}", record.level(), record.args())
        })
        .try_init();
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::fmt_elapsed;

    #[test]
    fn elapsed_switches_to_hours() {
        assert_eq!(fmt_elapsed(-3.0), "00:00");
        assert_eq!(fmt_elapsed(75.9), "01:15");
        assert_eq!(fmt_elapsed(3723.0), "01:02:03");
    }
}
