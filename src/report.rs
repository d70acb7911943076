use std::fmt::Write;

use crate::stats::Metrics;

/// Renders the run summary: the total data-line count, then one line per
/// metric with its average, median, range, and most-frequent group.
pub fn render(total_lines: u64, sections: &[(&str, Metrics)]) -> String {
    let mut out = String::with_capacity(64 + sections.len() * 96);
    writeln!(out, "Total readings: {total_lines}").unwrap();
    for (name, m) in sections {
        writeln!(
            out,
            "{}: Average {:.2}, Median {:.2}, Low {:.2}, High {:.2}, Most frequent {}, Frequency {}",
            name,
            m.average,
            m.median,
            m.min,
            m.max,
            fmt_group(&m.high_values),
            m.high_count,
        )
        .unwrap();
    }
    out
}

fn fmt_group(values: &[f64]) -> String {
    let mut s = String::from("[");
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        write!(s, "{v:.2}").unwrap();
    }
    s.push(']');
    s
}
