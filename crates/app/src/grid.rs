use std::fmt::Write;

use seq_core::{Pattern, STEP_COUNT, Track};

/// Text view of a pattern: one row per track, `x` for set cells, with the
/// cursor column marked when given.
pub fn render_grid(tracks: &[Track], pattern: &Pattern, cursor: Option<usize>) -> String {
    let width = tracks
        .iter()
        .map(|track| track.name.len())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = String::new();
    let _ = write!(out, "{:width$} ", "");
    for step in 0..STEP_COUNT {
        let _ = write!(out, "{}", if step % 4 == 0 { '|' } else { ' ' });
        let _ = write!(out, "{:<2}", step + 1);
    }
    out.push('\n');

    for track in tracks {
        let _ = write!(out, "{:<width$} ", track.name);
        for step in 0..STEP_COUNT {
            let cell = if pattern.is_set(track.id, step) {
                'x'
            } else if cursor == Some(step) {
                '^'
            } else {
                '.'
            };
            let _ = write!(out, "{}{cell} ", if step % 4 == 0 { '|' } else { ' ' });
        }
        out.push('\n');
    }
    out
}

/// Parse a 1-based step number into a step index.
pub fn parse_step(text: &str) -> Option<usize> {
    text.parse::<usize>()
        .ok()
        .filter(|step| (1..=STEP_COUNT).contains(step))
        .map(|step| step - 1)
}

pub fn describe_cell(track: &Track, step: usize, on: bool) -> String {
    format!(
        "{} step {} {}",
        track.name,
        step + 1,
        if on { "on" } else { "off" }
    )
}
