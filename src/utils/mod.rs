//! Logging setup and small numeric helpers.

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides the default
/// `nnplay=info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nnplay=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Index of the largest value; the first one on ties. `None` for an empty
/// input. NaN values are never selected.
pub fn argmax<I: IntoIterator<Item = f32>>(values: I) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if v <= b || v.is_nan() => {}
            None if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
