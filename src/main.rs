pub mod freq;
pub mod ingest;
pub mod report;
pub mod stats;

use std::path::PathBuf;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let begin = std::time::Instant::now();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: envdata <input-file>")?;

    // one full pass over the file; anything bigger than a single chunk goes
    // through the parallel chunked reader
    let size = std::fs::metadata(&path)
        .with_context(|| format!("reading metadata for {}", path.display()))?
        .len();
    let readings = if size > ingest::BUF_SIZE as u64 {
        ingest::read_parallel(&path)?
    } else {
        ingest::read_sequential(&path)?
    };

    let sections = [
        (
            "Air temperature",
            stats::compute_metrics(&readings.air_temp).context("air temperature")?,
        ),
        (
            "Barometric pressure",
            stats::compute_metrics(&readings.pressure).context("barometric pressure")?,
        ),
        (
            "Wind speed",
            stats::compute_metrics(&readings.wind_speed).context("wind speed")?,
        ),
    ];
    print!("{}", report::render(readings.lines, &sections));

    println!("elapsed: {}ms", begin.elapsed().as_millis());
    Ok(())
}
