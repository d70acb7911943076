use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use anyhow::{anyhow, Context};
use log::warn;
use ordered_float::NotNan;

use crate::freq::FrequencyTable;

// 1-based whitespace-token positions of the tracked metrics in a data line.
const AIR_TEMP_COL: usize = 3;
const PRESSURE_COL: usize = 4;
const WIND_SPEED_COL: usize = 9;

// chunk size for the parallel reader. every record must fit inside one
// chunk, and anything much past a few MiB stops paying off.
pub const BUF_SIZE: usize = 1 << 21;

/// Everything accumulated over one pass of the input: the data-line count
/// and one frequency table per tracked metric.
#[derive(Debug, Default, PartialEq)]
pub struct Readings {
    pub lines: u64,
    pub air_temp: FrequencyTable,
    pub pressure: FrequencyTable,
    pub wind_speed: FrequencyTable,
}

impl Readings {
    /// Tokenizes one data line and records the tracked columns. Short lines
    /// just contribute fewer readings; tokens that fail to parse (or parse
    /// to NaN) are skipped with a warning rather than recorded as 0.0.
    pub fn record_line(&mut self, line: &str) {
        self.lines += 1;
        for (pos, token) in line.split_whitespace().enumerate() {
            let table = match pos + 1 {
                AIR_TEMP_COL => &mut self.air_temp,
                PRESSURE_COL => &mut self.pressure,
                WIND_SPEED_COL => &mut self.wind_speed,
                _ => continue,
            };
            match token.parse::<f64>().ok().and_then(|v| NotNan::new(v).ok()) {
                Some(value) => table.increment(value),
                None => warn!("skipping unparseable reading {:?} at column {}", token, pos + 1),
            }
        }
    }

    pub fn merge(&mut self, other: Readings) {
        self.lines += other.lines;
        self.air_temp.merge(other.air_temp);
        self.pressure.merge(other.pressure);
        self.wind_speed.merge(other.wind_speed);
    }
}

/// Single-threaded pass: skip the header line, then record every data line.
pub fn read_sequential(path: &Path) -> anyhow::Result<Readings> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    match lines.next() {
        Some(header) => {
            header.context("reading header line")?;
        }
        // an empty file has no data lines either; stats will reject it
        None => return Ok(Readings::default()),
    }

    let mut readings = Readings::default();
    for line in lines {
        match line {
            Ok(line) => readings.record_line(&line),
            // only a failure to open the file aborts the run; a read error
            // mid-file ends the pass with what was accumulated so far
            Err(err) => {
                warn!("reading record: {err}");
                break;
            }
        }
    }
    Ok(readings)
}

/// Multi-threaded pass over the same input, for files bigger than one chunk.
///
/// A reader loop sends fixed-size chunks, sliced back to the last newline,
/// over a bounded channel; the chopped tail line is re-read into the next
/// chunk by rewinding the file. Each worker accumulates into its own private
/// `Readings`, and the workers' results are merged by summing counts after
/// join, so the tables come out identical to a sequential pass.
pub fn read_parallel(path: &Path) -> anyhow::Result<Readings> {
    let mut input = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let num_threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    // (buf, start, len): workers scan buf[start..len], which always ends on
    // a line boundary
    let (tx, rx) = crossbeam::channel::bounded::<(Box<[u8]>, usize, usize)>(num_threads);

    let mut threads = Vec::new();
    for _ in 0..num_threads {
        let rx = rx.clone();
        threads.push(std::thread::spawn(move || {
            let mut readings = Readings::default();
            while let Ok((buf, start, len)) = rx.recv() {
                // splitting while still bytes; decode per line so one bad
                // record can't take down the chunk. blank lines still count
                // as data lines, so only the empty segment after the chunk's
                // final newline is dropped.
                let mut segments = buf[start..len].split(|c| *c == b'\n').peekable();
                while let Some(line) = segments.next() {
                    if line.is_empty() && segments.peek().is_none() {
                        break;
                    }
                    match std::str::from_utf8(line) {
                        Ok(line) => readings.record_line(line),
                        Err(_) => warn!("skipping non-utf8 record"),
                    }
                }
            }
            readings
        }));
    }

    let mut first = true;
    loop {
        // built on the heap directly; a 2 MiB array would overflow the
        // stack of a spawning thread with a small stack
        let mut buf = vec![0u8; BUF_SIZE].into_boxed_slice();
        let read = match input.read(&mut buf) {
            Ok(n) => n,
            // same policy as the sequential pass: report and stop the pass
            Err(err) => {
                warn!("reading chunk: {err}");
                break;
            }
        };
        if read == 0 {
            break;
        }

        // rewind over the incomplete tail line so the next chunk re-reads it
        // whole. a short read means EOF, where the tail line is complete even
        // without a trailing newline.
        let chopped_tail = if read == BUF_SIZE {
            let Some(tail) = buf[0..read].iter().rev().position(|&c| c == b'\n') else {
                warn!("record longer than one {BUF_SIZE}-byte chunk, stopping");
                break;
            };
            if let Err(err) = input.seek(SeekFrom::Current(-(tail as i64))) {
                warn!("rewinding over tail line: {err}");
                break;
            }
            tail
        } else {
            0
        };

        // the first chunk starts with the header line, which is discarded
        let mut start = 0;
        if first {
            first = false;
            match buf[0..read].iter().position(|&c| c == b'\n') {
                Some(n) => start = n + 1,
                // the whole file is one header line
                None => break,
            }
        }

        let len = read - chopped_tail;
        if start < len && tx.send((buf, start, len)).is_err() {
            // only happens if every worker died; join below reports it
            break;
        }
    }
    // workers only finish once every sender is gone
    drop(tx);

    let mut readings = Readings::default();
    for t in threads {
        let part = t.join().map_err(|_| anyhow!("ingest worker panicked"))?;
        readings.merge(part);
    }
    Ok(readings)
}
