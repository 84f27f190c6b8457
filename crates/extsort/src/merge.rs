use record::{FixedRecord, IndexEntry, RecordStream};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Duplicate handling while merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dedup {
    /// Write every record.
    Keep,
    /// Drop a record whose key equals the previously written key.
    ByKey,
}

/// Tunables for [`merge_runs`].
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Emit an index entry every `index_gap` written records.
    pub index_gap: usize,
    pub dedup: Dedup,
    /// Output buffer size, in records.
    pub write_buffer: usize,
}

/// Summary of one merge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub runs: usize,
    pub records: u64,
    pub index_entries: u64,
    pub duplicates: u64,
}

/// Merges N sorted streams of one record kind.
///
/// Holds one buffered record per stream (the frontier) and repeatedly yields
/// the smallest. Selection is a linear scan over the frontier; N is small
/// compared to the run size. Equal keys across streams come out in stream
/// order.
pub struct KWayMerge<R, S> {
    streams: Vec<RecordStream<R, S>>,
    frontier: Vec<Option<R>>,
}

impl<R: FixedRecord, S: Read> KWayMerge<R, S> {
    /// Primes the frontier with the first record of every stream.
    pub fn new(sources: Vec<S>) -> io::Result<Self> {
        let mut streams: Vec<RecordStream<R, S>> =
            sources.into_iter().map(RecordStream::new).collect();
        let frontier = streams
            .iter_mut()
            .map(|s| s.next_record().map(|r| r.map(|(_, rec)| rec)))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self { streams, frontier })
    }

    /// Removes and returns the smallest frontier record, refilling its slot.
    pub fn next_record(&mut self) -> io::Result<Option<R>> {
        let mut min: Option<(usize, i64)> = None;
        for (i, slot) in self.frontier.iter().enumerate() {
            if let Some(rec) = slot {
                let key = rec.key();
                if min.map_or(true, |(_, k)| key < k) {
                    min = Some((i, key));
                }
            }
        }

        let Some((i, _)) = min else {
            return Ok(None);
        };
        let refill = self.streams[i].next_record()?.map(|(_, rec)| rec);
        Ok(std::mem::replace(&mut self.frontier[i], refill))
    }

    /// Merges everything into `out`, writing a sparse index into `index`.
    pub fn merge_into<W: Write, I: Write>(
        &mut self,
        out: &mut W,
        index: &mut I,
        index_gap: usize,
        dedup: Dedup,
    ) -> io::Result<MergeStats> {
        let runs = self.streams.len();
        let stats = write_indexed(self.by_ref(), out, index, index_gap, dedup)?;
        Ok(MergeStats { runs, ..stats })
    }
}

impl<R: FixedRecord, S: Read> Iterator for KWayMerge<R, S> {
    type Item = io::Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Writes already sorted `records` to `out` and their sparse index to `index`.
///
/// The index gets `(key, written * SIZE)` whenever the count of records
/// already written is a multiple of `index_gap`, so the first record is
/// always indexed. With [`Dedup::ByKey`] a record whose key equals the
/// previously written key is dropped.
pub fn write_indexed<R, I, W, X>(
    records: I,
    out: &mut W,
    index: &mut X,
    index_gap: usize,
    dedup: Dedup,
) -> io::Result<MergeStats>
where
    R: FixedRecord,
    I: IntoIterator<Item = io::Result<R>>,
    W: Write,
    X: Write,
{
    let gap = index_gap.max(1) as u64;
    let mut stats = MergeStats::default();
    let mut last_key: Option<i64> = None;

    for rec in records {
        let rec = rec?;
        let key = rec.key();
        if dedup == Dedup::ByKey && last_key == Some(key) {
            stats.duplicates += 1;
            continue;
        }
        if stats.records % gap == 0 {
            IndexEntry::new(key, R::offset_of(stats.records)).encode(index)?;
            stats.index_entries += 1;
        }
        rec.encode(out)?;
        stats.records += 1;
        last_key = Some(key);
    }
    Ok(stats)
}

fn create_truncated(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Merges the sorted `runs` into `output` and writes its sparse index to
/// `index`, then deletes the runs.
///
/// Both outputs are truncated first, so zero runs leave two empty files.
/// The outputs are flushed and synced before the runs are removed.
pub fn merge_runs<R: FixedRecord>(
    runs: &[PathBuf],
    output: &Path,
    index: &Path,
    opts: MergeOptions,
) -> io::Result<MergeStats> {
    let sources = runs
        .iter()
        .map(|p| File::open(p).map(BufReader::new))
        .collect::<io::Result<Vec<_>>>()?;
    let mut merge = KWayMerge::<R, _>::new(sources)?;

    let mut out = BufWriter::with_capacity(
        opts.write_buffer.max(1) * R::SIZE,
        create_truncated(output)?,
    );
    let mut idx = BufWriter::new(create_truncated(index)?);

    let stats = merge.merge_into(&mut out, &mut idx, opts.index_gap, opts.dedup)?;

    out.flush()?;
    idx.flush()?;
    out.get_ref().sync_all()?;
    idx.get_ref().sync_all()?;
    drop(merge);

    for run in runs {
        fs::remove_file(run)?;
    }

    tracing::info!(
        output = %output.display(),
        runs = stats.runs,
        records = stats.records,
        index_entries = stats.index_entries,
        duplicates = stats.duplicates,
        "merged sorted runs"
    );
    Ok(stats)
}
