//! CLI front end (spec §6): `bwt`, `unbwt`, and `compare` over plain-text
//! read collections (one read per line, all the same length — FASTA/FASTQ
//! parsing is explicitly out of scope, spec §1 Non-goals).

use anyhow::{bail, Context, Result};
use beetl::alphabet::Alphabet;
use beetl::backtrack::TwoBwtBackTracker;
use beetl::concat::concatenate;
use beetl::config::{Codec, EngineConfig};
use beetl::context::EngineContext;
use beetl::counts::LetterCountTable;
use beetl::cycle_source::SliceCycleSource;
use beetl::engine::{self, BuildOutput};
use beetl::handlers::ReferenceHandler;
use beetl::invert::{backward_reconstruct, EndPosMap};
use beetl::pileset::PileSet;
use beetl::run_meta::RunMetadata;
use beetl::triples::InsertionTripleStore;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "beetl", version, about = "Multi-string BWT construction and inversion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CodecArg {
    Ascii,
    Rle4,
}

impl From<CodecArg> for Codec {
    fn from(c: CodecArg) -> Self {
        match c {
            CodecArg::Ascii => Codec::Ascii,
            CodecArg::Rle4 => Codec::Rle4_4,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the BWT of a read collection, one read per line.
    Bwt {
        input: PathBuf,
        /// Final concatenated BWT path.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = CodecArg::Ascii)]
        codec: CodecArg,
        /// Per-cycle scratch directory; overridden by `BEETL_TMPDIR` if set.
        #[arg(long)]
        tmp_dir: Option<PathBuf>,
    },
    /// Rebuild the original reads from a completed construction run.
    Unbwt {
        /// The run directory passed to `bwt --tmp-dir` (or its default).
        run_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Backward-search both collections' BWTs together, reporting
    /// reference-style variant candidates (spec §4.8-4.9).
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[arg(long, default_value_t = 4)]
        min_occ: u64,
        #[arg(long, default_value_t = 20)]
        max_length: usize,
    },
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("beetl: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Bwt { input, output, codec, tmp_dir } => run_bwt(&input, &output, codec.into(), tmp_dir),
        Command::Unbwt { run_dir, output } => run_unbwt(&run_dir, &output),
        Command::Compare { a, b, min_occ, max_length } => run_compare(&a, &b, min_occ, max_length),
    }
}

fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let reads: Vec<Vec<u8>> = text.lines().filter(|l| !l.is_empty()).map(|l| l.as_bytes().to_vec()).collect();
    if reads.is_empty() {
        bail!("{} contains no reads", path.display());
    }
    Ok(reads)
}

fn build_reads(reads: Vec<Vec<u8>>, codec: Codec, tmp_dir: &Path) -> Result<BuildOutput> {
    let alphabet = Alphabet::DNA5;
    let mut source = SliceCycleSource::new(reads).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let cfg = EngineConfig::new(codec, tmp_dir);
    let ctx = EngineContext::new(alphabet, cfg).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    engine::build(&mut source, &ctx, tmp_dir).map_err(|e| anyhow::anyhow!(e.to_string()))
}

fn run_bwt(input: &Path, output: &Path, codec: Codec, tmp_dir: Option<PathBuf>) -> Result<()> {
    let reads = read_lines(input)?;
    let run_dir = tmp_dir.unwrap_or_else(|| output.with_extension("beetl-run"));
    let out = build_reads(reads, codec, &run_dir)?;

    let alphabet = Alphabet::DNA5;
    concatenate(&out, &alphabet, codec, output).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // The final generation's pile files are what survive `cleanup_generation`
    // (see engine::build); `unbwt` reopens them directly rather than
    // re-running construction, so the end-pos map and a little metadata
    // about which generation/codec/read shape they're in are kept alongside
    // them using the same "{prefix}-..." naming the piles themselves use.
    let prefix = run_dir.join(&out.generation);
    let end_pos_path = PathBuf::from(format!("{}-end-pos", prefix.display()));
    EndPosMap::identity(out.read_count)
        .write(&end_pos_path)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let meta = RunMetadata {
        generation: out.generation.clone(),
        read_count: out.read_count,
        read_len: out.read_len,
        codec,
    };
    meta.write(&run_dir.join("meta.txt")).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    log::info!(
        "wrote {} reads x {} cycles to {} (piles kept under {} for `unbwt`)",
        out.read_count,
        out.read_len,
        output.display(),
        run_dir.display()
    );
    Ok(())
}

/// Tally each pile's per-symbol counts by decoding it once, start to
/// finish. `bwt` doesn't persist the [`LetterCountTable`] itself, only the
/// pile files it was computed from, so `unbwt` rebuilds it the same way
/// [`beetl::rank_index::RankIndex::build`] walks a pile — sequentially, in
/// fixed-size chunks, to the first short read.
fn reconstruct_counts(pileset: &PileSet, alphabet: &Alphabet, cycle: usize) -> Result<LetterCountTable> {
    const CHUNK: usize = 1 << 16;
    let size = alphabet.len();
    let mut counts = LetterCountTable::new(size);
    for p in 0..size as u8 {
        let mut reader = pileset.open_bwt_reader(p, *alphabet, cycle).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        loop {
            let mut row = vec![0u64; size];
            let got = reader.read_and_count(&mut row, CHUNK).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            counts.add_row(p as usize, &row);
            if got < CHUNK {
                break;
            }
        }
    }
    Ok(counts)
}

fn run_unbwt(run_dir: &Path, output: &Path) -> Result<()> {
    let alphabet = Alphabet::DNA5;
    let meta = RunMetadata::read(&run_dir.join("meta.txt"))
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("reading run metadata under {} (was this directory written by `bwt`?)", run_dir.display()))?;

    let pileset = PileSet::new(run_dir, &meta.generation, alphabet.len(), meta.codec);
    let counts = reconstruct_counts(&pileset, &alphabet, meta.read_count)?;

    let prefix = run_dir.join(&meta.generation);
    let end_pos_path = PathBuf::from(format!("{}-end-pos", prefix.display()));
    let end_pos = EndPosMap::read(&end_pos_path).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let out = BuildOutput {
        run_dir: run_dir.to_path_buf(),
        generation: meta.generation,
        pileset,
        counts,
        triples: InsertionTripleStore::with_capacity(0),
        read_count: meta.read_count,
        read_len: meta.read_len,
    };
    let reads = backward_reconstruct(&out, &alphabet, &end_pos).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut file = std::fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;
    for read in &reads {
        file.write_all(read)?;
        file.write_all(b"\n")?;
    }
    log::info!("recovered {} reads into {}", reads.len(), output.display());
    Ok(())
}

fn run_compare(a: &Path, b: &Path, min_occ: u64, max_length: usize) -> Result<()> {
    let alphabet = Alphabet::DNA5;
    let tmp_a = tempfile::tempdir().context("creating scratch dir for collection A")?;
    let tmp_b = tempfile::tempdir().context("creating scratch dir for collection B")?;

    let out_a = build_reads(read_lines(a)?, Codec::Ascii, tmp_a.path())?;
    let out_b = build_reads(read_lines(b)?, Codec::Ascii, tmp_b.path())?;

    let mut tracker = TwoBwtBackTracker::new(&out_a, Some(&out_b), alphabet, min_occ, true);
    let mut handler = ReferenceHandler { min_occ };
    let findings = tracker.run(&mut handler, max_length).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for f in &findings {
        let word = f.word.as_deref().map(|w| String::from_utf8_lossy(w).into_owned()).unwrap_or_default();
        writeln!(out, "{:?}\tpile={}\tword={word}", f.discovery.kind, f.pile)?;
    }
    log::info!("{} candidate(s) reported", findings.len());
    Ok(())
}
