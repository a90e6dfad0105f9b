use bio::io::fasta;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use theseus::{Penalties, TheseusMsa};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputKind {
    /// Aligned sequences in FASTA format
    Msa,
    /// The compact partial-order graph as GFA
    Gfa,
    /// Consensus sequence
    Consensus,
    /// The compact graph in Graphviz format
    Dot,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Progressive multiple-sequence alignment over a POA graph", long_about = None)]
struct Args {
    /// Input FASTA file with the sequences to align
    #[arg(short, long)]
    sequences: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to write once all sequences are aligned
    #[arg(short = 'k', long, value_enum, default_value = "msa")]
    output_kind: OutputKind,

    /// Match penalty
    #[arg(long = "match", default_value = "0")]
    match_score: i32,

    /// Mismatch penalty
    #[arg(long, default_value = "2")]
    mismatch: i32,

    /// Gap open penalty
    #[arg(long, default_value = "3")]
    gapo: i32,

    /// Gap extension penalty
    #[arg(long, default_value = "1")]
    gape: i32,

    /// Disable progress bar output
    #[arg(long)]
    no_progress: bool,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let penalties = Penalties::affine(args.match_score, args.mismatch, args.gapo, args.gape)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    // Read the sequences
    let fasta_reader = fasta::Reader::new(File::open(&args.sequences)?);
    let mut sequences = Vec::new();
    for result in fasta_reader.records() {
        let record = result?;
        sequences.push(String::from_utf8_lossy(record.seq()).into_owned());
    }
    if sequences.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no sequences to align",
        ));
    }

    let mut msa = TheseusMsa::new(penalties, &sequences[0])
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let progress = if args.no_progress || !atty::is(atty::Stream::Stderr) {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(sequences.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{elapsed_precise} {pos}/{len} ({percent}%) ETA: {eta}")
                .unwrap(),
        );
        pb.set_position(1);
        pb
    };

    for seq in &sequences[1..] {
        msa.add_sequence(seq)
            .map_err(|e| io::Error::other(e.to_string()))?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    match args.output_kind {
        OutputKind::Msa => msa.write_msa(&mut output)?,
        OutputKind::Gfa => msa.write_gfa(&mut output)?,
        OutputKind::Consensus => writeln!(output, "{}", msa.consensus())?,
        OutputKind::Dot => msa.write_dot(&mut output)?,
    }

    output.flush()
}
