use bio::io::fasta;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use theseus::{Penalties, TheseusAligner, VertexId};

#[derive(Parser, Debug)]
#[command(author, version, about = "Gap-affine sequence-to-graph alignment", long_about = None)]
struct Args {
    /// Input graph in GFA1 format
    #[arg(short, long)]
    graph: PathBuf,

    /// Input FASTA file with the query sequences
    #[arg(short, long)]
    sequences: PathBuf,

    /// Optional start positions, one `vertex_name<TAB>offset` line per query
    /// (defaults to the first vertex at offset 0)
    #[arg(short, long)]
    positions: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

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

/// Read the per-query start positions file
fn read_positions(path: &PathBuf) -> io::Result<Vec<(String, u32)>> {
    let contents = std::fs::read_to_string(path)?;
    let mut positions = Vec::new();
    for line in contents.lines() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let name = fields.next().unwrap_or_default().to_string();
        let offset = fields
            .next()
            .unwrap_or("0")
            .parse::<u32>()
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid start offset in positions line: {line}"),
                )
            })?;
        positions.push((name, offset));
    }
    Ok(positions)
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let penalties = Penalties::affine(args.match_score, args.mismatch, args.gapo, args.gape)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    // Load the graph
    let graph_file = File::open(&args.graph)?;
    let mut aligner = TheseusAligner::from_gfa(penalties, BufReader::new(graph_file))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    // Read the query sequences
    let fasta_reader = fasta::Reader::new(File::open(&args.sequences)?);
    let mut sequences = Vec::new();
    for result in fasta_reader.records() {
        let record = result?;
        sequences.push((
            record.id().to_string(),
            String::from_utf8_lossy(record.seq()).into_owned(),
        ));
    }

    let positions = match &args.positions {
        Some(path) => Some(read_positions(path)?),
        None => None,
    };

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    // Progress bar for interactive runs only
    let is_interactive = atty::is(atty::Stream::Stderr);
    let progress = if args.no_progress || !is_interactive {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(sequences.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{elapsed_precise} {pos}/{len} ({percent}%) ETA: {eta}")
                .unwrap(),
        );
        pb
    };

    for (idx, (name, seq)) in sequences.iter().enumerate() {
        // Resolve the start position for this query
        let (start_node, start_offset): (VertexId, u32) = match &positions {
            Some(positions) => {
                let (vertex_name, offset) = positions.get(idx).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("no start position for sequence {name}"),
                    )
                })?;
                let oriented = format!("{vertex_name}+");
                let id = aligner
                    .graph()
                    .vertex_id(&oriented)
                    .or_else(|| aligner.graph().vertex_id(vertex_name))
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("unknown start vertex {vertex_name}"),
                        )
                    })?;
                (id, *offset)
            }
            None => (0, 0),
        };

        let alignment = aligner
            .align(seq, start_node, start_offset)
            .map_err(|e| io::Error::other(e.to_string()))?;

        let path_names: Vec<&str> = alignment
            .path
            .iter()
            .map(|&v| aligner.graph().vertex(v).name.as_str())
            .collect();
        writeln!(
            output,
            "{}\t{}\t{}\t{}",
            name,
            alignment.score,
            alignment.cigar_string(),
            path_names.join(",")
        )?;

        progress.set_position(idx as u64 + 1);
    }

    progress.finish_and_clear();
    output.flush()
}
