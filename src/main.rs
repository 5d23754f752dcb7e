use clap::{Parser, Subcommand, ValueEnum};
use cwv::compression::CompressionKind;
use cwv::nbt;
use cwv::region::{CellStatus, RegionContainer};
use cwv::world::{self, ShuffleRng};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "cwv",
    about = "Inspect and rewrite tag-tree documents and region containers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CompressionArg {
    Gzip,
    Zlib,
    None,
}

impl CompressionArg {
    fn to_kind(self) -> CompressionKind {
        match self {
            CompressionArg::Gzip => CompressionKind::Gzip,
            CompressionArg::Zlib => CompressionKind::Zlib,
            CompressionArg::None => CompressionKind::None,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print a document as an indented tree
    Dump {
        /// Document file (gzip, zlib or uncompressed)
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Re-encode a document with another compression
    Convert {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = CompressionArg::Gzip)]
        compression: CompressionArg,
    },
    /// List the created cells of a region file
    Inspect {
        /// Region file path (r.<x>.<z>.mca)
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Redistribute every readable cell of a world across its occupied cells
    Shuffle {
        /// World directory holding the .mca region files
        #[arg(long, short)]
        world: PathBuf,
        /// Seed for a reproducible shuffle (default: taken from the clock)
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = CompressionArg::Gzip)]
        compression: CompressionArg,
    },
}

fn run_dump(input: &Path) -> cwv::Result<()> {
    let document = nbt::read_document_file(input)?;
    print!("{}", nbt::pretty_tree(&document));
    Ok(())
}

fn run_convert(input: &Path, output: &Path, compression: CompressionKind) -> cwv::Result<()> {
    let document = nbt::read_document_file(input)?;
    nbt::write_document_file(output, &document, compression)?;
    println!("Saved {} ({compression}) to {}", input.display(), output.display());
    Ok(())
}

fn run_inspect(input: &Path) -> cwv::Result<()> {
    let mut region = RegionContainer::open(input)?;
    let created: Vec<(u8, u8)> = region
        .cells()
        .filter(|(_, _, cell)| cell.status(region.file_len()) != CellStatus::NotCreated)
        .map(|(x, z, _)| (x, z))
        .collect();

    println!("{}: {} bytes", input.display(), region.file_len());
    let mut readable = 0usize;
    for (x, z) in created.iter().copied() {
        let note = match region.read(x, z) {
            Ok(Some(document)) => {
                readable += 1;
                format!("root {}", nbt::pretty::quote(&document.name))
            }
            Ok(None) => String::new(),
            Err(err) => format!("error: {err}"),
        };
        let cell = region.cell(x, z)?;
        println!(
            "  ({x:2}, {z:2}) sector {:>6} count {:>3} timestamp {:>10} {} {note}",
            cell.offset,
            cell.sector_count,
            cell.timestamp,
            cell.status(region.file_len()),
        );
    }
    println!("created cells: {}, readable: {readable}", created.len());
    Ok(())
}

fn run_shuffle(world_dir: &Path, seed: Option<u64>, compression: CompressionKind) -> cwv::Result<()> {
    let paths = world::discover_region_files(world_dir)?;
    let mut rng = match seed {
        Some(seed) => ShuffleRng::new(seed),
        None => ShuffleRng::from_clock(),
    };
    let report = world::shuffle_world(&paths, &mut rng, compression)?;
    for failure in &report.failures {
        println!(
            "  skipped ({}, {}) in {}: {}",
            failure.failure.x,
            failure.failure.z,
            failure.path.display(),
            failure.failure.error
        );
    }
    println!(
        "Shuffled {} cells across {} region files ({} unreadable).",
        report.cells_moved,
        report.containers,
        report.failures.len()
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Dump { input } => run_dump(&input),
        Command::Convert {
            input,
            output,
            compression,
        } => run_convert(&input, &output, compression.to_kind()),
        Command::Inspect { input } => run_inspect(&input),
        Command::Shuffle {
            world,
            seed,
            compression,
        } => run_shuffle(&world, seed, compression.to_kind()),
    };

    if let Err(err) = result {
        exit_with_error(err);
    }
}

fn exit_with_error(err: cwv::Error) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}
