use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lzjb_stream::{decode_size, encode_size, Decompressor, SizeError, MAX_OFFSET, MAX_SIZE_BYTES};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

#[derive(Parser, Debug)]
struct Arguments {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decompress LZJB files, streaming the input in fixed size chunks
    Decompress {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        args: DecompressArgs,
    },

    /// Encode or decode a variable-length size
    Size {
        #[command(subcommand)]
        command: SizeCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SizeCommand {
    /// Print the encoding of a size as hex
    Encode { value: usize },

    /// Decode a size from hex bytes, e.g. "2c 82"
    Decode { bytes: String },
}

#[derive(Args, Debug, Clone)]
struct DecompressArgs {
    /// The output directory to write decompressed files to
    #[arg(short, long, default_value = "decompressed")]
    out_dir: PathBuf,

    /// Overwrite the output directory if it already exists
    #[arg(long)]
    force: bool,

    /// Number of compressed bytes handed to the decompressor per call
    #[arg(short, long, default_value = "4096")]
    chunk_size: usize,

    #[arg(short, long, default_value = "framed")]
    format: InputFormat,

    /// Decompressed size of raw inputs
    #[arg(short, long, required_if_eq("format", "raw"))]
    size: Option<usize>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum InputFormat {
    /// Encoded decompressed size followed by the compressed body
    Framed,

    /// Compressed body only, the decompressed size is given with --size
    Raw,
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    colog::init();

    match args.command {
        Commands::Decompress { inputs, args } => decompress(&inputs, &args)?,
        Commands::Size { command } => size(command)?,
    }

    Ok(())
}

fn size(command: SizeCommand) -> anyhow::Result<()> {
    match command {
        SizeCommand::Encode { value } => {
            let mut buf = [0u8; MAX_SIZE_BYTES];
            let len = encode_size(&mut buf, value)?;

            println!("{}", to_hex(&buf[..len]));
        }
        SizeCommand::Decode { bytes } => {
            let hex: String = bytes.chars().filter(|c| !c.is_whitespace()).collect();
            anyhow::ensure!(
                hex.is_ascii() && hex.len() % 2 == 0,
                "Expected pairs of hex digits, got '{}'",
                bytes
            );

            let encoded = (0..hex.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Invalid hex '{}'", bytes))?;

            let (value, len) = decode_size(&encoded).context("Failed to decode size")?;
            if len < encoded.len() {
                log::warn!("Ignoring {} trailing bytes", encoded.len() - len);
            }

            println!("{}", value);
        }
    }

    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

fn decompress(inputs: &[PathBuf], args: &DecompressArgs) -> anyhow::Result<()> {
    use indicatif::ProgressBar;
    use rayon::prelude::*;

    anyhow::ensure!(args.chunk_size > 0, "Chunk size must be at least 1");

    if args.force && args.out_dir.exists() {
        fs::remove_dir_all(&args.out_dir)
            .with_context(|| "Failed to clean up old output directory")?;
    }
    fs::create_dir(&args.out_dir).with_context(|| "Failed to create output directory")?;

    let total = inputs
        .iter()
        .map(|input| fs::metadata(input).map(|meta| meta.len()).unwrap_or(0))
        .sum();
    let progress = ProgressBar::new(total);

    let results = inputs
        .par_iter()
        .map(|input| (input, decompress_file(input, args, &progress)))
        .collect::<Vec<_>>();

    progress.finish_and_clear();

    let mut failed = 0;
    for (input, result) in results {
        match result {
            Ok(output) => log::info!("{} -> {}", input.display(), output.display()),
            Err(err) => {
                log::error!("{}: {:#}", input.display(), err);
                failed += 1;
            }
        }
    }

    anyhow::ensure!(failed == 0, "{} of {} inputs failed", failed, inputs.len());
    log::info!("Done!");

    Ok(())
}

const WINDOW_SIZE: usize = (MAX_OFFSET + 1).next_power_of_two();

/// Output sink that only keeps the part of the output back-references can still reach.
struct Window {
    recent: Box<[u8]>,
    out: BufWriter<File>,
    error: Option<io::Error>,
}

impl Window {
    fn new(out: File) -> Self {
        Self {
            recent: vec![0u8; WINDOW_SIZE].into_boxed_slice(),
            out: BufWriter::new(out),
            error: None,
        }
    }

    fn read(offset: usize, window: &mut Window) -> u8 {
        window.recent[offset % WINDOW_SIZE]
    }

    fn write(offset: usize, value: u8, window: &mut Window) {
        window.recent[offset % WINDOW_SIZE] = value;

        if window.error.is_none() {
            if let Err(err) = window.out.write_all(&[value]) {
                window.error = Some(err);
            }
        }
    }

    fn finish(mut self) -> io::Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        self.out.flush()
    }
}

fn read_size<R: Read>(reader: &mut R) -> anyhow::Result<usize> {
    let mut header = [0u8; MAX_SIZE_BYTES];

    for len in 1..=MAX_SIZE_BYTES {
        reader
            .read_exact(&mut header[len - 1..len])
            .with_context(|| "Input ended inside the size header")?;

        match decode_size(&header[..len]) {
            Ok((size, _)) => return Ok(size),
            Err(SizeError::Incomplete) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    anyhow::bail!("Size header is longer than {} bytes", MAX_SIZE_BYTES)
}

fn decompress_file(
    input: &Path,
    args: &DecompressArgs,
    progress: &indicatif::ProgressBar,
) -> anyhow::Result<PathBuf> {
    let file =
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut reader = BufReader::new(file);

    let size = match args.format {
        InputFormat::Framed => read_size(&mut reader)?,
        InputFormat::Raw => args.size.context("--size is required for raw input")?,
    };

    let name = input.file_stem().context("Input has no file name")?;
    let output = args.out_dir.join(name);
    let out = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    if size == 0 {
        return Ok(output);
    }

    let mut decompressor =
        Decompressor::callbacks(size, Window::read, Window::write, Window::new(out))?;

    let mut chunk = vec![0u8; args.chunk_size];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            anyhow::bail!(
                "Input ended after {} of {} bytes",
                decompressor.position(),
                size
            );
        }
        progress.inc(read as u64);

        let more = decompressor.decompress(&chunk[..read])?;
        if !more || decompressor.destination().user().error.is_some() {
            break;
        }
    }

    decompressor
        .into_destination()
        .into_user()
        .finish()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(output)
}
