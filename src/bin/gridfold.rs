use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use kurbo::{Point, Rect};

use gridfold::{CropMode, Grid, crop, decode_image, detect, encode_png, erase};

#[derive(Parser, Debug)]
#[command(name = "gridfold", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect a table grid in an image and write it as JSON.
    Detect(DetectArgs),
    /// Apply one eraser action to a grid document.
    Erase(EraseArgs),
    /// Fold selected regions out of an image.
    Crop(CropArgs),
}

#[derive(Parser, Debug)]
struct DetectArgs {
    /// Input image (any format the `image` crate decodes).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output grid JSON path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct EraseArgs {
    /// Input grid JSON.
    #[arg(long)]
    grid: PathBuf,

    /// Eraser position as `x,y` in image coordinates.
    #[arg(long, value_parser = parse_point)]
    at: Point,

    /// Remove the whole line instead of one lattice segment.
    #[arg(long)]
    whole_line: bool,

    /// Maximum distance from a line for it to be erased.
    #[arg(long, default_value_t = 20.0)]
    threshold: f64,

    /// Output grid JSON path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CropArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Selection rectangles JSON (list of {x0,y0,x1,y1}).
    #[arg(long)]
    selections: PathBuf,

    /// Grid JSON; detected from the image when omitted.
    #[arg(long)]
    grid: Option<PathBuf>,

    /// Which axis ranges the selections remove.
    #[arg(long, value_enum, default_value_t = ModeChoice::Both)]
    mode: ModeChoice,

    /// Prefer whitespace cuts and per-cell squish over plain stitching.
    #[arg(long)]
    smart: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Optional path for the remapped grid JSON.
    #[arg(long)]
    grid_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Horizontal,
    Vertical,
    Both,
}

impl From<ModeChoice> for CropMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Horizontal => CropMode::Horizontal,
            ModeChoice::Vertical => CropMode::Vertical,
            ModeChoice::Both => CropMode::Both,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Detect(args) => cmd_detect(args),
        Command::Erase(args) => cmd_erase(args),
        Command::Crop(args) => cmd_crop(args),
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',').ok_or("expected 'x,y'")?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok(Point::new(x, y))
}

fn read_image(path: &Path) -> anyhow::Result<gridfold::PixelBuffer> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    Ok(decode_image(&bytes)?)
}

fn read_grid_json(path: &Path) -> anyhow::Result<Grid> {
    let f = File::open(path).with_context(|| format!("open grid '{}'", path.display()))?;
    let grid: Grid = serde_json::from_reader(BufReader::new(f)).context("parse grid JSON")?;
    grid.validate()?;
    Ok(grid)
}

fn write_grid_json(grid: &Grid, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create grid '{}'", path.display()))?;
    serde_json::to_writer_pretty(f, grid).context("write grid JSON")?;
    Ok(())
}

fn cmd_detect(args: DetectArgs) -> anyhow::Result<()> {
    let buffer = read_image(&args.in_path)?;
    let grid = detect(&buffer);
    write_grid_json(&grid, &args.out)?;
    eprintln!(
        "wrote {} ({} horizontal, {} vertical)",
        args.out.display(),
        grid.horizontal.len(),
        grid.vertical.len()
    );
    Ok(())
}

fn cmd_erase(args: EraseArgs) -> anyhow::Result<()> {
    let grid = read_grid_json(&args.grid)?;
    match erase(&grid, args.at, args.whole_line, args.threshold) {
        Some(edited) => {
            write_grid_json(&edited, &args.out)?;
            eprintln!("wrote {}", args.out.display());
        }
        None => {
            write_grid_json(&grid, &args.out)?;
            eprintln!(
                "no line within {}px of ({}, {}); grid unchanged",
                args.threshold, args.at.x, args.at.y
            );
        }
    }
    Ok(())
}

fn read_selections_json(path: &Path) -> anyhow::Result<Vec<Rect>> {
    let f = File::open(path).with_context(|| format!("open selections '{}'", path.display()))?;
    let selections: Vec<Rect> =
        serde_json::from_reader(BufReader::new(f)).context("parse selections JSON")?;
    Ok(selections)
}

fn cmd_crop(args: CropArgs) -> anyhow::Result<()> {
    let buffer = read_image(&args.in_path)?;
    let selections = read_selections_json(&args.selections)?;
    let grid = match &args.grid {
        Some(path) => read_grid_json(path)?,
        None => detect(&buffer),
    };

    let out = crop(&buffer, &selections, &grid, args.mode.into(), args.smart)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    encode_png(&out.buffer, &args.out)?;

    if let Some(grid_out) = &args.grid_out {
        write_grid_json(&out.grid, grid_out)?;
    }

    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        out.buffer.width(),
        out.buffer.height()
    );
    Ok(())
}
