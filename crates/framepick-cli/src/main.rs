use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use framepick_core::decode::ReadSeek;
use framepick_core::encode::encode_png;
use framepick_core::{
    Base64Png, DecodeError, FileProvider, ImagePicker, ImageProvider, ImageSource, Origin,
    OutputAdapter, PickerConfig, PickerState, RawPixels, TargetSpec,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode an image into a bounded, oriented canvas", long_about = None)]
struct Args {
    /// Image file to load
    input: PathBuf,

    /// Target width in pixels
    #[arg(long)]
    width: f32,

    /// Target height in pixels
    #[arg(long)]
    height: f32,

    /// Fill the target exactly and crop the overflow (default: letterbox)
    #[arg(long, default_value_t = false)]
    exact: bool,

    /// Extra clockwise quarter turns to apply
    #[arg(long, default_value_t = 0)]
    rotate: u32,

    /// Treat the input as a gallery pick instead of a camera capture
    #[arg(long, default_value_t = false)]
    gallery: bool,

    /// Orientation attribute to report for gallery picks, in degrees
    #[arg(long, requires = "gallery")]
    orientation: Option<i32>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the result as PNG to this path
    #[arg(short, long, conflicts_with = "base64")]
    output: Option<PathBuf>,

    /// Print the result as base64-encoded PNG
    #[arg(long, default_value_t = false)]
    base64: bool,
}

/// Files on disk plus a one-entry content index for gallery picks.
struct IndexedFiles {
    files: FileProvider,
    orientation: Option<i32>,
}

impl ImageProvider for IndexedFiles {
    fn open(&self, handle: &str) -> io::Result<Box<dyn ReadSeek>> {
        self.files.open(handle)
    }

    fn orientation_attribute(&self, _handle: &str) -> Option<i32> {
        self.orientation
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PickerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PickerConfig::default(),
    };

    if args.base64 {
        let text = run(&args, config, Base64Png)?;
        println!("{}", text);
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .ok_or_else(|| anyhow!("either --output or --base64 is required"))?;
    let image = run(&args, config, RawPixels)?;
    let png = encode_png(&image).context("Failed to encode PNG")?;
    fs::write(&output, png).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{}x{} -> {}", image.width, image.height, output.display());

    Ok(())
}

/// Forward each delivered result into `tx`.
fn channel_delivery<T: Send>(
    tx: mpsc::Sender<Result<T, DecodeError>>,
) -> impl Fn(&ImageSource, Result<T, DecodeError>) + Send + Sync {
    move |source: &ImageSource, result: Result<T, DecodeError>| {
        log::debug!("delivered {}", source.handle());
        if tx.send(result).is_err() {
            log::debug!("result for {} dropped: receiver gone", source.handle());
        }
    }
}

/// Drive one decode through the picker and wait for its delivery.
fn run<A: OutputAdapter>(args: &Args, config: PickerConfig, adapter: A) -> Result<A::Output> {
    let target = if args.exact {
        TargetSpec::exact(args.width, args.height)
    } else {
        TargetSpec::contain(args.width, args.height)
    };
    let origin = if args.gallery {
        Origin::Gallery
    } else {
        Origin::Camera
    };
    let handle = args.input.to_string_lossy().into_owned();

    let provider = IndexedFiles {
        files: FileProvider::new(),
        orientation: args.orientation,
    };

    let (tx, rx) = mpsc::channel::<Result<A::Output, DecodeError>>();
    let picker = ImagePicker::with_config(
        Arc::new(provider),
        target,
        adapter,
        channel_delivery(tx),
        config,
    );

    let quarter_turns = (args.rotate % 4) as i32;
    if quarter_turns == 0 {
        picker.pick(ImageSource::new(handle, origin))?;
    } else {
        picker.restore(PickerState {
            source: Some(handle),
            rotation: quarter_turns * 90,
            origin,
        });
        picker.refresh()?;
    }

    let result = rx
        .recv()
        .context("Decode worker exited without delivering a result")?;
    result.with_context(|| format!("Failed to decode {}", args.input.display()))
}
