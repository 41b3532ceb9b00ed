use std::{path::PathBuf, time::Instant};

use clap::Parser;
use rapidocr_layer::{check_options, initialize, NativeBackend, OcrOptions, PaddleOcrEngine};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Recognize one page image and print its text layer.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Page image to recognize.
    image: PathBuf,
    /// Tesseract language code, the first one selects the model.
    #[arg(short, long = "lang", default_value = "eng")]
    languages: Vec<String>,
    /// Directory holding the ONNX models.
    #[arg(short, long, default_value = "models")]
    models: PathBuf,
    /// Zero-based page index recorded on the page node.
    #[arg(short, long, default_value_t = 0)]
    page: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let backend = NativeBackend::builder().model_dir(&args.models).build();
    if let Err(err) = initialize(&backend) {
        eprintln!("{err}");
        std::process::exit(2);
    }

    let mut options = OcrOptions {
        languages: args.languages,
        jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
    };
    check_options(&mut options);

    let mut engine = PaddleOcrEngine::new(backend);
    log::info!("Using {engine}");

    let orientation = engine
        .get_orientation(&args.image)
        .expect("Failed orientation detection");
    let skew = engine
        .get_deskew(&args.image, &options)
        .expect("Failed skew detection");
    println!(
        "orientation: {}° (confidence {:.1}), skew: {skew:.2}°",
        orientation.angle.degrees(),
        orientation.confidence
    );

    let start = Instant::now();
    let (page, text) = engine
        .generate_ocr(&args.image, &options, args.page)
        .expect("Failed recognition.");
    log::debug!("{:?}", start.elapsed());
    log::debug!("{page:#?}");

    println!("{text}");
}
