use std::{path::Path, time::Instant};

use rapidocr_layer::{initialize, NativeBackend, OcrOptions, PaddleOcrEngine};

const MODEL_DIR: &str = "tests/data/models";
const TEST_IMAGE: &str = "tests/data/test_image.png";

// Needs ONNX Runtime and the models under tests/data/models, which are not
// checked in. Run with `--ignored` once they are in place.
#[test]
#[ignore]
fn recognizes_test_image() {
    let _ = env_logger::builder().is_test(true).try_init();

    let backend = NativeBackend::builder()
        .model_dir(MODEL_DIR)
        .max_side_len(2048)
        .build();
    initialize(&backend).expect("Models are missing");
    let mut engine = PaddleOcrEngine::new(backend);
    let options = OcrOptions {
        languages: vec!["chi_sim".to_string()],
        jobs: 1,
    };

    let start = Instant::now();
    let (page, text) = engine
        .generate_ocr(Path::new(TEST_IMAGE), &options, 0)
        .expect("Failed recognition.");
    log::debug!("{:?}", start.elapsed());

    assert!(page.children.len() > 1);
    assert!(text
        .lines()
        .any(|line| line == "不行，头好痛-接下来要处理的事情太多了，现在必须好好休息·！"));
    for word in page.words() {
        assert!(word.bbox.right <= page.bbox.right && word.bbox.bottom <= page.bbox.bottom);
        assert!((0.0..=1.0).contains(&word.confidence.unwrap_or_default()));
    }

    let skew = engine
        .get_deskew(Path::new(TEST_IMAGE), &options)
        .expect("Failed skew detection");
    assert!(skew.abs() < 5.0);
}
