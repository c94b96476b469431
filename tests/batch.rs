use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use png_stego::batch::{jobs_from_dir, BatchRunner};
use png_stego::common::config::BatchConfig;
use png_stego::processing::carrier;
use png_stego::{extract, Codec};

fn write_cover(path: &std::path::Path, width: u32, height: u32) {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7) as u8, (y * 5) as u8, (x * y) as u8])
    }));
    carrier::save_png_file(&img, path).unwrap();
}

#[tokio::test]
async fn batch_embeds_every_png() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for i in 0..5 {
        write_cover(&input.path().join(format!("cover_{i}.png")), 16 + i, 16);
    }

    let jobs = jobs_from_dir(input.path(), output.path()).unwrap();
    assert_eq!(jobs.len(), 5);

    let runner = BatchRunner::new(
        Codec::default(),
        &BatchConfig {
            workers: 2,
            max_queue_size: 10,
        },
    );
    let report = runner.run(jobs.clone(), "hunter2", "batch payload").await.unwrap();

    let stats = report.aggregate();
    assert_eq!(stats.total_jobs, 5);
    assert_eq!(stats.successful_jobs, 5);
    assert_eq!(stats.failed_jobs, 0);

    // Report keeps submission order
    for (record, job) in report.jobs().iter().zip(&jobs) {
        assert_eq!(record.input, job.input.display().to_string());
    }

    for job in &jobs {
        let stego = carrier::load_png_file(&job.output).unwrap();
        assert_eq!(extract(&stego, "hunter2").unwrap(), "batch payload");
    }
}

#[tokio::test]
async fn batch_records_failures_without_aborting() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write_cover(&input.path().join("big.png"), 32, 32);
    // 50 positions cannot hold the 96-bit frame overhead
    let tiny = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 5, Luma([0])));
    carrier::save_png_file(&tiny, input.path().join("tiny.png")).unwrap();
    std::fs::write(input.path().join("fake.png"), b"not really a png").unwrap();

    let jobs = jobs_from_dir(input.path(), output.path()).unwrap();
    let runner = BatchRunner::new(Codec::default(), &BatchConfig::default());
    let report = runner.run(jobs, "k", "hello").await.unwrap();

    let stats = report.aggregate();
    assert_eq!(stats.total_jobs, 3);
    assert_eq!(stats.successful_jobs, 1);
    assert_eq!(stats.failure_kinds.get("insufficient_capacity"), Some(&1));
    assert_eq!(stats.failure_kinds.get("unsupported_format"), Some(&1));
    assert!(output.path().join("stego_big.png").exists());
    assert!(!output.path().join("stego_tiny.png").exists());

    let report_path = output.path().join("report.json");
    report.export_to_json(&report_path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(value["aggregated_stats"]["failed_jobs"], 2);
}
