use criterion::{criterion_group, criterion_main, Criterion};
use parkalign::{
    evaluate, warp_perspective, Aligner, CorrespondenceMatcher, Detection, FeatureExtractor,
    Homography, HomographyEstimator, Image, ParkingSpot, Point,
};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Image {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let block = ((x / 17) * 31 + (y / 13) * 57) & 0xFF;
            let value = block ^ (((x * 13) ^ (y * 7)) & 0x1F);
            data.push(value as u8);
        }
    }
    Image::gray(data, width, height).unwrap()
}

fn crop(image: &Image, x0: usize, y0: usize, width: usize, height: usize) -> Image {
    let mut data = Vec::with_capacity(width * height);
    for y in y0..y0 + height {
        let start = y * image.width() + x0;
        data.extend_from_slice(&image.data()[start..start + width]);
    }
    Image::gray(data, width, height).unwrap()
}

fn bench_registration(c: &mut Criterion) {
    let scene = make_image(656, 496);
    let master = crop(&scene, 0, 0, 640, 480);
    let live = crop(&scene, 10, 6, 640, 480);

    let extractor = FeatureExtractor::default();
    c.bench_function("extract_features_640x480", |b| {
        b.iter(|| black_box(extractor.extract(&master)));
    });

    let kp_master = extractor.extract(&master);
    let kp_live = extractor.extract(&live);
    let matcher = CorrespondenceMatcher::default();
    c.bench_function("match_correspondences", |b| {
        b.iter(|| black_box(matcher.match_keypoints(&kp_master, &kp_live)));
    });

    let matches = matcher.match_keypoints(&kp_master, &kp_live);
    let estimator = HomographyEstimator::default();
    c.bench_function("estimate_homography", |b| {
        b.iter(|| black_box(estimator.estimate(&matches)));
    });

    let h = Homography::from_rows([[1.0, 0.02, 10.0], [-0.01, 1.0, 6.0], [0.0, 0.0, 1.0]]).unwrap();
    c.bench_function("warp_perspective_640x480", |b| {
        b.iter(|| black_box(warp_perspective(&live, &h, 640, 480).unwrap()));
    });

    let aligner = Aligner::default();
    c.bench_function("align_640x480", |b| {
        b.iter(|| black_box(aligner.align(&master, &live)));
    });
}

fn bench_occupancy(c: &mut Criterion) {
    let spots: Vec<ParkingSpot> = (0..200)
        .map(|i| {
            let x = (i % 20) as f64 * 30.0;
            let y = (i / 20) as f64 * 50.0;
            ParkingSpot::new(
                format!("S{i}"),
                vec![
                    Point::new(x, y),
                    Point::new(x + 28.0, y),
                    Point::new(x + 28.0, y + 48.0),
                    Point::new(x, y + 48.0),
                ],
            )
            .unwrap()
        })
        .collect();
    let detections: Vec<Detection> = (0..120)
        .map(|i| {
            let x = (i * 37 % 600) as f64;
            let y = (i * 53 % 500) as f64;
            Detection::new(x, y, x + 20.0, y + 40.0, 0.5).unwrap()
        })
        .collect();

    c.bench_function("evaluate_occupancy_200_spots", |b| {
        b.iter(|| black_box(evaluate(&detections, &spots)));
    });
}

criterion_group!(benches, bench_registration, bench_occupancy);
criterion_main!(benches);
