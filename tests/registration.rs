mod common;

use common::{crop, lot_scene, mean_abs_diff};
use parkalign::{
    Aligner, CorrespondenceMatcher, FailureKind, FeatureExtractor, Homography, HomographyEstimator,
    Image, PipelineConfig, Point,
};

const SCENE_W: usize = 320;
const SCENE_H: usize = 240;

#[test]
fn self_alignment_is_identity() {
    let master = lot_scene(SCENE_W, SCENE_H, 11);
    let alignment = Aligner::default().align(&master, &master).unwrap();

    let diff = alignment.homography().max_abs_diff(&Homography::identity());
    assert!(diff < 1e-6, "max coefficient deviation {diff}");
    assert!(alignment.diagnostics.good_matches >= 10);
    assert_eq!(alignment.estimate.inlier_ratio(), 1.0);
    let err = mean_abs_diff(&alignment.aligned, &master, 1, 1, SCENE_W - 1, SCENE_H - 1);
    assert!(err < 0.01, "mean abs diff {err}");
}

#[test]
fn recovers_known_translation() {
    let scene = lot_scene(SCENE_W + 16, SCENE_H + 16, 23);
    let (dx, dy) = (8usize, 12usize);
    let master = crop(&scene, 0, 0, SCENE_W, SCENE_H);
    let live = crop(&scene, dx, dy, SCENE_W, SCENE_H);

    let alignment = Aligner::default().align(&master, &live).unwrap();
    let h = alignment.homography();
    for p in [
        Point::new(40.0, 40.0),
        Point::new(160.0, 120.0),
        Point::new(280.0, 200.0),
    ] {
        let q = h.apply(p).unwrap();
        let expected = Point::new(p.x + dx as f64, p.y + dy as f64);
        assert!(q.distance(expected) < 1.0, "{p:?} -> {q:?}, expected {expected:?}");
    }

    // Inside the overlap the aligned image reproduces the master.
    let err = mean_abs_diff(&alignment.aligned, &master, dx + 2, dy + 2, SCENE_W - 2, SCENE_H - 2);
    assert!(err < 4.0, "mean abs diff {err}");
    // Pixels with no live counterpart are background.
    assert_eq!(alignment.aligned.pixel(1, 1), Some(&[0u8][..]));
}

#[test]
fn alignment_is_deterministic() {
    let scene = lot_scene(SCENE_W + 8, SCENE_H + 8, 5);
    let master = crop(&scene, 0, 0, SCENE_W, SCENE_H);
    let live = crop(&scene, 4, 6, SCENE_W, SCENE_H);

    let aligner = Aligner::default();
    let first = aligner.align(&master, &live).unwrap();
    let second = aligner.align(&master, &live).unwrap();
    assert_eq!(first.estimate, second.estimate);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.homography().to_rows(), second.homography().to_rows());
}

#[test]
fn stages_compose_without_the_aligner() {
    let master = lot_scene(SCENE_W, SCENE_H, 3);
    let extractor = FeatureExtractor::default();
    let kp_master = extractor.extract(&master);
    let kp_live = extractor.extract(&master);
    assert_eq!(kp_master.keypoints(), kp_live.keypoints());

    let matches = CorrespondenceMatcher::default().match_keypoints(&kp_master, &kp_live);
    assert!(matches.windows(2).all(|w| w[0].live_index < w[1].live_index));
    let estimate = HomographyEstimator::default().estimate(&matches).unwrap();
    assert_eq!(estimate.inliers, matches.len());
}

#[test]
fn featureless_image_reports_insufficient_features() {
    let master = lot_scene(SCENE_W, SCENE_H, 9);
    let flat = Image::filled(SCENE_W, SCENE_H, 1, 128).unwrap();
    let failure = Aligner::default().align(&master, &flat).unwrap_err();
    assert_eq!(failure.kind, FailureKind::InsufficientFeatures);
    assert_eq!(failure.diagnostics.keypoints_live, 0);
    assert!(failure.diagnostics.keypoints_master > 0);
    assert_eq!(failure.diagnostics.good_matches, 0);
}

#[test]
fn sparse_image_reports_insufficient_matches() {
    let master = lot_scene(SCENE_W, SCENE_H, 9);
    let mut data = vec![30u8; 64 * 64];
    for y in 20..44 {
        for x in 20..44 {
            data[y * 64 + x] = 220;
        }
    }
    let live = Image::gray(data, 64, 64).unwrap();

    let failure = Aligner::default().align(&master, &live).unwrap_err();
    assert_eq!(failure.kind, FailureKind::InsufficientMatches);
    assert!(failure.diagnostics.keypoints_live > 0);
    assert!(failure.diagnostics.good_matches < 10);
    assert_eq!(failure.diagnostics.inliers, 0);
}

#[test]
fn color_images_align_like_their_luma() {
    let gray = lot_scene(SCENE_W, SCENE_H, 17);
    let rgb = gray.to_rgb();
    let config = PipelineConfig::default();
    let aligner = Aligner::new(&config).unwrap();
    let a = aligner.align(&gray, &gray).unwrap();
    let b = aligner.align(&rgb, &rgb).unwrap();
    assert_eq!(a.estimate, b.estimate);
    assert_eq!(b.aligned.channels(), 3);
}
