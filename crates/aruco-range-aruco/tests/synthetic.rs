use approx::assert_abs_diff_eq;
use aruco_range_aruco::{
    builtins, ArucoDetector, CornerRefinement, DetectorParams, Dictionary, QuadParams,
};
use aruco_range_core::{estimate, CameraModel, GrayImage};
use nalgebra::Point2;

/// Paint marker `id` with a one-cell black border, top-left at (`x0`, `y0`).
fn paint_marker(img: &mut GrayImage, id: u32, x0: usize, y0: usize, cell_px: usize) {
    paint_dict_marker(img, builtins::DICT_4X4_50, id, x0, y0, cell_px);
}

fn paint_dict_marker(
    img: &mut GrayImage,
    dict: Dictionary,
    id: u32,
    x0: usize,
    y0: usize,
    cell_px: usize,
) {
    let code = dict.code(id).expect("id in dictionary");
    let cells = dict.marker_size + 2;
    for cy in 0..cells {
        for cx in 0..cells {
            let border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            let white = !border && dict.bit(code, cx - 1, cy - 1);
            let v = if white { 250 } else { 10 };
            for yy in 0..cell_px {
                for xx in 0..cell_px {
                    img.set(x0 + cx * cell_px + xx, y0 + cy * cell_px + yy, v);
                }
            }
        }
    }
}

/// Rotate the frame 90 degrees clockwise.
fn rotate_cw(img: &GrayImage) -> GrayImage {
    let mut out = GrayImage::filled(img.height, img.width, 0);
    for y in 0..out.height {
        for x in 0..out.width {
            let v = img.data[(img.height - 1 - x) * img.width + y];
            out.set(x, y, v);
        }
    }
    out
}

fn assert_corner(actual: Point2<f32>, expected: (f32, f32)) {
    assert_abs_diff_eq!(actual.x, expected.0, epsilon = 1.0);
    assert_abs_diff_eq!(actual.y, expected.1, epsilon = 1.0);
}

#[test]
fn detects_single_upright_marker() {
    let mut img = GrayImage::filled(200, 160, 245);
    paint_marker(&mut img, 7, 50, 40, 12);

    let detector = ArucoDetector::new(builtins::DICT_4X4_50, DetectorParams::default());
    let dets = detector.detect(&img.view());
    assert_eq!(dets.len(), 1, "detections: {dets:?}");

    let d = &dets[0];
    assert_eq!(d.id, 7);
    assert_eq!(d.rotation, 0);
    assert_eq!(d.hamming, 0);
    assert_corner(d.corners[0], (49.5, 39.5));
    assert_corner(d.corners[1], (121.5, 39.5));
    assert_corner(d.corners[2], (121.5, 111.5));
    assert_corner(d.corners[3], (49.5, 111.5));
}

#[test]
fn rotated_marker_reports_its_own_top_left_first() {
    let mut img = GrayImage::filled(200, 160, 245);
    paint_marker(&mut img, 7, 50, 40, 12);
    let rotated = rotate_cw(&img);

    let detector = ArucoDetector::new(builtins::DICT_4X4_50, DetectorParams::default());
    let dets = detector.detect(&rotated.view());
    assert_eq!(dets.len(), 1);

    let d = &dets[0];
    assert_eq!(d.id, 7);
    // The top-left corner (49.5, 39.5) moves to (160 - 39.5, 49.5).
    assert_corner(d.corners[0], (120.5, 49.5));
    assert_corner(d.corners[1], (120.5, 121.5));
    assert_corner(d.corners[2], (48.5, 121.5));
    assert_corner(d.corners[3], (48.5, 49.5));
}

#[test]
fn detects_several_markers_in_id_order() {
    let mut img = GrayImage::filled(320, 160, 245);
    paint_marker(&mut img, 11, 30, 40, 10);
    paint_marker(&mut img, 3, 200, 50, 10);

    let detector = ArucoDetector::new(builtins::DICT_4X4_50, DetectorParams::default());
    let ids: Vec<u32> = detector.detect(&img.view()).iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![3, 11]);
}

#[test]
fn unrefined_corners_still_decode() {
    let mut img = GrayImage::filled(200, 160, 245);
    paint_marker(&mut img, 21, 50, 40, 12);

    let params = DetectorParams {
        quad: QuadParams {
            refinement: CornerRefinement::None,
            ..QuadParams::default()
        },
        ..DetectorParams::default()
    };
    let detector = ArucoDetector::new(builtins::DICT_4X4_50, params);
    let dets = detector.detect(&img.view());
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].id, 21);
}

#[test]
fn detection_feeds_geometry_estimate() {
    let mut img = GrayImage::filled(200, 160, 245);
    paint_marker(&mut img, 7, 50, 40, 12);

    let detector = ArucoDetector::new(builtins::DICT_4X4_50, DetectorParams::default());
    let obs = detector.observe(&img.view());
    assert_eq!(obs.len(), 1);

    let camera = CameraModel::default();
    let res = estimate(&obs[0], &camera, Point2::new(100, 80));
    assert_abs_diff_eq!(res.avg_side_px, 72.0, epsilon = 1.0);
    assert!((res.center.x - 86).abs() <= 1, "center {:?}", res.center);
    assert!((res.center.y - 76).abs() <= 1, "center {:?}", res.center);
    assert_eq!(res.offset.x, 100 - res.center.x);
    assert_eq!(res.offset.y, 80 - res.center.y);
    let distance = res.distance.expect("distance");
    assert_abs_diff_eq!(distance, 5.0 * 700.0 / 72.0, epsilon = 0.5);
}

#[test]
fn larger_dictionary_reaches_high_ids() {
    let mut img = GrayImage::filled(200, 160, 245);
    paint_dict_marker(&mut img, builtins::DICT_4X4_100, 87, 50, 40, 12);

    let detector = ArucoDetector::new(builtins::DICT_4X4_100, DetectorParams::default());
    let dets = detector.detect(&img.view());
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].id, 87);
}
