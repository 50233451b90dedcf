//! Debug overlay: spot outlines colored by occupancy plus detection boxes.

use crate::geometry::Point;
use crate::image::Image;
use crate::occupancy::{Detection, OccupancyReport, ParkingSpot};

pub const OCCUPIED_COLOR: [u8; 3] = [255, 0, 0];
pub const FREE_COLOR: [u8; 3] = [0, 255, 0];
pub const DETECTION_COLOR: [u8; 3] = [0, 0, 255];

/// Stroke width in pixels.
const THICKNESS: i64 = 2;

struct Canvas<'a> {
    data: &'a mut [u8],
    width: i64,
    height: i64,
}

impl Canvas<'_> {
    fn put(&mut self, x: i64, y: i64, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data[idx..idx + 3].copy_from_slice(&color);
    }

    fn dot(&mut self, x: i64, y: i64, color: [u8; 3]) {
        for dy in 0..THICKNESS {
            for dx in 0..THICKNESS {
                self.put(x + dx, y + dy, color);
            }
        }
    }

    /// Bresenham line between integer endpoints.
    fn line(&mut self, (mut x0, mut y0): (i64, i64), (x1, y1): (i64, i64), color: [u8; 3]) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.dot(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn polygon(&mut self, points: &[Point], color: [u8; 3]) {
        let pixels: Vec<(i64, i64)> = points.iter().map(|p| to_pixel(*p)).collect();
        for (i, &a) in pixels.iter().enumerate() {
            let b = pixels[(i + 1) % pixels.len()];
            self.line(a, b, color);
        }
    }
}

/// Rounds and clamps to a range where Bresenham stays cheap; far-away points
/// are clipped pixel by pixel anyway.
fn to_pixel(p: Point) -> (i64, i64) {
    const LIMIT: f64 = 1e6;
    (
        p.x.round().clamp(-LIMIT, LIMIT) as i64,
        p.y.round().clamp(-LIMIT, LIMIT) as i64,
    )
}

/// Draws spot outlines (red occupied, green free) and detection boxes (blue)
/// onto an RGB copy of `image`.
pub fn render_overlay(
    image: &Image,
    spots: &[ParkingSpot],
    report: &OccupancyReport,
    detections: &[Detection],
) -> Image {
    let mut out = image.to_rgb();
    let (width, height) = (out.width() as i64, out.height() as i64);
    let mut canvas = Canvas {
        data: out.data_mut(),
        width,
        height,
    };

    for spot in spots {
        let occupied = report.get(spot.id()).is_some_and(|r| r.occupied);
        let color = if occupied { OCCUPIED_COLOR } else { FREE_COLOR };
        canvas.polygon(spot.polygon(), color);
    }

    for det in detections {
        let [x1, y1, x2, y2] = det.bounds();
        canvas.polygon(
            &[
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ],
            DETECTION_COLOR,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::evaluate;

    #[test]
    fn colors_follow_occupancy() {
        let image = Image::filled(60, 40, 1, 0).unwrap();
        let square = |id: &str, x0: f64| {
            ParkingSpot::new(
                id,
                vec![
                    Point::new(x0, 5.0),
                    Point::new(x0 + 20.0, 5.0),
                    Point::new(x0 + 20.0, 25.0),
                    Point::new(x0, 25.0),
                ],
            )
            .unwrap()
        };
        let spots = vec![square("A1", 5.0), square("A2", 35.0)];
        let dets = vec![Detection::new(10.0, 10.0, 20.0, 20.0, 0.8).unwrap()];
        let report = evaluate(&dets, &spots);

        let out = render_overlay(&image, &spots, &report, &dets);
        assert_eq!(out.channels(), 3);
        assert_eq!(out.pixel(5, 15), Some(&OCCUPIED_COLOR[..]));
        assert_eq!(out.pixel(35, 15), Some(&FREE_COLOR[..]));
        assert_eq!(out.pixel(15, 10), Some(&DETECTION_COLOR[..]));
        assert_eq!(out.pixel(15, 15), Some(&[0u8, 0, 0][..]));
    }

    #[test]
    fn shapes_outside_the_image_are_clipped() {
        let image = Image::filled(10, 10, 3, 50).unwrap();
        let dets = vec![Detection::new(-100.0, -100.0, 500.0, 500.0, 0.5).unwrap()];
        let out = render_overlay(&image, &[], &OccupancyReport::default(), &dets);
        assert_eq!(out, image);
    }
}
