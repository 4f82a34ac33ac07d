//! Fitting generated artwork into a placeholder's device-space corners

use super::config::Corners;
use crate::error::{PdfError, Result};
use crate::geometry::{Point, TransformationMatrix};

/// Matrix mapping the unit square onto the placeholder `corners`, keeping the
/// aspect ratio `width : height` and centering the slack.
///
/// The placeholder is normalized first: moved so its lower-left corner is the
/// origin, rotated until the bottom edge is horizontal and sheared until the
/// left edge is vertical. The target is scaled uniformly into the resulting
/// box and the normalization is undone.
pub fn perspective_fit_transform(
    corners: &Corners,
    width: f64,
    height: f64,
) -> Result<TransformationMatrix> {
    if width <= 0.0 || height <= 0.0 {
        return Err(PdfError::InvalidImage(format!(
            "cannot fit a {width}x{height} image"
        )));
    }
    let origin: Point = corners.lower_left.into();
    let bottom = Point::from(corners.lower_right) - origin;
    let left = Point::from(corners.upper_left) - origin;

    let angle = bottom.y.atan2(bottom.x);
    let rotate = TransformationMatrix::rotation(-angle);
    let left = rotate.apply_vector(left);
    if left.y.abs() < f64::EPSILON || bottom.length() < f64::EPSILON {
        return Err(PdfError::InvalidStructure(
            "placeholder corners are degenerate".to_string(),
        ));
    }

    let normalize = TransformationMatrix::translation(-origin.x, -origin.y)
        .multiply(&rotate)
        .multiply(&TransformationMatrix::shear_x(-left.x / left.y));
    let denormalize = normalize.invert().ok_or_else(|| {
        PdfError::InvalidStructure("placeholder corners are degenerate".to_string())
    })?;

    let box_width = bottom.length();
    let box_height = left.y;
    let scale = (box_width / width).min(box_height / height);
    let fitted_width = width * scale;
    let fitted_height = height * scale;

    Ok(TransformationMatrix::scaling(fitted_width, fitted_height)
        .multiply(&TransformationMatrix::translation(
            (box_width - fitted_width) / 2.0,
            (box_height - fitted_height) / 2.0,
        ))
        .multiply(&denormalize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::config::Position;
    use proptest::prelude::*;

    #[test]
    fn test_axis_aligned_square() {
        let corners = Corners::from_rect(0.0, 0.0, 10.0, 10.0);
        let m = perspective_fit_transform(&corners, 1.0, 1.0).unwrap();
        assert!(m.apply(Point::new(0.0, 0.0)).approx_eq(&Point::new(0.0, 0.0), 1e-12));
        assert!(m.apply(Point::new(1.0, 1.0)).approx_eq(&Point::new(10.0, 10.0), 1e-12));
        assert!(m.approx_eq(&TransformationMatrix::scaling(10.0, 10.0), 1e-12));
    }

    #[test]
    fn test_slack_is_centered() {
        let corners = Corners::from_rect(100.0, 50.0, 40.0, 20.0);
        let m = perspective_fit_transform(&corners, 1.0, 1.0).unwrap();
        assert!(m.apply(Point::new(0.0, 0.0)).approx_eq(&Point::new(110.0, 50.0), 1e-9));
        assert!(m.apply(Point::new(1.0, 1.0)).approx_eq(&Point::new(130.0, 70.0), 1e-9));
    }

    #[test]
    fn test_rotated_placeholder() {
        // the 10x10 square turned by 90 degrees around the origin
        let corners = Corners {
            lower_left: Position { x: 0.0, y: 0.0 },
            lower_right: Position { x: 0.0, y: 10.0 },
            upper_left: Position { x: -10.0, y: 0.0 },
            upper_right: Position { x: -10.0, y: 10.0 },
        };
        let m = perspective_fit_transform(&corners, 1.0, 1.0).unwrap();
        assert!(m.apply(Point::new(1.0, 0.0)).approx_eq(&Point::new(0.0, 10.0), 1e-9));
        assert!(m.apply(Point::new(1.0, 1.0)).approx_eq(&Point::new(-10.0, 10.0), 1e-9));
    }

    #[test]
    fn test_sheared_placeholder_keeps_corners() {
        let corners = Corners {
            lower_left: Position { x: 0.0, y: 0.0 },
            lower_right: Position { x: 10.0, y: 0.0 },
            upper_left: Position { x: 5.0, y: 10.0 },
            upper_right: Position { x: 15.0, y: 10.0 },
        };
        let m = perspective_fit_transform(&corners, 1.0, 1.0).unwrap();
        assert!(m.apply(Point::new(0.0, 1.0)).approx_eq(&Point::new(5.0, 10.0), 1e-9));
        assert!(m.apply(Point::new(1.0, 1.0)).approx_eq(&Point::new(15.0, 10.0), 1e-9));
    }

    #[test]
    fn test_degenerate_corners() {
        let corners = Corners::from_rect(3.0, 3.0, 10.0, 0.0);
        assert!(perspective_fit_transform(&corners, 1.0, 1.0).is_err());
        let square = Corners::from_rect(0.0, 0.0, 10.0, 10.0);
        assert!(perspective_fit_transform(&square, 0.0, 1.0).is_err());
    }

    proptest! {
        #[test]
        fn fitted_image_stays_inside_box(
            x in -500.0f64..500.0,
            y in -500.0f64..500.0,
            w in 1.0f64..300.0,
            h in 1.0f64..300.0,
            aspect in 0.2f64..5.0,
        ) {
            let corners = Corners::from_rect(x, y, w, h);
            let m = perspective_fit_transform(&corners, aspect, 1.0).unwrap();
            for corner in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
                let p = m.apply(Point::new(corner.0, corner.1));
                prop_assert!(p.x >= x - 1e-6 && p.x <= x + w + 1e-6);
                prop_assert!(p.y >= y - 1e-6 && p.y <= y + h + 1e-6);
            }
            let inverse = m.invert().unwrap();
            prop_assert!(m.multiply(&inverse).approx_eq(&TransformationMatrix::identity(), 1e-6));
        }
    }
}
