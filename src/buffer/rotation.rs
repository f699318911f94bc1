//! Logical-to-physical coordinate transform for the four supported
//! orientations.

/// One of the four orientations a `PixelBuffer` can present to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Parse a degree value; only the four right angles are valid.
    pub fn from_degrees(deg: u16) -> Option<Self> {
        match deg {
            0 => Some(Rotation::Rotate0),
            90 => Some(Rotation::Rotate90),
            180 => Some(Rotation::Rotate180),
            270 => Some(Rotation::Rotate270),
            _ => None,
        }
    }

    /// `(swap_xy, flip_x, flip_y)`, cached once per rotation change rather
    /// than recomputed per pixel.
    pub const fn props(self) -> RotationProps {
        match self {
            Rotation::Rotate0 => RotationProps { swap_xy: false, flip_x: false, flip_y: false },
            Rotation::Rotate90 => RotationProps { swap_xy: true, flip_x: true, flip_y: false },
            Rotation::Rotate180 => RotationProps { swap_xy: false, flip_x: true, flip_y: true },
            Rotation::Rotate270 => RotationProps { swap_xy: true, flip_x: false, flip_y: true },
        }
    }

    /// Logical width given physical dimensions: swapped axes for 90/270.
    pub const fn logical_w(self, phys_w: usize, phys_h: usize) -> usize {
        if self.props().swap_xy {
            phys_h
        } else {
            phys_w
        }
    }

    /// Logical height given physical dimensions.
    pub const fn logical_h(self, phys_w: usize, phys_h: usize) -> usize {
        if self.props().swap_xy {
            phys_w
        } else {
            phys_h
        }
    }
}

/// The cached boolean triple driving the coordinate transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationProps {
    pub swap_xy: bool,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl RotationProps {
    /// Map a logical point to its physical location.
    pub const fn transform_point(
        self,
        x: usize,
        y: usize,
        phys_w: usize,
        phys_h: usize,
    ) -> (usize, usize) {
        let (mut x, mut y) = (x, y);
        if self.swap_xy {
            let tmp = x;
            x = y;
            y = tmp;
        }
        let px = if self.flip_x { phys_w - 1 - x } else { x };
        let py = if self.flip_y { phys_h - 1 - y } else { y };
        (px, py)
    }

    /// Map a logical rectangle to its physical bounding rectangle. Flips
    /// subtract extents (`w`/`h`), not `1`, since a rectangle's far edge
    /// is `origin + extent`, not `origin + 1`.
    pub const fn transform_rect(
        self,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        phys_w: usize,
        phys_h: usize,
    ) -> (usize, usize, usize, usize) {
        let (mut x, mut y, mut w, mut h) = (x, y, w, h);
        if self.swap_xy {
            let (tx, tw) = (x, w);
            x = y;
            w = h;
            y = tx;
            h = tw;
        }
        let px = if self.flip_x { phys_w - w - x } else { x };
        let py = if self.flip_y { phys_h - h - y } else { y };
        (px, py, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHYS_W: usize = 128;
    const PHYS_H: usize = 296;

    #[test]
    fn rotate0_is_identity() {
        let p = Rotation::Rotate0.props();
        assert_eq!(p.transform_point(10, 20, PHYS_W, PHYS_H), (10, 20));
    }

    #[test]
    fn rotate90_swaps_and_flips_x() {
        let p = Rotation::Rotate90.props();
        assert_eq!(p.transform_point(0, 0, PHYS_W, PHYS_H), (PHYS_W - 1, 0));
    }

    #[test]
    fn all_rotations_round_trip_in_bounds_points() {
        for rot in [
            Rotation::Rotate0,
            Rotation::Rotate90,
            Rotation::Rotate180,
            Rotation::Rotate270,
        ] {
            let p = rot.props();
            let lw = rot.logical_w(PHYS_W, PHYS_H);
            let lh = rot.logical_h(PHYS_W, PHYS_H);
            for &(x, y) in &[(0, 0), (lw - 1, 0), (0, lh - 1), (lw / 2, lh / 3)] {
                let (px, py) = p.transform_point(x, y, PHYS_W, PHYS_H);
                assert!(px < PHYS_W && py < PHYS_H);
            }
        }
    }

    #[test]
    fn rotate180_transform_rect_matches_point_transform_of_far_corner() {
        let p = Rotation::Rotate180.props();
        let (px, py, pw, ph) = p.transform_rect(0, 0, 32, 32, PHYS_W, PHYS_H);
        assert_eq!((pw, ph), (32, 32));
        assert_eq!(px, PHYS_W - 32);
        assert_eq!(py, PHYS_H - 32);
    }
}
