// Topology viewport
//
// Maps between layout world coordinates and terminal cells. World y grows
// downward like a screen; the ratatui canvas grows upward, so canvas y is
// the negated world y.

use super::config::{MAX_ZOOM, MIN_ZOOM, PAN_STEP, PICK_RADIUS, ZOOM_STEP};
use ratatui::layout::Rect;

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    world_width: f64,
    world_height: f64,
    pub zoom: f64,
    /// Offset of the view center from the world center, in world units
    pub pan_x: f64,
    pub pan_y: f64,
    /// Inner canvas area from the last frame
    area: Rect,
}

impl Viewport {
    pub fn new(world_width: f64, world_height: f64) -> Self {
        Self {
            world_width,
            world_height,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            area: Rect::default(),
        }
    }

    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    #[cfg(test)]
    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Pan by whole steps; a step covers less world the further you zoom in
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.pan_x += dx as f64 * PAN_STEP / self.zoom;
        self.pan_y += dy as f64 * PAN_STEP / self.zoom;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Node pick radius in world units at the current zoom
    pub fn pick_radius(&self) -> f64 {
        PICK_RADIUS / self.zoom
    }

    fn center(&self) -> (f64, f64) {
        (
            self.world_width / 2.0 + self.pan_x,
            self.world_height / 2.0 + self.pan_y,
        )
    }

    /// Half extents of the visible world, preserving aspect ratio
    fn half_extents(&self) -> (f64, f64) {
        let cols = self.area.width as f64;
        let rows = self.area.height as f64 * CELL_ASPECT;
        if cols <= 0.0 || rows <= 0.0 {
            return (
                self.world_width / (2.0 * self.zoom),
                self.world_height / (2.0 * self.zoom),
            );
        }
        let scale = (cols / self.world_width).min(rows / self.world_height) * self.zoom;
        (cols / (2.0 * scale), rows / (2.0 * scale))
    }

    /// Canvas x bounds in world units
    pub fn x_bounds(&self) -> [f64; 2] {
        let (cx, _) = self.center();
        let (hw, _) = self.half_extents();
        [cx - hw, cx + hw]
    }

    /// Canvas y bounds (negated world y)
    pub fn y_bounds(&self) -> [f64; 2] {
        let (_, cy) = self.center();
        let (_, hh) = self.half_extents();
        [-(cy + hh), -(cy - hh)]
    }

    /// World point to canvas point
    pub fn to_canvas(x: f64, y: f64) -> (f64, f64) {
        (x, -y)
    }

    /// Terminal cell to world point, if the cell lies on the canvas
    pub fn screen_to_world(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let area = self.area;
        if area.width == 0
            || area.height == 0
            || column < area.x
            || row < area.y
            || column >= area.x + area.width
            || row >= area.y + area.height
        {
            return None;
        }
        let fx = (column - area.x) as f64 + 0.5;
        let fy = (row - area.y) as f64 + 0.5;
        let (cx, cy) = self.center();
        let (hw, hh) = self.half_extents();
        let x = cx - hw + fx / area.width as f64 * 2.0 * hw;
        let y = cy - hh + fy / area.height as f64 * 2.0 * hh;
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.set_area(Rect::new(10, 5, 80, 30));
        vp
    }

    #[test]
    fn test_center_cell_maps_to_world_center() {
        let vp = viewport();
        let (x, y) = vp.screen_to_world(50, 20).unwrap();
        assert!((x - 400.0).abs() < 10.0, "x = {}", x);
        assert!((y - 300.0).abs() < 20.0, "y = {}", y);
    }

    #[test]
    fn test_outside_canvas_is_none() {
        let vp = viewport();
        assert!(vp.screen_to_world(9, 20).is_none());
        assert!(vp.screen_to_world(50, 35).is_none());
        assert!(Viewport::new(800.0, 600.0).screen_to_world(0, 0).is_none());
    }

    #[test]
    fn test_top_rows_are_smaller_world_y() {
        let vp = viewport();
        let (_, top) = vp.screen_to_world(50, 5).unwrap();
        let (_, bottom) = vp.screen_to_world(50, 34).unwrap();
        assert!(top < bottom);
    }

    #[test]
    fn test_world_fits_inside_bounds() {
        let vp = viewport();
        let [x0, x1] = vp.x_bounds();
        let [y0, y1] = vp.y_bounds();
        let eps = 1e-6;
        assert!(x0 <= eps && x1 >= 800.0 - eps);
        assert!(y0 <= -600.0 + eps && y1 >= -eps);
    }

    #[test]
    fn test_zoom_is_clamped_and_narrows_view() {
        let mut vp = viewport();
        let wide = vp.x_bounds();
        vp.zoom_in();
        let narrow = vp.x_bounds();
        assert!(narrow[1] - narrow[0] < wide[1] - wide[0]);

        for _ in 0..50 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..100 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_pan_and_reset() {
        let mut vp = viewport();
        vp.pan(1, -1);
        assert_eq!((vp.pan_x, vp.pan_y), (PAN_STEP, -PAN_STEP));
        vp.zoom_in();
        vp.reset();
        assert_eq!((vp.zoom, vp.pan_x, vp.pan_y), (1.0, 0.0, 0.0));
    }

    #[test]
    fn test_pick_radius_shrinks_with_zoom() {
        let mut vp = viewport();
        let base = vp.pick_radius();
        vp.zoom_in();
        assert!(vp.pick_radius() < base);
    }
}
