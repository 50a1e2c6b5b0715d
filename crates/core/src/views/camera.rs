use thorn_insight_protocol::{Point, Rect, Viewport};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Pan/zoom state for the graph canvas. Screen = world * scale + translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub scale: f64,
    pub translate: Point,
    drag_origin: Option<Point>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Point::new(0.0, 0.0),
            drag_origin: None,
        }
    }
}

impl Camera {
    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - ZOOM_STEP);
    }

    fn set_scale(&mut self, scale: f64) {
        // Drop float drift only; a fitted scale keeps its fraction.
        self.scale = ((scale * 1e9).round() / 1e9).clamp(MIN_SCALE, MAX_SCALE);
    }

    /// Scale and center `bounds` inside `viewport`. Empty bounds reset.
    pub fn fit(&mut self, bounds: Rect, viewport: Viewport) {
        if bounds.w <= 0.0 || bounds.h <= 0.0 || viewport.width <= 0.0 || viewport.height <= 0.0
        {
            *self = Self::default();
            return;
        }
        let scale = (viewport.width / bounds.w)
            .min(viewport.height / bounds.h)
            .clamp(MIN_SCALE, MAX_SCALE);
        self.scale = scale;
        self.translate = Point::new(
            viewport.x + (viewport.width - bounds.w * scale) / 2.0 - bounds.x * scale,
            viewport.y + (viewport.height - bounds.h * scale) / 2.0 - bounds.y * scale,
        );
        self.drag_origin = None;
    }

    pub fn begin_drag(&mut self, screen: Point) {
        self.drag_origin = Some(Point::new(
            screen.x - self.translate.x,
            screen.y - self.translate.y,
        ));
    }

    /// Returns whether the camera moved.
    pub fn drag_to(&mut self, screen: Point) -> bool {
        match self.drag_origin {
            Some(origin) => {
                self.translate = Point::new(screen.x - origin.x, screen.y - origin.y);
                true
            }
            None => false,
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    pub fn to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.translate.x) / self.scale,
            (screen.y - self.translate.y) / self.scale,
        )
    }

    pub fn to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.scale + self.translate.x,
            world.y * self.scale + self.translate.y,
        )
    }
}
