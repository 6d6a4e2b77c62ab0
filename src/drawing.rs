//! Pointer-driven shape capture over a transparent page overlay.

use crate::anchor::{Point, Shape};
use crate::color::MarkColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTool {
    Rectangle,
    Circle,
    Arrow,
    Freehand,
}

/// In-progress drawing state for one pointer gesture.
///
/// `pointer_down` records the start point, `pointer_move` yields the shape
/// to preview, `pointer_up` commits it. Rectangle/circle/arrow derive from
/// start + current point; freehand accumulates every sampled point.
#[derive(Debug)]
pub struct DrawingSession {
    tool: DrawTool,
    start: Option<Point>,
    path: Vec<Point>,
}

impl DrawingSession {
    pub fn new(tool: DrawTool) -> Self {
        Self {
            tool,
            start: None,
            path: Vec::new(),
        }
    }

    pub fn tool(&self) -> DrawTool {
        self.tool
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    pub fn pointer_down(&mut self, point: Point) {
        self.start = Some(point);
        self.path.clear();
        if self.tool == DrawTool::Freehand {
            self.path.push(point);
        }
    }

    /// Shape to preview for the current pointer position, or `None` when
    /// no gesture is in progress.
    pub fn pointer_move(&mut self, point: Point) -> Option<Shape> {
        self.start?;
        if self.tool == DrawTool::Freehand {
            self.path.push(point);
        }
        self.shape_to(point)
    }

    /// Commit the gesture. Resets the session for the next stroke.
    pub fn pointer_up(&mut self, point: Point) -> Option<Shape> {
        if self.tool == DrawTool::Freehand && self.start.is_some() {
            self.path.push(point);
        }
        let shape = self.shape_to(point);
        self.start = None;
        self.path.clear();
        shape
    }

    /// Abandon the in-progress gesture (drawing mode exit mid-stroke).
    pub fn cancel(&mut self) {
        self.start = None;
        self.path.clear();
    }

    fn shape_to(&self, current: Point) -> Option<Shape> {
        let start = self.start?;
        let shape = match self.tool {
            DrawTool::Rectangle => Shape::Rectangle {
                x: start.x.min(current.x),
                y: start.y.min(current.y),
                width: (current.x - start.x).abs(),
                height: (current.y - start.y).abs(),
            },
            DrawTool::Circle => Shape::Circle {
                cx: start.x,
                cy: start.y,
                radius: start.distance_to(current),
            },
            DrawTool::Arrow => Shape::Arrow {
                from: start,
                to: current,
            },
            DrawTool::Freehand => Shape::Freehand {
                points: self.path.clone(),
            },
        };
        Some(shape)
    }
}

/// A shape committed to a page's overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedShape {
    pub shape: Shape,
    pub color: MarkColor,
    pub stroke_width: f32,
}

/// Transparent canvas layered over a rendered page.
///
/// Shapes are stored in the canvas's intrinsic raster coordinates, not CSS
/// pixels: pointer input in display space goes through [`Overlay::to_canvas`]
/// so committed geometry stays put when the page is zoomed.
#[derive(Debug)]
pub struct Overlay {
    canvas_width: f32,
    canvas_height: f32,
    display_width: f32,
    display_height: f32,
    committed: Vec<CommittedShape>,
}

impl Overlay {
    pub fn new(canvas_width: f32, canvas_height: f32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            display_width: canvas_width,
            display_height: canvas_height,
            committed: Vec::new(),
        }
    }

    /// Record the overlay's displayed bounding box (changes under zoom).
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.display_width = width;
        self.display_height = height;
    }

    /// Normalize a display-space point to canvas raster coordinates.
    pub fn to_canvas(&self, x: f32, y: f32) -> Point {
        let sx = if self.display_width > 0.0 {
            self.canvas_width / self.display_width
        } else {
            1.0
        };
        let sy = if self.display_height > 0.0 {
            self.canvas_height / self.display_height
        } else {
            1.0
        };
        Point::new(x * sx, y * sy)
    }

    pub fn commit(&mut self, shape: Shape, color: MarkColor, stroke_width: f32) {
        self.committed.push(CommittedShape {
            shape,
            color,
            stroke_width,
        });
    }

    pub fn shapes(&self) -> &[CommittedShape] {
        &self.committed
    }

    pub fn remove_at(&mut self, index: usize) -> bool {
        if index >= self.committed.len() {
            return false;
        }
        self.committed.remove(index);
        true
    }

    pub fn clear(&mut self) {
        self.committed.clear();
    }

    /// One frame's draw order over a cleared canvas: every committed shape
    /// first, then the in-progress one on top.
    pub fn draw_pass<'a>(&'a self, in_progress: Option<&'a Shape>) -> Vec<&'a Shape> {
        let mut pass: Vec<&Shape> = self.committed.iter().map(|c| &c.shape).collect();
        if let Some(shape) = in_progress {
            pass.push(shape);
        }
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> MarkColor {
        MarkColor::parse("#FF0000").unwrap()
    }

    #[test]
    fn rectangle_normalizes_corners() {
        let mut session = DrawingSession::new(DrawTool::Rectangle);
        session.pointer_down(Point::new(100.0, 80.0));
        let shape = session.pointer_up(Point::new(40.0, 20.0)).unwrap();

        assert_eq!(
            shape,
            Shape::Rectangle {
                x: 40.0,
                y: 20.0,
                width: 60.0,
                height: 60.0,
            }
        );
        assert!(!session.is_active());
    }

    #[test]
    fn circle_uses_start_as_center() {
        let mut session = DrawingSession::new(DrawTool::Circle);
        session.pointer_down(Point::new(10.0, 10.0));
        let shape = session.pointer_up(Point::new(13.0, 14.0)).unwrap();

        assert_eq!(
            shape,
            Shape::Circle {
                cx: 10.0,
                cy: 10.0,
                radius: 5.0,
            }
        );
    }

    #[test]
    fn freehand_accumulates_sampled_points() {
        let mut session = DrawingSession::new(DrawTool::Freehand);
        session.pointer_down(Point::new(0.0, 0.0));
        session.pointer_move(Point::new(1.0, 1.0));
        session.pointer_move(Point::new(2.0, 0.0));
        let shape = session.pointer_up(Point::new(3.0, 1.0)).unwrap();

        match shape {
            Shape::Freehand { points } => {
                assert_eq!(points.len(), 4);
                assert_eq!(points[0], Point::new(0.0, 0.0));
                assert_eq!(points[3], Point::new(3.0, 1.0));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn move_without_down_previews_nothing() {
        let mut session = DrawingSession::new(DrawTool::Arrow);
        assert_eq!(session.pointer_move(Point::new(5.0, 5.0)), None);
        assert_eq!(session.pointer_up(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn cancel_abandons_the_stroke() {
        let mut session = DrawingSession::new(DrawTool::Rectangle);
        session.pointer_down(Point::new(1.0, 1.0));
        session.cancel();
        assert!(!session.is_active());
        assert_eq!(session.pointer_up(Point::new(9.0, 9.0)), None);
    }

    #[test]
    fn preview_tracks_the_pointer() {
        let mut session = DrawingSession::new(DrawTool::Arrow);
        session.pointer_down(Point::new(0.0, 0.0));

        let preview = session.pointer_move(Point::new(4.0, 4.0)).unwrap();
        assert_eq!(
            preview,
            Shape::Arrow {
                from: Point::new(0.0, 0.0),
                to: Point::new(4.0, 4.0),
            }
        );
        assert!(session.is_active());
    }

    #[test]
    fn to_canvas_compensates_for_zoomed_display() {
        let mut overlay = Overlay::new(1000.0, 1400.0);
        overlay.set_display_size(500.0, 700.0);

        let point = overlay.to_canvas(100.0, 70.0);
        assert_eq!(point, Point::new(200.0, 140.0));
    }

    #[test]
    fn to_canvas_survives_zero_display_size() {
        let mut overlay = Overlay::new(1000.0, 1400.0);
        overlay.set_display_size(0.0, 0.0);
        assert_eq!(overlay.to_canvas(10.0, 20.0), Point::new(10.0, 20.0));
    }

    #[test]
    fn draw_pass_orders_committed_before_in_progress() {
        let mut overlay = Overlay::new(100.0, 100.0);
        let committed = Shape::Circle {
            cx: 1.0,
            cy: 1.0,
            radius: 1.0,
        };
        overlay.commit(committed.clone(), red(), 2.0);

        let preview = Shape::Arrow {
            from: Point::new(0.0, 0.0),
            to: Point::new(1.0, 1.0),
        };
        let pass = overlay.draw_pass(Some(&preview));
        assert_eq!(pass.len(), 2);
        assert_eq!(pass[0], &committed);
        assert_eq!(pass[1], &preview);
    }

    #[test]
    fn remove_at_drops_only_the_named_shape() {
        let mut overlay = Overlay::new(100.0, 100.0);
        overlay.commit(
            Shape::Circle {
                cx: 1.0,
                cy: 1.0,
                radius: 1.0,
            },
            red(),
            1.0,
        );
        overlay.commit(
            Shape::Circle {
                cx: 2.0,
                cy: 2.0,
                radius: 2.0,
            },
            red(),
            1.0,
        );

        assert!(overlay.remove_at(0));
        assert_eq!(overlay.shapes().len(), 1);
        assert!(!overlay.remove_at(5));
    }
}
