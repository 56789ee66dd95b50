// SPDX: CC0-1.0

use crate::{
    session::{self, Curve, IntersectionPoint, PlotSession},
    Number, Point,
};
use plotters::{
    drawing::DrawingAreaErrorKind,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

pub type SvgErr = DrawingAreaErrorKind<std::io::Error>;

const GRID: RGBColor = RGBColor(0xe4, 0xe4, 0xe4);
const AXIS: RGBColor = RGBColor(0x44, 0x44, 0x44);
const LABEL_SIZE: f64 = 11.0;
const LEGEND_ROW: i32 = 15;
const MARK_RADIUS: i32 = 3;

fn rgb(color: session::Color) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

fn px(p: Point<Number>) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

fn label(color: &RGBColor, h: HPos, v: VPos) -> TextStyle<'static> {
    ("sans-serif", LABEL_SIZE)
        .into_font()
        .color(color)
        .pos(Pos::new(h, v))
}

/// Render the session's current view, curves and intersection marks as a
/// standalone SVG document.
///
/// Curves are drawn from their rasterized screen-space segments, so the
/// document matches the view pixel for pixel.
pub fn render_svg(
    session: &PlotSession,
    curves: &[Curve],
    marks: &[IntersectionPoint],
) -> Result<String, SvgErr> {
    let view = session.view();
    let surface = view.surface();
    let bounds = view.bounds();
    let drawable = view.drawable();
    let (left, top) = (view.offset().x, view.offset().y);
    let right = left.saturating_add(drawable.x.clamp(0, i64::from(i32::MAX)) as i32);
    let bottom = top.saturating_add(drawable.y.clamp(0, i64::from(i32::MAX)) as i32);

    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (surface.x, surface.y)).into_drawing_area();
        root.fill(&WHITE)?;

        // grid & tick labels
        for tx in view.ticks_x() {
            let sx = view.world_to_screen_x(tx);
            root.draw(&PathElement::new(
                vec![(sx, top), (sx, bottom)],
                GRID.stroke_width(1),
            ))?;
            root.draw(&Text::new(
                view.format_tick(tx),
                (sx, bottom + 4),
                label(&AXIS, HPos::Center, VPos::Top),
            ))?;
        }
        for ty in view.ticks_y() {
            let sy = view.world_to_screen_y(ty);
            root.draw(&PathElement::new(
                vec![(left, sy), (right, sy)],
                GRID.stroke_width(1),
            ))?;
            root.draw(&Text::new(
                view.format_tick(ty),
                (left - 4, sy),
                label(&AXIS, HPos::Right, VPos::Center),
            ))?;
        }

        // axes through the origin, when visible
        if bounds.x.contains(&0.0) {
            let sx = view.world_to_screen_x(0.0);
            root.draw(&PathElement::new(
                vec![(sx, top), (sx, bottom)],
                AXIS.stroke_width(1),
            ))?;
        }
        if bounds.y.contains(&0.0) {
            let sy = view.world_to_screen_y(0.0);
            root.draw(&PathElement::new(
                vec![(left, sy), (right, sy)],
                AXIS.stroke_width(1),
            ))?;
        }
        root.draw(&Rectangle::new(
            [(left, top), (right, bottom)],
            AXIS.stroke_width(1),
        ))?;

        for curve in curves {
            let style = rgb(curve.color).stroke_width(2);
            for seg in &curve.segments {
                let points: Vec<(i32, i32)> = seg.points.iter().copied().map(px).collect();
                root.draw(&PathElement::new(points, style))?;
            }
        }

        for mark in marks {
            if !(bounds.x.contains(&mark.pos.x) && bounds.y.contains(&mark.pos.y)) {
                continue;
            }
            let (mx, my) = px(view.world_to_screen(mark.pos));
            root.draw(&Circle::new((mx, my), MARK_RADIUS, AXIS.filled()))?;
            root.draw(&Text::new(
                format!(
                    "({}, {})",
                    view.format_tick(mark.pos.x),
                    view.format_tick(mark.pos.y)
                ),
                (mx + MARK_RADIUS + 2, my - MARK_RADIUS - 2),
                label(&AXIS, HPos::Left, VPos::Bottom),
            ))?;
        }

        // legend
        let visible = session.functions().iter().filter(|fun| fun.visible);
        for (row, fun) in (1..).zip(visible) {
            root.draw(&Text::new(
                format!("y = {}", fun.expr.text()),
                (left + 8, top + LEGEND_ROW * row),
                label(&rgb(fun.color), HPos::Left, VPos::Bottom),
            ))?;
        }

        root.present()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ViewConfig, ViewWindow};

    fn session() -> PlotSession {
        PlotSession::new(
            ViewWindow::new(ViewConfig::default(), 440, 440).expect("drawable surface"),
        )
    }

    fn render(session: &mut PlotSession) -> String {
        let curves = session.render();
        let marks = session.intersections().to_vec();
        render_svg(session, &curves, &marks).expect("renders to memory")
    }

    #[test]
    fn one_path_per_segment() {
        let mut session = session();
        session.add("1/x").expect("compiles");
        session.add("x^2").expect("compiles");
        let segments: usize = session.render().iter().map(|c| c.segments.len()).sum();
        assert!(segments >= 3);
        let svg = render(&mut session);

        // grid and axes alone, for the same view
        let background = render(&mut PlotSession::new(session.view().clone()));

        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(
            svg.matches("<polyline").count() - background.matches("<polyline").count(),
            segments
        );
        assert!(svg.contains("y = 1/x"));
        assert!(svg.contains("0.00"));
    }

    #[test]
    fn intersections_are_marked() {
        let mut session = session();
        session.add("x^2").expect("compiles");
        session.add("4").expect("compiles");
        let svg = render(&mut session);
        assert_eq!(session.intersections().len(), 2);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("(2.00, 4.00)"));
    }

    #[test]
    fn hidden_functions_are_left_out() {
        let mut session = session();
        session.add("x").expect("compiles");
        let shown = render(&mut session);
        session.toggle_visibility(0).expect("exists");
        let hidden = render(&mut session);
        assert_eq!(
            shown.matches("<polyline").count(),
            hidden.matches("<polyline").count() + 1
        );
        assert!(shown.contains("y = x"));
        assert!(!hidden.contains("y = x"));
    }
}
