// SPDX: CC0-1.0

use function_plot::{
    eval::{EvalErrTyp, Expression},
    intersect::find_intersections,
    parse::ParseErrTyp,
    raster::rasterize,
    session::PlotSession,
    svg::render_svg,
    view::{ViewConfig, ViewWindow},
    Number, Point,
};

fn close(a: Number, b: Number, tol: Number) -> bool {
    (a - b).abs() <= tol * b.abs().max(1.0)
}

fn eval(text: &str, x: Number) -> Number {
    Expression::compile(text)
        .expect("compiles")
        .eval(x)
        .expect("evaluates")
}

fn square_view() -> ViewWindow {
    ViewWindow::new(ViewConfig::default(), 440, 440).expect("drawable surface")
}

#[test]
fn evaluates_closed_forms() {
    assert!(close(eval("x^2", 3.0), 9.0, 1e-9));
    assert!(close(eval("2x+1", 5.0), 11.0, 1e-9));
    assert!(close(eval("sin(x)+cos(x)", 0.0), 1.0, 1e-9));
    assert!(close(eval("2(3+4)", 0.0), 14.0, 1e-9));
    assert!(close(eval("2x(x+1)sin(x)", 1.0), 4.0 * 1.0_f64.sin(), 1e-9));
    assert!(close(eval("-2^2", 0.0), -4.0, 1e-9));
    assert!(close(eval("2^3^2", 0.0), 512.0, 1e-9));
    assert!(eval("(-8)^(1/3)", 0.0).is_nan());
}

#[test]
fn division_by_near_zero_is_an_evaluation_error() {
    let expr = Expression::compile("1/(x-x)").expect("compiles");
    let err = expr.eval(5.0).expect_err("divides by zero");
    assert_eq!(err.typ, EvalErrTyp::DivisionByZero);
    assert!(expr.sample(5.0).is_nan());
}

#[test]
fn bad_text_is_a_parse_error() {
    for (text, typ) in [
        ("2 +", ParseErrTyp::UnexpectedEnd),
        ("foo(x)", ParseErrTyp::UnknownIdent),
        ("(x+1", ParseErrTyp::ParenMismatch),
        ("x+1)", ParseErrTyp::ParenMismatch),
        ("y", ParseErrTyp::UnknownIdent),
    ] {
        let err = Expression::compile(text).expect_err(text);
        assert_eq!(err.typ, typ, "{text}");
    }
    assert!(Expression::compile("x $ 2").is_err());
}

#[test]
fn two_variable_expressions() {
    let expr = Expression::compile_xy("x^2 + 2xy").expect("compiles");
    assert!(close(expr.eval_xy(1.0, 3.0).expect("evaluates"), 7.0, 1e-9));
}

#[test]
fn screen_world_round_trip() {
    let mut view = ViewWindow::new(ViewConfig::default(), 1000, 700).expect("drawable surface");
    for bounds in [(-10.0, 10.0), (-0.003, 0.001), (1e4, 3e4)] {
        let config = ViewConfig {
            x: bounds.0..bounds.1,
            y: bounds.0..bounds.1,
            ..ViewConfig::default()
        };
        view = ViewWindow::new(config, view.surface().x, view.surface().y)
            .expect("drawable surface");
        let pixel = 1.0 / view.scale().x;
        for wx in [view.bounds().x.start, view.bounds().mid().x, view.bounds().x.end] {
            let back = view.screen_to_world_x(view.world_to_screen_x(wx));
            assert!((back - wx).abs() <= pixel, "{wx} came back as {back}");
        }
    }
}

#[test]
fn zoom_out_undoes_zoom_in() {
    let mut view = ViewWindow::new(ViewConfig::default(), 800, 600).expect("drawable surface");
    let before = view.bounds().clone();
    let anchor = Point::new(123, 321);
    view.zoom(0.5, anchor).expect("zooms in");
    let after = view.zoom(2.0, anchor).expect("zooms out");
    for (a, b) in [
        (after.x.start, before.x.start),
        (after.x.end, before.x.end),
        (after.y.start, before.y.start),
        (after.y.end, before.y.end),
    ] {
        assert!(close(a, b, 1e-9), "{a} != {b}");
    }
}

#[test]
fn aspect_adjustment_is_idempotent() {
    let mut view = ViewWindow::new(ViewConfig::default(), 1200, 500).expect("drawable surface");
    let once = view.adjust_to_aspect_ratio(1200, 500).expect("fits");
    let twice = view.adjust_to_aspect_ratio(1200, 500).expect("fits");
    assert_eq!(once, twice);
}

#[test]
fn reciprocal_splits_at_asymptote_and_stays_in_band() {
    let view = square_view();
    let expr = Expression::compile("1/x").expect("compiles");
    let segments = rasterize(&expr, &view);
    assert!(segments.len() >= 2, "{} segments", segments.len());

    let top = view.offset().y as Number;
    let bottom = top + view.drawable().y as Number;
    for seg in &segments {
        for p in &seg.points {
            assert!(top - 1e-6 <= p.y && p.y <= bottom + 1e-6, "{p:?} left the band");
        }
    }
}

#[test]
fn identical_functions_have_no_intersections() {
    let f = Expression::compile("x").expect("compiles");
    let g = Expression::compile("x").expect("compiles");
    assert!(find_intersections(&f, &g, -10.0, 10.0).is_empty());
    assert!(find_intersections(&f, &g, -1e3, 5.0).is_empty());
}

#[test]
fn parabola_meets_line_twice() {
    let f = Expression::compile("x^2").expect("compiles");
    let g = Expression::compile("4").expect("compiles");
    let points = find_intersections(&f, &g, -10.0, 10.0);
    assert_eq!(points.len(), 2);
    let mut xs: Vec<Number> = points.iter().map(|p| p.x).collect();
    xs.sort_by(|a, b| a.total_cmp(b));
    assert!((xs[0] + 2.0).abs() < 1e-5);
    assert!((xs[1] - 2.0).abs() < 1e-5);
    assert!(points.iter().all(|p| (p.y - 4.0).abs() < 1e-4));
}

#[test]
fn session_renders_to_svg() {
    let mut session = PlotSession::new(square_view());
    session.add("x^2").expect("compiles");
    session.add("4").expect("compiles");
    session.set_show_intersections(true);

    let curves = session.render();
    assert_eq!(curves.len(), 2);
    assert!(curves.iter().all(|c| !c.blank));
    let marks = session.intersections().to_vec();
    assert_eq!(marks.len(), 2);

    let svg = render_svg(&session, &curves, &marks).expect("renders to memory");
    assert_eq!(svg.matches("<circle").count(), 2);
    assert!(svg.contains("y = x^2"));
}
