//! Objects written to disk and read back keep their edges, sums and
//! annotations to the written precision.

use approx::assert_relative_eq;
use ys_hist::{AnalysisObject, Distribution, Histo1D, Profile1D, Registry, Scatter2D};
use ys_io::{Format, read_path, read_str, write_path};

const TOL: f64 = 1e-5;

fn sample_registry() -> Registry {
    let mut h = Histo1D::with_edges("/ANA/pt", &[0.0, 0.5, 1.5, 4.0]).unwrap().with_title("pT");
    for (x, w) in [(0.1, 1.0), (0.7, 2.5), (1.2, 0.3), (3.9, 1.0), (-1.0, 5.0), (7.0, 0.25)] {
        h.fill(x, w).unwrap();
    }
    h.annotations_mut().set("XLabel", "$p_T$ [GeV]").unwrap();

    let mut p = Profile1D::uniform("/ANA/mean_pt", 3, 0.0, 30.0).unwrap();
    for (x, y) in [(1.0, 10.0), (1.0, 20.0), (15.0, 3.3), (29.0, 1.0 / 3.0), (-5.0, 1.0)] {
        p.fill(x, y, 1.0).unwrap();
    }

    let mut s = Scatter2D::new("/ANA/xsec").with_title("cross-section");
    s.add_point(7000.0, 1.234e-3, 0.0, 0.0, 1.0e-4, 2.0e-4).unwrap();
    s.add_point(13000.0, 2.5e-3, 0.0, 0.0, 3.0e-4, 1.0e-4).unwrap();

    let mut reg = Registry::new();
    reg.register(h).unwrap();
    reg.register(p).unwrap();
    reg.register(s).unwrap();
    reg
}

fn close(a: f64, b: f64) {
    assert_relative_eq!(a, b, max_relative = TOL, epsilon = 1e-12);
}

#[test]
fn yoda_file_round_trip() {
    let reg = sample_registry();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.yoda");
    write_path(&path, &reg).unwrap();

    let back = read_path(&path).unwrap();
    assert_eq!(back.len(), 3);
    let paths: Vec<&str> = back.iter().map(AnalysisObject::path).collect();
    assert_eq!(paths, vec!["/ANA/mean_pt", "/ANA/pt", "/ANA/xsec"]);

    let h0 = reg.find("/ANA/pt").unwrap().as_histo1d().unwrap();
    let h1 = back[1].as_histo1d().unwrap();
    assert_eq!(h1.title(), "pT");
    assert_eq!(h1.annotations().get("XLabel"), Some("$p_T$ [GeV]"));
    assert_eq!(h1.num_bins(), h0.num_bins());
    for (a, b) in h0.bins().iter().zip(h1.bins()) {
        close(a.x_low(), b.x_low());
        close(a.x_high(), b.x_high());
        close(a.sum_w(), b.sum_w());
        close(a.sum_w2(), b.sum_w2());
        close(a.dbn().sum_wx(), b.dbn().sum_wx());
        close(a.dbn().sum_wx2(), b.dbn().sum_wx2());
        assert_eq!(a.num_entries(), b.num_entries());
    }
    close(h1.underflow().sum_w(), 5.0);
    close(h1.overflow().sum_wx(), 1.75);

    let p0 = reg.find("/ANA/mean_pt").unwrap().as_profile1d().unwrap();
    let p1 = back[0].as_profile1d().unwrap();
    for (a, b) in p0.bins().iter().zip(p1.bins()) {
        close(a.sum_wy(), b.sum_wy());
        close(a.sum_wy2(), b.sum_wy2());
        close(a.mean(), b.mean());
        assert_eq!(a.num_entries(), b.num_entries());
    }
    assert_eq!(p1.underflow().num_entries(), 1);

    let s0 = reg.find("/ANA/xsec").unwrap().as_scatter2d().unwrap();
    let s1 = back[2].as_scatter2d().unwrap();
    assert_eq!(s1.title(), "cross-section");
    for (a, b) in s0.points().iter().zip(s1.points()) {
        close(a.x, b.x);
        close(a.y, b.y);
        close(a.y_err_minus, b.y_err_minus);
        close(a.y_err_plus, b.y_err_plus);
    }
}

fn yoda_text<'a>(objects: impl IntoIterator<Item = &'a AnalysisObject>) -> String {
    let mut buf = Vec::new();
    ys_io::write(&mut buf, Format::Yoda, objects).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn rewriting_is_stable() {
    // Once values are at written precision, further passes change nothing.
    let reg = sample_registry();
    let once = read_str(&yoda_text(&reg), Format::Yoda).unwrap();
    let text = yoda_text(&once);
    let twice = read_str(&text, Format::Yoda).unwrap();
    assert_eq!(text, yoda_text(&twice));
}

#[test]
fn aida_file_round_trip_as_points() {
    let reg = sample_registry();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ref.aida");
    write_path(&path, &reg).unwrap();

    let back = read_path(&path).unwrap();
    assert_eq!(back.len(), 3);
    let pt = back.iter().find(|o| o.path() == "/ANA/pt").unwrap().as_scatter2d().unwrap();
    assert_eq!(pt.num_points(), 3);
    close(pt.points()[1].x, 1.0);
    close(pt.points()[1].x_err_minus, 0.5);
    close(pt.points()[1].y, 2.8);
    assert_eq!(pt.title(), "pT");
}

#[test]
fn merged_worker_outputs_round_trip() {
    let a = sample_registry();
    let mut b = sample_registry();
    b.merge(a).unwrap();
    let back = read_str(&yoda_text(&b), Format::Yoda).unwrap();
    let h = back[1].as_histo1d().unwrap();
    close(h.underflow().sum_w(), 10.0);
    assert_eq!(h.num_entries(true), 12);
}

#[test]
fn unknown_extension_fails() {
    let reg = sample_registry();
    let dir = tempfile::tempdir().unwrap();
    let err = write_path(dir.path().join("run.root"), &reg).unwrap_err();
    assert!(matches!(err, ys_hist::Error::UnsupportedType(_)));
}

#[test]
fn edges_closer_than_written_precision_do_not_survive() {
    // Six significant digits cannot tell 1.0 from 1.000001.
    let h = Histo1D::with_edges("/ANA/fine", &[0.0, 1.0, 1.000001, 2.0]).unwrap();
    let obj = AnalysisObject::from(h);
    let text = yoda_text([&obj]);
    assert!(text.contains("\n1.00000e+00\t1.00000e+00\t"));
    match read_str(&text, Format::Yoda) {
        Err(ys_hist::Error::Parse { line, .. }) => assert_eq!(line, 11),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn padded_annotations_survive_a_file() {
    let s = Scatter2D::new("/ANA/padded").with_title(" x ");
    let mut reg = Registry::new();
    reg.register(s).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("padded.yoda");
    write_path(&path, &reg).unwrap();
    let back = read_path(&path).unwrap();
    assert_eq!(back[0].title(), " x ");
}
