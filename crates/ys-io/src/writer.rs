//! YODA flat-text and AIDA XML writers.
//!
//! Dispatch is an exhaustive match on [`AnalysisObject`], so every kind
//! that exists can be written.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use ys_core::{Distribution, Error, Result, ResultExt};
use ys_hist::convert;
use ys_hist::registry::{basename, parent_dir, validate_path};
use ys_hist::{AnalysisObject, Histo1D, Profile1D, Scatter2D, annotations};

use crate::format::fmt_f64;

/// Annotation key carrying the object kind in YODA blocks.
pub const TYPE_KEY: &str = "Type";

/// Output/input file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YODA flat text (`.yoda`).
    Yoda,
    /// AIDA XML (`.aida`, `.xml`).
    Aida,
}

impl Format {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        ext.parse()
    }

    /// Preferred file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Yoda => "yoda",
            Format::Aida => "aida",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yoda" => Ok(Format::Yoda),
            "aida" | "xml" => Ok(Format::Aida),
            other => Err(Error::UnsupportedType(format!("file format '{other}'"))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// YODA block tag for an object kind.
pub(crate) fn block_tag(obj: &AnalysisObject) -> &'static str {
    match obj {
        AnalysisObject::Histo1D(_) => "YODA_HISTO1D",
        AnalysisObject::Profile1D(_) => "YODA_PROFILE1D",
        AnalysisObject::Scatter2D(_) => "YODA_SCATTER2D",
    }
}

/// Write one object as a YODA block, followed by a blank line.
///
/// Fails with `InvalidPath` if the path would not survive the BEGIN line.
pub fn write_yoda<W: Write>(out: &mut W, obj: &AnalysisObject) -> Result<()> {
    validate_path(obj.path()).in_object(obj.path(), "write")?;
    let tag = block_tag(obj);
    writeln!(out, "# BEGIN {tag} {}", obj.path())?;
    for (key, value) in obj.annotations().iter() {
        if key == TYPE_KEY {
            continue;
        }
        if value.contains(['\n', '\r']) || key.contains(['\n', '\r', '=']) {
            return Err(Error::InvalidInput(format!("annotation '{key}' cannot be written")))
                .in_object(obj.path(), "write");
        }
        writeln!(out, "{key}={value}")?;
    }
    writeln!(out, "{TYPE_KEY}={}", obj.kind())?;
    match obj {
        AnalysisObject::Histo1D(h) => write_histo_body(out, h)?,
        AnalysisObject::Profile1D(p) => write_profile_body(out, p)?,
        AnalysisObject::Scatter2D(s) => write_scatter_body(out, s)?,
    }
    writeln!(out, "# END {tag}")?;
    writeln!(out)?;
    Ok(())
}

fn write_histo_body<W: Write>(out: &mut W, h: &Histo1D) -> Result<()> {
    writeln!(out, "# Mean: {}", fmt_f64(h.mean(false)))?;
    writeln!(out, "# Area: {}", fmt_f64(h.integral(false)))?;
    writeln!(out, "# xlow\t xhigh\t sumw\t sumw2\t sumwx\t sumwx2\t numEntries")?;
    for (label, d) in [("Underflow", h.underflow()), ("Overflow", h.overflow())] {
        writeln!(
            out,
            "{label}\t{label}\t{}\t{}\t{}\t{}\t{}",
            fmt_f64(d.sum_w()),
            fmt_f64(d.sum_w2()),
            fmt_f64(d.sum_wx()),
            fmt_f64(d.sum_wx2()),
            d.num_entries()
        )?;
    }
    for b in h.bins() {
        let d = b.dbn();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            fmt_f64(b.x_low()),
            fmt_f64(b.x_high()),
            fmt_f64(d.sum_w()),
            fmt_f64(d.sum_w2()),
            fmt_f64(d.sum_wx()),
            fmt_f64(d.sum_wx2()),
            d.num_entries()
        )?;
    }
    Ok(())
}

fn write_profile_body<W: Write>(out: &mut W, p: &Profile1D) -> Result<()> {
    writeln!(
        out,
        "# xlow\t xhigh\t sumw\t sumw2\t sumwx\t sumwx2\t sumwy\t sumwy2\t numEntries"
    )?;
    for (label, d) in [("Underflow", p.underflow()), ("Overflow", p.overflow())] {
        writeln!(
            out,
            "{label}\t{label}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            fmt_f64(d.sum_w()),
            fmt_f64(d.sum_w2()),
            fmt_f64(d.sum_wx()),
            fmt_f64(d.sum_wx2()),
            fmt_f64(d.sum_wy()),
            fmt_f64(d.sum_wy2()),
            d.num_entries()
        )?;
    }
    for b in p.bins() {
        let d = b.dbn();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            fmt_f64(b.x_low()),
            fmt_f64(b.x_high()),
            fmt_f64(d.sum_w()),
            fmt_f64(d.sum_w2()),
            fmt_f64(d.sum_wx()),
            fmt_f64(d.sum_wx2()),
            fmt_f64(d.sum_wy()),
            fmt_f64(d.sum_wy2()),
            d.num_entries()
        )?;
    }
    Ok(())
}

fn write_scatter_body<W: Write>(out: &mut W, s: &Scatter2D) -> Result<()> {
    writeln!(out, "# xval\t xerr-\t xerr+\t yval\t yerr-\t yerr+")?;
    for p in s.points() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            fmt_f64(p.x),
            fmt_f64(p.x_err_minus),
            fmt_f64(p.x_err_plus),
            fmt_f64(p.y),
            fmt_f64(p.y_err_minus),
            fmt_f64(p.y_err_plus)
        )?;
    }
    Ok(())
}

/// Write every object as consecutive YODA blocks.
pub fn write_yoda_all<'a, W, I>(out: &mut W, objects: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AnalysisObject>,
{
    for obj in objects {
        write_yoda(out, obj)?;
    }
    Ok(())
}

/// One object as a YODA string.
pub fn to_yoda_string(obj: &AnalysisObject) -> Result<String> {
    let mut buf = Vec::new();
    write_yoda(&mut buf, obj)?;
    String::from_utf8(buf).map_err(|e| Error::InvalidInput(e.to_string()))
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write objects as one AIDA document. Histograms and profiles are
/// converted to points first; every object becomes a `<dataPointSet>`.
pub fn write_aida_all<'a, W, I>(out: &mut W, objects: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AnalysisObject>,
{
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8" ?>"#)?;
    writeln!(out, r#"<!DOCTYPE aida SYSTEM "http://aida.freehep.org/schemas/3.3/aida.dtd">"#)?;
    writeln!(out, r#"<aida version="3.3">"#)?;
    writeln!(out, r#"  <implementation version="1.1" package="YStat"/>"#)?;
    for obj in objects {
        let converted;
        let scatter = match obj {
            AnalysisObject::Histo1D(h) => {
                converted = convert::histo_to_scatter(h);
                &converted
            }
            AnalysisObject::Profile1D(p) => {
                converted = convert::profile_to_scatter(p);
                &converted
            }
            AnalysisObject::Scatter2D(s) => s,
        };
        write_data_point_set(out, scatter)?;
    }
    writeln!(out, "</aida>")?;
    Ok(())
}

fn write_data_point_set<W: Write>(out: &mut W, s: &Scatter2D) -> Result<()> {
    let path = s.path();
    validate_path(path).in_object(path, "write")?;
    writeln!(
        out,
        r#"  <dataPointSet name="{}" dimension="2" path="{}" title="{}">"#,
        xml_escape(basename(path)),
        xml_escape(parent_dir(path)),
        xml_escape(s.annotations().get(annotations::TITLE).unwrap_or_default())
    )?;
    writeln!(out, r#"    <dimension dim="0" title="" />"#)?;
    writeln!(out, r#"    <dimension dim="1" title="" />"#)?;
    for p in s.points() {
        writeln!(out, "    <dataPoint>")?;
        for (v, minus, plus) in [(p.x, p.x_err_minus, p.x_err_plus), (p.y, p.y_err_minus, p.y_err_plus)]
        {
            writeln!(
                out,
                r#"      <measurement value="{}" errorPlus="{}" errorMinus="{}"/>"#,
                fmt_f64(v),
                fmt_f64(plus),
                fmt_f64(minus)
            )?;
        }
        writeln!(out, "    </dataPoint>")?;
    }
    writeln!(out, "  </dataPointSet>")?;
    Ok(())
}

/// Write objects in `format`.
pub fn write<'a, W, I>(out: &mut W, format: Format, objects: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AnalysisObject>,
{
    match format {
        Format::Yoda => write_yoda_all(out, objects),
        Format::Aida => write_aida_all(out, objects),
    }
}

/// Write objects to a file, choosing the format from its extension.
pub fn write_path<'a, I>(path: impl AsRef<Path>, objects: I) -> Result<()>
where
    I: IntoIterator<Item = &'a AnalysisObject>,
{
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    write(&mut out, format, objects)?;
    out.flush()?;
    log::debug!("wrote {} ({format})", path.display());
    Ok(())
}
