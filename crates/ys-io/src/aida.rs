//! Legacy AIDA XML reader for reference data.
//!
//! Only two-dimensional `<dataPointSet>` elements are read; each becomes a
//! [`Scatter2D`] at `path` + `/` + `name`.

use ys_core::{Error, Result};
use ys_hist::{Point2D, Scatter2D};

/// Parse every `<dataPointSet>` in an AIDA document.
pub fn read_aida_str(text: &str) -> Result<Vec<Scatter2D>> {
    // roxmltree rejects DTDs; blank the DOCTYPE line so reported rows stay right.
    let text: String = text
        .lines()
        .map(|l| if l.trim_start().starts_with("<!DOCTYPE") { "" } else { l })
        .collect::<Vec<_>>()
        .join("\n");

    let doc = roxmltree::Document::parse(&text).map_err(|e| Error::Xml(e.to_string()))?;

    let mut out = Vec::new();
    for node in doc.descendants().filter(|n| n.has_tag_name("dataPointSet")) {
        out.push(parse_data_point_set(&doc, node)?);
    }
    Ok(out)
}

fn row(doc: &roxmltree::Document, node: roxmltree::Node) -> usize {
    doc.text_pos_at(node.range().start).row as usize
}

fn parse_data_point_set(doc: &roxmltree::Document, node: roxmltree::Node) -> Result<Scatter2D> {
    let name = attr_string(&node, "name")?;
    let dir = node.attribute("path").unwrap_or("/");
    let path = if dir.ends_with('/') { format!("{dir}{name}") } else { format!("{dir}/{name}") };

    if let Some(dim) = node.attribute("dimension")
        && dim.trim() != "2"
    {
        return Err(Error::UnsupportedType(format!(
            "{dim}-dimensional dataPointSet '{path}'"
        )));
    }

    let mut scatter = Scatter2D::new(path.as_str());
    if let Some(title) = node.attribute("title") {
        scatter.set_title(title);
    }

    for dp in node.children().filter(|n| n.has_tag_name("dataPoint")) {
        let line = row(doc, dp);
        let m: Vec<roxmltree::Node> =
            dp.children().filter(|n| n.has_tag_name("measurement")).collect();
        if m.len() != 2 {
            return Err(Error::Parse {
                line,
                message: format!("dataPoint in '{path}' has {} measurements, expected 2", m.len()),
            });
        }
        let (x, xm, xp) = measurement(&m[0], line)?;
        let (y, ym, yp) = measurement(&m[1], line)?;
        let p = Point2D::new(x, y, xm, xp, ym, yp)
            .map_err(|e| Error::Parse { line, message: e.to_string() })?;
        scatter.push(p);
    }
    log::debug!("read dataPointSet {path} ({} points)", scatter.num_points());
    Ok(scatter)
}

/// `(value, errorMinus, errorPlus)`; missing errors default to zero.
fn measurement(node: &roxmltree::Node, line: usize) -> Result<(f64, f64, f64)> {
    let value = attr_f64(node, "value", None, line)?;
    let minus = attr_f64(node, "errorMinus", Some(0.0), line)?;
    let plus = attr_f64(node, "errorPlus", Some(0.0), line)?;
    Ok((value, minus, plus))
}

fn attr_string(node: &roxmltree::Node, name: &str) -> Result<String> {
    node.attribute(name)
        .map(String::from)
        .ok_or_else(|| Error::Xml(format!("missing attribute '{}'", name)))
}

fn attr_f64(node: &roxmltree::Node, name: &str, default: Option<f64>, line: usize) -> Result<f64> {
    match (node.attribute(name), default) {
        (Some(v), _) => v.trim().parse().map_err(|_| Error::Parse {
            line,
            message: format!("attribute {name}=\"{v}\" is not a number"),
        }),
        (None, Some(d)) => Ok(d),
        (None, None) => Err(Error::Xml(format!("missing attribute '{}'", name))),
    }
}
