//! YODA flat-text reader.

use std::path::Path;

use ys_core::{Dbn1D, Dbn2D, Error, Result, ResultExt};
use ys_hist::{
    AnalysisObject, Axis1D, Bin1D, Histo1D, Point2D, Profile1D, Scatter2D, annotations,
};

use crate::format::{parse_count, parse_f64};
use crate::writer::{Format, TYPE_KEY};

fn parse_err(line: usize, message: impl Into<String>) -> Error {
    Error::Parse { line, message: message.into() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Histo,
    Profile,
    Scatter,
}

impl BlockKind {
    fn from_tag(tag: &str, line: usize) -> Result<Self> {
        match tag {
            "YODA_HISTO1D" => Ok(BlockKind::Histo),
            "YODA_PROFILE1D" => Ok(BlockKind::Profile),
            "YODA_SCATTER2D" => Ok(BlockKind::Scatter),
            other => Err(Error::UnsupportedType(format!("block '{other}' at line {line}"))),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            BlockKind::Histo => "Histo1D",
            BlockKind::Profile => "Profile1D",
            BlockKind::Scatter => "Scatter2D",
        }
    }
}

/// Rows collected for one block before the object is assembled.
struct Block {
    kind: BlockKind,
    tag: String,
    path: String,
    start: usize,
    annotations: Vec<(String, String)>,
    histo_bins: Vec<Bin1D<Dbn1D>>,
    profile_bins: Vec<Bin1D<Dbn2D>>,
    flows1: [Dbn1D; 2],
    flows2: [Dbn2D; 2],
    points: Vec<Point2D>,
}

impl Block {
    fn new(kind: BlockKind, tag: &str, path: &str, start: usize) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            path: path.to_string(),
            start,
            annotations: Vec::new(),
            histo_bins: Vec::new(),
            profile_bins: Vec::new(),
            flows1: Default::default(),
            flows2: Default::default(),
            points: Vec::new(),
        }
    }

    fn annotation(&mut self, line: usize, key: &str, value: &str) -> Result<()> {
        if key == TYPE_KEY {
            if value != self.kind.type_name() {
                return Err(parse_err(
                    line,
                    format!("Type={value} inside a {} block", self.tag),
                ));
            }
            return Ok(());
        }
        // The BEGIN line names the object.
        if key == annotations::PATH {
            if value != self.path {
                log::debug!("line {line}: Path={value} differs from BEGIN path {}", self.path);
            }
            return Ok(());
        }
        self.annotations.push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn row(&mut self, line: usize, tokens: &[&str]) -> Result<()> {
        match self.kind {
            BlockKind::Histo => self.histo_row(line, tokens),
            BlockKind::Profile => self.profile_row(line, tokens),
            BlockKind::Scatter => self.scatter_row(line, tokens),
        }
    }

    fn histo_row(&mut self, line: usize, tokens: &[&str]) -> Result<()> {
        expect_columns(line, tokens, 7)?;
        let [w, w2, wx, wx2] = floats::<4>(line, &tokens[2..6])?;
        let n = parse_count(tokens[6], line)?;
        let dbn = Dbn1D::from_sums(n, w, w2, wx, wx2).map_err(|e| parse_err(line, e.to_string()))?;
        match flow_slot(line, tokens)? {
            Some(i) => self.flows1[i] = dbn,
            None => {
                let [lo, hi] = floats::<2>(line, &tokens[..2])?;
                let bin = Bin1D::with_dbn(lo, hi, dbn).map_err(|e| parse_err(line, e.to_string()))?;
                self.histo_bins.push(bin);
            }
        }
        Ok(())
    }

    fn profile_row(&mut self, line: usize, tokens: &[&str]) -> Result<()> {
        expect_columns(line, tokens, 9)?;
        let [w, w2, wx, wx2, wy, wy2] = floats::<6>(line, &tokens[2..8])?;
        let n = parse_count(tokens[8], line)?;
        let dbn = Dbn2D::from_sums(n, w, w2, wx, wx2, wy, wy2, 0.0)
            .map_err(|e| parse_err(line, e.to_string()))?;
        match flow_slot(line, tokens)? {
            Some(i) => self.flows2[i] = dbn,
            None => {
                let [lo, hi] = floats::<2>(line, &tokens[..2])?;
                let bin = Bin1D::with_dbn(lo, hi, dbn).map_err(|e| parse_err(line, e.to_string()))?;
                self.profile_bins.push(bin);
            }
        }
        Ok(())
    }

    fn scatter_row(&mut self, line: usize, tokens: &[&str]) -> Result<()> {
        expect_columns(line, tokens, 6)?;
        let [x, xm, xp, y, ym, yp] = floats::<6>(line, tokens)?;
        let p = Point2D::new(x, y, xm, xp, ym, yp).map_err(|e| parse_err(line, e.to_string()))?;
        self.points.push(p);
        Ok(())
    }

    fn finish(self, line: usize) -> Result<AnalysisObject> {
        let path = self.path;
        let mut obj: AnalysisObject = match self.kind {
            BlockKind::Histo => {
                if self.histo_bins.is_empty() {
                    return Err(parse_err(line, format!("histogram '{path}' has no bins")));
                }
                let [under, over] = self.flows1;
                let axis = Axis1D::from_bins(self.histo_bins, under, over).in_object(&path, "read")?;
                Histo1D::new(path.as_str(), axis).into()
            }
            BlockKind::Profile => {
                if self.profile_bins.is_empty() {
                    return Err(parse_err(line, format!("profile '{path}' has no bins")));
                }
                let [under, over] = self.flows2;
                let axis =
                    Axis1D::from_bins(self.profile_bins, under, over).in_object(&path, "read")?;
                Profile1D::new(path.as_str(), axis).into()
            }
            BlockKind::Scatter => Scatter2D::with_points(path.as_str(), self.points).into(),
        };
        for (k, v) in self.annotations {
            obj.annotations_mut().set(k, v).in_object(&path, "read")?;
        }
        Ok(obj)
    }
}

fn expect_columns(line: usize, tokens: &[&str], n: usize) -> Result<()> {
    if tokens.len() == n {
        Ok(())
    } else {
        Err(parse_err(line, format!("expected {n} columns, found {}", tokens.len())))
    }
}

fn floats<const N: usize>(line: usize, tokens: &[&str]) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for (slot, tok) in out.iter_mut().zip(tokens) {
        *slot = parse_f64(tok, line)?;
    }
    Ok(out)
}

/// `Some(0)` for an underflow row, `Some(1)` for overflow, `None` for a bin.
fn flow_slot(line: usize, tokens: &[&str]) -> Result<Option<usize>> {
    let slot = match tokens[0] {
        "Underflow" => 0,
        "Overflow" => 1,
        _ => return Ok(None),
    };
    if tokens[1] != tokens[0] {
        return Err(parse_err(line, format!("malformed {} row", tokens[0])));
    }
    Ok(Some(slot))
}

/// Parse every block in a YODA document, in file order.
pub fn read_yoda_str(text: &str) -> Result<Vec<AnalysisObject>> {
    let mut objects = Vec::new();
    let mut current: Option<Block> = None;
    let mut last_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        last_line = line;
        let trimmed = raw.trim();

        let Some(block) = current.as_mut() else {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("# BEGIN ") {
                let mut parts = rest.split_whitespace();
                let tag = parts.next().unwrap_or_default();
                let kind = BlockKind::from_tag(tag, line)?;
                let path = parts
                    .next()
                    .ok_or_else(|| parse_err(line, "BEGIN line without a path"))?;
                current = Some(Block::new(kind, tag, path, line));
            } else if trimmed.starts_with('#') {
                log::debug!("line {line}: skipping comment outside a block");
            } else {
                return Err(parse_err(line, "content outside a BEGIN/END block"));
            }
            continue;
        };

        if let Some(rest) = trimmed.strip_prefix("# END ") {
            if rest.trim() != block.tag {
                return Err(parse_err(
                    line,
                    format!("END {} does not close {}", rest.trim(), block.tag),
                ));
            }
            if let Some(done) = current.take() {
                objects.push(done.finish(line)?);
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            if trimmed.starts_with("# BEGIN ") {
                return Err(parse_err(line, format!("BEGIN inside unterminated {}", block.tag)));
            }
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens[0] == "Total" {
            log::debug!("line {line}: ignoring Total row");
            continue;
        }
        let is_data = tokens.len() > 1
            && (tokens[0] == "Underflow" || tokens[0] == "Overflow" || tokens[0].parse::<f64>().is_ok());
        // Values are kept verbatim; only the key is trimmed.
        if !is_data && let Some((key, value)) = raw.split_once('=') {
            block.annotation(line, key.trim(), value.strip_suffix('\r').unwrap_or(value))?;
            continue;
        }
        block.row(line, &tokens)?;
    }

    if let Some(block) = current {
        return Err(parse_err(
            last_line,
            format!("{} '{}' opened at line {} is never closed", block.tag, block.path, block.start),
        ));
    }
    Ok(objects)
}

/// Read a YODA or AIDA file, choosing the format from its extension.
pub fn read_path(path: impl AsRef<Path>) -> Result<Vec<AnalysisObject>> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    let objects = read_str(&text, format)?;
    log::debug!("read {} objects from {}", objects.len(), path.display());
    Ok(objects)
}

/// Parse `text` in `format`.
pub fn read_str(text: &str, format: Format) -> Result<Vec<AnalysisObject>> {
    match format {
        Format::Yoda => read_yoda_str(text),
        Format::Aida => Ok(crate::aida::read_aida_str(text)?.into_iter().map(Into::into).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ys_core::Distribution;

    const HISTO: &str = "\
# BEGIN YODA_HISTO1D /ANA/h
Path=/ANA/h
Title=pT
Type=Histo1D
# Mean: 1.16667e+00
# Area: 3.00000e+00
# xlow\t xhigh\t sumw\t sumw2\t sumwx\t sumwx2\t numEntries
Total   \tTotal   \t8.00000e+00\t3.00000e+01\t-2.50000e+00\t9.75000e+00\t3
Underflow\tUnderflow\t5.00000e+00\t2.50000e+01\t-5.00000e+00\t5.00000e+00\t1
Overflow\tOverflow\t0.00000e+00\t0.00000e+00\t0.00000e+00\t0.00000e+00\t0
0.00000e+00\t1.00000e+00\t1.00000e+00\t1.00000e+00\t5.00000e-01\t2.50000e-01\t1
1.00000e+00\t2.00000e+00\t2.00000e+00\t4.00000e+00\t3.00000e+00\t4.50000e+00\t1.00000e+00
# END YODA_HISTO1D

";

    #[test]
    fn reads_histo_block() {
        let objs = read_yoda_str(HISTO).unwrap();
        assert_eq!(objs.len(), 1);
        let h = objs[0].as_histo1d().unwrap();
        assert_eq!(h.path(), "/ANA/h");
        assert_eq!(h.title(), "pT");
        assert_eq!(h.axis().edges(), &[0.0, 1.0, 2.0]);
        assert_eq!(h.bins()[1].sum_w(), 2.0);
        assert_eq!(h.bins()[1].num_entries(), 1);
        assert_eq!(h.underflow().sum_w(), 5.0);
        assert!(!h.annotations().contains("Type"));
    }

    #[test]
    fn unknown_block_is_unsupported() {
        let text = "# BEGIN YODA_HISTO2D /ANA/h2\n# END YODA_HISTO2D\n";
        assert!(matches!(read_yoda_str(text), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn malformed_row_reports_line() {
        let text = "\
# BEGIN YODA_SCATTER2D /REF/s
Path=/REF/s
1.0 0.5 0.5 2.0 0.1
# END YODA_SCATTER2D
";
        match read_yoda_str(text) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unterminated_block() {
        let text = "# BEGIN YODA_SCATTER2D /REF/s\n1 0 0 2 0 0\n";
        assert!(matches!(read_yoda_str(text), Err(Error::Parse { line: 2, .. })));
    }

    #[test]
    fn mismatched_end_and_stray_content() {
        let text = "# BEGIN YODA_SCATTER2D /REF/s\n# END YODA_HISTO1D\n";
        assert!(matches!(read_yoda_str(text), Err(Error::Parse { line: 2, .. })));
        assert!(matches!(read_yoda_str("hello\n"), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn gap_between_bins_is_rejected() {
        let text = "\
# BEGIN YODA_HISTO1D /ANA/h
0 1 0 0 0 0 0
2 3 0 0 0 0 0
# END YODA_HISTO1D
";
        let err = read_yoda_str(text).unwrap_err();
        assert!(matches!(err.root(), Error::InvalidAxis(_)));
    }

    #[test]
    fn profile_block_without_flows() {
        let text = "\
# BEGIN YODA_PROFILE1D /ANA/p
0 2 2 2 2 2 30 500 2
# END YODA_PROFILE1D
";
        let objs = read_yoda_str(text).unwrap();
        let p = objs[0].as_profile1d().unwrap();
        assert_eq!(p.bins()[0].mean(), 15.0);
        assert_eq!(p.underflow().num_entries(), 0);
        assert_eq!(p.path(), "/ANA/p");
    }

    #[test]
    fn annotation_values_are_verbatim() {
        let text = "# BEGIN YODA_SCATTER2D /REF/s\nPath=/REF/elsewhere\n  Title= x \n\
                    Note=a=b\r\n# END YODA_SCATTER2D\n";
        let objs = read_yoda_str(text).unwrap();
        assert_eq!(objs[0].path(), "/REF/s");
        assert_eq!(objs[0].title(), " x ");
        assert_eq!(objs[0].annotations().get("Note"), Some("a=b"));

        let s = Scatter2D::new("/REF/t").with_title("  padded\t");
        let text = crate::writer::to_yoda_string(&s.into()).unwrap();
        let back = read_yoda_str(&text).unwrap();
        assert_eq!(back[0].title(), "  padded\t");
    }
}
