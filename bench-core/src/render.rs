//! Text colormaps of attainment distributions.

use ndarray::Array2;
use std::fmt::Write;

use crate::ecdf::AttainmentRanges;

const DEFAULT_PALETTE: &str = " .:-=+*#%@";

/// Renders a distribution as one character per cell.
///
/// The largest error bucket is printed on the first line, so attained cells
/// gather towards the bottom right as runs progress.
#[derive(Debug, Clone)]
pub struct Colormap {
    palette: Vec<char>,
    legend: Option<AttainmentRanges>,
}

impl Default for Colormap {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.chars().collect(),
            legend: None,
        }
    }
}

impl Colormap {
    /// Colormap with the default ten-level palette.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `palette` from lowest to highest level. Empty palettes are ignored.
    pub fn with_palette(mut self, palette: &str) -> Self {
        if !palette.is_empty() {
            self.palette = palette.chars().collect();
        }
        self
    }

    /// Label rows with error bucket bounds and add an evaluation footer.
    pub fn with_legend(mut self, ranges: &AttainmentRanges) -> Self {
        self.legend = Some(ranges.clone());
        self
    }

    fn glyph(&self, level: f64) -> char {
        let top = self.palette.len() - 1;
        let step = (level.clamp(0.0, 1.0) * top as f64).round() as usize;
        self.palette[step.min(top)]
    }

    /// Render cell values in `[0, 1]`.
    pub fn render(&self, distribution: &Array2<f64>) -> String {
        let (rows, cols) = distribution.dim();
        let mut out = String::new();
        for i in (0..rows).rev() {
            if let Some(ranges) = &self.legend {
                let low = ranges.error.bounds(i).map_or(f64::NAN, |(low, _)| low);
                let _ = write!(out, "{low:>10.2e} |");
            }
            out.extend((0..cols).map(|j| self.glyph(distribution[[i, j]])));
            out.push('\n');
        }
        if let Some(ranges) = &self.legend {
            let _ = writeln!(out, "{:>10} +{}", "", "-".repeat(cols));
            let first = ranges.evaluations.min().to_string();
            let last = ranges.evaluations.max().to_string();
            let gap = (cols + 1).saturating_sub(first.len() + last.len()).max(1);
            let _ = writeln!(out, "{:>10}  {first}{}{last}", "", " ".repeat(gap));
        }
        out
    }

    /// Render run counts as fractions of `runs`.
    pub fn render_histogram(&self, histogram: &Array2<u64>, runs: usize) -> String {
        let runs = runs.max(1) as f64;
        self.render(&histogram.mapv(|count| count as f64 / runs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Range;
    use ndarray::array;

    #[test]
    fn test_render_orders_rows_top_down() {
        let distribution = array![[0.0, 0.5, 1.0], [0.0, 0.0, 1.0]];
        let text = Colormap::new().with_palette(" o#").render(&distribution);
        assert_eq!(text, "  #\n o#\n");
    }

    #[test]
    fn test_render_histogram_scales_by_runs() {
        let histogram = array![[0u64, 2, 4]];
        let text = Colormap::new().with_palette("ab").render_histogram(&histogram, 4);
        assert_eq!(text, "abb\n");
    }

    #[test]
    fn test_render_with_legend() {
        let ranges = AttainmentRanges::new(
            Range::linear(0.0, 10.0, 2).unwrap(),
            Range::linear(1, 100, 4).unwrap(),
        );
        let distribution = Array2::from_elem((2, 4), 1.0);
        let text = Colormap::new().with_legend(&ranges).render(&distribution);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].trim_start().starts_with("5.00e0 |@@@@"));
        assert!(lines[1].trim_start().starts_with("0.00e0 |@@@@"));
        assert!(lines[2].ends_with("+----"));
        assert!(lines[3].trim_start().starts_with('1'));
        assert!(lines[3].ends_with("100"));
    }
}
