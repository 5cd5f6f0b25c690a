//! # Run statistics
//!
//! Plots how the disparity range evolves over a video.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use plotters::prelude::*;

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Plot the per frame minimum and maximum disparity to a PNG.
pub fn plot_disparity_ranges<P: AsRef<Path>>(path: P, ranges: &[(f32, f32)]) -> Result<()> {
    let finite = ranges
        .iter()
        .flat_map(|&(lo, hi)| [lo, hi])
        .filter(|v| v.is_finite());
    let (mut lo, mut hi) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !(lo.is_finite() && hi.is_finite()) {
        lo = 0.0;
        hi = 1.0;
    }
    if hi <= lo {
        hi = lo + 1.0;
    }

    let root = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Disparity range per frame", ("sans-serif", 20).into_font())
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0..ranges.len().max(1), lo..hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Frame")
        .y_desc("Disparity (px)")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            ranges.iter().enumerate().map(|(i, r)| (i, r.0)),
            &RED
        ))
        .map_err(plot_err)?
        .label("Min disparity")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(
            ranges.iter().enumerate().map(|(i, r)| (i, r.1)),
            &BLUE
        ))
        .map_err(plot_err)?
        .label("Max disparity")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Statistics(e.to_string())
}
