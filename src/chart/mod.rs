/////////////////////////////////////////////////////////////////////////////////////
//
// Mask SIRD model
//
// chart module
//
// draws the four compartments as a share of the population over time
// plotters renders the figure as SVG, svg2pdf turns it into the PDF on disk
//
////////////////////////////////////////////////////////////////////////////////////
use super::model::Compartment;
use super::stats::Trajectory;
use log::warn;
use plotters::prelude::*;
use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use svg2pdf::usvg;
use svg2pdf::{ConversionOptions, PageOptions};

const FIGURE_SIZE: (u32, u32) = (800, 600);
const PLOT_BACKGROUND: RGBColor = RGBColor(0xdd, 0xdd, 0xdd);
const LEGEND_BORDER: RGBColor = RGBColor(0xcc, 0xcc, 0xcc);
const LINE_WIDTH: u32 = 2;

fn colour(compartment: Compartment) -> RGBAColor {
    let base = match compartment {
        Compartment::Susceptible => BLUE,
        Compartment::Infected => RED,
        Compartment::Recovered => GREEN,
        Compartment::Deceased => BLACK,
    };
    base.mix(0.5)
}

// Render the trajectory as an SVG document.
pub fn render_svg(trajectory: &Trajectory, title: &str) -> Result<String, Box<dyn Error>> {
    let mut svg = String::new();
    {
        let x_end = trajectory.times.last().copied().unwrap_or(1.0);
        let x_start = trajectory.times.first().copied().unwrap_or(0.0);

        let root = SVGBackend::with_string(&mut svg, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(title, ("sans-serif", 22).into_font())?;

        let mut chart = ChartBuilder::on(&area)
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(x_start..x_end, 0f64..1f64)?;

        chart.plotting_area().fill(&PLOT_BACKGROUND)?;

        // white major grid on grey, no spines, no tick marks
        chart
            .configure_mesh()
            .bold_line_style(WHITE.stroke_width(2))
            .light_line_style(TRANSPARENT.stroke_width(0))
            .axis_style(TRANSPARENT.stroke_width(0))
            .set_all_tick_mark_size(0)
            .x_desc("Time /days")
            .y_desc("People %")
            .draw()?;

        for compartment in Compartment::ALL.iter() {
            let line = colour(*compartment);
            chart
                .draw_series(LineSeries::new(
                    trajectory.normalized_series(*compartment),
                    line.stroke_width(LINE_WIDTH),
                ))?
                .label(compartment.label())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], line.stroke_width(LINE_WIDTH))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.5).filled())
            .border_style(LEGEND_BORDER.mix(0.5).stroke_width(1))
            .draw()?;

        root.present()?;
    }
    Ok(svg)
}

// Convert an SVG document to PDF, using the system fonts for its text.
pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options)?;
    let pdf = svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
        .map_err(|e| format!("PDF conversion failed: {:?}", e))?;
    Ok(pdf)
}

// Render the trajectory to a PDF file at `path`.
pub fn draw(trajectory: &Trajectory, title: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    let pdf = svg_to_pdf(&render_svg(trajectory, title)?)?;
    fs::write(path, pdf)?;
    Ok(())
}

/// Opens the saved figure in the desktop's default viewer.
/// Returns false, after a warning, when no viewer could be started.
pub fn show(path: &Path) -> bool {
    show_with(path, |p| opener::open(p))
}

fn show_with<F, E>(path: &Path, open: F) -> bool
where
    F: FnOnce(&Path) -> Result<(), E>,
    E: Display,
{
    match open(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("cannot display {}: {}", path.display(), e);
            false
        }
    }
}
