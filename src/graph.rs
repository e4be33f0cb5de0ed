use anyhow::{Context, Result};
use image::{ImageEncoder, Rgb, RgbImage};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::ops::Range;

/// Blank border kept around the content when cropping
const CROP_PADDING: u32 = 10;
const POINT_SIZE: i32 = 4;
const LINE_WIDTH: u32 = 2;
/// Share of a category slot covered by its bars
const BAR_SPAN: f64 = 0.8;
/// Largest canvas accepted, in pixels
const MAX_CANVAS_PIXELS: u64 = 50_000_000;

type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// One plot axis: a numeric range, with optional category names at integer positions
#[derive(Debug, Clone, PartialEq)]
pub struct AxisScale {
    pub label: String,
    pub range: Range<f64>,
    pub categories: Option<Vec<String>>,
}

impl AxisScale {
    /// Range covering `values` with 5% padding on each side
    pub fn continuous(label: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let range = if min > max {
            0.0..1.0
        } else if min == max {
            (min - 1.0)..(max + 1.0)
        } else {
            let padding = (max - min) * 0.05;
            (min - padding)..(max + padding)
        };

        Self {
            label: label.into(),
            range,
            categories: None,
        }
    }

    /// Evenly spaced slots `0..n`, each labelled with its category
    pub fn categorical(label: impl Into<String>, categories: Vec<String>) -> Self {
        let n = categories.len().max(1) as f64;
        Self {
            label: label.into(),
            range: -0.5..(n - 0.5),
            categories: Some(categories),
        }
    }

    /// Stretch the range so it contains zero (bar baselines)
    pub fn with_zero(mut self) -> Self {
        if self.range.start > 0.0 {
            self.range.start = 0.0;
        }
        if self.range.end < 0.0 {
            self.range.end = 0.0;
        }
        self
    }

    fn label_count(&self) -> usize {
        match &self.categories {
            Some(categories) => categories.len().clamp(1, 30),
            None => 10,
        }
    }

    fn format(&self, value: f64) -> String {
        match &self.categories {
            Some(categories) => {
                let slot = value.round();
                if (value - slot).abs() > 1e-6 || slot < 0.0 {
                    return String::new();
                }
                categories.get(slot as usize).cloned().unwrap_or_default()
            }
            None => format_tick(value),
        }
    }
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Points drawn with one colour under one legend entry
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
}

/// Bar lengths per category slot; `None` leaves the slot empty
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub label: String,
    pub values: Vec<Option<f64>>,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Categories along X, bars grow upwards
    Vertical,
    /// Categories along Y, bars grow to the right
    Horizontal,
}

/// Bitmap canvas with fixed axes
pub struct Canvas {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    title: String,
    x: AxisScale,
    y: AxisScale,
}

impl Canvas {
    pub fn new(width: u32, height: u32, title: &str, x: AxisScale, y: AxisScale) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("Canvas size must be positive (got {}x{})", width, height);
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_CANVAS_PIXELS {
            anyhow::bail!(
                "Canvas size {}x{} exceeds the limit of {} pixels",
                width,
                height,
                MAX_CANVAS_PIXELS
            );
        }
        let len = usize::try_from(pixels * 3).context("Canvas too large for this platform")?;

        Ok(Canvas {
            buffer: vec![255u8; len],
            width,
            height,
            title: title.to_string(),
            x,
            y,
        })
    }

    /// One polyline per series, in point order
    pub fn draw_lines(&mut self, series: &[Series]) -> Result<()> {
        let legend = series.len() > 1;
        self.plot(legend, |chart| {
            for s in series {
                let style = s.color.stroke_width(LINE_WIDTH);
                let anno = chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), style))
                    .context("Failed to draw line series")?;
                if legend {
                    anno.label(s.label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                }
            }
            Ok(())
        })
    }

    pub fn draw_points(&mut self, series: &[Series], legend: bool) -> Result<()> {
        self.plot(legend, |chart| {
            for s in series {
                let style = s.color.filled();
                let anno = chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), POINT_SIZE, style)),
                    )
                    .context("Failed to draw point series")?;
                if legend {
                    anno.label(s.label.as_str())
                        .legend(move |(x, y)| Circle::new((x + 10, y), POINT_SIZE, style));
                }
            }
            Ok(())
        })
    }

    /// Dodged bars: each series gets its own lane inside every category slot
    pub fn draw_bars(&mut self, series: &[BarSeries], orientation: Orientation) -> Result<()> {
        let legend = series.len() > 1;
        let lanes = series.len().max(1) as f64;
        let lane_width = BAR_SPAN / lanes;

        self.plot(legend, |chart| {
            for (lane, s) in series.iter().enumerate() {
                let offset = (lane as f64 - (lanes - 1.0) / 2.0) * lane_width;
                let style = s.color.filled();
                let bars = s
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(slot, value)| value.map(|v| (slot, v)))
                    .map(|(slot, value)| {
                        let center = slot as f64 + offset;
                        let (lo, hi) = (center - lane_width / 2.0, center + lane_width / 2.0);
                        let corners = match orientation {
                            Orientation::Vertical => [(lo, 0.0), (hi, value)],
                            Orientation::Horizontal => [(0.0, lo), (value, hi)],
                        };
                        Rectangle::new(corners, style)
                    });
                let anno = chart.draw_series(bars).context("Failed to draw bars")?;
                if legend {
                    anno.label(s.label.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], style));
                }
            }
            Ok(())
        })
    }

    /// Shared frame: background, caption, mesh, then the layer, then the legend
    fn plot<F>(&mut self, legend: bool, draw: F) -> Result<()>
    where
        F: FnOnce(&mut Chart<'_, '_>) -> Result<()>,
    {
        let (width, height) = (self.width, self.height);
        let (x, y) = (&self.x, &self.y);
        let root =
            BitMapBackend::with_buffer(&mut self.buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(self.title.as_str(), ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x.range.clone(), y.range.clone())
            .context("Failed to build chart")?;

        let x_formatter = |v: &f64| x.format(*v);
        let y_formatter = |v: &f64| y.format(*v);
        chart
            .configure_mesh()
            .x_labels(x.label_count())
            .y_labels(y.label_count())
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .x_desc(x.label.as_str())
            .y_desc(y.label.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        draw(&mut chart)?;

        if legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .context("Failed to draw legend")?;
        }

        root.present().context("Failed to present drawing")?;
        Ok(())
    }

    /// Hand over the drawn bitmap, cropped to its content
    pub fn finish(self) -> Result<RgbImage> {
        let image = RgbImage::from_raw(self.width, self.height, self.buffer)
            .context("Canvas buffer does not match its dimensions")?;
        Ok(crop_to_content(&image, CROP_PADDING))
    }
}

/// Crop away the white border around the drawn content, keeping `padding` pixels
pub fn crop_to_content(image: &RgbImage, padding: u32) -> RgbImage {
    let background = Rgb([255u8, 255, 255]);
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if *pixel != background {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }

    let Some((x0, y0, x1, y1)) = bounds else {
        return image.clone();
    };
    let left = x0.saturating_sub(padding);
    let top = y0.saturating_sub(padding);
    let right = x1.saturating_add(padding).min(image.width() - 1);
    let bottom = y1.saturating_add(padding).min(image.height() - 1);
    image::imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image()
}

/// Encode an RGB image as PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    #[test]
    fn test_continuous_range_padding() {
        let axis = AxisScale::continuous("x", vec![0.0, 10.0]);
        assert_eq!(axis.range, -0.5..10.5);
    }

    #[test]
    fn test_continuous_range_single_value() {
        let axis = AxisScale::continuous("x", vec![3.0, 3.0]);
        assert_eq!(axis.range, 2.0..4.0);
    }

    #[test]
    fn test_continuous_range_empty() {
        let axis = AxisScale::continuous("x", Vec::new());
        assert_eq!(axis.range, 0.0..1.0);
    }

    #[test]
    fn test_with_zero() {
        let axis = AxisScale::continuous("y", vec![10.0, 20.0]).with_zero();
        assert_eq!(axis.range.start, 0.0);
        let axis = AxisScale::continuous("y", vec![-10.0, -20.0]).with_zero();
        assert_eq!(axis.range.end, 0.0);
    }

    #[test]
    fn test_categorical_format_only_at_slots() {
        let axis = AxisScale::categorical("c", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(axis.range, -0.5..1.5);
        assert_eq!(axis.format(0.0), "a");
        assert_eq!(axis.format(1.0), "b");
        assert_eq!(axis.format(0.5), "");
        assert_eq!(axis.format(-1.0), "");
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(5.0), "5");
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(0.125), "0.125");
    }

    #[test]
    fn test_crop_to_content() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        image.put_pixel(50, 40, Rgb([0, 0, 0]));
        image.put_pixel(60, 45, Rgb([0, 0, 0]));
        let cropped = crop_to_content(&image, 5);
        assert_eq!(cropped.dimensions(), (21, 16));
        assert_eq!(*cropped.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_crop_blank_image_is_unchanged() {
        let image = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        assert_eq!(crop_to_content(&image, 2).dimensions(), (10, 10));
    }

    #[test]
    fn test_zero_sized_canvas_rejected() {
        let x = AxisScale::continuous("x", vec![1.0]);
        let y = AxisScale::continuous("y", vec![1.0]);
        assert!(Canvas::new(0, 10, "t", x, y).is_err());
    }

    #[test]
    fn test_oversized_canvas_rejected() {
        let x = AxisScale::continuous("x", vec![1.0]);
        let y = AxisScale::continuous("y", vec![1.0]);
        let err = Canvas::new(100_000, 100_000, "t", x, y).err().unwrap();
        assert!(err.to_string().contains("exceeds the limit"));
    }

    #[test]
    fn test_draw_lines_renders_png() {
        let x = AxisScale::continuous("x", vec![1.0, 2.0, 3.0]);
        let y = AxisScale::continuous("y", vec![10.0, 30.0]);
        let mut canvas = Canvas::new(400, 300, "Lines", x, y).unwrap();
        canvas
            .draw_lines(&[Series {
                label: "y".to_string(),
                points: vec![(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)],
                color: BLUE,
            }])
            .unwrap();
        let image = canvas.finish().unwrap();
        assert!(image.width() <= 400 && image.height() <= 300);
        assert!(is_valid_png(&encode_png(&image).unwrap()));
    }

    #[test]
    fn test_draw_bars_horizontal() {
        let x = AxisScale::continuous("v", vec![5.0, 8.0]).with_zero();
        let y = AxisScale::categorical("c", vec!["a".to_string(), "b".to_string()]);
        let mut canvas = Canvas::new(400, 300, "Bars", x, y).unwrap();
        let series = [
            BarSeries { label: "v".to_string(), values: vec![Some(5.0), None], color: RED },
            BarSeries { label: "w".to_string(), values: vec![Some(8.0), Some(1.0)], color: GREEN },
        ];
        assert!(canvas.draw_bars(&series, Orientation::Horizontal).is_ok());
    }
}
