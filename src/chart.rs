// Chart geometry shared by the window and PNG export, plus the PNG renderer
use std::path::Path;
use image::{ImageBuffer, Rgb, RgbImage};
use log::info;
use crate::prelude::*;

pub const TITLE: &str = "Energy transformations of a mass on a spring";
pub const X_LABEL: &str = "Time (s)";
pub const Y_LABEL: &str = "Energy (J)";

pub const BACKGROUND: [u8; 3] = [255, 255, 255];
pub const AXIS_COLOR: [u8; 3] = [0, 0, 0];
pub const GRID_COLOR: [u8; 3] = [220, 220, 220];

pub const DEFAULT_PNG_PATH: &str = "energy.png";

/// Dash and gap length in pixels for the total energy curve
pub const DASH: (Float, Float) = (8.0, 5.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
	Kinetic,
	Potential,
	Total
}

impl Curve {
	pub const ALL: [Curve; 3] = [Curve::Kinetic, Curve::Potential, Curve::Total];
	pub fn label(&self) -> &'static str {
		match self {
			Curve::Kinetic => "Kinetic energy",
			Curve::Potential => "Potential energy",
			Curve::Total => "Total mechanical energy"
		}
	}
	pub fn color(&self) -> [u8; 3] {
		match self {
			Curve::Kinetic => [31, 119, 180],
			Curve::Potential => [255, 127, 14],
			Curve::Total => [44, 160, 44]
		}
	}
	pub fn dashed(&self) -> bool {
		*self == Curve::Total
	}
	pub fn value(&self, sample: &EnergySample) -> Float {
		match self {
			Curve::Kinetic => sample.kinetic,
			Curve::Potential => sample.potential,
			Curve::Total => sample.total
		}
	}
}

/// Spacing of roughly `target` ticks over `range`, rounded to 1, 2 or 5 times a power of ten
pub fn nice_step(range: Float, target: usize) -> Float {
	if !(range > 0.0) || target == 0 {
		return 1.0;
	}
	let raw = range / (target as Float);
	let magnitude = (10.0 as Float).powf(raw.log10().floor());
	let residual = raw / magnitude;
	let nice = if residual <= 1.0 {1.0}
		else if residual <= 2.0 {2.0}
		else if residual <= 5.0 {5.0}
		else {10.0};
	nice * magnitude
}

/// Tick label with just enough decimals for the tick spacing
pub fn tick_label(value: Float, step: Float) -> String {
	let decimals = if step > 0.0 {(-step.log10().floor()).max(0.0) as usize} else {0};
	format!("{:.*}", decimals, value)
}

/// Maps (time, energy) to pixel coordinates inside a plot area. Pixel Y grows downwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartLayout {
	pub width: Float,
	pub height: Float,
	pub margin_left: Float,
	pub margin_right: Float,
	pub margin_top: Float,
	pub margin_bottom: Float,
	pub t_max: Float,
	pub e_max: Float
}

impl ChartLayout {
	pub fn new(width: Float, height: Float, series: Option<&TimeSeries>) -> Self {
		let peak = series.map_or(0.0, |s| s.peak_energy());
		let e_max = if peak > 0.0 {
			let padded = peak * 1.05;
			let step = nice_step(padded, 5);
			(padded / step).ceil() * step
		}
		else {
			1.0
		};
		Self {
			width,
			height,
			margin_left: 70.0,
			margin_right: 20.0,
			margin_top: 40.0,
			margin_bottom: 50.0,
			t_max: T_END,
			e_max
		}
	}
	pub fn plot_left(&self) -> Float {
		self.margin_left
	}
	pub fn plot_right(&self) -> Float {
		(self.width - self.margin_right).max(self.margin_left + 1.0)
	}
	pub fn plot_top(&self) -> Float {
		self.margin_top
	}
	pub fn plot_bottom(&self) -> Float {
		(self.height - self.margin_bottom).max(self.margin_top + 1.0)
	}
	pub fn data_to_px(&self, t: Float, e: Float) -> V2 {
		let x = self.plot_left() + (t / self.t_max) * (self.plot_right() - self.plot_left());
		let y = self.plot_bottom() - (e / self.e_max) * (self.plot_bottom() - self.plot_top());
		V2::new(x, y)
	}
	/// Rounded pixel position, None if it falls off the image
	pub fn to_pixel(&self, px: V2) -> Option<(u32, u32)> {
		let x = px.x.round();
		let y = px.y.round();
		if x < 0.0 || y < 0.0 || x >= self.width || y >= self.height {
			return None;
		}
		Some((x as u32, y as u32))
	}
	pub fn t_ticks(&self) -> Vec<Float> {
		Self::ticks(self.t_max)
	}
	pub fn e_ticks(&self) -> Vec<Float> {
		Self::ticks(self.e_max)
	}
	pub fn e_tick_step(&self) -> Float {
		nice_step(self.e_max, 5)
	}
	pub fn t_tick_step(&self) -> Float {
		nice_step(self.t_max, 5)
	}
	fn ticks(max: Float) -> Vec<Float> {
		let step = nice_step(max, 5);
		let count = (max / step + 1e-9).floor() as usize;
		(0..=count).map(|i| (i as Float) * step).collect()
	}
	/// Pixel polyline of one curve
	pub fn curve_points(&self, series: &TimeSeries, curve: Curve) -> Vec<V2> {
		series.samples.iter().map(|s| self.data_to_px(s.t, curve.value(s))).collect()
	}
}

struct Pen<'a> {
	image: &'a mut RgbImage,
	layout: &'a ChartLayout
}

impl<'a> Pen<'a> {
	fn dot(&mut self, px: V2, color: Rgb<u8>) {
		if let Some((x, y)) = self.layout.to_pixel(px) {
			self.image.put_pixel(x, y, color);
		}
	}
	/// Walks the segment one pixel at a time. `dash` is (on, off) in pixels, `phase` carries the dash position between segments.
	fn line(&mut self, from: V2, to: V2, color: Rgb<u8>, thickness: u32, dash: Option<(Float, Float)>, phase: &mut Float) {
		let delta = to - from;
		let length = delta.magnitude();
		let steps = length.ceil().max(1.0) as usize;
		for i in 0..=steps {
			let frac = (i as Float) / (steps as Float);
			let along = *phase + frac * length;
			let visible = match dash {
				Some((on, off)) => along % (on + off) < on,
				None => true
			};
			if visible {
				let p = from + delta * frac;
				for offset in 0..thickness {
					self.dot(p + V2::new(0.0, offset as Float), color);
				}
			}
		}
		*phase += length;
	}
}

pub fn render_png(series: &TimeSeries, settings: &ChartSettings) -> RgbImage {
	let layout = ChartLayout::new(settings.width as Float, settings.height as Float, Some(series));
	let mut image: RgbImage = ImageBuffer::from_pixel(settings.width, settings.height, Rgb(BACKGROUND));
	let mut pen = Pen {
		image: &mut image,
		layout: &layout
	};
	let mut no_phase = 0.0;
	// Grid
	for t in layout.t_ticks() {
		let top = layout.data_to_px(t, layout.e_max);
		let bottom = layout.data_to_px(t, 0.0);
		pen.line(top, bottom, Rgb(GRID_COLOR), 1, None, &mut no_phase);
	}
	for e in layout.e_ticks() {
		let left = layout.data_to_px(0.0, e);
		let right = layout.data_to_px(layout.t_max, e);
		pen.line(left, right, Rgb(GRID_COLOR), 1, None, &mut no_phase);
	}
	// Axes
	let origin = layout.data_to_px(0.0, 0.0);
	pen.line(origin, layout.data_to_px(layout.t_max, 0.0), Rgb(AXIS_COLOR), 1, None, &mut no_phase);
	pen.line(origin, layout.data_to_px(0.0, layout.e_max), Rgb(AXIS_COLOR), 1, None, &mut no_phase);
	// Curves
	for curve in Curve::ALL {
		let points = layout.curve_points(series, curve);
		let dash = if curve.dashed() {Some(DASH)} else {None};
		let mut phase = 0.0;
		for pair in points.windows(2) {
			pen.line(pair[0], pair[1], Rgb(curve.color()), 2, dash, &mut phase);
		}
	}
	// Legend swatches, top right of the plot area
	for (i, curve) in Curve::ALL.iter().enumerate() {
		let y = layout.plot_top() + 10.0 + (i as Float) * 14.0;
		let x = layout.plot_right() - 40.0;
		let mut phase = 0.0;
		let dash = if curve.dashed() {Some(DASH)} else {None};
		pen.line(V2::new(x, y), V2::new(x + 30.0, y), Rgb(curve.color()), 3, dash, &mut phase);
	}
	// Done
	image
}

pub fn save_png(series: &TimeSeries, settings: &ChartSettings, path: &Path) -> Result<(), Error> {
	let image = render_png(series, settings);
	image.save(path)?;
	info!("Saved chart to {}", path.display());
	Ok(())
}
