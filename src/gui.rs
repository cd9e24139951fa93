// Uses bevy + bevy_egui for the parameter form and the energy chart
use std::path::Path;
use bevy::{log::LogPlugin, prelude::*, window::WindowResolution};
use bevy_egui::{egui, EguiContexts, EguiPlugin};
use crate::prelude::*;
use crate::chart::{self, Curve};
use crate::simulation;

// Resources
#[derive(Resource)]
pub struct Settings(pub AppConfig);

/// Raw form text, the pending error message and the latest run
#[derive(Resource, Default)]
pub struct FormState {
	pub mass: String,
	pub stiffness: String,
	pub damping: String,
	pub error: Option<String>,
	pub status: Option<String>,
	pub series: Option<TimeSeries>
}

impl FormState {
	/// Validates the fields and runs the simulation, any failure ends up in `self.error`
	pub fn submit(&mut self, solver: &SolverSettings) {
		let params = match parse_parameters(&self.mass, &self.stiffness, &self.damping) {
			Ok(p) => p,
			Err(e) => {
				warn!("Rejected input: {}", e);
				self.error = Some(e.to_string());
				return;
			}
		};
		match simulation::run(&params, solver) {
			Ok(series) => {
				self.status = Some(format!(
					"m = {} kg, k = {} N/m, b = {} kg/s, {:?}",
					params.mass(), params.stiffness(), params.damping(), params.model().regime()
				));
				self.series = Some(series);
			},
			Err(e) => {
				error!("Simulation failed: {}", e);
				self.error = Some(e.to_string());
			}
		}
	}
	pub fn save(&mut self, settings: &ChartSettings, path: &Path) {
		let Some(series) = &self.series else {
			return;
		};
		match chart::save_png(series, settings, path) {
			Ok(()) => self.status = Some(format!("Saved chart to {}", path.display())),
			Err(e) => {
				error!("Could not save chart: {}", e);
				self.error = Some(e.to_string());
			}
		}
	}
}

fn color(rgb: [u8; 3]) -> egui::Color32 {
	egui::Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

fn draw_chart(painter: &egui::Painter, rect: egui::Rect, series: Option<&TimeSeries>) {
	let layout = ChartLayout::new(rect.width() as Float, rect.height() as Float, series);
	let to_pos = |px: V2| egui::pos2(rect.left() + px.x as f32, rect.top() + px.y as f32);
	let font = egui::FontId::proportional(13.0);
	let text_color = color(chart::AXIS_COLOR);
	painter.rect_filled(rect, 0.0, color(chart::BACKGROUND));
	// Grid and tick labels
	let grid_stroke = egui::Stroke::new(1.0, color(chart::GRID_COLOR));
	for t in layout.t_ticks() {
		let bottom = to_pos(layout.data_to_px(t, 0.0));
		painter.line_segment([to_pos(layout.data_to_px(t, layout.e_max)), bottom], grid_stroke);
		painter.text(bottom + egui::vec2(0.0, 4.0), egui::Align2::CENTER_TOP, chart::tick_label(t, layout.t_tick_step()), font.clone(), text_color);
	}
	for e in layout.e_ticks() {
		let left = to_pos(layout.data_to_px(0.0, e));
		painter.line_segment([left, to_pos(layout.data_to_px(layout.t_max, e))], grid_stroke);
		painter.text(left - egui::vec2(6.0, 0.0), egui::Align2::RIGHT_CENTER, chart::tick_label(e, layout.e_tick_step()), font.clone(), text_color);
	}
	// Axes
	let axis_stroke = egui::Stroke::new(1.0, text_color);
	let origin = to_pos(layout.data_to_px(0.0, 0.0));
	painter.line_segment([origin, to_pos(layout.data_to_px(layout.t_max, 0.0))], axis_stroke);
	painter.line_segment([origin, to_pos(layout.data_to_px(0.0, layout.e_max))], axis_stroke);
	// Labels
	painter.text(rect.center_top() + egui::vec2(0.0, 8.0), egui::Align2::CENTER_TOP, chart::TITLE, egui::FontId::proportional(16.0), text_color);
	painter.text(rect.center_bottom() - egui::vec2(0.0, 6.0), egui::Align2::CENTER_BOTTOM, chart::X_LABEL, font.clone(), text_color);
	painter.text(to_pos(V2::new(layout.plot_left(), layout.plot_top())) - egui::vec2(0.0, 4.0), egui::Align2::LEFT_BOTTOM, chart::Y_LABEL, font.clone(), text_color);
	let Some(series) = series else {
		return;
	};
	// Curves
	for curve in Curve::ALL {
		let points: Vec<egui::Pos2> = layout.curve_points(series, curve).into_iter().map(to_pos).collect();
		let stroke = egui::Stroke::new(2.0, color(curve.color()));
		if curve.dashed() {
			painter.extend(egui::Shape::dashed_line(&points, stroke, chart::DASH.0 as f32, chart::DASH.1 as f32));
		}
		else {
			painter.add(egui::Shape::line(points, stroke));
		}
	}
	// Legend
	for (i, curve) in Curve::ALL.iter().enumerate() {
		let y = layout.plot_top() + 12.0 + (i as Float) * 18.0;
		let x = layout.plot_right() - 230.0;
		let start = to_pos(V2::new(x, y));
		let end = to_pos(V2::new(x + 30.0, y));
		let stroke = egui::Stroke::new(3.0, color(curve.color()));
		if curve.dashed() {
			painter.extend(egui::Shape::dashed_line(&[start, end], stroke, chart::DASH.0 as f32, chart::DASH.1 as f32));
		}
		else {
			painter.line_segment([start, end], stroke);
		}
		painter.text(end + egui::vec2(6.0, 0.0), egui::Align2::LEFT_CENTER, curve.label(), font.clone(), text_color);
	}
}

// Systems
fn camera_setup(mut commands: Commands) {
	commands.spawn(Camera2dBundle::default());
}

fn form_system(
	mut contexts: EguiContexts,
	mut form: ResMut<FormState>,
	settings: Res<Settings>
) {
	let ctx = contexts.ctx_mut();
	let form = &mut *form;
	let blocked = form.error.is_some();
	let mut run_clicked = false;
	let mut save_clicked = false;
	egui::TopBottomPanel::top("parameters").show(ctx, |ui| {
		ui.add_space(6.0);
		ui.add_enabled_ui(!blocked, |ui| {
			egui::Grid::new("parameter_grid")
				.num_columns(2)
				.spacing([10.0, 6.0])
				.show(ui, |ui| {
					ui.label("Mass (kg):");
					ui.text_edit_singleline(&mut form.mass);
					ui.end_row();
					ui.label("Spring stiffness k (N/m):");
					ui.text_edit_singleline(&mut form.stiffness);
					ui.end_row();
					ui.label("Damping coefficient b (kg/s):");
					ui.text_edit_singleline(&mut form.damping);
					ui.end_row();
				});
			ui.horizontal(|ui| {
				run_clicked = ui.button("Run simulation").clicked();
				save_clicked = ui.add_enabled(form.series.is_some(), egui::Button::new("Save PNG")).clicked();
				if let Some(status) = &form.status {
					ui.label(status.as_str());
				}
			});
		});
		ui.add_space(6.0);
	});
	egui::CentralPanel::default().show(ctx, |ui| {
		let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::hover());
		draw_chart(&painter, response.rect, form.series.as_ref());
	});
	// Blocking error notification
	if let Some(message) = form.error.clone() {
		egui::Window::new("Error")
			.collapsible(false)
			.resizable(false)
			.anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
			.show(ctx, |ui| {
				ui.label(message.as_str());
				if ui.button("OK").clicked() {
					form.error = None;
				}
			});
	}
	if run_clicked {
		form.submit(&settings.0.solver);
	}
	if save_clicked {
		form.save(&settings.0.chart, Path::new(chart::DEFAULT_PNG_PATH));
	}
}

struct MainPlugin;

impl Plugin for MainPlugin {
	fn build(&self, app: &mut App) {
		app.init_resource::<FormState>();
		app.add_systems(Startup, camera_setup);
		app.add_systems(Update, form_system);
	}
}

/// Logging is expected to be set up by the caller already, so `LogPlugin` is left out
pub fn main(config: AppConfig) {
	let resolution = WindowResolution::new(config.window.width, config.window.height);
	let mut app = App::new();
	app.add_plugins((
		DefaultPlugins.set(WindowPlugin {
			primary_window: Some(Window {
				title: APP_NAME.to_string(),
				resolution,
				..Default::default()
			}),
			..Default::default()
		}).disable::<LogPlugin>(),
		EguiPlugin,
		MainPlugin
	));
	app.insert_resource(Settings(config));
	info!("Starting bevy app");
	app.run();
}

#[cfg(test)]
mod tests {
	use super::*;
	fn form(mass: &str, stiffness: &str, damping: &str) -> FormState {
		FormState {
			mass: mass.to_string(),
			stiffness: stiffness.to_string(),
			damping: damping.to_string(),
			..Default::default()
		}
	}
	#[test]
	fn invalid_input_shows_error() {
		let mut f = form("0", "10", "0.5");
		f.submit(&SolverSettings::default());
		assert_eq!(f.error.as_deref(), Some("Mass must be a positive number."));
		assert!(f.series.is_none());
	}
	#[test]
	fn valid_input_replaces_series() {
		let mut f = form("1", "10", "0.5");
		f.submit(&SolverSettings::default());
		assert!(f.error.is_none());
		assert_eq!(f.series.as_ref().unwrap().len(), NUM_SAMPLES);
		// A later bad run keeps the last good chart
		f.damping = "-0.1".to_string();
		f.submit(&SolverSettings::default());
		assert_eq!(f.error.as_deref(), Some("Damping coefficient cannot be negative."));
		assert_eq!(f.series.as_ref().unwrap().parameters.damping(), 0.5);
	}
	#[test]
	fn save_without_series_does_nothing() {
		let mut f = FormState::default();
		f.save(&ChartSettings::default(), Path::new("unused.png"));
		assert!(f.status.is_none());
		assert!(f.error.is_none());
	}
}
