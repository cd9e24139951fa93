// Opens the form by default, `--headless` runs one simulation and writes the chart to a PNG instead
use std::{env, fs, path::PathBuf, process::ExitCode};
use bevy::{app::App, log::LogPlugin};
use oscillator_energy::prelude::*;
use oscillator_energy::chart::DEFAULT_PNG_PATH;

const USAGE: &str = "Usage: oscillator_energy [--config PATH] [--headless MASS STIFFNESS DAMPING [--out PNG] [--csv CSV]]";

#[derive(Debug, PartialEq)]
struct Headless {
	mass: String,
	stiffness: String,
	damping: String,
	out: PathBuf,
	csv: Option<PathBuf>
}

#[derive(Debug, PartialEq, Default)]
struct Args {
	config: Option<PathBuf>,
	headless: Option<Headless>
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
	let mut out = Args::default();
	let mut args = args.into_iter();
	let mut positional = Vec::<String>::new();
	let mut headless = false;
	let mut png: Option<PathBuf> = None;
	let mut csv: Option<PathBuf> = None;
	while let Some(arg) = args.next() {
		match arg.as_str() {
			"--config" => out.config = Some(args.next().ok_or("--config needs a path")?.into()),
			"--out" => png = Some(args.next().ok_or("--out needs a path")?.into()),
			"--csv" => csv = Some(args.next().ok_or("--csv needs a path")?.into()),
			"--headless" => headless = true,
			_ => positional.push(arg)
		}
	}
	if !headless {
		if !positional.is_empty() || png.is_some() || csv.is_some() {
			return Err("parameters and output paths are only used with --headless".to_string());
		}
		return Ok(out);
	}
	let [mass, stiffness, damping]: [String; 3] = positional.try_into()
		.map_err(|_| "--headless needs exactly three values: MASS STIFFNESS DAMPING".to_string())?;
	out.headless = Some(Headless {
		mass,
		stiffness,
		damping,
		out: png.unwrap_or_else(|| PathBuf::from(DEFAULT_PNG_PATH)),
		csv
	});
	// Done
	Ok(out)
}

/// `LogPlugin` installs the global subscriber when it's built, the window leaves it out of its own plugins
fn init_logging() {
	App::new().add_plugins(LogPlugin::default());
}

fn run_headless(config: &AppConfig, headless: &Headless) -> Result<(), Error> {
	let params = parse_parameters(&headless.mass, &headless.stiffness, &headless.damping)?;
	let series = run(&params, &config.solver)?;
	println!("{:?}, omega = {:.4} rad/s, damping ratio = {:.4}", params.model().regime(), params.model().angular_frequency(), params.model().damping_ratio());
	let last = series.len() - 1;
	for i in [0, last / 4, last / 2, 3 * last / 4, last] {
		let s = &series.samples[i];
		println!("t = {:6.2} s  KE = {:.6e} J  PE = {:.6e} J  E = {:.6e} J", s.t, s.kinetic, s.potential, s.total);
	}
	save_png(&series, &config.chart, &headless.out)?;
	if let Some(path) = &headless.csv {
		fs::write(path, series.to_csv())?;
		log::info!("Wrote samples to {}", path.display());
	}
	Ok(())
}

fn main() -> ExitCode {
	let args = match parse_args(env::args().skip(1)) {
		Ok(a) => a,
		Err(message) => {
			eprintln!("{}\n{}", message, USAGE);
			return ExitCode::FAILURE;
		}
	};
	// Before the config is read, so its log lines aren't lost
	init_logging();
	let config = match &args.config {
		Some(path) => AppConfig::from_config_file(path),
		None => AppConfig::from_default_sources()
	};
	let config = match config {
		Ok(c) => c,
		Err(e) => {
			eprintln!("{}", e);
			return ExitCode::FAILURE;
		}
	};
	match &args.headless {
		Some(headless) => match run_headless(&config, headless) {
			Ok(()) => ExitCode::SUCCESS,
			Err(e) => {
				eprintln!("{}", e);
				ExitCode::FAILURE
			}
		},
		None => {
			oscillator_energy::gui::main(config);
			ExitCode::SUCCESS
		}
	}
}
