
extern crate clap;
extern crate colored;
extern crate gnss_baseband;

use std::fs;

use clap::{App, Arg};
use colored::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use gnss_baseband::acquisition::{corr_max, dop_bins, fine_dop, SearchResult};
use gnss_baseband::buffer::{read_data, Sampling};
use gnss_baseband::engine::{Engine, EngineConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {

	env_logger::init();

	let matches = App::new("GNSS code search")
		.version("0.1.0")
		.about("Sweeps a Doppler x code-offset grid over raw IF samples and reports the correlation peak")
		.arg(Arg::with_name("file")
			.long("file")
			.help("Raw IF data file (signed 8-bit samples)")
			.required(true).takes_value(true))
		.arg(Arg::with_name("code")
			.long("code")
			.help("Spreading code file: one signed 8-bit chip per sample, one code period")
			.required(true).takes_value(true))
		.arg(Arg::with_name("fs")
			.long("fs")
			.help("Sampling frequency [Hz]")
			.required(true).takes_value(true))
		.arg(Arg::with_name("fi")
			.long("fi")
			.help("IF frequency [Hz]")
			.takes_value(true))
		.arg(Arg::with_name("iq")
			.long("iq")
			.help("Sampling type (1: I only, 2: interleaved IQ)")
			.takes_value(true)
			.possible_value("1").possible_value("2"))
		.arg(Arg::with_name("toff")
			.long("toff")
			.help("Time offset into the file [s]")
			.takes_value(true))
		.arg(Arg::with_name("max_dop")
			.long("max_dop")
			.help("Doppler search half-width [Hz]")
			.takes_value(true))
		.arg(Arg::with_name("periods")
			.long("periods")
			.help("Number of code periods to integrate non-coherently")
			.takes_value(true))
		.arg(Arg::with_name("plan_hints")
			.long("plan-hints")
			.help("FFT plan-hints file (default: the user cache dir, if present)")
			.takes_value(true))
		.get_matches();

	let fs: f64 = matches.value_of("fs").unwrap().parse()?;
	let fi: f64 = matches.value_of("fi").unwrap_or("0").parse()?;
	let toff: f64 = matches.value_of("toff").unwrap_or("0").parse()?;
	let max_dop: f32 = matches.value_of("max_dop").unwrap_or("5000").parse()?;
	let periods: usize = matches.value_of("periods").unwrap_or("1").parse()?;
	let sampling = match matches.value_of("iq").unwrap_or("2") {
		"1" => Sampling::Real,
		_ => Sampling::Complex,
	};

	let chips: Vec<i8> = fs::read(matches.value_of("code").unwrap())?
		.iter().map(|&b| b as i8).collect();
	let n = chips.len();
	if n == 0 {
		return Err("empty code file".into());
	}
	let t_code = n as f64 / fs;

	let plan_hints = matches.value_of("plan_hints").map(|s| s.to_string())
		.or_else(default_plan_hints);
	let engine = Engine::with_config(&EngineConfig { plan_hints, console_vt_escape: true });

	let buff = read_data(matches.value_of("file").unwrap(), fs, sampling,
		t_code * periods as f64, toff)?;

	// conjugated code spectrum, so the sweep correlates rather than convolves
	let mut code_fft: Vec<Complex<f32>> = chips.iter()
		.map(|&c| Complex::new(c as f32, 0.0))
		.collect();
	FftPlanner::new().plan_fft_forward(n).process(&mut code_fft);
	for c in code_fft.iter_mut() {
		*c = c.conj();
	}

	let fds = dop_bins(t_code, 0.0, max_dop);
	let mut p = vec![0.0f32; fds.len() * n];
	for k in 0..periods {
		engine.search_code(&code_fft, t_code, &buff, k * n, n, fs, fi, &fds, &mut p)?;
	}

	let (ix, cn0) = corr_max(&p, n, n, fds.len(), t_code);
	let result = SearchResult {
		doppler_hz: fds[ix.0] as f64,
		fine_doppler_hz: fine_dop(&p, n, &fds, ix),
		code_offset: ix.1,
		cn0_dbhz: cn0,
	};

	let line = format!("{:9.2} [Hz], {:6} [samples], {:5.1} [dB-Hz]",
		result.fine_doppler_hz, result.code_offset, result.cn0_dbhz);
	if cn0 > 35.0 {
		eprintln!("{}", line.as_str().green());
	} else {
		eprintln!("{}", line.as_str().yellow());
	}

	println!("{}", serde_json::to_string_pretty(&result)?);

	Ok(())
}

fn default_plan_hints() -> Option<String> {
	let path = dirs::cache_dir()?.join("gnss-baseband").join("plan_hints.txt");
	if path.exists() {
		Some(path.to_string_lossy().into_owned())
	} else {
		None
	}
}
