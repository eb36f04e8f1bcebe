
extern crate clap;
extern crate gnss_baseband;

use clap::{App, Arg};

use gnss_baseband::engine::plans::gen_plan_hints;
use gnss_baseband::utils::parse_nums;

fn main() -> Result<(), Box<dyn std::error::Error>> {

	env_logger::init();

	let matches = App::new("FFT plan hints generator")
		.version("0.1.0")
		.about("Pre-plans the given transform sizes and writes a plan-hints file read back at engine startup")
		.arg(Arg::with_name("sizes")
			.long("sizes")
			.help("Transform sizes as a list or range, e.g. 12000,24576,32768")
			.required(true).takes_value(true))
		.arg(Arg::with_name("out")
			.long("out")
			.help("Output plan-hints file")
			.required(true).takes_value(true))
		.get_matches();

	let sizes: Vec<usize> = parse_nums(matches.value_of("sizes").unwrap())
		.into_iter()
		.filter(|&n| n > 0)
		.map(|n| n as usize)
		.collect();
	if sizes.is_empty() {
		return Err("no valid transform sizes".into());
	}

	let out = matches.value_of("out").unwrap();
	gen_plan_hints(out, &sizes)?;
	eprintln!("wrote {} plan hints to {}", sizes.len(), out);

	Ok(())
}
