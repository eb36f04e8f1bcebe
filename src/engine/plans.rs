
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use log::{error, warn};
use rustfft::{Fft, FftPlanner};

use crate::SdrErr;

/// Maximum number of cached transform sizes. More than this many distinct
/// correlation lengths in one process is a configuration bug.
pub const MAX_FFT_PLAN: usize = 32;

struct PlanSlot {
	n: usize,
	fwd: Arc<dyn Fft<f32>>,
	bwd: Arc<dyn Fft<f32>>,
}

/// Registry of forward/backward plan pairs keyed by transform size. Plan
/// creation is serialized by the engine mutex around this value; the
/// returned plans execute concurrently on distinct buffers.
pub struct PlanCache {
	planner: FftPlanner<f32>,
	slots: Vec<PlanSlot>,
}

impl PlanCache {
	pub fn new() -> PlanCache {
		PlanCache {
			planner: FftPlanner::new(),
			slots: Vec::with_capacity(MAX_FFT_PLAN),
		}
	}

	fn acquire(&mut self, n: usize)
			-> Result<(Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>), SdrErr> {
		for slot in &self.slots {
			if slot.n == n {
				return Ok((slot.fwd.clone(), slot.bwd.clone()));
			}
		}
		if self.slots.len() >= MAX_FFT_PLAN {
			error!("fft plan cache overflow N={}", n);
			return Err(SdrErr::PlanCacheOverflow(n));
		}
		let fwd = self.planner.plan_fft_forward(n);
		let bwd = self.planner.plan_fft_inverse(n);
		self.slots.push(PlanSlot { n, fwd: fwd.clone(), bwd: bwd.clone() });
		Ok((fwd, bwd))
	}
}

impl super::Engine {
	pub(crate) fn get_plan(&self, n: usize)
			-> Result<(Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>), SdrErr> {
		self.plans.lock().unwrap().acquire(n)
	}

	/// Transform sizes currently resident in the plan cache.
	pub fn cached_plan_sizes(&self) -> Vec<usize> {
		self.plans.lock().unwrap().slots.iter().map(|s| s.n).collect()
	}

	/// Pre-plan every size listed in a plan-hints file (one decimal size
	/// per line, '#' comments allowed). Returns the number of sizes
	/// planned. A full cache stops the import but is not an error.
	pub fn import_plan_hints(&self, path: &str) -> Result<usize, SdrErr> {
		let f = File::open(path).map_err(|_| SdrErr::FileIo(path.to_string()))?;
		let mut count = 0;
		for line in BufReader::new(f).lines() {
			let line = line.map_err(|_| SdrErr::FileIo(path.to_string()))?;
			let field = line.trim();
			if field.is_empty() || field.starts_with('#') {
				continue;
			}
			let n: usize = match field.parse() {
				Ok(n) if n > 0 => n,
				_ => {
					warn!("plan hints: bad size {:?} in {}", field, path);
					continue;
				}
			};
			match self.get_plan(n) {
				Ok(_) => count += 1,
				Err(_) => break,
			}
		}
		Ok(count)
	}
}

/// Plan the given transform sizes once and persist them as a plan-hints
/// file for later engine startups.
pub fn gen_plan_hints(path: &str, sizes: &[usize]) -> Result<(), SdrErr> {
	let mut planner = FftPlanner::<f32>::new();
	for &n in sizes {
		let _ = planner.plan_fft_forward(n);
		let _ = planner.plan_fft_inverse(n);
	}
	let mut f = File::create(path).map_err(|_| SdrErr::FileIo(path.to_string()))?;
	for &n in sizes {
		writeln!(f, "{}", n).map_err(|_| SdrErr::FileIo(path.to_string()))?;
	}
	Ok(())
}
