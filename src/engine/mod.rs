
use std::f64::consts::PI;
use std::sync::Mutex;

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::types::{Cpx16, Cpx8};
use crate::CSCALE;

pub mod plans;

use self::plans::PlanCache;

/// Number of carrier phase steps per cycle in the mixing LUT.
pub const NTBL: usize = 256;

// The NCO phase lives in a u32 with 24 fractional bits below the 8-bit
// table index, so `+=` wraps exactly at NTBL cycles (NTBL << 24 == 2^32).
const PHASE_SCALE: f64 = (1u64 << 24) as f64;

/// Options applied when an engine is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
	/// Optional plan-hints file listing transform sizes to pre-plan.
	pub plan_hints: Option<String>,
	/// Enable ANSI escape processing on the Windows console.
	pub console_vt_escape: bool,
}

/// Shared numeric context: the carrier-mixing LUT plus the FFT plan cache.
/// Create one per process (or use [`default_engine`]) and share it by
/// reference; every method is re-entrant.
pub struct Engine {
	mix_tbl: Vec<Cpx16>,
	pub(crate) plans: Mutex<PlanCache>,
}

static DEFAULT_ENGINE: Lazy<Engine> = Lazy::new(Engine::new);

/// Process-wide engine for call sites that do not carry their own.
pub fn default_engine() -> &'static Engine {
	&DEFAULT_ENGINE
}

impl Engine {
	pub fn new() -> Engine {
		Engine::with_config(&EngineConfig::default())
	}

	pub fn with_config(cfg: &EngineConfig) -> Engine {
		let mut mix_tbl = vec![Cpx16::default(); 256 * NTBL];
		for j in 0..256 {
			let s = Cpx8(j as u8);
			let (si, sq) = (s.i() as f64, s.q() as f64);
			for i in 0..NTBL {
				let (sin, cos) = (-2.0 * PI * i as f64 / NTBL as f64).sin_cos();
				mix_tbl[(j << 8) | i] = Cpx16 {
					i: round(CSCALE as f64 * (si * cos - sq * sin)) as i16,
					q: round(CSCALE as f64 * (si * sin + sq * cos)) as i16,
				};
			}
		}
		let engine = Engine { mix_tbl, plans: Mutex::new(PlanCache::new()) };

		if cfg.console_vt_escape {
			enable_console_esc();
		}
		if let Some(path) = &cfg.plan_hints {
			if let Err(e) = engine.import_plan_hints(path) {
				warn!("plan hints import error: {}", e);
			}
		}
		engine
	}

	/// Mix the carrier onto `n` ring samples starting at index `ix`,
	/// quantized through the LUT: `iq[k] ~ sample(ix+k) * CSCALE *
	/// exp(-2*pi*j*(phi + fc*k/fs))`. `fc` is the mix frequency in Hz and
	/// `phi` the start phase in cycles. The hot path is pure integer
	/// arithmetic.
	pub fn mix_carr(&self, buff: &SampleBuffer, ix: usize, n: usize, fs: f64,
			fc: f64, phi: f64, iq: &mut [Cpx16]) {
		debug_assert!(ix < buff.len() && n <= buff.len() && iq.len() >= n);
		let step = fc / fs * NTBL as f64;
		let phi = phi.rem_euclid(1.0) * NTBL as f64;
		let p = (phi * PHASE_SCALE) as u64 as u32;
		let s = (step * PHASE_SCALE) as i64 as u32;

		if ix + n <= buff.len() {
			self.mix_span(&buff.data[ix..ix + n], p, s, &mut iq[..n]);
		} else {
			// across the ring boundary: the second span continues the
			// phase accumulator exactly, carry included
			let n1 = buff.len() - ix;
			self.mix_span(&buff.data[ix..], p, s, &mut iq[..n1]);
			let p1 = p.wrapping_add(s.wrapping_mul(n1 as u32));
			self.mix_span(&buff.data[..n - n1], p1, s, &mut iq[n1..n]);
		}
	}

	fn mix_span(&self, data: &[Cpx8], mut p: u32, s: u32, iq: &mut [Cpx16]) {
		for (out, sample) in iq.iter_mut().zip(data.iter()) {
			*out = self.mix_tbl[((sample.0 as usize) << 8) | (p >> 24) as usize];
			p = p.wrapping_add(s);
		}
	}
}

fn round(x: f64) -> f64 {
	(x + 0.5).floor()
}

#[cfg(windows)]
fn enable_console_esc() {
	let _ = colored::control::set_virtual_terminal(true);
}

#[cfg(not(windows))]
fn enable_console_esc() {}
