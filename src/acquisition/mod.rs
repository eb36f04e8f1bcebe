
use std::thread;
use std::time::Duration;

use nalgebra::{Matrix3, Vector3};
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::engine::Engine;
use crate::SdrErr;

#[cfg(test)]
mod tests;

/// Doppler search step, in cycles per code period.
pub const DOP_STEP: f64 = 0.5;

// Release the CPU briefly every this many Doppler bins so a long sweep
// does not starve other threads.
const YIELD_BIN_INTERVAL: usize = 22;

/// One acquisition outcome as reported by the search tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
	pub doppler_hz: f64,
	pub fine_doppler_hz: f64,
	pub code_offset: usize,
	pub cn0_dbhz: f32,
}

impl Engine {
	/// Parallel code search: for every Doppler bin in `fds`, mix the
	/// carrier at `fi + fds[i]`, run the FFT correlator against
	/// `code_fft` and accumulate `|C|^2` into row `i` of the `len(fds) x
	/// n` power grid `p`. The grid is additive across calls, which is
	/// what non-coherent integration over repeated code periods relies
	/// on. A plan-cache overflow aborts the sweep.
	pub fn search_code(&self, code_fft: &[Complex<f32>], t_code: f64,
			buff: &SampleBuffer, ix: usize, n: usize, fs: f64, fi: f64,
			fds: &[f32], p: &mut [f32]) -> Result<(), SdrErr> {
		debug_assert!(code_fft.len() == n && p.len() >= fds.len() * n);
		debug_assert!((fs * t_code).round() as usize == n);

		let mut c = vec![Complex::new(0.0, 0.0); n];
		for (i, &fd) in fds.iter().enumerate() {
			self.corr_fft(buff, ix, n, fs, fi + fd as f64, 0.0, code_fft, &mut c)?;
			for (pj, cj) in p[i * n..(i + 1) * n].iter_mut().zip(c.iter()) {
				*pj += cj.norm_sqr();
			}
			if i % YIELD_BIN_INTERVAL == YIELD_BIN_INTERVAL - 1 {
				thread::sleep(Duration::from_millis(1));
			}
		}
		Ok(())
	}
}

/// Peak of the `m x nmax` sub-region of the power grid `p` (row stride
/// `n`), plus a carrier-to-noise density estimate in dB-Hz derived from
/// the peak-to-mean ratio over the same region. Returns the (Doppler
/// index, code index) of the peak; on ties the first hit in row-major
/// order wins. A non-positive mean yields a C/N0 of zero.
pub fn corr_max(p: &[f32], n: usize, nmax: usize, m: usize, t_code: f64)
		-> ((usize, usize), f32) {
	let mut p_max = 0.0f32;
	let mut p_ave = 0.0f32;
	let mut ix = (0, 0);
	let mut count = 0;
	for i in 0..m {
		for j in 0..nmax {
			let x = p[i * n + j];
			count += 1;
			p_ave += (x - p_ave) / count as f32;
			if x <= p_max {
				continue;
			}
			p_max = x;
			ix = (i, j);
		}
	}
	let cn0 = if p_ave > 0.0 {
		10.0 * ((p_max - p_ave) / p_ave / t_code as f32).log10()
	} else {
		0.0
	};
	(ix, cn0)
}

/// Refine the peak Doppler frequency by fitting a quadratic through the
/// three power samples neighbouring the peak bin and returning its
/// vertex. Falls back to the coarse bin frequency at the grid edge or
/// when the fit is degenerate.
pub fn fine_dop(p: &[f32], n: usize, fds: &[f32], ix: (usize, usize)) -> f64 {
	let (i, j) = ix;
	if i == 0 || i == fds.len() - 1 {
		return fds[i] as f64;
	}
	let x = [fds[i - 1] as f64, fds[i] as f64, fds[i + 1] as f64];
	let y = Vector3::new(
		p[(i - 1) * n + j] as f64,
		p[i * n + j] as f64,
		p[(i + 1) * n + j] as f64);
	let v = Matrix3::new(
		1.0, x[0], x[0] * x[0],
		1.0, x[1], x[1] * x[1],
		1.0, x[2], x[2] * x[2]);
	match v.lu().solve(&y) {
		Some(c) if c[2] != 0.0 => -c[1] / (2.0 * c[2]),
		_ => fds[i] as f64,
	}
}

/// Doppler search bins: centered on `dop`, spanning +/- `max_dop`, spaced
/// half a cycle per code period.
pub fn dop_bins(t_code: f64, dop: f32, max_dop: f32) -> Vec<f32> {
	let step = (DOP_STEP / t_code) as f32;
	let len = (2.0 * max_dop / step) as usize + 1;
	(0..len).map(|i| dop - max_dop + i as f32 * step).collect()
}
