
use rustfft::num_complex::Complex;
use rustfft::Fft;

use crate::buffer::SampleBuffer;
use crate::engine::Engine;
use crate::types::Cpx16;
use crate::{SdrErr, CSCALE};

// Inner product of mixed samples against a code over m samples. The code
// components are -1, 0 or +1, so I and Q accumulate independently; i64
// keeps the sums exact for any window length.
fn dot_iq_code(iq: &[Cpx16], code: &[Cpx16], m: usize, s: f32) -> Complex<f32> {
	let mut sum_i: i64 = 0;
	let mut sum_q: i64 = 0;
	for (x, c) in iq[..m].iter().zip(code[..m].iter()) {
		sum_i += x.i as i64 * c.i as i64;
		sum_q += x.q as i64 * c.q as i64;
	}
	Complex::new(sum_i as f32 * s / CSCALE, sum_q as f32 * s / CSCALE)
}

/// Standard (time-domain) correlator over already-mixed samples. Each
/// entry of `pos` is a signed code offset in samples; positive offsets
/// advance the samples, negative ones advance the code, and the window
/// shrinks to the overlap either way. Outputs are normalized by the
/// window length and the carrier scale.
pub fn corr_std_iq(iq: &[Cpx16], code: &[Cpx16], n: usize, pos: &[i32])
		-> Vec<Complex<f32>> {
	debug_assert!(iq.len() >= n && code.len() >= n);
	pos.iter().map(|&k| {
		if k > 0 {
			let m = n - k as usize;
			dot_iq_code(&iq[k as usize..], code, m, 1.0 / m as f32)
		}
		else if k < 0 {
			let m = n - (-k) as usize;
			dot_iq_code(iq, &code[(-k) as usize..], m, 1.0 / m as f32)
		}
		else {
			dot_iq_code(iq, code, n, 1.0 / n as f32)
		}
	}).collect()
}

impl Engine {
	/// Mix the carrier and run the standard correlator at the given code
	/// offsets.
	pub fn corr_std(&self, buff: &SampleBuffer, ix: usize, n: usize, fs: f64,
			fc: f64, phi: f64, code: &[Cpx16], pos: &[i32]) -> Vec<Complex<f32>> {
		let mut iq = vec![Cpx16::default(); n];
		self.mix_carr(buff, ix, n, fs, fc, phi, &mut iq);
		corr_std_iq(&iq, code, n, pos)
	}

	/// Circular FFT correlator over already-mixed samples:
	/// `corr = IFFT(FFT(iq / CSCALE) * code_fft) / N^2`, with one factor
	/// of N applied in the element-wise multiply and the other absorbed
	/// by the unnormalized backward transform. The code spectrum is
	/// multiplied verbatim; callers wanting correlation rather than
	/// convolution supply the conjugated DFT. On a plan-cache overflow
	/// `corr` is left unwritten.
	pub fn corr_fft_iq(&self, iq: &[Cpx16], code_fft: &[Complex<f32>],
			corr: &mut [Complex<f32>]) -> Result<(), SdrErr> {
		let n = iq.len();
		debug_assert!(code_fft.len() == n && corr.len() == n);
		let (fwd, bwd) = self.get_plan(n)?;

		let mut buf: Vec<Complex<f32>> = iq.iter()
			.map(|x| Complex::new(x.i as f32 / CSCALE, x.q as f32 / CSCALE))
			.collect();
		fwd.process(&mut buf);

		let s = 1.0 / n as f32 / n as f32;
		for (b, c) in buf.iter_mut().zip(code_fft.iter()) {
			*b = *b * c * s;
		}
		bwd.process(&mut buf);
		corr.copy_from_slice(&buf);
		Ok(())
	}

	/// Mix the carrier and run the FFT correlator over all code offsets.
	pub fn corr_fft(&self, buff: &SampleBuffer, ix: usize, n: usize, fs: f64,
			fc: f64, phi: f64, code_fft: &[Complex<f32>],
			corr: &mut [Complex<f32>]) -> Result<(), SdrErr> {
		let mut iq = vec![Cpx16::default(); n];
		self.mix_carr(buff, ix, n, fs, fc, phi, &mut iq);
		self.corr_fft_iq(&iq, code_fft, corr)
	}
}
