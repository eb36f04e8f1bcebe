
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::acquisition::{corr_max, dop_bins, fine_dop};
use crate::buffer::{SampleBuffer, Sampling};
use crate::engine::Engine;
use crate::types::Cpx8;

#[test]
fn doppler_bins_cover_the_search_span() {
	let fds = dop_bins(1.0e-3, 0.0, 5000.0);
	assert_eq!(fds.len(), 21);
	for (i, f) in fds.iter().enumerate() {
		assert!((f - (-5000.0 + 500.0 * i as f32)).abs() < 1.0e-3);
	}
}

#[test]
fn doppler_bins_follow_the_center_frequency() {
	let fds = dop_bins(1.0e-3, 4200.0, 1000.0);
	assert_eq!(fds.len(), 5);
	assert!((fds[0] - 3200.0).abs() < 1.0e-3);
	assert!((fds[4] - 5200.0).abs() < 1.0e-3);
}

#[test]
fn corr_max_finds_the_peak_and_estimates_cn0() {
	let (m, n) = (3, 8);
	let mut p = vec![1.0f32; m * n];
	p[1 * n + 4] = 100.0;
	let ((i, j), cn0) = corr_max(&p, n, n, m, 1.0e-3);
	assert_eq!((i, j), (1, 4));
	let mean = (23.0 + 100.0) / 24.0;
	let expect = 10.0 * ((100.0 - mean) / mean / 1.0e-3f32).log10();
	assert!((cn0 - expect).abs() < 0.1, "cn0 = {}, expect = {}", cn0, expect);
}

#[test]
fn corr_max_first_occurrence_wins_on_ties() {
	let (m, n) = (2, 4);
	let mut p = vec![0.5f32; m * n];
	p[0 * n + 2] = 9.0;
	p[1 * n + 1] = 9.0;
	let (ix, _) = corr_max(&p, n, n, m, 1.0e-3);
	assert_eq!(ix, (0, 2));
}

#[test]
fn corr_max_reports_zero_cn0_for_an_empty_grid() {
	let p = vec![0.0f32; 16];
	let (ix, cn0) = corr_max(&p, 4, 4, 4, 1.0e-3);
	assert_eq!(ix, (0, 0));
	assert_eq!(cn0, 0.0);
}

#[test]
fn fine_dop_interpolates_the_vertex() {
	let n = 8;
	let fds = [100.0f32, 200.0, 300.0];
	let mut p = vec![0.0f32; fds.len() * n];
	p[0 * n + 3] = 1.0;
	p[1 * n + 3] = 4.0;
	p[2 * n + 3] = 1.0;
	let f = fine_dop(&p, n, &fds, (1, 3));
	assert!((f - 200.0).abs() < 1.0e-6, "f = {}", f);
}

#[test]
fn fine_dop_falls_back_at_the_grid_edge() {
	let n = 4;
	let fds = [-500.0f32, 0.0, 500.0];
	let p = vec![1.0f32; fds.len() * n];
	assert_eq!(fine_dop(&p, n, &fds, (0, 1)), -500.0);
	assert_eq!(fine_dop(&p, n, &fds, (2, 1)), 500.0);
}

#[test]
fn fine_dop_falls_back_when_the_fit_is_flat() {
	let n = 4;
	let fds = [-500.0f32, 0.0, 500.0];
	// equal powers: the quadratic term vanishes
	let p = vec![2.0f32; fds.len() * n];
	assert_eq!(fine_dop(&p, n, &fds, (1, 2)), 0.0);
}

fn random_chips(n: usize, seed: u64) -> Vec<i8> {
	let mut rng = StdRng::seed_from_u64(seed);
	(0..n).map(|_| if rng.gen::<bool>() { 1 } else { -1 }).collect()
}

// IF samples carrying the code delayed by tau samples on a Doppler-shifted
// carrier, quantized to the nibble range of Cpx8
fn synth_buffer(chips: &[i8], tau: usize, fd: f64, fs: f64, amp: f64) -> SampleBuffer {
	let n = chips.len();
	let data = (0..n).map(|t| {
		let ph = 2.0 * std::f64::consts::PI * fd * t as f64 / fs;
		let chip = chips[(t + n - tau) % n] as f64 * amp;
		Cpx8::new((chip * ph.cos()).round() as i8, (chip * ph.sin()).round() as i8)
	}).collect();
	SampleBuffer { data, sampling: Sampling::Complex }
}

fn code_spectrum(chips: &[i8]) -> Vec<Complex<f32>> {
	let mut buf: Vec<Complex<f32>> = chips.iter()
		.map(|&c| Complex::new(c as f32, 0.0))
		.collect();
	FftPlanner::new().plan_fft_forward(buf.len()).process(&mut buf);
	buf.iter().map(|c| c.conj()).collect()
}

#[test]
fn search_recovers_code_offset_and_doppler() {
	let fs = 2.0e6;
	let n = 2000;
	let t_code = n as f64 / fs;
	let (tau, fd) = (700, 900.0);

	let chips = random_chips(n, 7);
	let buff = synth_buffer(&chips, tau, fd, fs, 3.0);
	let code_fft = code_spectrum(&chips);

	let engine = Engine::new();
	let fds = dop_bins(t_code, 0.0, 5000.0);
	let mut p = vec![0.0f32; fds.len() * n];
	engine.search_code(&code_fft, t_code, &buff, 0, n, fs, 0.0, &fds, &mut p).unwrap();

	let ((i, j), cn0) = corr_max(&p, n, n, fds.len(), t_code);
	assert_eq!(j, tau);
	assert!((fds[i] - 1000.0).abs() < 1.0, "coarse bin {}", fds[i]);
	assert!(cn0 > 20.0, "cn0 = {}", cn0);

	let fine = fine_dop(&p, n, &fds, (i, j));
	assert!((fine - fd).abs() < 250.0, "fine doppler {}", fine);
}

#[test]
fn power_grid_accumulates_across_calls() {
	let fs = 1.0e6;
	let n = 500;
	let t_code = n as f64 / fs;
	let (tau, fd) = (123, 0.0);

	let chips = random_chips(n, 11);
	let buff = synth_buffer(&chips, tau, fd, fs, 3.0);
	let code_fft = code_spectrum(&chips);

	let engine = Engine::new();
	let fds = [0.0f32];
	let mut p = vec![0.0f32; n];
	engine.search_code(&code_fft, t_code, &buff, 0, n, fs, 0.0, &fds, &mut p).unwrap();
	let single = p[tau];
	engine.search_code(&code_fft, t_code, &buff, 0, n, fs, 0.0, &fds, &mut p).unwrap();
	assert!((p[tau] - 2.0 * single).abs() < 1.0e-3 * single.abs());

	let (ix, _) = corr_max(&p, n, n, 1, t_code);
	assert_eq!(ix, (0, tau));
}

#[test]
fn search_over_the_ring_boundary_finds_the_same_peak() {
	let fs = 1.0e6;
	let n = 400;
	let t_code = n as f64 / fs;
	let tau = 50;

	let chips = random_chips(n, 13);
	let buff = synth_buffer(&chips, tau, 0.0, fs, 3.0);
	let code_fft = code_spectrum(&chips);

	let engine = Engine::new();
	let fds = [0.0f32];
	let mut p = vec![0.0f32; n];
	// start three quarters of the way in: the window wraps around
	let ix = 3 * n / 4;
	engine.search_code(&code_fft, t_code, &buff, ix, n, fs, 0.0, &fds, &mut p).unwrap();
	let (peak, _) = corr_max(&p, n, n, 1, t_code);
	// the delay seen from ix is shifted by the start index, modulo n
	assert_eq!(peak.1, (tau + n - ix) % n);
}
