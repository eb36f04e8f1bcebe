
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use log::error;

use crate::types::Cpx8;
use crate::SdrErr;

/// Sampling type of a raw IF stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
	/// Real (I-only) sampling, one signed byte per sample.
	Real,
	/// Complex sampling, interleaved (I, Q) signed byte pairs.
	Complex,
}

impl Sampling {
	pub fn channels(self) -> usize {
		match self {
			Sampling::Real => 1,
			Sampling::Complex => 2,
		}
	}
}

/// Buffer of digitized IF samples. Logically a ring: the carrier mixer
/// interprets indices modulo `len()`, so reads past the end wrap to the
/// start without any wrap-around slices being handed out.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
	pub data: Vec<Cpx8>,
	pub sampling: Sampling,
}

impl SampleBuffer {
	pub fn new(n: usize, sampling: Sampling) -> SampleBuffer {
		SampleBuffer { data: vec![Cpx8::default(); n], sampling }
	}

	/// Ingest raw signed bytes: one byte per sample for real sampling,
	/// interleaved (I, Q) pairs for complex sampling.
	pub fn from_bytes(raw: &[u8], sampling: Sampling) -> SampleBuffer {
		let data = match sampling {
			Sampling::Real => raw.iter().map(|&b| Cpx8::new(b as i8, 0)).collect(),
			Sampling::Complex => raw.chunks_exact(2)
				.map(|c| Cpx8::new(c[0] as i8, c[1] as i8))
				.collect(),
		};
		SampleBuffer { data, sampling }
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

/// Read digitized IF data from a flat binary file of signed 8-bit samples.
/// `toff` seconds are skipped from the beginning; `t` seconds are read, or
/// the remainder of the file when `t` is zero. A short file is an error.
pub fn read_data(path: &str, fs: f64, sampling: Sampling, t: f64, toff: f64)
		-> Result<SampleBuffer, SdrErr> {
	let ch = sampling.channels() as f64;
	let off = (fs * toff * ch).round() as u64;
	let mut cnt = if t > 0.0 { (fs * t * ch).round() as u64 } else { 0 };

	let mut f = File::open(path).map_err(|_| {
		error!("data read error {}", path);
		SdrErr::FileIo(path.to_string())
	})?;
	let size = f.metadata().map(|m| m.len()).unwrap_or(0);

	if cnt == 0 {
		if size <= off {
			error!("data read error {}: offset past end of file", path);
			return Err(SdrErr::FileIo(path.to_string()));
		}
		cnt = size - off;
	}
	if size < off + cnt {
		error!("data read error {}: {} bytes short", path, off + cnt - size);
		return Err(SdrErr::FileIo(path.to_string()));
	}
	f.seek(SeekFrom::Start(off)).map_err(|_| {
		error!("data read error {}", path);
		SdrErr::FileIo(path.to_string())
	})?;

	let mut raw = vec![0u8; cnt as usize];
	f.read_exact(&mut raw).map_err(|_| {
		error!("data read error {}", path);
		SdrErr::FileIo(path.to_string())
	})?;

	Ok(SampleBuffer::from_bytes(&raw, sampling))
}
