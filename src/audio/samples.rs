// Sample bank - one-shot instrument samples loaded from WAV files

use std::collections::HashMap;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use log::{debug, warn};

use super::AudioError;

/// Mono sample data at its native rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub name: String,
    pub frames: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode a WAV file to mono f32, averaging channels
pub fn load_wav(path: &Path) -> Result<SampleBuffer, AudioError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let frames: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if frames.is_empty() {
        return Err(AudioError::EmptySample(name));
    }

    Ok(SampleBuffer {
        name,
        frames,
        sample_rate: spec.sample_rate,
    })
}

/// Samples addressed by instrument name (the file stem) or by index
#[derive(Debug, Default)]
pub struct SampleBank {
    samples: Vec<SampleBuffer>,
    index: HashMap<String, usize>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.wav` file of a directory. Unreadable files are skipped
    /// with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self, AudioError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
            })
            .collect();
        paths.sort();

        let mut bank = Self::new();
        for path in paths {
            match load_wav(&path) {
                Ok(sample) => {
                    debug!(
                        "Loaded sample {} ({} frames @ {} Hz)",
                        sample.name,
                        sample.frames.len(),
                        sample.sample_rate
                    );
                    bank.insert(sample);
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(bank)
    }

    /// Add or replace a sample, returning its index
    pub fn insert(&mut self, sample: SampleBuffer) -> usize {
        if let Some(&index) = self.index.get(&sample.name) {
            self.samples[index] = sample;
            return index;
        }
        let index = self.samples.len();
        self.index.insert(sample.name.clone(), index);
        self.samples.push(sample);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<&SampleBuffer> {
        self.samples.get(index)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Names from `wanted` that have no sample
    pub fn missing<'a>(&self, wanted: &[&'a str]) -> Vec<&'a str> {
        wanted
            .iter()
            .copied()
            .filter(|name| !self.index.contains_key(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_i16(path: &Path, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_stereo_int_wav_as_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_i16(&path, 2, &[16384, 0, -16384, -16384]);

        let sample = load_wav(&path).unwrap();
        assert_eq!(sample.name, "kick");
        assert_eq!(sample.sample_rate, 44100);
        assert_eq!(sample.frames.len(), 2);
        assert!((sample.frames[0] - 0.25).abs() < 1e-6);
        assert!((sample.frames[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bell.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.75_f32).unwrap();
        writer.finalize().unwrap();

        assert_eq!(load_wav(&path).unwrap().frames, vec![0.75]);
    }

    #[test]
    fn test_load_dir_indexes_by_stem() {
        let dir = tempdir().unwrap();
        write_i16(&dir.path().join("snare.wav"), 1, &[100, 200]);
        write_i16(&dir.path().join("click.wav"), 1, &[300]);
        std::fs::write(dir.path().join("readme.txt"), "not audio").unwrap();
        std::fs::write(dir.path().join("broken.wav"), "not a wav").unwrap();

        let bank = SampleBank::load_dir(dir.path()).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.index_of("click"), Some(0));
        assert_eq!(bank.index_of("snare"), Some(1));
        assert_eq!(bank.missing(&["click", "bell"]), vec!["bell"]);
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut bank = SampleBank::new();
        let sample = |v: f32| SampleBuffer {
            name: "kick".into(),
            frames: vec![v],
            sample_rate: 44100,
        };
        assert_eq!(bank.insert(sample(0.1)), 0);
        assert_eq!(bank.insert(sample(0.2)), 0);
        assert_eq!(bank.get(0).unwrap().frames, vec![0.2]);
    }
}
