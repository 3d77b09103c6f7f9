use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use log::warn;

/// Host-side beeper. One output stream plays a 440Hz sinusoid and stays
/// paused until the core reports a pending tone.
pub struct Sound {
    stream: cpal::Stream,
}

impl Sound {
    /// Returns `None` with a logged warning when no usable output device
    /// or stream config exists, so the machine still runs silently.
    pub fn new() -> Option<Self> {
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(device) => device,
            None => {
                warn!("no audio output device available, running silent");
                return None;
            }
        };
        let supported = match device.supported_output_configs() {
            Ok(mut configs) => configs.next()?.with_max_sample_rate(),
            Err(err) => {
                warn!("error while querying audio configs: {err}");
                return None;
            }
        };
        let format = supported.sample_format();
        let config = supported.into();

        let stream = match format {
            cpal::SampleFormat::I8 => Self::build::<i8>(&device, &config),
            cpal::SampleFormat::I16 => Self::build::<i16>(&device, &config),
            cpal::SampleFormat::I32 => Self::build::<i32>(&device, &config),
            cpal::SampleFormat::I64 => Self::build::<i64>(&device, &config),
            cpal::SampleFormat::U8 => Self::build::<u8>(&device, &config),
            cpal::SampleFormat::U16 => Self::build::<u16>(&device, &config),
            cpal::SampleFormat::U32 => Self::build::<u32>(&device, &config),
            cpal::SampleFormat::U64 => Self::build::<u64>(&device, &config),
            cpal::SampleFormat::F32 => Self::build::<f32>(&device, &config),
            cpal::SampleFormat::F64 => Self::build::<f64>(&device, &config),
            sample_format => {
                warn!("unsupported sample format '{sample_format}', running silent");
                return None;
            }
        };

        match stream {
            Ok(stream) => {
                let _ = stream.pause();
                Some(Self { stream })
            }
            Err(err) => {
                warn!("unable to build audio stream: {err}");
                None
            }
        }
    }

    pub fn beep(&self) {
        let _ = self.stream.play();
    }

    pub fn silence(&self) {
        let _ = self.stream.pause();
    }

    fn build<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        // Produce a sinusoid of maximum amplitude.
        let mut sample_clock = 0f32;
        let mut next_value = move || {
            sample_clock = (sample_clock + 1.0) % sample_rate;
            (sample_clock * 440.0 * 2.0 * std::f32::consts::PI / sample_rate).sin()
        };

        let err_fn = |err| warn!("an error occurred on stream: {err}");

        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                Self::write_data(data, channels, &mut next_value)
            },
            err_fn,
            None,
        )
    }

    fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
    where
        T: Sample + FromSample<f32>,
    {
        for frame in output.chunks_mut(channels) {
            let value: T = T::from_sample(next_sample());
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}
