use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::player::Playhead;

/// Open stream on the default output device. Dropping it stops output.
pub struct OutputStream {
    _stream: Stream,
}

pub(crate) fn open(playhead: Arc<Playhead>) -> Result<OutputStream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No output device available")?;
    let supported = device
        .default_output_config()
        .context("Failed to query output config")?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();

    log::info!(
        "Output device: channels: {}, sample_rate: {}",
        config.channels,
        config.sample_rate.0
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, playhead)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, playhead)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, playhead)?,
        other => anyhow::bail!("Unsupported sample format: {:?}", other),
    };
    stream.play().context("Failed to start output stream")?;

    Ok(OutputStream { _stream: stream })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    playhead: Arc<Playhead>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let device_rate = config.sample_rate.0 as f64;
    // Fractional source position between callbacks.
    let mut carry = 0.0f64;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let clip = match playhead.clip.try_lock() {
                Ok(clip) if playhead.playing.load(Ordering::Relaxed) => Arc::clone(&*clip),
                _ => {
                    data.fill(T::from_sample(0.0));
                    return;
                }
            };

            let step = clip.sample_rate as f64 / device_rate;
            let start = playhead.position.load(Ordering::Acquire);
            let mut pos = start;
            for frame in data.chunks_mut(channels) {
                let s = clip.samples.get(pos).copied().unwrap_or(0.0);
                frame.fill(T::from_sample(s));
                carry += step;
                let whole = carry.floor();
                pos += whole as usize;
                carry -= whole;
            }

            if !playhead.commit(start, pos, clip.len()) {
                carry = 0.0;
            }
        },
        |err| log::error!("Output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
