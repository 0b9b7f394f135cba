// Audio module - cpal output stream draining a shared sample queue (§7)
//
// The core's `Apu` is owned by `System`, not shared across threads; the host
// loop drains `Apu::drain` once per frame and pushes the interleaved stereo
// samples into this queue, which the cpal callback then consumes. Underrun
// (queue empty) plays silence rather than blocking.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub type SampleQueue = Arc<Mutex<VecDeque<i16>>>;

pub fn new_queue() -> SampleQueue {
    Arc::new(Mutex::new(VecDeque::new()))
}

pub struct AudioOutput {
    stream: Stream,
}

impl AudioOutput {
    pub fn new(queue: SampleQueue, sample_rate: u32) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no audio output device available")?;

        let config = StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = queue.lock().unwrap();
                    for sample in data.iter_mut() {
                        *sample = queue
                            .pop_front()
                            .map(|s| s as f32 / i16::MAX as f32)
                            .unwrap_or(0.0);
                    }
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|err| format!("failed to build audio stream: {err}"))?;

        stream
            .play()
            .map_err(|err| format!("failed to start audio stream: {err}"))?;

        Ok(AudioOutput { stream })
    }

    pub fn pause(&self) -> Result<(), String> {
        self.stream.pause().map_err(|err| err.to_string())
    }

    pub fn resume(&self) -> Result<(), String> {
        self.stream.play().map_err(|err| err.to_string())
    }
}

/// Drain as many samples as the APU ring currently holds into the queue,
/// called once per emulated frame by the host loop.
pub fn pump(apu: &mut crate::apu::Apu, queue: &SampleQueue) {
    let mut scratch = [0i16; 4096];
    let pairs = apu.drain(&mut scratch);
    let mut queue = queue.lock().unwrap();
    queue.extend(&scratch[..pairs * 2]);
    // Cap backlog so a paused/minimized window doesn't grow this unbounded.
    while queue.len() > scratch.len() * 4 {
        queue.pop_front();
    }
}
