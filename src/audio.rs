//! Audio system using Web Audio API
//!
//! Procedurally generated bubble pops - no external files needed!
//! Bigger bubbles pop lower and a little louder.

use wasm_bindgen::JsValue;
use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::driver::SoundHook;
use crate::error::{SimError, SimResult};
use crate::sim::SizeTier;

/// Audio manager for the bubble field
pub struct AudioManager {
    ctx: Option<AudioContext>,
    volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            volume: 0.6,
            muted: false,
        }
    }

    /// Set volume (0.0 - 1.0)
    pub fn set_volume(&mut self, vol: f32) {
        self.volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Result<(OscillatorNode, GainNode), JsValue> {
        let osc = ctx.create_oscillator()?;
        let gain = ctx.create_gain()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;

        Ok((osc, gain))
    }

    /// Pop - a quick downward chirp with a tiny high click
    fn pop(ctx: &AudioContext, radius: f32, vol: f32) -> Result<(), JsValue> {
        // Medium bubble sits around 520 Hz
        let size = (radius / SizeTier::Medium.radius()).clamp(0.5, 2.0);
        let base = 520.0 / size;
        let t = ctx.current_time();

        let (osc, gain) = Self::create_osc(ctx, base * 1.8, OscillatorType::Sine)?;
        gain.gain().set_value_at_time(vol * 0.5 * size.sqrt(), t)?;
        gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.09)?;
        osc.frequency().set_value_at_time(base * 1.8, t)?;
        osc.frequency().exponential_ramp_to_value_at_time(base * 0.6, t + 0.08)?;
        osc.start()?;
        osc.stop_with_when(t + 0.1)?;

        let (click, click_gain) = Self::create_osc(ctx, 3200.0, OscillatorType::Triangle)?;
        click_gain.gain().set_value_at_time(vol * 0.12, t)?;
        click_gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.02)?;
        click.start()?;
        click.stop_with_when(t + 0.03)?;
        Ok(())
    }
}

impl SoundHook for AudioManager {
    fn play_pop(&mut self, radius: f32) -> SimResult<()> {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return Ok(());
        }
        let Some(ctx) = &self.ctx else {
            return Ok(());
        };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        Self::pop(ctx, radius, vol).map_err(|e| SimError::Sound(format!("{:?}", e)))
    }
}
