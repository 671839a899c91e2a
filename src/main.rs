//! Bubble Field entry point
//!
//! On the web the field is driven by `requestAnimationFrame` and renders
//! through JS callbacks. Natively it runs a headless demo that logs waves.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use js_sys::Function;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use bubble_field::audio::AudioManager;
    use bubble_field::consts::DEFAULT_SEED;
    use bubble_field::sim::{BodyPosition, BurstTrigger};
    use bubble_field::{CancelToken, Driver, DriverSlot, FrameHost, FrameOutcome, Tuning, Viewport};

    /// Hands snapshots to the page as JSON strings
    #[derive(Default)]
    struct JsHost {
        on_positions: Option<Function>,
        on_bursts: Option<Function>,
    }

    impl JsHost {
        fn emit<T: serde::Serialize + ?Sized>(callback: &Option<Function>, payload: &T) {
            let Some(callback) = callback else { return };
            match serde_json::to_string(payload) {
                Ok(json) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                        log::warn!("Render callback failed: {:?}", e);
                    }
                }
                Err(e) => log::warn!("Failed to encode frame: {}", e),
            }
        }
    }

    impl FrameHost for JsHost {
        fn viewport(&self) -> Option<Viewport> {
            let window = web_sys::window()?;
            let width = window.inner_width().ok()?.as_f64()? as f32;
            let height = window.inner_height().ok()?.as_f64()? as f32;
            Viewport::new(width, height).ok()
        }

        fn publish_positions(&mut self, positions: &[BodyPosition]) {
            Self::emit(&self.on_positions, positions);
        }

        fn publish_bursts(&mut self, bursts: &[BurstTrigger]) {
            Self::emit(&self.on_bursts, bursts);
        }
    }

    thread_local! {
        static SLOT: DriverSlot<JsHost, AudioManager> = const { DriverSlot::new() };
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0)
    }

    fn request_animation_frame(token: CancelToken) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let callback = Closure::once_into_js(move |time: f64| frame(token, time));
        let _ = window.request_animation_frame(callback.unchecked_ref());
    }

    fn frame(token: CancelToken, time: f64) {
        if token.is_cancelled() {
            return;
        }
        let (outcome, restarted) = SLOT.with(|slot| (slot.with(|d| d.on_frame(time)), slot.settle(now_ms())));
        if let Some(next) = restarted {
            request_animation_frame(next);
        }
        match outcome {
            Some(FrameOutcome::Continue(_)) | Some(FrameOutcome::Inert) if !token.is_cancelled() => {
                request_animation_frame(token)
            }
            _ => {}
        }
    }

    /// Start the field. `tuning_json` may override any tuning constant.
    #[wasm_bindgen]
    pub fn start(on_positions: Function, on_bursts: Function, tuning_json: Option<String>) {
        stop();

        let host = JsHost {
            on_positions: Some(on_positions),
            on_bursts: Some(on_bursts),
        };
        let seed = (js_sys::Math::random() * u32::MAX as f64) as u64 ^ DEFAULT_SEED;
        let tuning = Tuning::load_or_default(tuning_json.as_deref());
        let mut driver = Driver::new(host, AudioManager::new(), seed, tuning);

        if let Err(e) = driver.start() {
            log::warn!("Bubble field not started: {}", e);
            return;
        }
        // From inside a render callback the swap happens after the frame
        if let Some(token) = SLOT.with(|slot| slot.install(driver)) {
            request_animation_frame(token);
        }
    }

    /// Tear everything down; any queued frame becomes a no-op.
    /// Safe to call from inside a render callback.
    #[wasm_bindgen]
    pub fn stop() {
        SLOT.with(|slot| slot.stop());
    }

    #[wasm_bindgen]
    pub fn subscription_succeeded() {
        let now = now_ms();
        SLOT.with(|slot| slot.with(|d| d.subscription_succeeded(now)));
    }

    /// Returns true if the tap burst a bubble
    #[wasm_bindgen]
    pub fn tap_bubble(id: u32) -> bool {
        SLOT.with(|slot| slot.with(|d| d.tap(id).is_some())).unwrap_or(false)
    }

    /// The page has scheduled the burst animation for `id`.
    /// Calls made from inside a render callback are applied after the frame.
    #[wasm_bindgen]
    pub fn acknowledge_burst(id: u32) {
        let now = now_ms();
        SLOT.with(|slot| slot.acknowledge(id, now));
    }

    pub fn init_logging() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialised".into());
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::init_logging();
    log::info!("Bubble Field (web) loaded");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bubble Field (native) starting headless demo...");
    headless::run(60 * 60);
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use bubble_field::consts::{DEFAULT_SEED, SIM_DT};
    use bubble_field::driver::NoSound;
    use bubble_field::sim::{BodyPosition, BurstTrigger};
    use bubble_field::{Driver, FrameHost, FrameOutcome, Tuning, Viewport};

    /// Pretends to be a renderer: acknowledges every burst after its stagger
    struct HeadlessHost {
        viewport: Viewport,
        scheduled: Vec<(u32, f64)>,
        now_ms: f64,
    }

    impl FrameHost for HeadlessHost {
        fn viewport(&self) -> Option<Viewport> {
            Some(self.viewport)
        }

        fn publish_positions(&mut self, _positions: &[BodyPosition]) {}

        fn publish_bursts(&mut self, bursts: &[BurstTrigger]) {
            for burst in bursts {
                self.scheduled.push((burst.id, self.now_ms + burst.delay_ms));
            }
        }
    }

    pub fn run(frames: u32) {
        let Ok(viewport) = Viewport::new(1280.0, 720.0) else {
            return;
        };
        let host = HeadlessHost {
            viewport,
            scheduled: Vec::new(),
            now_ms: 0.0,
        };
        let mut driver = Driver::new(host, NoSound, DEFAULT_SEED, Tuning::default());
        if let Err(e) = driver.start() {
            log::warn!("Demo not started: {}", e);
            return;
        }

        let frame_ms = SIM_DT as f64 * 1000.0;
        let mut bursts = 0usize;
        for frame in 1..=frames {
            let now = frame as f64 * frame_ms;
            driver.host_mut().now_ms = now;

            // A "subscription" every 20 s
            if frame % (60 * 20) == 0 {
                driver.subscription_succeeded(now);
            }
            // A "tap" every 2 s on the lowest id still floating
            if frame % 120 == 0 {
                let target = driver
                    .state()
                    .and_then(|s| s.registry.bodies.iter().find(|b| b.can_burst()).map(|b| b.id));
                if let Some(id) = target {
                    driver.tap(id);
                }
            }

            if let FrameOutcome::Continue(result) = driver.on_frame(now) {
                bursts += result.bursts.len();
            }

            let due: Vec<u32> = {
                let host = driver.host_mut();
                let (due, later): (Vec<_>, Vec<_>) =
                    host.scheduled.drain(..).partition(|&(_, at)| at <= now);
                host.scheduled = later;
                due.into_iter().map(|(id, _)| id).collect()
            };
            for id in due {
                driver.acknowledge(id, now);
            }
        }

        if let Some(state) = driver.state() {
            log::info!(
                "Demo finished: {} frames, wave {}, {}/{} burst, {} collision bursts",
                frames,
                state.wave.index,
                state.wave.completed_bursts,
                state.wave.target_bursts,
                bursts
            );
        }
        driver.cancel();
    }
}
