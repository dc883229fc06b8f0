use std::sync::Arc;

use anyhow::{Context, Result};
use wawona_touch::core::input::callbacks::{
    RecordingDeviceState, StubWindow, StubWindowPicker, VecEventSink,
};
use wawona_touch::core::input::{Screen, ValuatorMask, WindowId};
use wawona_touch::util::logging::MAIN;
use wawona_touch::{DeviceRegistry, TouchConfig, TouchContext, TouchEvent, TouchEventType, TouchMode};

/// Drives a touchscreen through the touch core the way the input
/// pipeline does.
struct Simulator {
    registry: DeviceRegistry,
    device: u32,
    picker: StubWindowPicker,
    state: RecordingDeviceState,
}

impl Simulator {
    fn new() -> Result<Self> {
        let ctx = TouchContext::new(TouchConfig::default(), vec![Screen::new(0, WindowId(1))])?;
        let mut registry = DeviceRegistry::new(Arc::new(ctx));

        let device = registry.add_device("virtual touchscreen", 2)?;
        // Deliberately small so the third finger forces a resize
        registry.device(device)?.init_touch_class(TouchMode::Direct, Some(2))?;

        let picker = StubWindowPicker::new(vec![
            StubWindow::new(2, 1, 0.0, 0.0, 640.0, 480.0),
            StubWindow::new(3, 2, 100.0, 100.0, 200.0, 150.0),
        ]);

        Ok(Self {
            registry,
            device,
            picker,
            state: RecordingDeviceState::default(),
        })
    }

    /// Feed one driver sample. Returns the client id it was routed as.
    fn sample(&mut self, ddx_id: u32, kind: TouchEventType, x: f64, y: f64) -> Result<Option<u32>> {
        let id = self.device;
        let dev = self.registry.device(id)?;

        let slot = if kind == TouchEventType::Begin {
            match dev.begin_ddx_touch(ddx_id) {
                Ok(slot) => slot,
                Err(e) if e.is_transient() => {
                    tracing::warn!("ddx touch {} dropped: {}", ddx_id, e);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            let Some(slot) = dev.find_by_ddx_id(ddx_id, false) else {
                tracing::warn!("ddx touch {} dropped ({})", ddx_id, kind.name());
                return Ok(None);
            };
            slot
        };
        let (client_id, emulate) = {
            let ddx = dev.ddx_touch(slot).context("ddx slot vanished")?;
            (ddx.client_id, ddx.emulate_pointer)
        };

        let mut mask = ValuatorMask::new(dev.num_axes);
        mask.set_double(0, x);
        mask.set_double(1, y);
        let event = TouchEvent::new(kind, id, client_id).with_valuators(mask);

        let index = match kind {
            TouchEventType::Begin => {
                let index = dev.begin_touch(id, client_id, emulate)?;
                dev.allocate_touch_history(index)?;
                index
            }
            _ => dev.find_by_client_id(client_id).context("no touch point for client id")?,
        };

        if let Err(e) = dev.ensure_sprite(index, &event, &self.picker) {
            tracing::warn!("touch {}: not delivered: {}", client_id, e);
        } else if let Some(ti) = dev.touch_point_mut(index) {
            ti.push_history(&event);
            tracing::info!(
                "touch {} {} at ({}, {}) -> {:?}",
                client_id,
                kind.name(),
                x,
                y,
                ti.sprite.hit_window()
            );
        }

        if kind == TouchEventType::End {
            dev.end_touch(index, &mut self.state)?;
            dev.end_ddx_touch(slot);
        }
        Ok(Some(client_id))
    }
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,wawona_touch=debug");
    }
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    wawona_touch::wlog!(MAIN, "touch simulation starting");
    let mut sim = Simulator::new()?;

    let first = sim.sample(10, TouchEventType::Begin, 150.0, 150.0)?;
    sim.sample(11, TouchEventType::Begin, 20.0, 20.0)?;
    // No room for a third finger yet
    sim.sample(12, TouchEventType::Begin, 500.0, 400.0)?;

    let ran = sim.registry.process_work_queue();
    tracing::info!("ran {} deferred work procs", ran);
    sim.sample(12, TouchEventType::Begin, 500.0, 400.0)?;

    for step in 1..=5 {
        let offset = step as f64 * 4.0;
        sim.sample(10, TouchEventType::Update, 150.0 + offset, 150.0 + offset)?;
    }

    if let Some(client_id) = first {
        let dev = sim.registry.device(sim.device)?;
        let index = dev.find_by_client_id(client_id).context("first touch is gone")?;
        let mut sink = VecEventSink::default();
        let replayed = dev.replay_touch_history(index, 0x0040_0001, &mut sink)?;
        tracing::info!("replayed {} events of touch {} to a new owner", replayed, client_id);
    }

    for ddx_id in [10, 11, 12] {
        sim.sample(ddx_id, TouchEventType::End, 0.0, 0.0)?;
    }

    tracing::info!("{} emulated pointer events", sim.state.emitted.len());
    Ok(())
}
