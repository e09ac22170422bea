use std::collections::HashMap;
use std::io::Write;
use std::os::fd::{AsFd, FromRawFd, IntoRawFd, OwnedFd};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use memfd::MemfdOptions;
use wayland_client::globals::{registry_queue_init, GlobalListContents};
use wayland_client::protocol::{wl_registry, wl_seat};
use wayland_client::{Connection, Dispatch, EventQueue, Proxy, QueueHandle};

use crate::keymap::KeymapInfo;
use crate::model::KeyState;
use crate::playback::sink::KeySink;
use crate::protocols::virtual_keyboard_unstable_v1::zwp_virtual_keyboard_manager_v1::ZwpVirtualKeyboardManagerV1;
use crate::protocols::virtual_keyboard_unstable_v1::zwp_virtual_keyboard_v1::ZwpVirtualKeyboardV1;

#[derive(Debug, Clone)]
struct SeatData {
    global_name: u32,
}

#[derive(Debug, Default)]
struct State {
    seat_names_by_global: HashMap<u32, String>,
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for State {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_seat::WlSeat, SeatData> for State {
    fn event(
        state: &mut Self,
        _proxy: &wl_seat::WlSeat,
        event: wl_seat::Event,
        data: &SeatData,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Name { name } = event {
            state.seat_names_by_global.insert(data.global_name, name);
        }
    }
}

impl Dispatch<ZwpVirtualKeyboardManagerV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardManagerV1,
        _event: <ZwpVirtualKeyboardManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwpVirtualKeyboardV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardV1,
        _event: <ZwpVirtualKeyboardV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

fn key_state_to_u32(state: KeyState) -> u32 {
    match state {
        KeyState::Released => 0,
        KeyState::Pressed => 1,
    }
}

fn make_keymap_fd(keymap: &str) -> Result<(OwnedFd, u32)> {
    let memfd = MemfdOptions::default()
        .allow_sealing(true)
        .create("codetyper-xkb-keymap")
        .context("failed to create memfd for keymap")?;

    let mut file = memfd.as_file();
    file.write_all(keymap.as_bytes())?;
    file.write_all(&[0])?;

    let size = (keymap.len() + 1)
        .try_into()
        .map_err(|_| anyhow!("keymap too large"))?;

    let raw_fd = memfd.into_file().into_raw_fd();
    // SAFETY: raw_fd was just released by `into_raw_fd`, so we are its only owner.
    let owned_fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

    Ok((owned_fd, size))
}

fn bind_seat(
    globals: &wayland_client::globals::GlobalList,
    event_queue: &mut EventQueue<State>,
    state: &mut State,
    qh: &QueueHandle<State>,
    seat_name: Option<&str>,
) -> Result<wl_seat::WlSeat> {
    let seat_globals: Vec<_> = globals
        .contents()
        .clone_list()
        .into_iter()
        .filter(|g| g.interface == wl_seat::WlSeat::interface().name)
        .collect();

    let Some(first) = seat_globals.first() else {
        return Err(anyhow!("wl_seat not available (no seats advertised)"));
    };

    let bind = |name: u32, version: u32| -> wl_seat::WlSeat {
        globals.registry().bind(
            name,
            version.min(7),
            qh,
            SeatData { global_name: name },
        )
    };

    let Some(requested) = seat_name else {
        return Ok(bind(first.name, first.version));
    };

    let seats: Vec<(u32, wl_seat::WlSeat)> = seat_globals
        .iter()
        .map(|g| (g.name, bind(g.name, g.version)))
        .collect();

    event_queue
        .roundtrip(state)
        .context("Wayland roundtrip (seat discovery) failed")?;

    if let Some((_, seat)) = seats.iter().find(|(global_name, _)| {
        state
            .seat_names_by_global
            .get(global_name)
            .is_some_and(|n| n == requested)
    }) {
        return Ok(seat.clone());
    }

    let mut names: Vec<String> = state.seat_names_by_global.values().cloned().collect();
    names.sort();
    names.dedup();
    if names.is_empty() {
        return Err(anyhow!(
            "requested seat {requested:?}, but compositor did not advertise any wl_seat.name values (requires wl_seat v2+)"
        ));
    }
    Err(anyhow!(
        "requested seat {requested:?} not found; available seats: {}",
        names.join(", ")
    ))
}

/// Virtual-keyboard sink for wlroots-style compositors.
///
/// Wayland offers no global pointer position, so only Ctrl+C stops playback.
pub struct WaylandSink {
    conn: Connection,
    keyboard: ZwpVirtualKeyboardV1,
    start: Instant,
    _event_queue: EventQueue<State>,
}

impl WaylandSink {
    pub fn connect(keymap: &KeymapInfo, seat_name: Option<&str>) -> Result<Self> {
        let conn = Connection::connect_to_env().context("failed to connect to Wayland")?;
        let (globals, mut event_queue) =
            registry_queue_init(&conn).context("failed to init Wayland registry")?;
        let qh = event_queue.handle();
        let mut state = State::default();

        let manager: ZwpVirtualKeyboardManagerV1 = globals
            .bind(&qh, 1..=1, ())
            .context("zwp_virtual_keyboard_manager_v1 not available (is sway/wlroots exposing it?)")?;

        let seat = bind_seat(&globals, &mut event_queue, &mut state, &qh, seat_name)?;
        let keyboard = manager.create_virtual_keyboard(&seat, &qh, ());

        event_queue
            .roundtrip(&mut state)
            .context("Wayland roundtrip failed")?;

        let (keymap_fd, keymap_size) = make_keymap_fd(&keymap.keymap)?;
        keyboard.keymap(keymap.keymap_format, keymap_fd.as_fd(), keymap_size);
        conn.flush().context("Wayland flush failed")?;

        Ok(Self {
            conn,
            keyboard,
            start: Instant::now(),
            _event_queue: event_queue,
        })
    }

    fn time_ms(&self) -> u32 {
        self.start
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u32::MAX)
    }
}

impl KeySink for WaylandSink {
    fn key(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        self.keyboard
            .key(self.time_ms(), keycode, key_state_to_u32(state));
        self.conn.flush().with_context(|| {
            format!("Wayland flush failed (key keycode={keycode} state={state:?})")
        })
    }

    fn modifiers(
        &mut self,
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        group: u32,
    ) -> Result<()> {
        self.keyboard
            .modifiers(mods_depressed, mods_latched, mods_locked, group);
        self.conn
            .flush()
            .context("Wayland flush failed (modifiers)")
    }

    fn reset_modifiers(&mut self) {
        self.keyboard.modifiers(0, 0, 0, 0);
        let time_ms = self.time_ms();
        for keycode in super::COMMON_MODIFIER_KEYCODES {
            self.keyboard.key(time_ms, keycode, 0);
        }
        let _ = self.conn.flush();
    }
}
