use wasm_bindgen::prelude::*;

pub mod error;
pub mod exercises;
pub mod music;
pub mod player;
pub mod scoring;

use std::cell::RefCell;

use serde::Deserialize;

use error::MusicError;
use exercises::blocks::Block;
use music::note::{Note, NoteValue};
use music::piece::Piece;
use music::time_signature::TimeSignature;
use player::Player;
use scoring::describe::{TimingDescription, Verbosity};

thread_local! {
    static PLAYER: RefCell<Option<Player>> = RefCell::new(None);
}

/// Host-supplied description of a piece: meter, notes and an optional
/// backing-loop selector.
#[derive(Deserialize)]
pub struct PieceDef {
    pub top: u8,
    pub bottom: Note,
    #[serde(default)]
    pub swing: bool,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub backing_loop: Option<usize>,
}

fn build_piece(def: PieceDef) -> Result<Piece, MusicError> {
    let time_signature = TimeSignature::new(def.top, def.bottom, def.swing)?;
    let piece = Piece::new(time_signature, def.notes)?;
    Ok(match def.backing_loop {
        Some(index) => piece.with_backing_loop(index),
        None => piece,
    })
}

fn signature(top: u8, denominator: u8, dots: u8, swing: bool) -> Result<TimeSignature, MusicError> {
    let bottom = Note::new(NoteValue::from_denominator(denominator)?, dots)?;
    TimeSignature::new(top, bottom, swing)
}

fn parse_verbosity(verbosity: &str) -> Option<Verbosity> {
    match verbosity {
        "short" => Some(Verbosity::Short),
        "medium" => Some(Verbosity::Medium),
        "long" => Some(Verbosity::Long),
        _ => None,
    }
}

fn err_js(e: MusicError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Install the panic hook and console logger. Call once at page load.
#[wasm_bindgen]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    #[cfg(feature = "console_log")]
    let _ = console_log::init_with_level(log::Level::Debug);
}

/// Replace the session's player with one for the given piece and tempo.
#[wasm_bindgen]
pub fn create_player(piece: JsValue, tempo: f64) -> Result<(), JsValue> {
    let def: PieceDef =
        serde_wasm_bindgen::from_value(piece).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let piece = build_piece(def).map_err(err_js)?;
    let player = Player::new(piece, tempo).map_err(err_js)?;
    PLAYER.with(|cell| {
        *cell.borrow_mut() = Some(player);
    });
    Ok(())
}

fn with_player<T>(f: impl FnOnce(&mut Player) -> Result<T, JsValue>) -> Result<T, JsValue> {
    PLAYER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(player) => f(player),
        None => Err(JsValue::from_str("no player loaded")),
    })
}

#[wasm_bindgen]
pub fn player_play(now_ms: f64, count_off: bool) -> Result<JsValue, JsValue> {
    with_player(|player| to_js(&player.play(now_ms, count_off)))
}

#[wasm_bindgen]
pub fn player_tick(now_ms: f64) -> Result<JsValue, JsValue> {
    with_player(|player| to_js(&player.tick(now_ms)))
}

#[wasm_bindgen]
pub fn player_stop() -> Result<JsValue, JsValue> {
    with_player(|player| to_js(&player.stop()))
}

/// Absolute time the host should arm its next timer for, if playing.
#[wasm_bindgen]
pub fn player_next_deadline() -> Option<f64> {
    PLAYER.with(|cell| cell.borrow().as_ref().and_then(|p| p.next_deadline_ms()))
}

#[wasm_bindgen]
pub fn player_is_playing() -> bool {
    PLAYER.with(|cell| cell.borrow().as_ref().is_some_and(|p| p.is_playing()))
}

#[wasm_bindgen]
pub fn player_set_tempo(tempo: f64) -> Result<(), JsValue> {
    with_player(|player| player.set_tempo(tempo).map_err(err_js))
}

/// Grade a clap at the given wall-clock time; returns the indices of
/// note events whose grading changed.
#[wasm_bindgen]
pub fn player_clap(now_ms: f64) -> Result<JsValue, JsValue> {
    with_player(|player| to_js(&player.grade_clap(now_ms)))
}

/// Grade a tap against the beat events.
#[wasm_bindgen]
pub fn player_tap(now_ms: f64) -> Result<JsValue, JsValue> {
    with_player(|player| to_js(&player.grade_tap(now_ms)))
}

/// Relay the backing loop's on-play seek read-back for latency
/// calibration.
#[wasm_bindgen]
pub fn player_backing_loop_started(now_ms: f64, seek_ms: f64) -> Result<(), JsValue> {
    with_player(|player| {
        player.backing_loop_started(now_ms, seek_ms);
        Ok(())
    })
}

/// Grading statistics for both event streams plus the latency heuristic.
#[wasm_bindgen]
pub fn player_summary() -> Result<JsValue, JsValue> {
    with_player(|player| to_js(&player.summary()))
}

#[wasm_bindgen]
pub fn player_notation() -> Result<String, JsValue> {
    with_player(|player| Ok(player.piece().notation()))
}

/// Stable DOM key for one of the current piece's notes.
#[wasm_bindgen]
pub fn player_note_id(index: usize) -> Result<String, JsValue> {
    with_player(|player| Ok(player.piece().id_for_note_index(index)))
}

/// Render a piece's staff markup without loading it into the session.
#[wasm_bindgen]
pub fn piece_notation(piece: JsValue) -> Result<String, JsValue> {
    let def: PieceDef =
        serde_wasm_bindgen::from_value(piece).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(build_piece(def).map_err(err_js)?.notation())
}

/// Phrase an absolute beat timing, e.g. "a little after the \"and\" of
/// beat 2". Verbosity is "short", "medium" or "long".
#[wasm_bindgen]
pub fn describe_timing(
    timing: f64,
    top: u8,
    bottom_denominator: u8,
    bottom_dots: u8,
    swing: bool,
    tempo: f64,
    verbosity: &str,
) -> Result<String, JsValue> {
    let time_signature = signature(top, bottom_denominator, bottom_dots, swing).map_err(err_js)?;
    let verbosity = parse_verbosity(verbosity)
        .ok_or_else(|| JsValue::from_str(&format!("unknown verbosity: {}", verbosity)))?;
    Ok(TimingDescription::of(timing, &time_signature, tempo).description(verbosity))
}

/// Generate `count` random measures from a block library and return the
/// flattened note sequence.
#[wasm_bindgen]
pub fn random_measures(
    blocks: JsValue,
    top: u8,
    bottom_denominator: u8,
    bottom_dots: u8,
    swing: bool,
    count: usize,
) -> Result<JsValue, JsValue> {
    let blocks: Vec<Block> =
        serde_wasm_bindgen::from_value(blocks).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let time_signature = signature(top, bottom_denominator, bottom_dots, swing).map_err(err_js)?;
    let notes = Block::random_measures(&time_signature, count, &blocks, &mut rand::thread_rng())
        .map_err(err_js)?;
    to_js(&notes)
}
