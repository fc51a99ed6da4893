#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fiber;
pub mod geom;

use std::fmt;

use fiber::{FiberStore, IngestOptions};
use geom::LineSet;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

/// Browser entry point: one fiber bundle resampled into a [`FiberStore`].
///
/// Geometry crosses the boundary as flat buffers: `points` holds xyz triples
/// and `line_lengths` the number of consecutive points in each fiber.
#[wasm_bindgen]
pub struct TractEngine {
    store: FiberStore,
    geometry: Option<LineSet>,
}

#[wasm_bindgen]
impl TractEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> TractEngine {
        TractEngine {
            store: FiberStore::new(),
            geometry: None,
        }
    }

    /// Resample a bundle; replaces whatever was loaded before.
    #[wasm_bindgen]
    pub fn ingest_flat(
        &mut self,
        points: &[f64],
        line_lengths: &[u32],
        points_per_fiber: usize,
    ) -> Result<(), JsValue> {
        let geometry = line_set_from_flat(points, line_lengths).map_err(|err| js_error(&err))?;
        let mut store = FiberStore::new();
        store
            .ingest_line_set(&geometry, &IngestOptions::new(points_per_fiber))
            .map_err(to_js_error)?;
        debug_log!(
            "ingested {} fibers at {} points each",
            store.fiber_count(),
            store.points_per_fiber()
        );

        self.store = store;
        self.geometry = Some(geometry);
        Ok(())
    }

    /// Attach a scalar indexed by the point order passed to `ingest_flat`.
    #[wasm_bindgen]
    pub fn attach_scalar(&mut self, name: &str, values: &[f64]) -> Result<(), JsValue> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| js_error("no fiber bundle has been loaded"))?;
        let points_per_fiber = self.store.points_per_fiber();
        self.store
            .attach_scalar(geometry, values, name, points_per_fiber)
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn fiber_count(&self) -> usize {
        self.store.fiber_count()
    }

    #[wasm_bindgen]
    pub fn points_per_fiber(&self) -> usize {
        self.store.points_per_fiber()
    }

    /// `{ x, y, z }` arrays of one fiber.
    #[wasm_bindgen]
    pub fn get_fiber(&self, index: usize) -> Result<JsValue, JsValue> {
        let fiber = self.store.fiber(index).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&fiber).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_scalar(&self, index: usize, name: &str) -> Result<Vec<f64>, JsValue> {
        self.store.scalar(index, name).map_err(to_js_error)
    }

    /// Arc length of every fiber, in index order.
    #[wasm_bindgen]
    pub fn arc_lengths(&self) -> Result<Vec<f64>, JsValue> {
        let indices: Vec<usize> = (0..self.store.fiber_count()).collect();
        self.store.arc_lengths(&indices).map_err(to_js_error)
    }

    /// `{ points, lines }` of the resampled bundle without the excluded fibers.
    #[wasm_bindgen]
    pub fn export_line_set(&self, exclude: Vec<u32>) -> Result<JsValue, JsValue> {
        let exclude: Vec<usize> = exclude.into_iter().map(|index| index as usize).collect();
        let line_set = self.store.to_line_set(&exclude).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&line_set).map_err(to_js_error)
    }
}

impl Default for TractEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits flat xyz triples into consecutive polylines of `line_lengths`
/// points each.
pub fn line_set_from_flat(points: &[f64], line_lengths: &[u32]) -> Result<LineSet, String> {
    if points.len() % 3 != 0 {
        return Err(format!(
            "point buffer length {} is not a multiple of 3",
            points.len()
        ));
    }
    let point_count = points.len() / 3;
    let referenced: usize = line_lengths.iter().map(|&len| len as usize).sum();
    if referenced != point_count {
        return Err(format!(
            "line lengths cover {referenced} points but {point_count} were given"
        ));
    }

    let coords = points
        .chunks_exact(3)
        .map(|xyz| [xyz[0], xyz[1], xyz[2]])
        .collect();
    let mut lines = Vec::with_capacity(line_lengths.len());
    let mut next = 0u32;
    for &len in line_lengths {
        lines.push((next..next + len).collect());
        next += len;
    }
    Ok(LineSet::new(coords, lines))
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen::JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::LineSetSource;

    #[test]
    fn flat_buffers_become_consecutive_lines() {
        let points = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 5.0, 5.0, 6.0, 5.0, 5.0, 7.0, 5.0, 5.0];
        let set = line_set_from_flat(&points, &[2, 3]).unwrap();

        assert_eq!(set.line_count(), 2);
        assert_eq!(set.lines[0], vec![0, 1]);
        assert_eq!(set.lines[1], vec![2, 3, 4]);
        assert_eq!(set.points[4], [7.0, 5.0, 5.0]);
    }

    #[test]
    fn flat_buffers_must_agree() {
        assert!(line_set_from_flat(&[0.0, 1.0], &[1]).is_err());
        assert!(line_set_from_flat(&[0.0, 1.0, 2.0], &[2]).is_err());
    }

    #[test]
    fn engine_ingests_and_measures() {
        let mut engine = TractEngine::new();
        let points = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        engine.ingest_flat(&points, &[3], 3).expect("ingest bundle");

        assert_eq!(engine.fiber_count(), 1);
        assert_eq!(engine.points_per_fiber(), 3);
        assert_eq!(engine.arc_lengths().expect("lengths"), vec![2.0]);

        engine
            .attach_scalar("FA", &[0.1, 0.2, 0.3])
            .expect("attach scalar");
        assert_eq!(engine.get_scalar(0, "FA").expect("scalar"), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn engine_rejects_scalar_before_ingest() {
        let mut engine = TractEngine::new();
        assert!(engine.attach_scalar("FA", &[1.0]).is_err());
        assert!(engine.ingest_flat(&[0.0, 0.0, 0.0], &[1], 4).is_err());
        assert_eq!(engine.fiber_count(), 0);
    }
}
