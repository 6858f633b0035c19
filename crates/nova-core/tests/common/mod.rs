use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{GrayImage, ImageFormat, Luma};
use nova_core::context::RunContext;
use nova_core::error::Result;
use nova_core::qa::report::JsonReportSink;
use nova_core::tools::{Tool, ToolRunner};

/// Write a flat 8-bit grayscale PNG, creating parent directories.
pub fn write_gray_png(path: &Path, width: u32, height: u32, level: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = GrayImage::from_pixel(width, height, Luma([level]));
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

/// Mean value `load_frame` reports for a flat 8-bit PNG at `level`.
/// 8-bit pixels widen to 16 bits as `level * 257`.
pub fn level_mean(level: u8) -> f64 {
    (level as f64 * 257.0) / 65535.0
}

/// Run context rooted at `outdir` with a JSON report sink under `qa/`.
pub fn run_context(outdir: &Path) -> RunContext {
    RunContext {
        program: "supernova".to_string(),
        night: None,
        outdir: outdir.to_path_buf(),
        reference_metrics: None,
        sink: Arc::new(JsonReportSink::new(outdir.join("qa"))),
    }
}

type Effect = dyn Fn(&str, &Tool, &Path) -> Result<()> + Send + Sync;

/// Fake tool runner: records every invocation and applies a caller-supplied
/// effect (typically fabricating the files the real tool would produce).
pub struct RecordingRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    effect: Box<Effect>,
}

impl RecordingRunner {
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn(&str, &Tool, &Path) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            effect: Box::new(effect),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_, _, _| Ok(()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, stage: &str, tool: &Tool, workdir: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((stage.to_string(), tool.args.clone()));
        (self.effect)(stage, tool, workdir)
    }
}

/// Build a PathBuf from segments, for terser test bodies.
pub fn path(root: &Path, segments: &[&str]) -> PathBuf {
    let mut p = root.to_path_buf();
    for s in segments {
        p.push(s);
    }
    p
}
