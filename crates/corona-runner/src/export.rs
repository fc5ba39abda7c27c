//! Writes per-step frames and snapshot records to disk.

use crate::render::{render, Palette};
use anyhow::{Context, Result};
use corona_world::Snapshot;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SNAPSHOT_FILE: &str = "snapshots.jsonl";

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub frames: bool,
    pub snapshots: bool,
    pub tile_size: u32,
}

pub struct Exporter {
    options: ExportOptions,
    palette: Palette,
    snapshot_writer: Option<BufWriter<File>>,
    frames_written: u64,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Result<Self> {
        let mut snapshot_writer = None;

        if options.frames || options.snapshots {
            fs::create_dir_all(&options.output_dir).with_context(|| {
                format!("failed to create output directory {:?}", options.output_dir)
            })?;
        }

        if options.snapshots {
            let path = options.output_dir.join(SNAPSHOT_FILE);
            let file = File::create(&path)
                .with_context(|| format!("failed to create {:?}", path))?;
            snapshot_writer = Some(BufWriter::new(file));
        }

        info!(
            output_dir = ?options.output_dir,
            frames = options.frames,
            snapshots = options.snapshots,
            "Exporter ready"
        );

        Ok(Self {
            options,
            palette: Palette::default(),
            snapshot_writer,
            frames_written: 0,
        })
    }

    pub fn record(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.options.frames {
            let path = frame_path(&self.options.output_dir, self.frames_written);
            render(snapshot, &self.palette, self.options.tile_size)
                .save(&path)
                .with_context(|| format!("failed to write frame {:?}", path))?;
            self.frames_written += 1;
            debug!(step = snapshot.step, path = ?path, "Frame written");
        }

        if let Some(writer) = self.snapshot_writer.as_mut() {
            writeln!(writer, "{}", snapshot.to_json()?)?;
        }

        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if let Some(mut writer) = self.snapshot_writer.take() {
            writer.flush()?;
        }
        info!(frames = self.frames_written, "Export finished");
        Ok(())
    }
}

/// Zero-padded, sequentially numbered PNG path
pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{:05}.png", index))
}
