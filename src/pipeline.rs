use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    config::RenderConfig,
    driver::{CancelToken, RenderStats, render_animation},
    error::{MapgifError, MapgifResult},
    map::MapData,
    wad::Wad,
};

/// `<wad path>_<MAP>.gif`, next to the WAD.
pub fn default_output_path(wad_path: &Path, map: &str) -> PathBuf {
    let mut name = wad_path.as_os_str().to_owned();
    name.push(format!("_{map}.gif"));
    PathBuf::from(name)
}

/// `<out_dir>/<wad file name>_<MAP>.gif`.
pub fn output_path_in(out_dir: &Path, wad_path: &Path, map: &str) -> PathBuf {
    let file = wad_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    out_dir.join(format!("{file}_{map}.gif"))
}

pub fn ensure_parent_dir(path: &Path) -> MapgifResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Render one map to a GIF file.
///
/// If rendering fails before any byte is written (bad geometry, invalid settings) the empty
/// output file is removed again.
#[tracing::instrument(skip(map, cfg, cancel), fields(map = %map.name))]
pub fn render_map_to_file(
    map: &MapData,
    out_path: &Path,
    cfg: &RenderConfig,
    cancel: &CancelToken,
) -> MapgifResult<RenderStats> {
    ensure_parent_dir(out_path)?;
    let file = File::create(out_path)
        .with_context(|| format!("failed to create '{}'", out_path.display()))?;

    let mut writer = BufWriter::new(file);
    let result = render_animation(map, cfg, &mut writer, cancel);
    drop(writer);

    if result.is_err()
        && std::fs::metadata(out_path).is_ok_and(|m| m.len() == 0)
        && let Err(e) = std::fs::remove_file(out_path)
    {
        tracing::warn!(error = %e, "failed to remove empty output file");
    }
    result
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub rendered: Vec<(String, PathBuf, RenderStats)>,
    pub failed: Vec<(String, MapgifError)>,
    /// Maps not attempted because the batch was cancelled.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Render every map of a WAD, in directory order.
///
/// Map-level failures (unsupported format, degenerate geometry, corrupt records) are recorded
/// and the batch moves on. Output failures abort the batch. A cancelled map is finalized and
/// the remaining maps are skipped.
#[tracing::instrument(skip(wad, cfg, cancel))]
pub fn render_wad(
    wad: &Wad,
    wad_path: &Path,
    out_dir: Option<&Path>,
    cfg: &RenderConfig,
    cancel: &CancelToken,
) -> MapgifResult<BatchReport> {
    cfg.validate()?;
    let mut report = BatchReport::default();

    for name in wad.map_names() {
        if cancel.is_cancelled() {
            report.skipped.push(name.to_string());
            continue;
        }

        let out_path = match out_dir {
            Some(dir) => output_path_in(dir, wad_path, name),
            None => default_output_path(wad_path, name),
        };

        match wad
            .load_map(name)
            .and_then(|map| render_map_to_file(&map, &out_path, cfg, cancel))
        {
            Ok(stats) => {
                tracing::info!(map = name, out = %out_path.display(), frames = stats.frames, "map rendered");
                report.rendered.push((name.to_string(), out_path, stats));
            }
            Err(e) if e.is_per_map() => {
                tracing::warn!(map = name, error = %e, "skipping map");
                report.failed.push((name.to_string(), e));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}
