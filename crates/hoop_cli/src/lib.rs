//! hoop CLI library
//!
//! File plumbing around `hoop_core`: detections JSON in, analysis JSON out.
//! Kept separate from `main.rs` so it can be tested without clap.

use anyhow::{Context, Result};
use hoop_core::{
    DetectionHistory, EventKind, FrameSource, GameAnalysis, GameAnalysisPipeline, ImageDirFrames,
    PipelineConfig,
};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Which JSON document to describe with `hoop schema`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// The detections file consumed by `hoop analyze`
    Input,
    /// The analysis document produced by `hoop analyze`
    Output,
}

/// Read a detections JSON file
pub fn load_detections(path: &Path) -> Result<DetectionHistory> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read detections file: {}", path.display()))?;
    let history: DetectionHistory = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse detections JSON: {}", path.display()))?;
    info!(
        path = %path.display(),
        frames = history.frame_count(),
        "detections loaded"
    );
    Ok(history)
}

/// Config file when given, otherwise the `HOOP_PROFILE` preset
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Invalid pipeline config: {}", path.display())),
        None => {
            let config = PipelineConfig::from_env_or_default();
            config.ensure_valid()?;
            Ok(config)
        }
    }
}

/// Run the full pipeline over one detections file, optionally sampling
/// jersey colors from a directory of decoded frames.
pub fn analyze(
    input: &Path,
    frames_dir: Option<&Path>,
    config: PipelineConfig,
) -> Result<GameAnalysis> {
    let mut history = load_detections(input)?;
    let frames = frames_dir
        .map(|dir| {
            ImageDirFrames::open(dir)
                .with_context(|| format!("Failed to open frame directory: {}", dir.display()))
        })
        .transpose()?;

    let pipeline = GameAnalysisPipeline::new(config)?;
    let analysis = pipeline
        .run(&mut history, frames.as_ref().map(|f| f as &dyn FrameSource))
        .with_context(|| format!("Analysis failed for {}", input.display()))?;
    Ok(analysis)
}

/// Serialize `value` as JSON to `out`, or to stdout when `out` is `None`
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

pub fn schema_json(kind: SchemaKind) -> Result<String> {
    let schema = match kind {
        SchemaKind::Input => schemars::schema_for!(DetectionHistory),
        SchemaKind::Output => schemars::schema_for!(GameAnalysis),
    };
    Ok(serde_json::to_string_pretty(&schema)?)
}

/// Human-readable digest printed after `hoop analyze`
pub fn summary_lines(analysis: &GameAnalysis) -> Vec<String> {
    let stats = &analysis.team_control_stats;
    let shots = &analysis.shot_stats.overall;
    let diag = &analysis.diagnostics;
    vec![
        format!(
            "frames: {} @ {:.2} fps",
            analysis.frame_count, analysis.fps
        ),
        format!(
            "ball control: team 1 {:.1}%, team 2 {:.1}%",
            stats.team1_share * 100.0,
            stats.team2_share * 100.0
        ),
        format!(
            "shots: {}/{} made, passes: {}",
            shots.makes,
            shots.attempts,
            analysis.events.count(EventKind::Pass)
        ),
        format!(
            "degraded frames: {} without ball, {} without keypoints, {} with too few keypoints, {} degenerate",
            diag.missing_ball_frames,
            diag.missing_keypoint_frames,
            diag.insufficient_correspondence_frames,
            diag.geometry_failure_frames
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoop_core::{BBox, DetectionRecord, FrameDetections, Rgb};
    use tempfile::tempdir;

    fn write_detections(dir: &Path) -> std::path::PathBuf {
        let mut history = DetectionHistory::with_frames(12);
        history.fps = Some(24.0);
        let mut frame = FrameDetections::new();
        frame.insert(
            7,
            DetectionRecord::new(BBox::new(100.0, 200.0, 140.0, 300.0))
                .with_color(Rgb::new(30.0, 30.0, 200.0)),
        );
        frame.insert(
            9,
            DetectionRecord::new(BBox::new(400.0, 200.0, 440.0, 300.0))
                .with_color(Rgb::new(250.0, 250.0, 250.0)),
        );
        history.players = vec![frame; 12];
        for ball in history.balls.iter_mut() {
            *ball = Some(BBox::new(115.0, 240.0, 125.0, 250.0));
        }

        let path = dir.join("detections.json");
        fs::write(&path, serde_json::to_string(&history).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_analyze_round_trip_through_files() {
        let dir = tempdir().unwrap();
        let input = write_detections(dir.path());
        let analysis = analyze(&input, None, PipelineConfig::default()).unwrap();
        assert_eq!(analysis.frame_count, 12);
        assert_eq!(analysis.fps, 24.0);
        assert_eq!(analysis.possession[5], Some(7));

        let out = dir.path().join("nested").join("analysis.json");
        write_json(&analysis, Some(&out), true).unwrap();
        let back: GameAnalysis =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(back.possession, analysis.possession);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_detections(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("nope.json"));
    }

    #[test]
    fn test_invalid_config_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "video:\n  fps: 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_schemas_describe_both_documents() {
        let input = schema_json(SchemaKind::Input).unwrap();
        assert!(input.contains("\"balls\""));
        let output = schema_json(SchemaKind::Output).unwrap();
        assert!(output.contains("\"possession\""));
        assert!(output.contains("\"diagnostics\""));
    }

    #[test]
    fn test_summary_mentions_shots_and_control() {
        let dir = tempdir().unwrap();
        let input = write_detections(dir.path());
        let analysis = analyze(&input, None, PipelineConfig::default()).unwrap();
        let lines = summary_lines(&analysis);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("frames: 12"));
        assert!(lines[2].starts_with("shots: 0/0"));
    }
}
