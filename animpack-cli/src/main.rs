use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::{debug, info};

use animpack::{
    calculate_skeleton_error, AnimationClip, ClipView, CompressionSettings, DTransform,
    HeapAllocator, PoseWriter, RangeReduction, RigidSkeleton, RotationFormat, Transform,
    TranslationFormat, UniformlySampled,
};

#[derive(Debug, Parser)]
#[command(
    name = "animpack",
    about = "Compresses a skeletal animation clip at every supported configuration"
)]
struct Options {
    /// Clip document (JSON) holding the skeleton and sampled tracks.
    input: PathBuf,

    /// Write the stats report to FILE instead of stdout.
    #[arg(long, value_name = "FILE")]
    stats: Option<PathBuf>,
}

/// The full configuration sweep: every rotation format crossed with every
/// legal translation format / range reduction combination.
fn sweep_configurations() -> Vec<CompressionSettings> {
    let rotation_formats = [
        RotationFormat::Quat128,
        RotationFormat::Quat96,
        RotationFormat::Quat48,
        RotationFormat::Quat32,
    ];
    let per_clip = RangeReduction::PER_CLIP;
    let mut configurations = Vec::new();
    for rotation_format in rotation_formats {
        for (translation_format, range_reduction) in [
            (TranslationFormat::Vector3_96, RangeReduction::empty()),
            (TranslationFormat::Vector3_96, per_clip | RangeReduction::ROTATIONS),
            (TranslationFormat::Vector3_96, per_clip | RangeReduction::TRANSLATIONS),
            (
                TranslationFormat::Vector3_96,
                per_clip | RangeReduction::ROTATIONS | RangeReduction::TRANSLATIONS,
            ),
            (TranslationFormat::Vector3_48, per_clip | RangeReduction::TRANSLATIONS),
            (
                TranslationFormat::Vector3_48,
                per_clip | RangeReduction::ROTATIONS | RangeReduction::TRANSLATIONS,
            ),
            (TranslationFormat::Vector3_32, per_clip | RangeReduction::TRANSLATIONS),
            (
                TranslationFormat::Vector3_32,
                per_clip | RangeReduction::ROTATIONS | RangeReduction::TRANSLATIONS,
            ),
        ] {
            configurations.push(CompressionSettings::new(
                rotation_format,
                translation_format,
                range_reduction,
            ));
        }
    }
    configurations
}

/// Samples the raw clip and the artifact at every frame time plus the clip
/// end, and returns the worst skeleton error. Also probes the single-bone
/// seek path against the full pose.
fn find_max_error(
    clip: &AnimationClip,
    skeleton: &RigidSkeleton,
    algorithm: &UniformlySampled,
    view: &ClipView<'_>,
) -> Result<f64> {
    let num_bones = skeleton.num_bones() as usize;
    let mut raw_pose = vec![DTransform::IDENTITY; num_bones];
    let mut lossy_pose = vec![Transform::IDENTITY; num_bones];
    let mut max_error = 0.0f64;

    let sample_times = (0..clip.num_samples())
        .map(|sample| sample as f64 / clip.sample_rate() as f64)
        .chain(std::iter::once(clip.duration()));
    for time in sample_times {
        clip.sample_pose(time, &mut raw_pose);
        algorithm.decompress_pose(view, time as f32, &mut PoseWriter::new(&mut lossy_pose));
        max_error = max_error.max(calculate_skeleton_error(skeleton, &raw_pose, &lossy_pose));
    }

    // The last bone at the clip end exercises the longest seek.
    let probe = skeleton.num_bones() - 1;
    let (rotation, translation) =
        algorithm.decompress_bone(view, clip.duration() as f32, probe);
    let pose_entry = lossy_pose[probe as usize];
    ensure!(
        rotation == pose_entry.rotation && translation == pose_entry.translation,
        "single-bone seek disagrees with the full pose for bone {probe}"
    );

    Ok(max_error)
}

fn try_configuration(
    clip: &AnimationClip,
    skeleton: &RigidSkeleton,
    settings: CompressionSettings,
    out: &mut dyn Write,
) -> Result<()> {
    let algorithm = UniformlySampled::new(settings);
    let allocator = HeapAllocator;

    let start = Instant::now();
    let compressed = algorithm
        .compress_clip(&allocator, clip, skeleton)
        .context("compression failed")?;
    let elapsed = start.elapsed();

    let view = compressed.view().context("artifact failed validation")?;
    let max_error = find_max_error(clip, skeleton, &algorithm, &view)?;

    let raw_size = clip.raw_size();
    let ratio = raw_size as f64 / compressed.size() as f64;

    writeln!(out, "Clip raw size (bytes): {raw_size}")?;
    writeln!(out, "Clip compression ratio: {ratio:.2} : 1")?;
    writeln!(out, "Clip max error: {max_error:.5}")?;
    writeln!(out, "Clip compression time (s): {:.6}", elapsed.as_secs_f64())?;
    writeln!(out, "Clip duration (s): {:.3}", clip.duration())?;
    algorithm.print_stats(&view, out)?;
    writeln!(out)?;

    debug!(
        "{} / {} / {}: {} bytes, max error {max_error:.6}",
        settings.rotation_format,
        settings.translation_format,
        settings.range_reduction.describe(),
        compressed.size()
    );

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let options = Options::parse();

    let text = fs::read_to_string(&options.input)
        .with_context(|| format!("failed to read {}", options.input.display()))?;
    let (skeleton, clip) = animpack::json::read_clip(&text)
        .with_context(|| format!("failed to parse {}", options.input.display()))?;
    info!(
        "clip '{}': {} bones, {} samples at {} Hz",
        clip.name(),
        clip.num_bones(),
        clip.num_samples(),
        clip.sample_rate()
    );

    let mut out: Box<dyn Write> = match &options.stats {
        Some(path) => Box::new(
            fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    for settings in sweep_configurations() {
        try_configuration(&clip, &skeleton, settings, &mut out)?;
    }

    Ok(())
}
