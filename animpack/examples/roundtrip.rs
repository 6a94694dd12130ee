use animpack::{
    AnimationClip, CompressionSettings, HeapAllocator, PoseWriter, RangeReduction, RigidBone,
    RigidSkeleton, RotationFormat, Transform, TranslationFormat, UniformlySampled,
};
use glam::{DQuat, DVec3};

fn main() {
    let skeleton = RigidSkeleton::new(vec![
        RigidBone::root("root"),
        RigidBone::child_of("arm", 0),
    ])
    .expect("skeleton");

    let num_samples = 16u32;
    let mut clip = AnimationClip::new(&skeleton, "swing", num_samples, 30).expect("clip");
    for sample in 0..num_samples {
        let phase = sample as f64 / num_samples as f64 * std::f64::consts::TAU;
        clip.set_rotation_sample(1, sample, DQuat::from_axis_angle(DVec3::Z, phase.sin()))
            .expect("set rotation");
        clip.set_translation_sample(1, sample, DVec3::new(0.0, 1.0 + 0.1 * phase.cos(), 0.0))
            .expect("set translation");
    }

    let configurations = [
        CompressionSettings::default(),
        CompressionSettings::new(
            RotationFormat::Quat48,
            TranslationFormat::Vector3_48,
            RangeReduction::PER_CLIP | RangeReduction::ROTATIONS | RangeReduction::TRANSLATIONS,
        ),
    ];

    for settings in configurations {
        let algorithm = UniformlySampled::new(settings);
        let compressed = algorithm
            .compress_clip(&HeapAllocator, &clip, &skeleton)
            .expect("compress");
        let view = compressed.view().expect("valid artifact");

        let mut stats = Vec::new();
        algorithm.print_stats(&view, &mut stats).expect("stats");
        print!("{}", String::from_utf8(stats).expect("utf-8"));
        println!(
            "Compression ratio: {:.2}:1",
            clip.raw_size() as f64 / compressed.size() as f64
        );

        let mut pose = vec![Transform::IDENTITY; 2];
        algorithm.decompress_pose(&view, 0.25, &mut PoseWriter::new(&mut pose));
        println!(
            "arm @ 0.25s: rotation [{:+.4} {:+.4} {:+.4} {:+.4}], translation [{:+.4} {:+.4} {:+.4}]\n",
            pose[1].rotation.x,
            pose[1].rotation.y,
            pose[1].rotation.z,
            pose[1].rotation.w,
            pose[1].translation.x,
            pose[1].translation.y,
            pose[1].translation.z,
        );
    }
}
