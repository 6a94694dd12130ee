//! Skeleton-propagated error measurement.
//!
//! Local pose error understates what a viewer sees: a small rotation error
//! high in the chain sweeps every descendant. Both poses are propagated to
//! object space and compared through a unit point rigidly attached to each
//! bone.

use glam::DVec3;

use crate::model::{DTransform, RigidSkeleton, Transform};

const REFERENCE_POINTS: [DVec3; 3] = [DVec3::X, DVec3::Y, DVec3::Z];

fn object_space_pose(skeleton: &RigidSkeleton, local_pose: &[DTransform]) -> Vec<DTransform> {
    let mut object_pose: Vec<DTransform> = Vec::with_capacity(local_pose.len());
    for (bone_index, local) in local_pose.iter().enumerate() {
        let transform = match skeleton.bone(bone_index as u16).parent {
            Some(parent) => object_pose[parent as usize].mul_transform(local),
            None => *local,
        };
        object_pose.push(transform);
    }
    object_pose
}

/// Maximum object-space drift, over all bones and reference axes, between a
/// raw pose and its lossy reconstruction.
pub fn calculate_skeleton_error(
    skeleton: &RigidSkeleton,
    raw_pose: &[DTransform],
    lossy_pose: &[Transform],
) -> f64 {
    let num_bones = skeleton.num_bones() as usize;
    assert_eq!(raw_pose.len(), num_bones, "raw pose size mismatch");
    assert_eq!(lossy_pose.len(), num_bones, "lossy pose size mismatch");

    let lossy_pose: Vec<DTransform> = lossy_pose
        .iter()
        .map(Transform::as_dtransform)
        .collect();

    let raw_object = object_space_pose(skeleton, raw_pose);
    let lossy_object = object_space_pose(skeleton, &lossy_pose);

    let mut max_error = 0.0f64;
    for (raw, lossy) in raw_object.iter().zip(&lossy_object) {
        for point in REFERENCE_POINTS {
            let error = raw
                .transform_point(point)
                .distance(lossy.transform_point(point));
            max_error = max_error.max(error);
        }
    }
    max_error
}
