//! Instance count and destroy-previous policy.

use deckhand_core::{Deploy, VersionFamily};

use crate::error::{RolloutError, RolloutResult};

/// Number of instances a deploy launches.
///
/// An explicit non-zero request wins. Otherwise a single running family
/// keeps its scale, and anything else (no family, or several) gets one.
pub fn resolve_instance_count(requested: Option<u32>, families: &[VersionFamily]) -> u32 {
    if let Some(n) = requested.filter(|n| *n > 0) {
        return n;
    }
    match families {
        [only] => only.instances.len() as u32,
        _ => 1,
    }
}

/// Check that `deploy` may destroy its predecessor and describe it.
///
/// `running` is the number of units of the service across all versions.
/// Returns `None` when nothing is running, so there is nothing to retire.
pub fn previous_version(
    deploy: &Deploy,
    families: &[VersionFamily],
    running: usize,
) -> RolloutResult<Option<Deploy>> {
    if families.len() > 1 {
        return Err(RolloutError::TooManyVersions {
            service: deploy.service_name.clone(),
            families: families.len(),
        });
    }

    if let Some(requested) = deploy.requested_instances() {
        if (requested as usize) < running {
            return Err(RolloutError::InsufficientInstances {
                service: deploy.service_name.clone(),
                requested,
                running,
            });
        }
    }

    Ok(families.first().map(|f| f.to_deploy(&deploy.service_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn family(version: &str, timestamp: &str, instances: usize) -> VersionFamily {
        VersionFamily {
            version: version.to_string(),
            timestamp: timestamp.to_string(),
            instances: (1..=instances).map(|i| i.to_string()).collect(),
        }
    }

    fn destroying(requested: Option<u32>) -> Deploy {
        let mut deploy = Deploy::new("carousel", "v2", "t1");
        deploy.destroy_previous = true;
        deploy.instance_count = requested;
        deploy
    }

    #[test]
    fn defaults_to_one_without_history() {
        assert_eq!(resolve_instance_count(None, &[]), 1);
        assert_eq!(resolve_instance_count(Some(0), &[]), 1);
    }

    #[test]
    fn preserves_scale_of_single_family() {
        assert_eq!(resolve_instance_count(None, &[family("v1", "t0", 3)]), 3);
    }

    #[test]
    fn ambiguous_history_defaults_to_one() {
        let families = [family("v1", "t0", 3), family("v0", "t-1", 2)];
        assert_eq!(resolve_instance_count(None, &families), 1);
    }

    #[test]
    fn rejects_multiple_families() {
        let families = [family("v1", "t0", 1), family("v0", "t-1", 1)];
        let err = previous_version(&destroying(None), &families, 2).unwrap_err();
        assert!(matches!(err, RolloutError::TooManyVersions { families: 2, .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_shrinking_while_destroying() {
        let families = [family("v1", "t0", 3)];
        let err = previous_version(&destroying(Some(2)), &families, 3).unwrap_err();
        assert!(matches!(
            err,
            RolloutError::InsufficientInstances {
                requested: 2,
                running: 3,
                ..
            }
        ));
    }

    #[test]
    fn captures_single_previous_family() {
        let families = [family("v1", "t0", 3)];
        let previous = previous_version(&destroying(Some(3)), &families, 3)
            .unwrap()
            .unwrap();
        assert_eq!(previous.version, "v1");
        assert_eq!(previous.timestamp, "t0");
        assert_eq!(previous.instance_count, Some(3));
        assert_eq!(previous.service_name, "carousel");
        assert_eq!(previous.instances, vec!["1", "2", "3"]);
    }

    #[test]
    fn nothing_to_retire_on_first_deploy() {
        assert_eq!(previous_version(&destroying(None), &[], 0).unwrap(), None);
    }

    proptest! {
        #[test]
        fn explicit_count_always_wins(
            requested in 1u32..500,
            sizes in proptest::collection::vec(1usize..8, 0..4),
        ) {
            let families: Vec<VersionFamily> = sizes
                .iter()
                .enumerate()
                .map(|(i, n)| family(&format!("v{i}"), &format!("t{i}"), *n))
                .collect();
            prop_assert_eq!(resolve_instance_count(Some(requested), &families), requested);
        }
    }
}
