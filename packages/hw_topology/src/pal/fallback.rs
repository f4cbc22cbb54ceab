use crate::pal::Platform;
use crate::{ProcessorMask, RelationshipKind};

/// Platform that knows no relationships between processors.
#[derive(Debug)]
pub(crate) struct FallbackPlatform;

pub(crate) static BUILD_TARGET_PLATFORM: FallbackPlatform = FallbackPlatform;

impl Platform for FallbackPlatform {
    fn processor_relationships(
        &self,
        _processors: &ProcessorMask,
    ) -> Vec<(ProcessorMask, RelationshipKind)> {
        Vec::new()
    }
}
