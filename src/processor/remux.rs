//! Access unit remuxing

use bytes::Bytes;

use crate::codec::{NalKind, VideoCodec};
use crate::format::ParameterSets;
use crate::unit::AccessUnit;

/// Drop delimiters and in-band parameter sets, then put the stored parameter
/// sets in front of key frames.
///
/// Parameter sets are prepended once per access unit, and only when the
/// store holds every set the codec needs. Returns `None` when nothing is left
/// to forward.
pub fn remux_access_unit<C: VideoCodec>(
    au: &[Bytes],
    params: &ParameterSets,
) -> Option<AccessUnit> {
    let mut keyframe = false;
    let mut filtered = Vec::with_capacity(au.len() + C::PARAM_KINDS.len());

    for nalu in au {
        match C::classify(nalu) {
            NalKind::ParameterSet(_) | NalKind::Delimiter => continue,
            NalKind::KeyFrame => keyframe = true,
            _ => {}
        }
        filtered.push(nalu.clone());
    }

    if keyframe {
        if let Some(sets) = params.ordered(C::PARAM_KINDS) {
            filtered.splice(0..0, sets);
        }
    }

    if filtered.is_empty() {
        return None;
    }

    Some(filtered)
}
