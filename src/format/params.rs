//! Parameter sets and the per-track parameter store
//!
//! The store is written by the track's processor and read concurrently by
//! whoever describes the track (SDP generation, late-joining sessions).
//! Updates swap in a complete [`ParameterSets`] value, so readers never see
//! a half-applied update.

use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;

use crate::codec::{extract_params, NalKind, VideoCodec};

/// Parameter set kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Video parameter set (H.265 only)
    Vps,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
}

/// Out-of-band codec parameters. Unused slots stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSets {
    pub vps: Option<Bytes>,
    pub sps: Option<Bytes>,
    pub pps: Option<Bytes>,
}

impl ParameterSets {
    pub fn get(&self, kind: ParamKind) -> Option<&Bytes> {
        match kind {
            ParamKind::Vps => self.vps.as_ref(),
            ParamKind::Sps => self.sps.as_ref(),
            ParamKind::Pps => self.pps.as_ref(),
        }
    }

    pub fn set(&mut self, kind: ParamKind, value: Bytes) {
        match kind {
            ParamKind::Vps => self.vps = Some(value),
            ParamKind::Sps => self.sps = Some(value),
            ParamKind::Pps => self.pps = Some(value),
        }
    }

    /// True when no set is present
    pub fn is_empty(&self) -> bool {
        self.vps.is_none() && self.sps.is_none() && self.pps.is_none()
    }

    /// True when every set in `kinds` is present
    pub fn is_complete(&self, kinds: &[ParamKind]) -> bool {
        kinds.iter().all(|kind| self.get(*kind).is_some())
    }

    /// The sets in `kinds` order, only if all of them are present
    pub fn ordered(&self, kinds: &[ParamKind]) -> Option<Vec<Bytes>> {
        kinds.iter().map(|kind| self.get(*kind).cloned()).collect()
    }

    /// Whether any candidate in `discovered` differs from what is held here
    pub fn differs(&self, discovered: &ParameterSets) -> bool {
        [ParamKind::Vps, ParamKind::Sps, ParamKind::Pps]
            .into_iter()
            .any(|kind| match discovered.get(kind) {
                Some(candidate) => self.get(kind) != Some(candidate),
                None => false,
            })
    }

    /// Discovered sets, falling back to the ones held here
    pub fn merged_with(&self, discovered: &ParameterSets) -> ParameterSets {
        ParameterSets {
            vps: discovered.vps.clone().or_else(|| self.vps.clone()),
            sps: discovered.sps.clone().or_else(|| self.sps.clone()),
            pps: discovered.pps.clone().or_else(|| self.pps.clone()),
        }
    }
}

/// Concurrent store for a track's current parameter sets
///
/// Cloning the store yields another handle to the same parameters.
#[derive(Clone, Default)]
pub struct ParameterStore {
    inner: Arc<ArcSwap<ParameterSets>>,
}

impl ParameterStore {
    pub fn new(initial: ParameterSets) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Snapshot of the current parameters
    pub fn load(&self) -> Arc<ParameterSets> {
        self.inner.load_full()
    }

    /// Replace the parameters wholesale
    pub fn store(&self, sets: ParameterSets) {
        self.inner.store(Arc::new(sets));
    }

    /// Merge newly discovered sets.
    ///
    /// Nothing happens unless at least one discovered set differs byte-wise
    /// from the stored one. Otherwise the complete merged record is swapped
    /// in at once. Returns whether an update took place.
    pub fn merge(&self, discovered: &ParameterSets) -> bool {
        if !self.inner.load().differs(discovered) {
            return false;
        }

        self.inner
            .rcu(|current| Arc::new(current.merged_with(discovered)));
        true
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ParameterStore").field(&self.load()).finish()
    }
}

/// Update the store from parameter sets carried by a single RTP payload
pub fn update_from_payload<C: VideoCodec>(store: &ParameterStore, payload: &Bytes) -> bool {
    let discovered = extract_params::<C>(payload);
    if discovered.is_empty() {
        return false;
    }

    let updated = store.merge(&discovered);
    if updated {
        tracing::debug!(codec = %C::KIND, "Parameter sets updated from RTP payload");
    }
    updated
}

/// Update the store from the NAL units of an access unit.
///
/// When a set occurs more than once, the last occurrence wins.
pub fn update_from_access_unit<C: VideoCodec>(store: &ParameterStore, au: &[Bytes]) -> bool {
    let mut discovered = ParameterSets::default();
    for nalu in au {
        if let NalKind::ParameterSet(kind) = C::classify(nalu) {
            discovered.set(kind, nalu.clone());
        }
    }
    if discovered.is_empty() {
        return false;
    }

    let updated = store.merge(&discovered);
    if updated {
        tracing::debug!(codec = %C::KIND, "Parameter sets updated from access unit");
    }
    updated
}
