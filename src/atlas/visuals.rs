//! Presentation hook
//!
//! The core never draws anything. It asks a [`SectionVisuals`] implementation to spawn
//! something at a position and keeps the returned handle; what the handle means is up
//! to the presentation layer.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{SectionAppearance, SectionFlags, SectionId};

/// Opaque handle to a spawned visual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// What to spawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VisualKind {
    Section(SectionId, SectionAppearance),
    /// Stand-in mirroring a distant target
    Proxy(SectionId, SectionAppearance),
    /// Neutral strip between layout rows
    Strip { size: Vec2 },
}

pub trait SectionVisuals {
    /// Spawn a visual; `None` means the presentation layer could not provide one
    fn spawn(&mut self, kind: VisualKind, pos: Vec2) -> Option<VisualHandle>;
    /// Push updated state flags to a visual
    fn update(&mut self, handle: VisualHandle, flags: SectionFlags);
    /// Move a visual (layout animation)
    fn relocate(&mut self, handle: VisualHandle, pos: Vec2);
    fn despawn(&mut self, handle: VisualHandle);
}

/// A spawned visual as seen by [`HeadlessVisuals`]
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessVisual {
    pub kind: VisualKind,
    pub pos: Vec2,
    pub flags: SectionFlags,
}

/// Records everything instead of drawing; used by the CLI and tests
#[derive(Debug, Default)]
pub struct HeadlessVisuals {
    pub live: BTreeMap<VisualHandle, HeadlessVisual>,
    pub spawned: u32,
    pub despawned: u32,
    /// Refuse to spawn sections with these ids
    pub refuse: Vec<SectionId>,
}

impl HeadlessVisuals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxies(&self) -> impl Iterator<Item = &HeadlessVisual> {
        self.live
            .values()
            .filter(|v| matches!(v.kind, VisualKind::Proxy(..)))
    }
}

impl SectionVisuals for HeadlessVisuals {
    fn spawn(&mut self, kind: VisualKind, pos: Vec2) -> Option<VisualHandle> {
        if let VisualKind::Section(id, _) = kind {
            if self.refuse.contains(&id) {
                return None;
            }
        }
        let flags = match kind {
            VisualKind::Section(_, a) | VisualKind::Proxy(_, a) => a.flags,
            VisualKind::Strip { .. } => SectionFlags::default(),
        };
        let handle = VisualHandle(self.spawned);
        self.spawned += 1;
        self.live.insert(handle, HeadlessVisual { kind, pos, flags });
        Some(handle)
    }

    fn update(&mut self, handle: VisualHandle, flags: SectionFlags) {
        if let Some(v) = self.live.get_mut(&handle) {
            v.flags = flags;
        }
    }

    fn relocate(&mut self, handle: VisualHandle, pos: Vec2) {
        if let Some(v) = self.live.get_mut(&handle) {
            v.pos = pos;
        }
    }

    fn despawn(&mut self, handle: VisualHandle) {
        if self.live.remove(&handle).is_some() {
            self.despawned += 1;
        }
    }
}
