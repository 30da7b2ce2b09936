//! Runtime reachability
//!
//! A section is reachable when it overlaps the player's detection circle or when the
//! player's current section links to it. Reachability is recomputed from scratch
//! after every move; `visited` is the only flag with memory.
//!
//! Linked targets outside the detection circle (reachable only through the link)
//! get a proxy: a stand-in placed just inside the circle on the line towards the
//! real target. Moving via a proxy is a move to the target.

use glam::Vec2;

use super::state::{PlayerAgent, ProxyId, ProxyNode, SectionId, SectionRegistry};
use crate::circles_overlap;
use crate::error::{AtlasError, Result};

/// Recompute `can_move` for every section. Returns how many are reachable.
pub fn detect_sections(
    registry: &mut SectionRegistry,
    player: &PlayerAgent,
    section_radius: f32,
) -> usize {
    let origin = player
        .current
        .and_then(|id| registry.get(id))
        .map(|node| (node.pos, node.links.iter().map(|l| l.target).collect::<Vec<_>>()));

    let Some((center, linked)) = origin else {
        if let Some(id) = player.current {
            log::error!("{}", AtlasError::MissingComponent(id, "player section"));
        }
        for node in registry.iter_mut() {
            node.flags.in_range = false;
            node.flags.can_move = false;
        }
        return 0;
    };

    let mut reachable = 0;
    for node in registry.iter_mut() {
        node.flags.in_range = circles_overlap(center, player.detection_radius, node.pos, section_radius);
        node.flags.can_move = node.flags.in_range || linked.contains(&node.id);
        if node.flags.can_move {
            reachable += 1;
        }
    }
    reachable
}

/// Move the player onto `target` and re-run detection.
///
/// Fails with [`AtlasError::InvalidMove`] when the target is neither reachable nor
/// visited; callers treat that as a no-op.
pub fn move_to(
    registry: &mut SectionRegistry,
    player: &mut PlayerAgent,
    target: SectionId,
    section_radius: f32,
) -> Result<()> {
    let node = registry
        .get(target)
        .ok_or(AtlasError::MissingComponent(target, "section"))?;
    if !(node.flags.can_move || node.flags.visited) {
        return Err(AtlasError::InvalidMove(target));
    }

    if player.current != Some(target) {
        if let Some(old) = player.current.and_then(|id| registry.get_mut(id)) {
            old.flags.player_on = false;
        }
        player.previous = player.current;
        player.current = Some(target);
    }
    if let Some(node) = registry.get_mut(target) {
        node.flags.player_on = true;
        node.flags.visited = true;
    }

    detect_sections(registry, player, section_radius);
    Ok(())
}

/// Put the player on `start` unconditionally (session start)
pub fn place_player(
    registry: &mut SectionRegistry,
    player: &mut PlayerAgent,
    start: SectionId,
    section_radius: f32,
) -> Result<()> {
    let node = registry
        .get_mut(start)
        .ok_or(AtlasError::MissingComponent(start, "section"))?;
    node.flags.can_move = true;
    move_to(registry, player, start, section_radius)
}

/// Proxy changes produced by [`ProxySet::sync`]
#[derive(Debug, Default)]
pub struct ProxyChanges {
    pub spawned: Vec<ProxyId>,
    pub despawned: Vec<ProxyNode>,
}

impl ProxyChanges {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.despawned.is_empty()
    }
}

/// Live proxies, at most one per (owner, target) link
#[derive(Debug, Default)]
pub struct ProxySet {
    proxies: Vec<ProxyNode>,
    next_id: u32,
}

impl ProxySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ProxyId) -> Option<&ProxyNode> {
        self.proxies.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: ProxyId) -> Option<&mut ProxyNode> {
        self.proxies.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyNode> {
        self.proxies.iter()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn find(&self, owner: SectionId, target: SectionId) -> Option<&ProxyNode> {
        self.proxies.iter().find(|p| p.owner == owner && p.target == target)
    }

    /// Bring the proxy set in line with current reachability.
    ///
    /// A proxy exists for link (owner, target) iff the player occupies `owner` and
    /// `target` is outside the detection circle. It sits `reach - epsilon` from the
    /// owner towards the target.
    pub fn sync(&mut self, registry: &SectionRegistry, player: &PlayerAgent, epsilon: f32) -> ProxyChanges {
        let reach = (player.detection_radius - epsilon).max(0.0);
        let wanted: Vec<(SectionId, SectionId, Vec2)> = player
            .current
            .and_then(|id| registry.get(id))
            .map(|owner| {
                owner
                    .links
                    .iter()
                    .filter_map(|link| {
                        let target = registry.get(link.target)?;
                        if target.flags.in_range {
                            return None;
                        }
                        let dir = (target.pos - owner.pos).normalize_or_zero();
                        Some((owner.id, target.id, owner.pos + dir * reach))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut changes = ProxyChanges::default();

        let (keep, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut self.proxies)
            .into_iter()
            .partition(|p| wanted.iter().any(|&(o, t, _)| o == p.owner && t == p.target));
        self.proxies = keep;
        changes.despawned = stale;

        for (owner, target, pos) in wanted {
            let Some(mirror) = registry.get(target).map(|n| n.appearance()) else {
                continue;
            };
            if let Some(existing) = self
                .proxies
                .iter_mut()
                .find(|p| p.owner == owner && p.target == target)
            {
                existing.pos = pos;
                existing.mirror = mirror;
                continue;
            }
            let id = ProxyId(self.next_id);
            self.next_id += 1;
            self.proxies.push(ProxyNode {
                id,
                owner,
                target,
                pos,
                mirror,
                visual: None,
            });
            changes.spawned.push(id);
        }

        if !changes.is_empty() {
            log::debug!(
                "Proxies: +{} -{} ({} live)",
                changes.spawned.len(),
                changes.despawned.len(),
                self.proxies.len()
            );
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::state::{AreaId, EventKind, SectionKind};

    fn add(reg: &mut SectionRegistry, x: f32, y: f32) -> SectionId {
        reg.insert(AreaId(0), "s", SectionKind::Normal, EventKind::Empty, Vec2::new(x, y))
    }

    fn setup() -> (SectionRegistry, PlayerAgent, [SectionId; 4]) {
        let mut reg = SectionRegistry::new();
        let p = add(&mut reg, 0.0, 0.0);
        let near = add(&mut reg, 5.0, 0.0);
        let far = add(&mut reg, 30.0, 0.0);
        let linked = add(&mut reg, 0.0, 40.0);
        reg.link(p, linked).unwrap();
        let mut player = PlayerAgent::new(8.0);
        place_player(&mut reg, &mut player, p, 0.0).unwrap();
        (reg, player, [p, near, far, linked])
    }

    #[test]
    fn test_detect_radius_and_links() {
        let (reg, _, [p, near, far, linked]) = setup();
        assert!(reg.get(p).unwrap().flags.can_move);
        assert!(reg.get(near).unwrap().flags.can_move);
        assert!(!reg.get(far).unwrap().flags.can_move);
        assert!(reg.get(linked).unwrap().flags.can_move);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let (mut reg, player, _) = setup();
        let before: Vec<bool> = reg.iter().map(|n| n.flags.can_move).collect();
        detect_sections(&mut reg, &player, 0.0);
        let after: Vec<bool> = reg.iter().map(|n| n.flags.can_move).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_requires_reach_or_visit() {
        let (mut reg, mut player, [p, near, far, _]) = setup();
        assert!(matches!(
            move_to(&mut reg, &mut player, far, 0.0),
            Err(AtlasError::InvalidMove(_))
        ));
        assert_eq!(player.current, Some(p));

        move_to(&mut reg, &mut player, near, 0.0).unwrap();
        assert_eq!(player.current, Some(near));
        assert_eq!(player.previous, Some(p));
        assert!(!reg.get(p).unwrap().flags.player_on);
        assert!(reg.get(near).unwrap().flags.player_on);
        assert!(reg.get(near).unwrap().flags.visited);
        // Link from p no longer applies
        assert!(!reg.get(SectionId(3)).unwrap().flags.can_move);
    }

    #[test]
    fn test_visited_nodes_stay_enterable() {
        let (mut reg, mut player, [p, _, _, linked]) = setup();
        move_to(&mut reg, &mut player, linked, 0.0).unwrap();
        // p is 40 away but linked back, and visited anyway
        assert!(reg.get(p).unwrap().flags.visited);
        move_to(&mut reg, &mut player, p, 0.0).unwrap();
        assert_eq!(player.current, Some(p));
        assert!(reg.get(linked).unwrap().flags.visited);
    }

    #[test]
    fn test_proxy_lifecycle() {
        let mut reg = SectionRegistry::new();
        let p = add(&mut reg, 0.0, 0.0);
        let q = add(&mut reg, 30.0, 0.0);
        let mid = add(&mut reg, 7.0, 0.0);
        reg.link(p, q).unwrap();
        let mut player = PlayerAgent::new(8.0);
        place_player(&mut reg, &mut player, p, 0.0).unwrap();

        // q is reachable through the link but out of range: proxy inside the circle
        let mut proxies = ProxySet::new();
        let changes = proxies.sync(&reg, &player, 0.5);
        assert_eq!(changes.spawned.len(), 1);
        assert!(reg.get(q).unwrap().flags.can_move);
        let proxy = proxies.find(p, q).unwrap();
        assert!((proxy.pos - Vec2::new(7.5, 0.0)).length() < 1e-4);
        assert!(proxy.pos.distance(Vec2::ZERO) < player.detection_radius);
        assert_eq!(proxy.mirror.kind, SectionKind::Normal);

        // Second sync does not duplicate
        assert!(proxies.sync(&reg, &player, 0.5).is_empty());
        assert_eq!(proxies.len(), 1);

        // Leaving the owner removes it
        move_to(&mut reg, &mut player, mid, 0.0).unwrap();
        let changes = proxies.sync(&reg, &player, 0.5);
        assert_eq!(changes.despawned.len(), 1);
        assert!(proxies.is_empty());
    }

    #[test]
    fn test_no_proxy_for_target_in_range() {
        let mut reg = SectionRegistry::new();
        let p = add(&mut reg, 0.0, 0.0);
        let q = add(&mut reg, 6.0, 0.0);
        reg.link(p, q).unwrap();
        let mut player = PlayerAgent::new(8.0);
        place_player(&mut reg, &mut player, p, 0.0).unwrap();
        let mut proxies = ProxySet::new();
        assert!(proxies.sync(&reg, &player, 0.5).is_empty());
    }
}
