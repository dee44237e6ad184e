//! Definition registry: the injected owner of all loaded definitions.
//!
//! The host loader populates one `DefRegistry` before the engine runs; the
//! engine expresses every effect it has (expanded target lists, new
//! offered-procedure links, merged-away procedures) as calls against this
//! object. Nothing in the engine reaches for ambient global state.

use std::collections::HashMap;

use crate::defs::{BodyPartKind, CreatureKind, Procedure};
use crate::ids::{CreatureId, PartKindId, ProcedureId};

/// Owner of all body-part-kind, creature-kind, and procedure definitions.
///
/// Ids are assigned sequentially at insertion and index directly into the
/// backing tables. Procedures are the only definitions that can be removed
/// (by the consolidator); their slots stay tombstoned so ids never shift.
#[derive(Debug, Default)]
pub struct DefRegistry {
    parts: Vec<BodyPartKind>,
    creatures: Vec<CreatureKind>,
    procedures: Vec<Option<Procedure>>,
    /// Stable presentation order over live procedures. Load order until the
    /// consolidator sorts it.
    procedure_order: Vec<ProcedureId>,
    part_names: HashMap<String, PartKindId>,
    creature_names: HashMap<String, CreatureId>,
    procedure_names: HashMap<String, ProcedureId>,
}

impl DefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a part kind. Re-registering an already-known `def_name`
    /// returns the existing id (packs redefine shared parts constantly).
    pub fn add_part(&mut self, part: BodyPartKind) -> PartKindId {
        if let Some(&id) = self.part_names.get(&part.def_name) {
            return id;
        }
        let id = PartKindId(self.parts.len() as u32);
        self.part_names.insert(part.def_name.clone(), id);
        self.parts.push(part);
        id
    }

    pub fn add_creature(&mut self, creature: CreatureKind) -> CreatureId {
        if let Some(&id) = self.creature_names.get(&creature.def_name) {
            return id;
        }
        let id = CreatureId(self.creatures.len() as u32);
        self.creature_names.insert(creature.def_name.clone(), id);
        self.creatures.push(creature);
        id
    }

    pub fn add_procedure(&mut self, procedure: Procedure) -> ProcedureId {
        if let Some(&id) = self.procedure_names.get(&procedure.def_name) {
            return id;
        }
        let id = ProcedureId(self.procedures.len() as u32);
        self.procedure_names.insert(procedure.def_name.clone(), id);
        self.procedures.push(Some(procedure));
        self.procedure_order.push(id);
        id
    }

    pub fn part(&self, id: PartKindId) -> Option<&BodyPartKind> {
        self.parts.get(id.index())
    }

    pub fn creature(&self, id: CreatureId) -> Option<&CreatureKind> {
        self.creatures.get(id.index())
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut CreatureKind> {
        self.creatures.get_mut(id.index())
    }

    pub fn procedure(&self, id: ProcedureId) -> Option<&Procedure> {
        self.procedures.get(id.index()).and_then(|p| p.as_ref())
    }

    pub fn procedure_mut(&mut self, id: ProcedureId) -> Option<&mut Procedure> {
        self.procedures.get_mut(id.index()).and_then(|p| p.as_mut())
    }

    pub fn part_by_name(&self, def_name: &str) -> Option<PartKindId> {
        self.part_names.get(def_name).copied()
    }

    pub fn creature_by_name(&self, def_name: &str) -> Option<CreatureId> {
        self.creature_names.get(def_name).copied()
    }

    pub fn procedure_by_name(&self, def_name: &str) -> Option<ProcedureId> {
        self.procedure_names.get(def_name).copied()
    }

    pub fn part_ids(&self) -> impl Iterator<Item = PartKindId> + '_ {
        (0..self.parts.len() as u32).map(PartKindId)
    }

    pub fn creature_ids(&self) -> impl Iterator<Item = CreatureId> + '_ {
        (0..self.creatures.len() as u32).map(CreatureId)
    }

    /// Live procedures in presentation order.
    pub fn procedure_ids(&self) -> impl Iterator<Item = ProcedureId> + '_ {
        self.procedure_order
            .iter()
            .copied()
            .filter(|&id| self.procedure(id).is_some())
    }

    pub fn procedure_count(&self) -> usize {
        self.procedures.iter().filter(|p| p.is_some()).count()
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Remove a procedure from the registry. The caller is responsible for
    /// having re-linked any creatures that referenced it.
    pub fn remove_procedure(&mut self, id: ProcedureId) -> Option<Procedure> {
        let removed = self.procedures.get_mut(id.index()).and_then(|p| p.take());
        if let Some(procedure) = &removed {
            self.procedure_names.remove(&procedure.def_name);
            self.procedure_order.retain(|&p| p != id);
        }
        removed
    }

    /// Replace the presentation order. Unknown or removed ids are dropped.
    pub fn set_procedure_order(&mut self, order: Vec<ProcedureId>) {
        self.procedure_order = order
            .into_iter()
            .filter(|&id| self.procedure(id).is_some())
            .collect();
    }

    /// Link a procedure to a creature on both sides of the bidirectional
    /// reference. Returns true if the link was new.
    pub fn offer_procedure(&mut self, creature: CreatureId, procedure: ProcedureId) -> bool {
        let Some(c) = self.creatures.get_mut(creature.index()) else {
            return false;
        };
        if c.offered.contains(&procedure) {
            return false;
        }
        let Some(p) = self
            .procedures
            .get_mut(procedure.index())
            .and_then(|p| p.as_mut())
        else {
            return false;
        };
        c.offered.push(procedure);
        if !p.offered_by.contains(&creature) {
            p.offered_by.push(creature);
        }
        true
    }

    /// Every (creature, procedure) pair where one side of the bidirectional
    /// reference is missing. Empty on a consistent registry.
    pub fn bidirectional_violations(&self) -> Vec<(CreatureId, ProcedureId)> {
        let mut violations = Vec::new();
        for (ci, creature) in self.creatures.iter().enumerate() {
            let cid = CreatureId(ci as u32);
            for &pid in &creature.offered {
                match self.procedure(pid) {
                    Some(p) if p.offered_by.contains(&cid) => {}
                    _ => violations.push((cid, pid)),
                }
            }
        }
        for (pi, procedure) in self.procedures.iter().enumerate() {
            let Some(procedure) = procedure else { continue };
            let pid = ProcedureId(pi as u32);
            for &cid in &procedure.offered_by {
                match self.creature(cid) {
                    Some(c) if c.offered.contains(&pid) => {}
                    _ => violations.push((cid, pid)),
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{BodyPartKind, CreatureKind, Procedure};

    #[test]
    fn test_add_part_dedupes_by_name() {
        let mut registry = DefRegistry::new();
        let a = registry.add_part(BodyPartKind::new("Arm"));
        let b = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
        assert_eq!(a, b);
        assert_eq!(registry.part_count(), 1);
    }

    #[test]
    fn test_remove_procedure_tombstones() {
        let mut registry = DefRegistry::new();
        let a = registry.add_procedure(Procedure::new("A", "a"));
        let b = registry.add_procedure(Procedure::new("B", "b"));
        assert_eq!(registry.procedure_count(), 2);

        let removed = registry.remove_procedure(a).unwrap();
        assert_eq!(removed.def_name, "A");
        assert!(registry.procedure(a).is_none());
        assert!(registry.procedure_by_name("A").is_none());
        assert_eq!(registry.procedure_ids().collect::<Vec<_>>(), vec![b]);

        // Id b still resolves after a's removal.
        assert_eq!(registry.procedure(b).unwrap().def_name, "B");
    }

    #[test]
    fn test_offer_procedure_links_both_sides() {
        let mut registry = DefRegistry::new();
        let c = registry.add_creature(CreatureKind::new("Boomrat"));
        let p = registry.add_procedure(Procedure::new("A", "a"));

        assert!(registry.offer_procedure(c, p));
        assert!(!registry.offer_procedure(c, p));

        assert_eq!(registry.creature(c).unwrap().offered, vec![p]);
        assert_eq!(registry.procedure(p).unwrap().offered_by, vec![c]);
        assert!(registry.bidirectional_violations().is_empty());
    }

    #[test]
    fn test_bidirectional_violations_detects_single_sided_link() {
        let mut registry = DefRegistry::new();
        let c = registry.add_creature(CreatureKind::new("Boomrat"));
        let p = registry.add_procedure(Procedure::new("A", "a"));

        registry.creature_mut(c).unwrap().offered.push(p);
        assert_eq!(registry.bidirectional_violations(), vec![(c, p)]);
    }
}
