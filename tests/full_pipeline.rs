use xenograft::{
    BodyPartInstance, BodyPartKind, ConditionChange, CreatureKind, DefRegistry, Engine,
    EngineOptions, NoopBridge, PartKindId, Procedure, RaceTraits,
};

fn humanlike(name: &str, parts: &[PartKindId]) -> CreatureKind {
    CreatureKind::new(name).with_race(RaceTraits {
        body: parts.iter().map(|&p| BodyPartInstance::new(p)).collect(),
        is_humanlike: true,
        has_living_tissue: true,
        ..RaceTraits::default()
    })
}

fn xeno(name: &str, parts: &[PartKindId]) -> CreatureKind {
    CreatureKind::new(name).with_race(RaceTraits {
        body: parts.iter().map(|&p| BodyPartInstance::new(p)).collect(),
        has_living_tissue: true,
        ..RaceTraits::default()
    })
}

#[test]
fn merge_equivalent_procedures_consolidate_across_packs() {
    let mut registry = DefRegistry::new();
    let arm = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
    let tentacle = registry.add_part(BodyPartKind::new("Tentacle").with_label("tentacle"));
    let human = registry.add_creature(humanlike("Human", &[arm]));
    let squid = registry.add_creature(xeno("VoidSquid", &[tentacle]));

    let a = registry.add_procedure(
        Procedure::new("InstallBionicArm", "install bionic arm")
            .with_worker("InstallArtificialBodyPart")
            .with_effect(ConditionChange::Adds("BionicArm".to_string()))
            .with_ingredients("BionicArm x1")
            .with_targets(vec![arm]),
    );
    let b = registry.add_procedure(
        Procedure::new("VoidInstallBionicArm", "install bionic limb")
            .with_worker("InstallArtificialBodyPart")
            .with_effect(ConditionChange::Adds("BionicArm".to_string()))
            .with_ingredients("BionicArm x1")
            .with_targets(vec![tentacle]),
    );
    registry.offer_procedure(human, a);
    registry.offer_procedure(squid, b);

    let mut engine = Engine::new();
    let summary = engine.run(&mut registry, &mut NoopBridge);

    // Same worker, effect, and ingredients: one procedure survives with the
    // union of targets and offerers, and the other is gone for good.
    assert_eq!(summary.merged, 1);
    assert!(registry.procedure(b).is_none());
    let kept = registry.procedure(a).expect("survivor stays registered");
    assert!(kept.targets.contains(&arm));
    assert!(kept.targets.contains(&tentacle));
    assert!(kept.offered_by.contains(&human));
    assert!(kept.offered_by.contains(&squid));
    assert!(registry.bidirectional_violations().is_empty());
}

#[test]
fn malformed_definitions_never_abort_a_run() {
    let mut registry = DefRegistry::new();
    registry.add_creature(CreatureKind::new("SealedVault"));
    registry.add_creature(xeno("EmptyMist", &[]));
    let arm = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
    let workerless =
        registry.add_procedure(Procedure::new("Rite", "obscure rite").with_targets(vec![arm]));

    let mut engine = Engine::new();
    let summary = engine.run(&mut registry, &mut NoopBridge);

    assert_eq!(summary.merged, 0);
    assert_eq!(summary.failed_merges, 0);
    assert!(registry.procedure(workerless).is_some());
}

#[test]
fn disabled_pairings_never_propagate() {
    let mut registry = DefRegistry::new();
    let paw = registry.add_part(BodyPartKind::new("Paw").with_label("paw"));
    let dog = registry.add_creature(CreatureKind::new("Dog").with_race(RaceTraits {
        body: vec![BodyPartInstance::new(paw)],
        is_animal: true,
        has_living_tissue: true,
        ..RaceTraits::default()
    }));
    let human = registry.add_creature(humanlike("Human", &[paw]));
    let groom = registry.add_procedure(
        Procedure::new("GroomPaw", "groom paw")
            .with_worker("RemoveHediff")
            .with_targets(vec![paw]),
    );
    registry.offer_procedure(dog, groom);
    let human_seed =
        registry.add_procedure(Procedure::new("Baseline", "baseline").with_worker("RemoveHediff"));
    registry.offer_procedure(human, human_seed);

    let mut engine = Engine::with_options(EngineOptions {
        patch_animal_to_humanlike: false,
        ..EngineOptions::default()
    });
    engine.run(&mut registry, &mut NoopBridge);

    // The only route from an animal-sourced procedure to a humanlike is the
    // disabled pairing (the catch-all fleshlike pass also requires it).
    assert!(!registry.creature(human).unwrap().offered.contains(&groom));
}
