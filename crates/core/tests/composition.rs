use cardforge_core::{
    overlay::{Background, OverlayState, DIAGONAL_CLIP, OVERLAY_ID},
    sets::resolve_class,
    CardError, CardSurface, CardType, Composer, ImageManifest, MaskChoice, MemorySurface,
    SetRegistry, SetResolver, Stage,
};

fn composer() -> Composer<MemorySurface> {
    let mut composer = Composer::new(SetResolver::default(), MemorySurface::card());
    assert!(composer.refresh().is_empty());
    composer
}

fn dual_composer(second: CardType, dual_set: &str) -> Composer<MemorySurface> {
    let mut composer = composer();
    composer.select_dual_set(dual_set);
    composer.select_second_type(Some(second));
    assert!(composer.set_dual_type(true).is_empty());
    composer
}

fn overlay_style(composer: &Composer<MemorySurface>, property: &str) -> Option<String> {
    composer.surface().style(OVERLAY_ID, property)
}

#[test]
fn class_resolution_is_deterministic_for_every_css_set() {
    let registry = SetRegistry::builtin();
    let resolver = SetResolver::default();
    for (key, config) in registry.sorted() {
        if !config.css_class_based {
            continue;
        }
        for card_type in CardType::ALL {
            for stage in Stage::ALL {
                let expected = format!("card-{}-{}", card_type.key(), stage.key());
                assert_eq!(resolve_class(card_type, stage), expected);
                assert_eq!(
                    resolver.resolve(key, card_type, stage),
                    Ok(cardforge_core::Resolution::Class(expected))
                );
            }
        }
    }
}

#[test]
fn quantum_contour_matches_template() -> Result<(), CardError> {
    let resolver = SetResolver::default();
    assert_eq!(
        resolver.resolve_path("QuantumContour", CardType::Fire, Stage::Stage1)?,
        Some("img/QuantumContour/Fire/P- Fire - S1.png".to_string())
    );
    Ok(())
}

#[test]
fn toggling_dual_type_recreates_identical_overlay() {
    let mut composer = dual_composer(CardType::Water, "QuantumContour");
    let first_layer = composer.compositor().layer().cloned();
    let first_element = composer.surface().element(OVERLAY_ID).cloned();
    assert!(first_layer.is_some());

    composer.set_dual_type(false);
    assert!(composer.set_dual_type(true).is_empty());

    assert_eq!(composer.compositor().layer().cloned(), first_layer);
    assert_eq!(composer.surface().element(OVERLAY_ID).cloned(), first_element);
}

#[test]
fn switching_masks_swaps_clip_and_mask_image() {
    let mut composer = dual_composer(CardType::Grass, "Classic");

    composer.select_mask(MaskChoice::Image("img/masks/wave.png".to_string()));
    assert_eq!(
        overlay_style(&composer, "mask-image").as_deref(),
        Some("url(\"img/masks/wave.png\")")
    );
    assert_eq!(overlay_style(&composer, "clip-path").as_deref(), Some("none"));

    composer.select_mask(MaskChoice::from_id("default"));
    assert_eq!(
        overlay_style(&composer, "clip-path").as_deref(),
        Some(DIAGONAL_CLIP)
    );
    assert_eq!(overlay_style(&composer, "mask-image").as_deref(), Some("none"));
}

#[test]
fn mask_change_restyles_without_recreating() {
    let mut composer = dual_composer(CardType::Dragon, "Vintage");
    let before = composer.surface().children("card");

    composer.select_mask(MaskChoice::Image("img/masks/split-vertical.png".to_string()));

    assert_eq!(composer.surface().children("card"), before);
    let layer = composer.compositor().layer().expect("overlay present");
    assert_eq!(
        layer.style.background,
        Background::Image("img/Vintage/Dragon/Dragon Basic.png".to_string())
    );
}

#[test]
fn disabling_dual_type_removes_overlay() {
    let mut composer = dual_composer(CardType::Water, "Classic");
    assert!(composer.surface().contains(OVERLAY_ID));

    composer.set_dual_type(false);
    assert!(!composer.surface().contains(OVERLAY_ID));
    assert_eq!(composer.compositor().state(), &OverlayState::Absent);

    composer.set_dual_type(true);
    composer.select_second_type(None);
    assert!(!composer.surface().contains(OVERLAY_ID));
}

#[test]
fn stage_change_recomputes_overlay_path_only() {
    let mut composer = dual_composer(CardType::Water, "QuantumContour");
    let mask = MaskChoice::Image("img/masks/wave.png".to_string());
    composer.select_mask(mask.clone());

    assert!(composer.select_stage(Stage::Stage2).is_empty());

    let layer = composer.compositor().layer().expect("overlay present");
    assert_eq!(
        layer.style.background,
        Background::Image("img/QuantumContour/Water/P- Water - S2.png".to_string())
    );
    assert_eq!(layer.card_type, CardType::Water);
    assert_eq!(composer.selection().current_type, CardType::Fire);
    assert_eq!(composer.selection().current_mask, mask);
    assert_eq!(
        overlay_style(&composer, "mask-image").as_deref(),
        Some("url(\"img/masks/wave.png\")")
    );
}

#[test]
fn content_stays_above_overlay_after_every_recompute() {
    let mut composer = dual_composer(CardType::Metal, "Classic");
    for stage in Stage::ALL {
        composer.select_stage(stage);
        composer.toggle_dual_type();
        composer.toggle_dual_type();

        let overlay_z: i32 = overlay_style(&composer, "z-index")
            .and_then(|value| value.parse().ok())
            .expect("overlay z-index");
        let base_z: i32 = composer
            .surface()
            .style("card-background", "z-index")
            .and_then(|value| value.parse().ok())
            .expect("base z-index");
        assert!(base_z < overlay_z);
        for id in ["card-name", "card-hp", "card-attacks", "card-footer"] {
            let content_z: i32 = composer
                .surface()
                .style(id, "z-index")
                .and_then(|value| value.parse().ok())
                .expect("content z-index");
            assert!(overlay_z < content_z, "{id} below overlay");
        }
    }
}

#[test]
fn manifest_miss_leaves_overlay_absent() {
    let mut manifest = ImageManifest::default();
    manifest.insert("QuantumContour", "img/QuantumContour/Fire/P- Fire - S0.png");
    let resolver = SetResolver::new(SetRegistry::builtin(), manifest);
    let mut composer = Composer::new(resolver, MemorySurface::card());
    composer.refresh();

    composer.select_dual_set("QuantumContour");
    composer.select_second_type(Some(CardType::Water));
    let warnings = composer.set_dual_type(true);

    assert!(matches!(
        warnings.as_slice(),
        [CardError::PathResolutionMiss { .. }]
    ));
    assert!(!composer.surface().contains(OVERLAY_ID));
}

#[test]
fn export_snapshot_is_ordered_and_complete() {
    let mut composer = dual_composer(CardType::Fairy, "Radiant");
    let (composition, warnings) = composer.prepare_export();
    assert!(warnings.is_empty());
    assert!(composition.is_ordered());
    assert_eq!(composition.layers[1].id, OVERLAY_ID);
    assert_eq!(composition.file_stem(), "fire-fairy-basic");
}
