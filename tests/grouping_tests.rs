mod support;

use census_report::grouping::GroupSpecBuilder;
use census_report::grouping::tables::UNCLASSIFIED_TITLE;
use census_report::ingest::parse_dictionary;
use census_report::model::{DenominatorPolicy, LayerField, Unit};
use support::*;

fn candidates() -> Vec<String> {
    strings(&[
        "n_region",
        "n_per",
        "n_hombres",
        "n_mujeres",
        "n_edad_0_14",
        "n_edad_15_64",
        "n_fuente_agua_red",
        "n_fuente_agua_pozo",
        "n_serv_hig_alc",
        "n_extra",
    ])
}

#[test]
fn dictionary_build_applies_overrides_in_topical_order() {
    let entries = parse_dictionary(DICTIONARY_CSV.as_bytes()).expect("dictionary");
    let built = GroupSpecBuilder::new().build(&entries, &candidates());

    assert_eq!(
        built.titles(),
        vec![
            "Población según sexo",
            "Población según tramos de edad",
            "Servicios básicos (Viviendas)",
            UNCLASSIFIED_TITLE,
        ]
    );

    let sex = &built.specs["Población según sexo"];
    assert_eq!(sex.variables, strings(&["n_hombres", "n_mujeres", "n_per"]));
    assert_eq!(sex.denominator, DenominatorPolicy::Column("n_per".into()));
    assert_eq!(sex.total_label, None);
    assert_eq!(sex.unit, Some(Unit::Personas));

    let services = &built.specs["Servicios básicos (Viviendas)"];
    assert_eq!(services.denominator, DenominatorPolicy::PerCategory);
    assert_eq!(services.category_of("n_fuente_agua_red"), Some("Agua"));
    assert_eq!(services.category_of("n_serv_hig_alc"), Some("WC"));
    assert_eq!(
        services.labels.get("n_fuente_agua_red").map(String::as_str),
        Some("Red pública")
    );

    let unclassified = &built.specs[UNCLASSIFIED_TITLE];
    assert_eq!(unclassified.variables, strings(&["n_extra"]));
    assert_eq!(unclassified.denominator, DenominatorPolicy::NoTotal);
    assert_eq!(built.unclassified, strings(&["n_extra"]));
}

#[test]
fn geographic_columns_never_become_groups() {
    let entries = parse_dictionary(DICTIONARY_CSV.as_bytes()).expect("dictionary");
    let built = GroupSpecBuilder::new().build(&entries, &candidates());
    assert!(
        built
            .specs
            .values()
            .all(|spec| !spec.variables.contains(&"n_region".to_string()))
    );
}

#[test]
fn unclassified_group_can_be_disabled() {
    let entries = parse_dictionary(DICTIONARY_CSV.as_bytes()).expect("dictionary");
    let built = GroupSpecBuilder::new()
        .include_unclassified(false)
        .build(&entries, &candidates());
    assert!(!built.specs.contains_key(UNCLASSIFIED_TITLE));
    assert_eq!(built.unclassified, strings(&["n_extra"]));
}

#[test]
fn unavailable_dictionary_columns_are_ignored() {
    let entries = parse_dictionary(DICTIONARY_CSV.as_bytes()).expect("dictionary");
    let built = GroupSpecBuilder::new().build(&entries, &strings(&["n_edad_0_14"]));
    assert_eq!(built.titles(), vec!["Población según tramos de edad"]);
    assert_eq!(
        built.specs["Población según tramos de edad"].variables,
        strings(&["n_edad_0_14"])
    );
}

#[test]
fn remaining_base_groups_get_unit_suffixed_titles() {
    let entries = vec![
        entry(HOUSING, "Tipo de vivienda", "n_tipo_viv_casa", "Casa"),
        entry(HOUSING, "Tipo de vivienda", "n_tipo_viv_depto", "Departamento"),
    ];
    let built = GroupSpecBuilder::new().build(
        &entries,
        &strings(&["n_tipo_viv_casa", "n_tipo_viv_depto"]),
    );
    let spec = &built.specs["Tipo de vivienda (Viviendas)"];
    assert_eq!(spec.denominator, DenominatorPolicy::SumOfMembers);
    assert_eq!(spec.total_label.as_deref(), Some("Total"));
    assert_eq!(spec.unit, Some(Unit::Viviendas));
}

#[test]
fn fallback_build_uses_layer_labels() {
    let available = strings(&["n_tipo_viv_casa", "n_tipo_viv_depto", "n_per"]);
    let layer = vec![LayerField {
        field: "n_tipo_viv_casa".into(),
        dtype: "integer".into(),
        description: "Casas".into(),
        display: "Viviendas tipo casa".into(),
    }];
    let built = GroupSpecBuilder::new().build_fallback(&available, &layer);
    assert!(built.specs.contains_key("Tipo Viv"), "{:?}", built.titles());
    assert!(built.specs.contains_key("Per"));
    assert_eq!(built.labels.get("n_tipo_viv_casa").map(String::as_str), Some("Casas"));
    assert_eq!(
        built.details.get("n_tipo_viv_casa").map(String::as_str),
        Some("Viviendas tipo casa")
    );
}

#[test]
fn geography_mentioning_topics_are_still_reported() {
    let entries = vec![entry(
        "3. Migración y movilidad geográfica",
        "Residencia anterior",
        "n_migrantes",
        "Migrantes",
    )];
    let built = GroupSpecBuilder::new().build(&entries, &strings(&["n_migrantes"]));
    assert_eq!(built.titles(), vec!["Residencia anterior (Personas)"]);
    assert!(built.unclassified.is_empty());
}

#[test]
fn general_topic_without_sex_columns_is_not_a_table() {
    let entries = vec![
        entry(POPULATION, "General", "n_hog", "Hogares"),
        entry(POPULATION, "General", "n_vp", "Viviendas particulares"),
    ];
    let built = GroupSpecBuilder::new()
        .include_unclassified(false)
        .build(&entries, &strings(&["n_hog", "n_vp"]));
    assert!(built.titles().is_empty(), "{:?}", built.titles());
    assert_eq!(built.unclassified, strings(&["n_hog", "n_vp"]));
}
