//! Ordered `(predicate, result)` tables evaluated top to bottom.
//!
//! New prefixes or topics are added as table rows; the lookup functions never
//! change.

use crate::model::{GroupSpec, Unit};
use once_cell::sync::Lazy;
use regex::Regex;

pub struct UnitRule {
    pub prefixes: &'static [&'static str],
    pub unit: Unit,
}

/// Household indicators first, then dwellings, then anything person-level.
pub const UNIT_RULES: &[UnitRule] = &[
    UnitRule {
        prefixes: &[
            "n_hog",
            "n_tenencia",
            "n_comb",
            "n_serv_",
            "n_internet",
            "n_serv_tel",
        ],
        unit: Unit::Hogares,
    },
    UnitRule {
        prefixes: &["n_vp", "n_viv", "n_tipo_viv", "n_mat", "n_dormitorios"],
        unit: Unit::Viviendas,
    },
    UnitRule {
        prefixes: &["n_"],
        unit: Unit::Personas,
    },
];

pub fn infer_unit<S: AsRef<str>>(columns: &[S]) -> Option<Unit> {
    UNIT_RULES
        .iter()
        .find(|rule| {
            columns.iter().any(|column| {
                let column = column.as_ref();
                rule.prefixes.iter().any(|prefix| column.starts_with(prefix))
            })
        })
        .map(|rule| rule.unit)
}

pub struct CategoryRule {
    pub prefix: &'static str,
    pub category: &'static str,
    /// Descriptive lead removed from member labels inside the category.
    pub label_prefix: Option<&'static str>,
}

pub const OTHER_CATEGORY: &str = "Otros";

pub const SERVICE_CATEGORIES: &[CategoryRule] = &[
    CategoryRule {
        prefix: "n_fuente_agua_",
        category: "Agua",
        label_prefix: Some("Fuente de agua"),
    },
    CategoryRule {
        prefix: "n_distrib_agua_",
        category: "Distribución",
        label_prefix: Some("Distribución de agua"),
    },
    CategoryRule {
        prefix: "n_serv_hig_",
        category: "WC",
        label_prefix: Some("Servicio higiénico"),
    },
    CategoryRule {
        prefix: "n_fuente_elect_",
        category: "Electricidad",
        label_prefix: Some("Fuente de electricidad"),
    },
    CategoryRule {
        prefix: "n_basura_",
        category: "Basura",
        label_prefix: Some("Eliminación de basura"),
    },
];

pub fn dispatch_category<'a>(
    table: &'a [CategoryRule],
    column: &str,
) -> Option<&'a CategoryRule> {
    table.iter().find(|rule| column.starts_with(rule.prefix))
}

/// Removes `prefix` (case-insensitive) from the start of `label` together with
/// any separator that follows it, then re-capitalizes. Labels that would end
/// up empty are returned untouched.
pub fn strip_label_prefix(label: &str, prefix: &str) -> String {
    let pattern = format!(r"(?i)^\s*{}\s*[:\-–,]?\s*", regex::escape(prefix));
    let Ok(re) = Regex::new(&pattern) else {
        return label.to_string();
    };
    let stripped = re.replace(label, "");
    if stripped.trim().is_empty() || stripped.len() == label.len() {
        return label.to_string();
    }
    capitalize_first(stripped.trim())
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

static GEOGRAPHIC_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)identificaci[oó]n\s+geogr").expect("static regex")
});

/// The geographic identification topic never becomes a report group.
pub fn is_geographic_topic(topic: &str) -> bool {
    GEOGRAPHIC_TOPIC.is_match(topic)
}

pub const UNCLASSIFIED_TITLE: &str = "Variables sin clasificar";

const UNRANKED: u8 = 11;
const UNCLASSIFIED_RANK: u8 = 12;

enum RankMatcher {
    Title(&'static str),
    Unit(Unit),
}

struct RankRule {
    matcher: RankMatcher,
    rank: u8,
}

const RANK_RULES: &[RankRule] = &[
    RankRule {
        matcher: RankMatcher::Title(r"(?i)seg[uú]n sexo"),
        rank: 0,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)\bedad\b|\btramos? etarios?\b"),
        rank: 1,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)estado civil|conyugal"),
        rank: 2,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)discapacidad"),
        rank: 3,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)educaci|escolar|alfabet"),
        rank: 4,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)migra|nacimiento|residencia"),
        rank: 5,
    },
    RankRule {
        matcher: RankMatcher::Title(
            r"(?i)pueblos? originarios?|afrodescend|lengua ind[ií]gena|etni",
        ),
        rank: 6,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)religi"),
        rank: 7,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)ocupa|emple|trabaj|actividad econ"),
        rank: 8,
    },
    RankRule {
        matcher: RankMatcher::Unit(Unit::Hogares),
        rank: 9,
    },
    RankRule {
        matcher: RankMatcher::Unit(Unit::Viviendas),
        rank: 10,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)hogar"),
        rank: 9,
    },
    RankRule {
        matcher: RankMatcher::Title(r"(?i)vivienda"),
        rank: 10,
    },
];

static COMPILED_RANK_RULES: Lazy<Vec<(Option<Regex>, &'static RankRule)>> = Lazy::new(|| {
    RANK_RULES
        .iter()
        .map(|rule| match rule.matcher {
            RankMatcher::Title(pattern) => {
                (Some(Regex::new(pattern).expect("static regex")), rule)
            }
            RankMatcher::Unit(_) => (None, rule),
        })
        .collect()
});

/// Presentation rank of a group; lower sorts first.
pub fn topical_rank(spec: &GroupSpec) -> u8 {
    if spec.title == UNCLASSIFIED_TITLE {
        return UNCLASSIFIED_RANK;
    }
    COMPILED_RANK_RULES
        .iter()
        .find(|(regex, rule)| match (&rule.matcher, regex) {
            (RankMatcher::Unit(unit), _) => spec.unit == Some(*unit),
            (RankMatcher::Title(_), Some(regex)) => regex.is_match(&spec.title),
            (RankMatcher::Title(_), None) => false,
        })
        .map(|(_, rule)| rule.rank)
        .unwrap_or(UNRANKED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DenominatorPolicy;

    fn spec(title: &str, unit: Option<Unit>) -> GroupSpec {
        GroupSpec::new(title, vec![], DenominatorPolicy::SumOfMembers).with_unit(unit)
    }

    #[test]
    fn unit_priority_prefers_households() {
        assert_eq!(infer_unit(&["n_viv_a", "n_hog_total"]), Some(Unit::Hogares));
        assert_eq!(infer_unit(&["n_mat_pared"]), Some(Unit::Viviendas));
        assert_eq!(infer_unit(&["n_edad_0_5"]), Some(Unit::Personas));
        assert_eq!(infer_unit(&["edad"]), None);
    }

    #[test]
    fn dispatches_service_categories() {
        let rule = dispatch_category(SERVICE_CATEGORIES, "n_serv_hig_alc").expect("rule");
        assert_eq!(rule.category, "WC");
        assert!(dispatch_category(SERVICE_CATEGORIES, "n_calefaccion").is_none());
    }

    #[test]
    fn strips_category_label_prefix() {
        assert_eq!(
            strip_label_prefix("Fuente de agua: red pública", "Fuente de agua"),
            "Red pública"
        );
        assert_eq!(
            strip_label_prefix("fuente de agua - camión aljibe", "Fuente de agua"),
            "Camión aljibe"
        );
        assert_eq!(strip_label_prefix("Fuente de agua", "Fuente de agua"), "Fuente de agua");
        assert_eq!(strip_label_prefix("Pozo", "Fuente de agua"), "Pozo");
    }

    #[test]
    fn geographic_topic_detection() {
        assert!(is_geographic_topic("1. Identificación Geográfica"));
        assert!(is_geographic_topic("1. Identificacion geografica"));
        assert!(!is_geographic_topic("3. Migración y movilidad geográfica"));
        assert!(!is_geographic_topic("2. Variables de Población (Personas)"));
    }

    #[test]
    fn ranks_follow_topical_order() {
        assert_eq!(topical_rank(&spec("Población según sexo", Some(Unit::Personas))), 0);
        assert_eq!(
            topical_rank(&spec("Población según tramos de edad", Some(Unit::Personas))),
            1
        );
        assert_eq!(topical_rank(&spec("Propiedad (Personas)", Some(Unit::Personas))), 11);
        assert_eq!(topical_rank(&spec("Tenencia de vivienda (Hogares)", Some(Unit::Hogares))), 9);
        assert_eq!(
            topical_rank(&spec("Servicios básicos (Viviendas)", Some(Unit::Viviendas))),
            10
        );
        assert_eq!(topical_rank(&spec(UNCLASSIFIED_TITLE, None)), 12);
    }
}
