//! Spanish domain vocabularies
//!
//! Closed word lists the detectors classify against. These are data, not
//! algorithm: extending coverage to another corpus means editing the
//! tables, nothing else.

use semblanza_domain::AttributeType;

/// Colors valid for eyes and hair
pub const COLORS: &[&str] = &[
    "azul", "azules", "verde", "verdes", "marrón", "marrones", "castaño", "castaña", "castaños",
    "castañas", "negro", "negra", "negros", "negras", "gris", "grises", "miel", "avellana",
    "ámbar", "violeta", "dorado", "dorados", "plateado", "plateados", "rubio", "rubia", "rubios",
    "rubias", "pelirrojo", "pelirroja", "pelirrojos", "pelirrojas", "canoso", "canosa", "canosos",
    "canosas", "blanco", "blanca", "blancos", "blancas", "oscuro", "oscura", "oscuros", "oscuras",
    "claro", "clara", "claros", "claras", "rojizo", "cobrizo", "azabache", "moreno", "morena",
];

/// Hair shape/length descriptors
pub const HAIR_TYPES: &[&str] = &[
    "liso", "rizado", "ondulado", "encrespado", "lacio", "fino", "grueso", "abundante", "escaso",
    "largo", "corto", "rapado", "calvo", "recogido", "suelto", "trenzado", "espeso",
];

/// Colors that in copulative use ("era rubio") refer to hair
pub const HAIR_COLOR_ADJECTIVES: &[&str] = &[
    "rubio", "rubia", "rubios", "rubias", "moreno", "morena", "morenos", "morenas", "castaño",
    "castaña", "castaños", "castañas", "pelirrojo", "pelirroja", "pelirrojos", "pelirrojas",
    "canoso", "canosa", "canosos", "canosas",
];

/// Height adjectives
pub const HEIGHT_ADJECTIVES: &[&str] = &[
    "alto", "alta", "altos", "altas", "bajo", "baja", "bajos", "bajas", "bajito", "bajita",
];

/// Body-build adjectives
pub const BUILD_TYPES: &[&str] = &[
    "delgado", "delgada", "delgados", "delgadas", "corpulento", "corpulenta", "esbelto", "esbelta",
    "robusto", "robusta", "musculoso", "musculosa", "gordo", "gorda", "flaco", "flaca", "atlético",
    "atlética", "fornido", "fornida", "enclenque",
];

/// Skin/complexion adjectives
pub const SKIN_ADJECTIVES: &[&str] = &[
    "pálido", "pálida", "bronceado", "bronceada", "pecoso", "pecosa", "cetrino", "cetrina",
];

/// Personality traits
pub const PERSONALITY_TRAITS: &[&str] = &[
    "amable", "cruel", "tímido", "tímida", "extrovertido", "extrovertida", "introvertido",
    "introvertida", "valiente", "cobarde", "leal", "honesto", "honesta", "generoso", "generosa",
    "paciente", "impaciente", "orgulloso", "orgullosa", "humilde", "arrogante", "sabio", "sabia",
    "astuto", "astuta", "torpe",
];

/// Descriptive age words (not numeric)
pub const AGE_DESCRIPTORS: &[&str] = &[
    "joven", "viejo", "vieja", "anciano", "anciana", "adolescente", "maduro", "madura", "mayor",
    "niño", "niña",
];

/// Metaphor-indicator phrases; a surface match inside their window is
/// figurative, not descriptive
pub const METAPHOR_INDICATORS: &[&str] = &[
    r"\bcomo\b",
    r"\bcual\b",
    r"\bsemejante\s+a\b",
    r"\btan\s+\w+\s+como\b",
    r"\bcomo\s+si\b",
    r"\bsi\s+fuera\b",
    r"\brecordaba\s+a\b",
    r"\bevocaba\b",
    r"\bparec[íi]an?\b",
];

/// Simple negation indicators
pub const NEGATION_INDICATORS: &[&str] = &[
    r"\bno\b",
    r"\bnunca\b",
    r"\bjamás\b",
    r"\bsin\b",
    r"\bni\s+siquiera\b",
    r"\bcarec[íi]a\b",
];

/// Generic nouns that look like professions in "era un X" frames but
/// are not
pub const PROFESSION_EXCLUDED: &[&str] = &[
    "hombre", "mujer", "persona", "tipo", "chico", "chica", "joven", "viejo", "niño", "niña",
    "señor", "señora",
];

/// Speech verbs that close an em-dash dialogue segment
pub const SPEECH_VERBS: &[&str] = &[
    "dijo", "preguntó", "contestó", "respondió", "exclamó", "murmuró", "gritó", "susurró",
    "añadió", "comentó",
];

fn in_set(set: &[&str], value: &str) -> bool {
    set.contains(&value)
}

/// Classify a bare adjective as used predicatively ("era alta", "era rubio")
///
/// Hair colors take precedence over generic colors: "era morena" describes
/// hair, not eyes.
pub fn classify_adjective(value: &str) -> Option<AttributeType> {
    let v = value.trim().to_lowercase();
    if in_set(HAIR_COLOR_ADJECTIVES, &v) {
        return Some(AttributeType::HairColor);
    }
    if in_set(HEIGHT_ADJECTIVES, &v) {
        return Some(AttributeType::Height);
    }
    if in_set(BUILD_TYPES, &v) {
        return Some(AttributeType::Build);
    }
    if in_set(SKIN_ADJECTIVES, &v) {
        return Some(AttributeType::Skin);
    }
    if in_set(PERSONALITY_TRAITS, &v) {
        return Some(AttributeType::Personality);
    }
    if in_set(AGE_DESCRIPTORS, &v) {
        return Some(AttributeType::Age);
    }
    None
}

/// Map a body-part lemma to the attribute type its modifiers describe
pub fn body_part_attribute(lemma: &str) -> Option<AttributeType> {
    match lemma {
        "ojo" | "ojos" => Some(AttributeType::EyeColor),
        "pelo" | "cabello" | "melena" | "barba" | "bigote" => Some(AttributeType::HairColor),
        "piel" | "tez" | "rostro" => Some(AttributeType::Skin),
        _ => None,
    }
}

/// Whether a body part can also carry a hair-type descriptor ("pelo largo")
pub fn body_part_has_hair_type(lemma: &str) -> bool {
    matches!(lemma, "pelo" | "cabello" | "melena" | "barba")
}

/// Validate a value against the closed vocabulary for its type.
///
/// Types without a closed list accept any value longer than one character.
pub fn validate_value(attribute_type: AttributeType, value: &str) -> bool {
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        return false;
    }
    match attribute_type {
        AttributeType::EyeColor | AttributeType::HairColor => in_set(COLORS, &v),
        AttributeType::HairType => in_set(HAIR_TYPES, &v),
        AttributeType::Height => in_set(HEIGHT_ADJECTIVES, &v),
        AttributeType::Build => in_set(BUILD_TYPES, &v),
        AttributeType::Skin => in_set(SKIN_ADJECTIVES, &v) || in_set(COLORS, &v),
        AttributeType::Personality => in_set(PERSONALITY_TRAITS, &v),
        AttributeType::Age => match v.parse::<u32>() {
            Ok(age) => age > 0 && age < 200,
            Err(_) => in_set(AGE_DESCRIPTORS, &v),
        },
        AttributeType::Profession => v.len() > 3 && !in_set(PROFESSION_EXCLUDED, &v),
        AttributeType::DistinctiveFeature => v.len() > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_copulative_adjectives() {
        assert_eq!(classify_adjective("alta"), Some(AttributeType::Height));
        assert_eq!(classify_adjective("rubio"), Some(AttributeType::HairColor));
        assert_eq!(classify_adjective("delgada"), Some(AttributeType::Build));
        assert_eq!(
            classify_adjective("valiente"),
            Some(AttributeType::Personality)
        );
        assert_eq!(classify_adjective("mesa"), None);
    }

    #[test]
    fn test_morena_is_hair_not_eye() {
        assert_eq!(classify_adjective("morena"), Some(AttributeType::HairColor));
    }

    #[test]
    fn test_body_parts() {
        assert_eq!(body_part_attribute("ojos"), Some(AttributeType::EyeColor));
        assert_eq!(body_part_attribute("cabello"), Some(AttributeType::HairColor));
        assert_eq!(body_part_attribute("piel"), Some(AttributeType::Skin));
        assert_eq!(body_part_attribute("mano"), None);
        assert!(body_part_has_hair_type("pelo"));
        assert!(!body_part_has_hair_type("ojos"));
    }

    #[test]
    fn test_validate_values() {
        assert!(validate_value(AttributeType::EyeColor, "azules"));
        assert!(!validate_value(AttributeType::EyeColor, "brillantes"));
        assert!(validate_value(AttributeType::Age, "42"));
        assert!(!validate_value(AttributeType::Age, "400"));
        assert!(validate_value(AttributeType::Age, "joven"));
        assert!(validate_value(AttributeType::HairType, "rizado"));
        assert!(!validate_value(AttributeType::HairType, "azul"));
    }
}
