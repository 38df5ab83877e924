use std::cmp::Ordering;
use std::fmt;

use crate::error::ConfigError;

pub const FIELD_COUNT: usize = 7;

/// Stored mapping codes use zero for "don't care" in a field.
pub const WILDCARD: u16 = 0;

pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "kind",
    "domain",
    "country",
    "category",
    "subcategory",
    "specific",
    "extra",
];

const FIELD_MAX: [u32; FIELD_COUNT] = [9, 255, 65535, 255, 255, 255, 255];

/// DIS entity type: (kind, domain, country, category, subcategory, specific, extra).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityTypeCode {
    kind: u8,
    domain: u8,
    country: u16,
    category: u8,
    subcategory: u8,
    specific: u8,
    extra: u8,
}

impl EntityTypeCode {
    pub const fn new(
        kind: u8,
        domain: u8,
        country: u16,
        category: u8,
        subcategory: u8,
        specific: u8,
        extra: u8,
    ) -> Self {
        Self {
            kind,
            domain,
            country,
            category,
            subcategory,
            specific,
            extra,
        }
    }

    pub fn from_fields(raw: [u32; FIELD_COUNT]) -> Result<Self, ConfigError> {
        for (i, &value) in raw.iter().enumerate() {
            if value > FIELD_MAX[i] {
                return Err(ConfigError::FieldOutOfRange {
                    field: FIELD_NAMES[i],
                    value,
                    max: FIELD_MAX[i],
                });
            }
        }

        Ok(Self::new(
            raw[0] as u8,
            raw[1] as u8,
            raw[2] as u16,
            raw[3] as u8,
            raw[4] as u8,
            raw[5] as u8,
            raw[6] as u8,
        ))
    }

    /// Mapping codes may only leave trailing fields unspecified.
    pub fn validate_pattern(&self) -> Result<(), ConfigError> {
        let fields = self.fields();
        if let Some(first_wildcard) = fields.iter().position(|&f| f == WILDCARD) {
            if let Some(offset) = fields[first_wildcard..].iter().position(|&f| f != WILDCARD) {
                return Err(ConfigError::NonTrailingWildcard {
                    field: FIELD_NAMES[first_wildcard + offset],
                });
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> [u16; FIELD_COUNT] {
        [
            self.kind as u16,
            self.domain as u16,
            self.country,
            self.category as u16,
            self.subcategory as u16,
            self.specific as u16,
            self.extra as u16,
        ]
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn domain(&self) -> u8 {
        self.domain
    }

    pub fn country(&self) -> u16 {
        self.country
    }

    pub fn category(&self) -> u8 {
        self.category
    }

    pub fn subcategory(&self) -> u8 {
        self.subcategory
    }

    pub fn specific(&self) -> u8 {
        self.specific
    }

    pub fn extra(&self) -> u8 {
        self.extra
    }

    pub fn wildcard_count(&self) -> u8 {
        self.fields().iter().filter(|&&f| f == WILDCARD).count() as u8
    }

    pub fn specified_len(&self) -> usize {
        self.fields()
            .iter()
            .position(|&f| f == WILDCARD)
            .unwrap_or(FIELD_COUNT)
    }
}

impl fmt::Display for EntityTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}.{}",
            self.kind,
            self.domain,
            self.country,
            self.category,
            self.subcategory,
            self.specific,
            self.extra
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchQuality {
    pub matched: u8,
    pub wildcards: u8,
}

impl Ord for MatchQuality {
    fn cmp(&self, other: &Self) -> Ordering {
        self.matched
            .cmp(&other.matched)
            .then_with(|| other.wildcards.cmp(&self.wildcards))
    }
}

impl PartialOrd for MatchQuality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compares `candidate` against `stored` field by field in priority order.
/// Wildcard fields of `stored` are skipped; any other difference is no match.
pub fn match_code(candidate: &EntityTypeCode, stored: &EntityTypeCode) -> Option<MatchQuality> {
    let mut matched = 0u8;
    let mut wildcards = 0u8;

    for (c, s) in candidate.fields().iter().zip(stored.fields()) {
        if s == WILDCARD {
            wildcards += 1;
        } else if *c == s {
            matched += 1;
        } else {
            return None;
        }
    }

    Some(MatchQuality { matched, wildcards })
}
