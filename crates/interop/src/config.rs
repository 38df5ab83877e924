use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity_type::{EntityTypeCode, FIELD_COUNT};
use crate::error::{ConfigError, InteropError};
use crate::nib::DeadReckoningModel;
use crate::ntm::{Ntm, NtmInputTree, NtmOutputTree};
use crate::player::{ClassRegistry, PlayerTemplate, TemplatePlayerRef};

/// Dead-reckoning and filtering thresholds. Times in seconds, distances in
/// meters, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrLimits {
    pub max_time_dr: f64,
    pub max_position_error: f64,
    pub max_orientation_error: f64,
    pub max_age: f64,
    /// Zero disables the range filter.
    pub max_entity_range: f64,
}

impl Default for DrLimits {
    fn default() -> Self {
        Self {
            max_time_dr: 5.0,
            max_position_error: 3.0,
            max_orientation_error: 3.0_f64.to_radians(),
            max_age: 12.5,
            max_entity_range: 0.0,
        }
    }
}

impl DrLimits {
    /// Boundary is inclusive: an entity exactly at the limit is accepted.
    pub fn in_range(&self, range: f64) -> bool {
        self.max_entity_range <= 0.0 || range <= self.max_entity_range
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitOverride {
    pub kind: u8,
    #[serde(default)]
    pub domain: Option<u8>,
    #[serde(default)]
    pub max_time_dr: Option<f64>,
    #[serde(default)]
    pub max_position_error: Option<f64>,
    #[serde(default)]
    pub max_orientation_error: Option<f64>,
    #[serde(default)]
    pub max_age: Option<f64>,
    #[serde(default)]
    pub max_entity_range: Option<f64>,
}

impl LimitOverride {
    fn apply(&self, limits: &mut DrLimits) {
        if let Some(v) = self.max_time_dr {
            limits.max_time_dr = v;
        }
        if let Some(v) = self.max_position_error {
            limits.max_position_error = v;
        }
        if let Some(v) = self.max_orientation_error {
            limits.max_orientation_error = v;
        }
        if let Some(v) = self.max_age {
            limits.max_age = v;
        }
        if let Some(v) = self.max_entity_range {
            limits.max_entity_range = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub type_string: String,
}

/// One row of an entity type table. The code stays raw until the tables
/// are built so a bad row only skips itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub entity_type: [u32; FIELD_COUNT],
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetIoConfig {
    pub federate_name: String,
    pub network_id: u16,
    pub input_enabled: bool,
    pub output_enabled: bool,
    pub max_entities: usize,
    pub limits: DrLimits,
    pub overrides: Vec<LimitOverride>,
    pub dead_reckoning: DeadReckoningModel,
    pub output_kinds: Vec<u8>,
    pub output_domains: Vec<u8>,
    pub classes: Vec<ClassEntry>,
    pub templates: Vec<TemplateEntry>,
    pub input_entity_types: Vec<MappingEntry>,
    pub output_entity_types: Vec<MappingEntry>,
}

impl Default for NetIoConfig {
    fn default() -> Self {
        Self {
            federate_name: "station".to_string(),
            network_id: 1,
            input_enabled: true,
            output_enabled: true,
            max_entities: 1000,
            limits: DrLimits::default(),
            overrides: Vec::new(),
            dead_reckoning: DeadReckoningModel::default(),
            output_kinds: Vec::new(),
            output_domains: Vec::new(),
            classes: Vec::new(),
            templates: Vec::new(),
            input_entity_types: Vec::new(),
            output_entity_types: Vec::new(),
        }
    }
}

impl NetIoConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, InteropError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, InteropError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Base limits with kind overrides applied, then kind+domain overrides.
    pub fn limits_for(&self, code: &EntityTypeCode) -> DrLimits {
        let mut limits = self.limits;

        for o in self.overrides.iter().filter(|o| o.kind == code.kind() && o.domain.is_none()) {
            o.apply(&mut limits);
        }
        for o in self
            .overrides
            .iter()
            .filter(|o| o.kind == code.kind() && o.domain == Some(code.domain()))
        {
            o.apply(&mut limits);
        }

        limits
    }

    /// Kind/domain publication filter; an empty list allows everything.
    pub fn output_allowed(&self, code: &EntityTypeCode) -> bool {
        (self.output_kinds.is_empty() || self.output_kinds.contains(&code.kind()))
            && (self.output_domains.is_empty() || self.output_domains.contains(&code.domain()))
    }
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<(String, ConfigError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn skip(&mut self, entry: String, err: ConfigError) {
        log::warn!("skipping {}: {}", entry, err);
        self.errors.push((entry, err));
    }
}

#[derive(Debug)]
pub struct NtmTables {
    pub classes: ClassRegistry,
    pub templates: HashMap<String, TemplatePlayerRef>,
    pub input: NtmInputTree,
    pub output: NtmOutputTree,
}

impl NtmTables {
    pub fn build(config: &NetIoConfig) -> (Self, LoadReport) {
        let mut report = LoadReport::default();
        let mut classes = ClassRegistry::with_builtin();

        for (i, entry) in config.classes.iter().enumerate() {
            if let Err(err) = classes.register(&entry.name, &entry.parent) {
                report.skip(format!("classes[{}] `{}`", i, entry.name), err);
            }
        }

        let mut templates = HashMap::new();
        for (i, entry) in config.templates.iter().enumerate() {
            let context = format!("templates[{}] `{}`", i, entry.name);
            if templates.contains_key(&entry.name) {
                report.skip(context, ConfigError::DuplicateTemplate(entry.name.clone()));
                continue;
            }
            match classes.get(&entry.class) {
                Some(class) => {
                    let template =
                        PlayerTemplate::new(&entry.name, Arc::clone(class), &entry.type_string);
                    templates.insert(entry.name.clone(), template);
                }
                None => report.skip(context, ConfigError::UnknownClass(entry.class.clone())),
            }
        }

        let mut input = NtmInputTree::new();
        for (i, entry) in config.input_entity_types.iter().enumerate() {
            let result = Self::mapping(entry, &templates).and_then(|ntm| input.insert(ntm));
            if let Err(err) = result {
                report.skip(format!("input_entity_types[{}]", i), err);
            }
        }

        let mut output = NtmOutputTree::new(Arc::clone(classes.base()));
        for (i, entry) in config.output_entity_types.iter().enumerate() {
            let result = Self::mapping(entry, &templates).and_then(|ntm| output.insert(ntm));
            if let Err(err) = result {
                report.skip(format!("output_entity_types[{}]", i), err);
            }
        }

        log::info!(
            "loaded {} input and {} output entity type mappings ({} skipped)",
            input.len(),
            output.len(),
            report.errors.len()
        );

        (
            Self {
                classes,
                templates,
                input,
                output,
            },
            report,
        )
    }

    pub fn template(&self, name: &str) -> Option<&TemplatePlayerRef> {
        self.templates.get(name)
    }

    fn mapping(
        entry: &MappingEntry,
        templates: &HashMap<String, TemplatePlayerRef>,
    ) -> Result<crate::ntm::NtmRef, ConfigError> {
        let code = EntityTypeCode::from_fields(entry.entity_type)?;
        let template = templates
            .get(&entry.template)
            .ok_or_else(|| ConfigError::UnknownTemplate(entry.template.clone()))?;
        Ntm::new(code, Arc::clone(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        federate_name = "alpha"
        network_id = 2
        output_domains = [2]

        [limits]
        max_age = 8.0
        max_entity_range = 1000.0

        [[overrides]]
        kind = 1
        max_position_error = 10.0

        [[overrides]]
        kind = 1
        domain = 2
        max_position_error = 1.0

        [[classes]]
        name = "Fighter"
        parent = "Aircraft"

        [[templates]]
        name = "f16"
        class = "Fighter"
        type_string = "F-16"

        [[templates]]
        name = "m1"
        class = "Tank"
        type_string = "M1"

        [[input_entity_types]]
        entity_type = [1, 2, 225, 1, 3, 0, 0]
        template = "f16"

        [[input_entity_types]]
        entity_type = [1, 2, 0, 1, 0, 0, 0]
        template = "f16"

        [[output_entity_types]]
        entity_type = [1, 2, 225, 1, 3, 0, 0]
        template = "f16"

        [[output_entity_types]]
        entity_type = [1, 1, 225, 1, 1, 0, 0]
        template = "missing"
    "#;

    #[test]
    fn parse_with_defaults() {
        let config = NetIoConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.federate_name, "alpha");
        assert_eq!(config.network_id, 2);
        assert!(config.input_enabled);
        assert_eq!(config.max_entities, 1000);
        assert_eq!(config.limits.max_age, 8.0);
        assert_eq!(config.limits.max_time_dr, 5.0);
        assert_eq!(config.dead_reckoning, DeadReckoningModel::Fpw);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let config = NetIoConfig::from_toml_str(SAMPLE).unwrap();
        let (tables, report) = NtmTables::build(&config);

        assert!(!report.is_clean());
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(
            report.errors[0].1,
            ConfigError::NonTrailingWildcard { field: "category" }
        ));
        assert_eq!(
            report.errors[1].1,
            ConfigError::UnknownTemplate("missing".to_string())
        );

        assert_eq!(tables.input.len(), 1);
        assert_eq!(tables.output.len(), 1);
        assert!(tables.classes.get("Fighter").unwrap().is_kind_of("AirVehicle"));
    }

    #[test]
    fn domain_override_beats_kind_override() {
        let config = NetIoConfig::from_toml_str(SAMPLE).unwrap();

        let air = config.limits_for(&EntityTypeCode::new(1, 2, 225, 1, 0, 0, 0));
        assert_eq!(air.max_position_error, 1.0);
        assert_eq!(air.max_age, 8.0);

        let land = config.limits_for(&EntityTypeCode::new(1, 1, 225, 1, 0, 0, 0));
        assert_eq!(land.max_position_error, 10.0);

        let munition = config.limits_for(&EntityTypeCode::new(2, 2, 225, 1, 0, 0, 0));
        assert_eq!(munition.max_position_error, 3.0);
    }

    #[test]
    fn output_filter() {
        let config = NetIoConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.output_allowed(&EntityTypeCode::new(1, 2, 225, 0, 0, 0, 0)));
        assert!(!config.output_allowed(&EntityTypeCode::new(1, 1, 225, 0, 0, 0, 0)));
        assert!(NetIoConfig::default().output_allowed(&EntityTypeCode::new(3, 4, 0, 0, 0, 0, 0)));
    }

    #[test]
    fn range_boundary_is_inclusive() {
        let limits = DrLimits {
            max_entity_range: 1000.0,
            ..DrLimits::default()
        };
        assert!(limits.in_range(999.0));
        assert!(limits.in_range(1000.0));
        assert!(!limits.in_range(1001.0));
        assert!(DrLimits::default().in_range(1.0e9));
    }

    #[test]
    fn duplicate_template_and_unknown_parent() {
        let config = NetIoConfig {
            classes: vec![ClassEntry {
                name: "Drone".to_string(),
                parent: "Robot".to_string(),
            }],
            templates: vec![
                TemplateEntry {
                    name: "t".to_string(),
                    class: "Ship".to_string(),
                    type_string: "DDG".to_string(),
                },
                TemplateEntry {
                    name: "t".to_string(),
                    class: "Ship".to_string(),
                    type_string: "CG".to_string(),
                },
            ],
            ..NetIoConfig::default()
        };

        let (tables, report) = NtmTables::build(&config);
        assert_eq!(
            report.errors[0].1,
            ConfigError::UnknownClass("Robot".to_string())
        );
        assert_eq!(
            report.errors[1].1,
            ConfigError::DuplicateTemplate("t".to_string())
        );
        assert_eq!(tables.template("t").unwrap().type_string(), "DDG");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            NetIoConfig::from_toml_str("max_entities = \"many\""),
            Err(InteropError::Toml(_))
        ));
    }
}
