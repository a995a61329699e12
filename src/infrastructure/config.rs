use crate::domain::models::WorkHours;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const POLICIES_JSON: &str = "policies.json";
const COHORTS_JSON: &str = "cohorts.json";
const SUPPORTED_SCHEMA: u64 = 1;
const MAX_WEEKLY_TARGET_HOURS: f64 = 168.0;

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
pub const DEFAULT_FEED_BASE_URL: &str =
    "https://ade-uga-ro-vs.grenet.fr/jsp/custom/modules/plannings/anonymous_cal.jsp";
pub const DEFAULT_WEEKLY_TARGET_HOURS: f64 = 35.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub schema: u8,
    pub app_name: String,
    pub timezone: String,
    pub feed_base_url: String,
    pub project_id: u32,
    #[serde(default)]
    pub notification_recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicySettings {
    pub schema: u8,
    pub work_hours: WorkHours,
    pub weekly_target_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CohortDirectory {
    pub schema: u8,
    /// Display name to comma-separated feed resource ids.
    pub cohorts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBundle {
    pub app: AppSettings,
    pub policies: PolicySettings,
    pub cohorts: CohortDirectory,
}

impl ConfigBundle {
    pub fn timezone(&self) -> Result<Tz, InfraError> {
        parse_timezone(&self.app.timezone)
    }

    pub fn resources_for(&self, cohort: &str) -> Result<&str, InfraError> {
        self.cohorts
            .cohorts
            .get(cohort.trim())
            .map(String::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InfraError::UnknownCohort(cohort.trim().to_string()))
    }

    pub fn notification_recipient(&self) -> Option<&str> {
        self.app
            .notification_recipient
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl Default for ConfigBundle {
    fn default() -> Self {
        Self {
            app: AppSettings {
                schema: 1,
                app_name: "Cohort Load".to_string(),
                timezone: DEFAULT_TIMEZONE.to_string(),
                feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
                project_id: 1,
                notification_recipient: None,
            },
            policies: PolicySettings {
                schema: 1,
                work_hours: WorkHours::default(),
                weekly_target_hours: DEFAULT_WEEKLY_TARGET_HOURS,
            },
            cohorts: CohortDirectory {
                schema: 1,
                cohorts: BTreeMap::from([(
                    "M1 MIAGE".to_string(),
                    "54303,55713,55613,54994,54320,54315,55542,55467,55000,65286,46667"
                        .to_string(),
                )]),
            },
        }
    }
}

fn default_files() -> Result<HashMap<&'static str, serde_json::Value>, InfraError> {
    let defaults = ConfigBundle::default();
    Ok(HashMap::from([
        (APP_JSON, serde_json::to_value(&defaults.app)?),
        (POLICIES_JSON, serde_json::to_value(&defaults.policies)?),
        (COHORTS_JSON, serde_json::to_value(&defaults.cohorts)?),
    ]))
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files()? {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    serde_json::from_value(parsed)
        .map_err(|error| InfraError::InvalidConfig(format!("{}: {error}", path.display())))
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    let bundle = ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        policies: read_config(&config_dir.join(POLICIES_JSON))?,
        cohorts: read_config(&config_dir.join(COHORTS_JSON))?,
    };
    validate_bundle(&bundle)?;
    Ok(bundle)
}

fn validate_bundle(bundle: &ConfigBundle) -> Result<(), InfraError> {
    bundle.timezone()?;
    bundle
        .policies
        .work_hours
        .validate()
        .map_err(InfraError::InvalidConfig)?;
    let target = bundle.policies.weekly_target_hours;
    if !(0.0..=MAX_WEEKLY_TARGET_HOURS).contains(&target) {
        return Err(InfraError::InvalidConfig(format!(
            "weeklyTargetHours must be within 0..={MAX_WEEKLY_TARGET_HOURS}, got {target}"
        )));
    }
    if bundle.app.feed_base_url.trim().is_empty() {
        return Err(InfraError::InvalidConfig(
            "feedBaseUrl must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn parse_timezone(value: &str) -> Result<Tz, InfraError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{value}': {error}")))
}
