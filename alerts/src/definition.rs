use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use market::types::normalize_symbol;

use crate::condition::Condition;
use crate::error::ConfigError;
use crate::key::AlertKey;

/// One `alerts:` entry exactly as configured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertSpec {
    #[serde(default = "unknown_name")]
    pub name: String,

    #[serde(default)]
    pub symbol: String,

    #[serde(default)]
    pub condition: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

fn enabled_by_default() -> bool {
    true
}

/// A validated alert: normalized symbol plus a resolved condition.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertDefinition {
    pub name: String,
    pub symbol: String,
    pub condition: Condition,
    pub enabled: bool,
}

impl AlertDefinition {
    pub fn key(&self) -> AlertKey {
        AlertKey::new(&self.symbol, self.condition.kind())
    }

    /// Notification title.
    pub fn title(&self) -> String {
        format!("Stock Alert: {}", self.symbol)
    }

    /// Notification body for a triggered condition message.
    pub fn body(&self, message: &str) -> String {
        format!("{}\n{}", self.name, message)
    }
}

impl TryFrom<&AlertSpec> for AlertDefinition {
    type Error = ConfigError;

    fn try_from(spec: &AlertSpec) -> Result<Self, Self::Error> {
        let symbol = normalize_symbol(&spec.symbol).ok_or_else(|| ConfigError::MissingSymbol {
            alert: spec.name.clone(),
        })?;

        Ok(Self {
            name: spec.name.clone(),
            symbol,
            condition: Condition::from_parts(&spec.condition, &spec.params)?,
            enabled: spec.enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionKind;

    #[test]
    fn spec_defaults_and_conversion() {
        let spec: AlertSpec = serde_yaml::from_str(
            r#"
symbol: " aapl "
condition: near_ma
params:
  ma_period: 50
"#,
        )
        .unwrap();

        assert_eq!(spec.name, "Unknown");
        assert!(spec.enabled);

        let def = AlertDefinition::try_from(&spec).unwrap();
        assert_eq!(def.symbol, "AAPL");
        assert_eq!(
            def.condition,
            Condition::NearMa {
                ma_period: 50,
                threshold_percent: 5.0
            }
        );
        assert_eq!(def.key().as_str(), "AAPL_near_ma");
        assert_eq!(def.condition.kind(), ConditionKind::NearMa);
    }

    #[test]
    fn missing_symbol_and_unknown_condition_fail() {
        let spec = AlertSpec {
            name: "Nothing".into(),
            symbol: "  ".into(),
            condition: "near_ma".into(),
            params: Value::Null,
            enabled: true,
        };
        assert_eq!(
            AlertDefinition::try_from(&spec).unwrap_err(),
            ConfigError::MissingSymbol {
                alert: "Nothing".into()
            }
        );

        let spec = AlertSpec {
            symbol: "SPY".into(),
            condition: "sideways".into(),
            ..spec
        };
        assert!(matches!(
            AlertDefinition::try_from(&spec).unwrap_err(),
            ConfigError::UnknownCondition(k) if k == "sideways"
        ));
    }

    #[test]
    fn title_and_body_format() {
        let def = AlertDefinition {
            name: "Apple".into(),
            symbol: "AAPL".into(),
            condition: Condition::Above { price: 1.0 },
            enabled: true,
        };

        assert_eq!(def.title(), "Stock Alert: AAPL");
        assert_eq!(def.body("Price $2.00 is above $1.00"), "Apple\nPrice $2.00 is above $1.00");
    }
}
