use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LexitrackError, Result};

/// Dyslexia severity. The only selector for which schedule and milestone
/// template applies to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Mild, Severity::Moderate, Severity::Severe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Deserialize an optional severity, mapping unknown values to `None`
/// so a profile with a bad severity still loads (it just has none selected).
pub fn lenient_severity<'de, D>(deserializer: D) -> std::result::Result<Option<Severity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => match s.parse() {
            Ok(sev) => Some(sev),
            Err(_) => {
                tracing::debug!(value = %s, "ignoring unknown severity");
                None
            }
        },
        _ => None,
    })
}

/// The authenticated user's profile. `email` is the identity used as the
/// key for every other persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub school_grade: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_severity",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<Severity>,
}

impl UserProfile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: String::new(),
            age: None,
            gender: None,
            school_grade: None,
            guardian_name: None,
            guardian_phone: None,
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Current value of a profile field by descriptor key, rendered as text.
    /// Returns `None` for unknown keys and for unset optional fields.
    pub fn field(&self, key: &str) -> Option<String> {
        match key {
            "email" => Some(self.email.clone()),
            "name" => (!self.name.is_empty()).then(|| self.name.clone()),
            "age" => self.age.map(|a| a.to_string()),
            "gender" => self.gender.clone(),
            "school_grade" => self.school_grade.clone(),
            "guardian_name" => self.guardian_name.clone(),
            "guardian_phone" => self.guardian_phone.clone(),
            "severity" => self.severity.map(|s| s.to_string()),
            _ => None,
        }
    }

    /// Set a field from user-entered text. An empty value clears optional
    /// fields. Non-editable fields (the identity) are rejected.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        let descriptor = field_descriptor(key)
            .ok_or_else(|| LexitrackError::InvalidInput(format!("unknown profile field: {key}")))?;
        if !descriptor.editable {
            return Err(LexitrackError::InvalidInput(format!(
                "{} cannot be changed",
                descriptor.label
            )));
        }

        let value = value.trim();
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        match key {
            "name" => self.name = value.to_string(),
            "age" => {
                self.age = if value.is_empty() {
                    None
                } else {
                    let age: u32 = value.parse().map_err(|_| {
                        LexitrackError::InvalidInput(format!("age must be a number, got '{value}'"))
                    })?;
                    if age > 130 {
                        return Err(LexitrackError::InvalidInput(format!(
                            "age {age} is out of range"
                        )));
                    }
                    Some(age)
                }
            }
            "gender" => self.gender = optional(value),
            "school_grade" => self.school_grade = optional(value),
            "guardian_name" => self.guardian_name = optional(value),
            "guardian_phone" => self.guardian_phone = optional(value),
            "severity" => {
                self.severity = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(LexitrackError::InvalidInput)?)
                }
            }
            _ => {
                return Err(LexitrackError::InvalidInput(format!(
                    "unknown profile field: {key}"
                )))
            }
        }
        Ok(())
    }
}

/// How a profile field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Choice(&'static [&'static str]),
}

/// One row in the profile editor table.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub editable: bool,
}

/// Every profile field in display order.
pub const PROFILE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        key: "email",
        label: "Email",
        kind: FieldKind::Text,
        editable: false,
    },
    FieldDescriptor {
        key: "name",
        label: "Name",
        kind: FieldKind::Text,
        editable: true,
    },
    FieldDescriptor {
        key: "age",
        label: "Age",
        kind: FieldKind::Number,
        editable: true,
    },
    FieldDescriptor {
        key: "gender",
        label: "Gender",
        kind: FieldKind::Text,
        editable: true,
    },
    FieldDescriptor {
        key: "school_grade",
        label: "School grade",
        kind: FieldKind::Text,
        editable: true,
    },
    FieldDescriptor {
        key: "guardian_name",
        label: "Guardian name",
        kind: FieldKind::Text,
        editable: true,
    },
    FieldDescriptor {
        key: "guardian_phone",
        label: "Guardian phone",
        kind: FieldKind::Text,
        editable: true,
    },
    FieldDescriptor {
        key: "severity",
        label: "Severity",
        kind: FieldKind::Choice(&["mild", "moderate", "severe"]),
        editable: true,
    },
];

pub fn field_descriptor(key: &str) -> Option<&'static FieldDescriptor> {
    PROFILE_FIELDS.iter().find(|d| d.key == key)
}
