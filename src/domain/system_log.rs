use {
    super::error::EngineError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[display("debug")]
    Debug,
    #[display("info")]
    Info,
    #[display("success")]
    Success,
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl TryFrom<&str> for LogLevel {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, EngineError> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(EngineError::Validation(format!("unknown log level: {other}"))),
        }
    }
}

/// Client-side diagnostic entry. Append-only, unrelated to payments.
#[derive(Debug, Clone)]
pub struct NewSystemLog {
    pub id: Uuid,
    pub level: LogLevel,
    pub category: Option<String>,
    pub description: String,
}

impl NewSystemLog {
    pub fn new(
        level: LogLevel,
        category: Option<String>,
        description: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(EngineError::Validation("description must not be empty".into()));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            level,
            category: category.filter(|c| !c.trim().is_empty()),
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse() {
        assert_eq!(LogLevel::try_from("warning").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::Success.to_string(), "success");
        assert!(LogLevel::try_from("fatal").is_err());
    }

    #[test]
    fn blank_description_rejected() {
        assert!(NewSystemLog::new(LogLevel::Info, None, "   ").is_err());
        let entry = NewSystemLog::new(LogLevel::Info, Some(" ".into()), "boot").unwrap();
        assert_eq!(entry.category, None);
    }
}
