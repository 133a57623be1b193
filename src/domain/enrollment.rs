use {
    super::error::SettlementError,
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Enrolled,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Enrolled => "ENROLLED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for EnrollmentStatus {
    type Error = SettlementError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ENROLLED" => Ok(Self::Enrolled),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(SettlementError::Validation(format!(
                "unknown enrollment status: {other}"
            ))),
        }
    }
}

/// Durable enrollment row. The PENDING → ENROLLED transition happens only via
/// a conditional update (`WHERE status = 'PENDING'`); racing callers lose
/// harmlessly.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub source: String,
}
