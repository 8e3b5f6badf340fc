use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The wire name and the stored name are the same upper-case literal.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Admin => "ADMIN",
    Staff => "STAFF",
});

str_enum!(Gender {
    Male => "MALE",
    Female => "FEMALE",
});

str_enum!(RegistrationStatus {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

str_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Refunded => "REFUNDED",
});

str_enum!(PaymentType {
    Registration => "REGISTRATION",
    Medicine => "MEDICINE",
    Examination => "EXAMINATION",
    Treatment => "TREATMENT",
});

str_enum!(FeedbackStatus {
    Pending => "PENDING",
    Processed => "PROCESSED",
    Closed => "CLOSED",
});

impl FeedbackStatus {
    /// Status names from query strings are accepted in any case.
    pub fn parse_loose(s: &str) -> Result<Self, DatabaseError> {
        s.trim().to_ascii_uppercase().parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn registration_status_round_trips_through_str() {
        for status in RegistrationStatus::ALL {
            assert_eq!(RegistrationStatus::from_str(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = PaymentStatus::from_str("paid").unwrap_err();
        match err {
            DatabaseError::InvalidEnum { field, value } => {
                assert_eq!(field, "PaymentStatus");
                assert_eq!(value, "paid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serde_uses_upper_case_names() {
        let json = serde_json::to_string(&RegistrationStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let parsed: PaymentType = serde_json::from_str("\"EXAMINATION\"").unwrap();
        assert_eq!(parsed, PaymentType::Examination);
    }

    #[test]
    fn feedback_status_parse_is_case_insensitive() {
        assert_eq!(FeedbackStatus::parse_loose("processed").unwrap(), FeedbackStatus::Processed);
        assert_eq!(FeedbackStatus::parse_loose(" Closed ").unwrap(), FeedbackStatus::Closed);
        assert!(FeedbackStatus::parse_loose("done").is_err());
    }
}
