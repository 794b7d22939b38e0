use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a path segment or config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// Store-generated row ids. Zero is never handed out by SQLite, so parsing
// rejects it along with anything non-numeric.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().parse::<u64>() {
                    Ok(0) | Err(_) => Err(ParseIdError {
                        kind: stringify!($name),
                    }),
                    Ok(v) => Ok(Self(v)),
                }
            }
        }
    };
}

row_id!(
    /// Unique identifier for a registered user.
    UserId
);
row_id!(
    /// Unique identifier for a learning resource.
    ResourceId
);
row_id!(
    /// Unique identifier for a pathway.
    PathwayId
);
row_id!(
    /// Unique identifier for a progress ledger row.
    ProgressId
);
row_id!(
    /// Unique identifier for a contact-form submission.
    QueryId
);
row_id!(EventId);
row_id!(BlogId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_number() {
        assert_eq!(PathwayId::new(42).to_string(), "42");
        assert_eq!(format!("{:?}", ResourceId::new(7)), "ResourceId(7)");
    }

    #[test]
    fn parses_positive_ids() {
        let id: UserId = "123".parse().unwrap();
        assert_eq!(id, UserId::new(123));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!("0".parse::<ResourceId>().is_err());
        assert!("abc".parse::<ResourceId>().is_err());
        assert!("-4".parse::<PathwayId>().is_err());
        let err = "x".parse::<BlogId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse BlogId from string");
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&ProgressId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: ProgressId = serde_json::from_str("9").unwrap();
        assert_eq!(back, ProgressId::new(9));
    }
}
