use thiserror::Error;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcDateTime, UtcOffset};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn as_std(&self) -> std::time::Duration {
        self.0.unsigned_abs()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Conversions between [`UtcDateTime`] and the offset-less `TIMESTAMP` values
/// stored in the database.
#[must_use]
pub fn to_primitive(value: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(value.date(), value.time())
}

#[must_use]
pub fn from_primitive(value: PrimitiveDateTime) -> UtcDateTime {
    value.as_utc()
}

/// `serde(with)` support for [`UtcDateTime`] as RFC 3339 strings.
pub mod rfc3339_utc {
    use super::to_primitive;
    use serde::{Deserializer, Serializer};
    use time::UtcDateTime;

    pub fn serialize<S: Serializer>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(&to_primitive(*value).assume_utc(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UtcDateTime, D::Error> {
        time::serde::rfc3339::deserialize(deserializer).map(super::normalize)
    }

    pub mod option {
        use serde::{Deserializer, Serializer};
        use time::UtcDateTime;

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<UtcDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let value = value.map(|value| super::to_primitive(value).assume_utc());
            time::serde::rfc3339::option::serialize(&value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<UtcDateTime>, D::Error> {
            time::serde::rfc3339::option::deserialize(deserializer)
                .map(|value| value.map(super::super::normalize))
        }
    }
}

fn normalize(value: OffsetDateTime) -> UtcDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    from_primitive(PrimitiveDateTime::new(utc.date(), utc.time()))
}
