#![forbid(unsafe_code)]

use std::fmt;

/// Stable external identifier of an archival object (for example `2142/1093`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, HandleError> {
        let value = value.into();
        let trimmed = value.trim();
        validate_handle(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandleError {
    Empty,
    TooLong,
    ContainsWhitespace,
    ContainsControl,
}

impl HandleError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "handle must not be empty",
            Self::TooLong => "handle is too long",
            Self::ContainsWhitespace => "handle must not contain whitespace",
            Self::ContainsControl => "handle contains control characters",
        }
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for HandleError {}

fn validate_handle(value: &str) -> Result<(), HandleError> {
    if value.is_empty() {
        return Err(HandleError::Empty);
    }
    if value.len() > 256 {
        return Err(HandleError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(HandleError::ContainsControl);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(HandleError::ContainsWhitespace);
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NumericIdError {
    Empty,
    NotANumber,
    NotPositive,
}

impl NumericIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "id must not be empty",
            Self::NotANumber => "id must be a decimal integer",
            Self::NotPositive => "id must be positive",
        }
    }
}

impl fmt::Display for NumericIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for NumericIdError {}

fn parse_positive(value: &str) -> Result<i64, NumericIdError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NumericIdError::Empty);
    }
    let parsed = value
        .parse::<i64>()
        .map_err(|_| NumericIdError::NotANumber)?;
    if parsed <= 0 {
        return Err(NumericIdError::NotPositive);
    }
    Ok(parsed)
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            pub fn parse(value: &str) -> Result<Self, NumericIdError> {
                parse_positive(value).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Internal id of an item.
    ItemId
);
numeric_id!(
    /// Internal id of a collection.
    CollectionId
);
numeric_id!(MetadataValueId);
numeric_id!(
    /// Registry id of a metadata field (schema.element.qualifier).
    FieldId
);
numeric_id!(ActorId);
