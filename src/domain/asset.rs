use std::str::FromStr;

use serde::Serialize;

use crate::domain::Error;

/// Kinds of balance tracked independently on every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Score,
    Amount,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 2] = [AssetCategory::Score, AssetCategory::Amount];

    pub fn code(&self) -> u8 {
        match self {
            AssetCategory::Score => 0,
            AssetCategory::Amount => 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, Error> {
        match code {
            0 => Ok(AssetCategory::Score),
            1 => Ok(AssetCategory::Amount),
            other => Err(Error::Validation(format!("unknown asset category: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Score => "score",
            AssetCategory::Amount => "amount",
        }
    }
}

impl FromStr for AssetCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(AssetCategory::Score),
            "amount" => Ok(AssetCategory::Amount),
            other => match other.parse::<u8>() {
                Ok(code) => AssetCategory::from_code(code),
                Err(_) => Err(Error::Validation(format!("unknown asset category: {}", other))),
            },
        }
    }
}

impl core::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-balance of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    Available,
    Frozen,
}

impl Pool {
    pub fn other(&self) -> Pool {
        match self {
            Pool::Available => Pool::Frozen,
            Pool::Frozen => Pool::Available,
        }
    }
}

impl FromStr for Pool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" | "usable" | "1" => Ok(Pool::Available),
            "frozen" | "freeze" | "0" => Ok(Pool::Frozen),
            other => Err(Error::Validation(format!("unknown balance pool: {}", other))),
        }
    }
}

impl core::fmt::Display for Pool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Pool::Available => f.write_str("available"),
            Pool::Frozen => f.write_str("frozen"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    ToFrozen,
    ToAvailable,
}

impl ShiftDirection {
    pub fn source(&self) -> Pool {
        match self {
            ShiftDirection::ToFrozen => Pool::Available,
            ShiftDirection::ToAvailable => Pool::Frozen,
        }
    }

    pub fn destination(&self) -> Pool {
        self.source().other()
    }

    /// Direction that ends in `pool`.
    pub fn into_pool(pool: Pool) -> Self {
        match pool {
            Pool::Frozen => ShiftDirection::ToFrozen,
            Pool::Available => ShiftDirection::ToAvailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_accepts_names_and_codes() {
        assert_eq!("score".parse::<AssetCategory>().unwrap(), AssetCategory::Score);
        assert_eq!(" Amount ".parse::<AssetCategory>().unwrap(), AssetCategory::Amount);
        assert_eq!("1".parse::<AssetCategory>().unwrap(), AssetCategory::Amount);
        assert!(matches!(
            "gold".parse::<AssetCategory>(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(AssetCategory::from_code(2), Err(Error::Validation(_))));
    }

    #[test]
    fn shift_direction_pools() {
        assert_eq!(ShiftDirection::ToFrozen.source(), Pool::Available);
        assert_eq!(ShiftDirection::ToFrozen.destination(), Pool::Frozen);
        assert_eq!(ShiftDirection::into_pool(Pool::Available), ShiftDirection::ToAvailable);
    }
}
