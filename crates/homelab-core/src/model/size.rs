use crate::error::{CoreError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([MmGg])$").expect("valid size regex"));

static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$").expect("valid ipv4 regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Mega,
    Giga,
}

/// A memory or disk size written as `<integer><M|G>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub amount: u64,
    pub unit: SizeUnit,
    megabytes: u64,
}

impl Size {
    /// Parse a size string. `field` names the value in the error message.
    pub fn parse(field: &'static str, value: &str) -> Result<Self> {
        let invalid = || CoreError::Invalid {
            field,
            value: value.to_string(),
        };
        let caps = SIZE_PATTERN.captures(value).ok_or_else(invalid)?;
        let amount = caps[1].parse::<u64>().map_err(|_| invalid())?;
        let (unit, megabytes) = match &caps[2] {
            "G" | "g" => (SizeUnit::Giga, amount.checked_mul(1024).ok_or_else(invalid)?),
            _ => (SizeUnit::Mega, amount),
        };
        Ok(Self {
            amount,
            unit,
            megabytes,
        })
    }

    pub fn to_mb(self) -> u64 {
        self.megabytes
    }

    /// Whole gigabytes; megabyte amounts are truncated.
    pub fn to_gb(self) -> u64 {
        match self.unit {
            SizeUnit::Mega => self.amount / 1024,
            SizeUnit::Giga => self.amount,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            SizeUnit::Mega => "M",
            SizeUnit::Giga => "G",
        };
        write!(f, "{}{}", self.amount, unit)
    }
}

/// Dotted-quad syntax check. Octet ranges are not checked.
pub fn validate_ipv4_syntax(field: &'static str, value: &str) -> Result<()> {
    if IPV4_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(CoreError::Invalid {
            field,
            value: value.to_string(),
        })
    }
}
