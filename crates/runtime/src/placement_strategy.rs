use std::{collections::BTreeMap, str::FromStr};

use crate::{
    error::{Error, Result},
    world::World,
};

/// Assigns the services of every application to data centers.
///
/// A strategy mutates the world in place and leaves it in an evaluatable state. Capacity is a
/// soft constraint of the placement primitives, so enforcing it is up to the strategy.
pub trait PlacementStrategy {
    fn name(&self) -> &str;

    fn place(&mut self, world: &mut World) -> Result<()>;
}

/// Named options of a strategy, written inline as `Name[key=value,...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyParameters {
    values: BTreeMap<String, String>,
}

impl StrategyParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|value| value.as_str())
    }

    /// Parses the value of `key`, or returns `default` when it is absent.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| Error::InvalidParameter {
                name: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|key| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Splits `Name[k1=v1,k2=v2]` into the name and its parameters.
pub fn read_name(name: &str) -> Result<(&str, StrategyParameters)> {
    let Some(open) = name.find('[') else {
        return Ok((name, StrategyParameters::new()));
    };
    let Some(body) = name[open + 1..].strip_suffix(']') else {
        return Err(Error::InvalidParameter {
            name: name.to_string(),
            value: "missing closing ']'".to_string(),
        });
    };

    let mut parameters = StrategyParameters::new();
    for pair in body.split(',').filter(|pair| !pair.trim().is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) => parameters.insert(key.trim(), value.trim()),
            None => {
                return Err(Error::InvalidParameter {
                    name: pair.to_string(),
                    value: String::new(),
                })
            }
        }
    }
    Ok((&name[..open], parameters))
}
