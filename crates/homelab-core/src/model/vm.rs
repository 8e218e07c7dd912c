use super::params::ArchetypeParams;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A declared VM instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vm {
    pub id: String,
    pub name: String,
    pub provider: VmProvider,
    pub image: VmImage,
    pub archetype: String,
    pub params: ArchetypeParams,
    pub start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VmProvider {
    pub name: String,
    /// Provider-specific extras such as the target `node`
    #[serde(default)]
    pub args: BTreeMap<String, serde_yaml::Value>,
}

impl VmProvider {
    /// String view of a scalar argument.
    pub fn arg_str(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VmImage {
    pub name: String,
    /// Datastore receiving the upload
    #[serde(default)]
    pub store: Option<String>,
}

/// Accepts `id: 101` as well as `id: "101"`.
pub fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Str(s) => s,
        Scalar::Int(i) => i.to_string(),
    })
}
