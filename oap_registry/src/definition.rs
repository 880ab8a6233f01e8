use std::fs;
use std::path::Path;
use std::str::FromStr;

use oap_common::bitcoin::hashes::{hash160, Hash};
use oap_common::AssetId;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::pointer::AssetDefinitionPointer;
use crate::{Error, Result};

const ASSET_IDS: &str = "asset_ids";
const NAME: &str = "name";
const NAME_SHORT: &str = "name_short";

/// A validated asset definition document.
///
/// Fields other than `asset_ids`, `name` and `name_short` are kept untouched. The canonical
/// form is the compact JSON serialization with keys in lexicographic order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDefinition {
    fields: Map<String, Value>,
    asset_ids: Vec<AssetId>,
}

impl AssetDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(parse_object(json)?)
    }

    /// Like [`AssetDefinition::from_json`], but `asset_id` must be one of the defined ids.
    /// A document without `asset_ids` gets `[asset_id]`.
    pub fn from_asset_id(asset_id: &AssetId, json: &str) -> Result<Self> {
        let mut fields = parse_object(json)?;
        if !fields.contains_key(ASSET_IDS) {
            fields.insert(ASSET_IDS.into(), Value::Array(vec![Value::String(asset_id.to_string())]));
        }
        let definition = Self::from_value(fields)?;
        if !definition.asset_ids.contains(asset_id) {
            return Err(Error::Definition(format!("{} is not in {}", asset_id, ASSET_IDS)));
        }
        Ok(definition)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn from_value(fields: Map<String, Value>) -> Result<Self> {
        let ids = match fields.get(ASSET_IDS) {
            Some(Value::Array(ids)) if !ids.is_empty() => ids,
            Some(Value::Array(_)) => return Err(Error::Definition(format!("empty {}", ASSET_IDS))),
            Some(_) => return Err(Error::Definition(format!("{} is not an array", ASSET_IDS))),
            None => return Err(Error::Definition(format!("missing {}", ASSET_IDS))),
        };
        let asset_ids = ids
            .iter()
            .map(|id| {
                id.as_str()
                    .and_then(|s| AssetId::from_str(s).ok())
                    .ok_or_else(|| Error::Definition(format!("invalid asset id {}", id)))
            })
            .collect::<Result<Vec<_>>>()?;

        for field in [NAME, NAME_SHORT] {
            match fields.get(field) {
                Some(Value::String(s)) if !s.is_empty() => (),
                Some(Value::String(_)) => return Err(Error::Definition(format!("empty {}", field))),
                Some(_) => return Err(Error::Definition(format!("{} is not a string", field))),
                None => return Err(Error::Definition(format!("missing {}", field))),
            }
        }

        Ok(AssetDefinition {
            fields,
            asset_ids,
        })
    }

    pub fn asset_ids(&self) -> &[AssetId] {
        &self.asset_ids
    }

    pub fn name(&self) -> &str {
        self.get(NAME).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn name_short(&self) -> &str {
        self.get(NAME_SHORT).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn to_canonical_string(&self) -> String {
        // a map of json values always serializes
        serde_json::to_string(&self.fields).unwrap_or_default()
    }

    pub fn hash(&self) -> [u8; 20] {
        hash160::Hash::hash(self.to_canonical_string().as_bytes()).to_byte_array()
    }

    /// The content-hash pointer this definition is stored under.
    pub fn pointer(&self) -> AssetDefinitionPointer {
        AssetDefinitionPointer::from_hash(self.hash())
    }
}

impl FromStr for AssetDefinition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AssetDefinition::from_json(s)
    }
}

impl Serialize for AssetDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssetDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        AssetDefinition::from_value(fields).map_err(de::Error::custom)
    }
}

fn parse_object(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(json) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(Error::Definition("not a json object".into())),
        Err(e) => Err(Error::Definition(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerKind;
    use oap_common::bitcoin::hex::DisplayHex;
    use std::io::Write;

    const ASSET_ID: &str = "ALn3aK1fSuG27N96UGYB1kUYUpGKRhBuBC";

    fn document() -> String {
        format!(
            r#"{{"name_short":"HAWSCoin","name":"Hawaiian shirt coin","asset_ids":["{}"],"issuer":"Tropical Inc.","divisibility":1}}"#,
            ASSET_ID
        )
    }

    #[test]
    fn accepts_well_formed() {
        let definition = AssetDefinition::from_json(&document()).unwrap();
        assert_eq!(definition.name(), "Hawaiian shirt coin");
        assert_eq!(definition.name_short(), "HAWSCoin");
        assert_eq!(definition.asset_ids(), &[AssetId::from_str(ASSET_ID).unwrap()]);
        assert_eq!(definition.get("issuer"), Some(&Value::String("Tropical Inc.".into())));
        assert_eq!(definition.get("divisibility"), Some(&Value::from(1)));
    }

    #[test]
    fn canonical_form() {
        let definition = AssetDefinition::from_json(&document()).unwrap();
        let canonical = definition.to_canonical_string();
        assert_eq!(
            canonical,
            format!(
                r#"{{"asset_ids":["{}"],"divisibility":1,"issuer":"Tropical Inc.","name":"Hawaiian shirt coin","name_short":"HAWSCoin"}}"#,
                ASSET_ID
            )
        );
        assert_eq!(definition.to_json().to_string(), canonical);

        let reparsed = AssetDefinition::from_json(&canonical).unwrap();
        assert_eq!(reparsed, definition);
        assert_eq!(reparsed.hash(), definition.hash());
        assert_eq!(
            definition.hash().to_lower_hex_string(),
            hash160::Hash::hash(canonical.as_bytes()).to_byte_array().to_lower_hex_string()
        );
    }

    #[test]
    fn whitespace_does_not_change_hash() {
        let compact = AssetDefinition::from_json(&document()).unwrap();
        let pretty = serde_json::to_string_pretty(&compact.to_json()).unwrap();
        assert_eq!(AssetDefinition::from_json(&pretty).unwrap().hash(), compact.hash());
    }

    #[test]
    fn rejects_invalid() {
        let cases = [
            "[]".to_string(),
            "not json".to_string(),
            r#"{"name":"a","name_short":"b"}"#.to_string(),
            r#"{"asset_ids":[],"name":"a","name_short":"b"}"#.to_string(),
            r#"{"asset_ids":"x","name":"a","name_short":"b"}"#.to_string(),
            r#"{"asset_ids":["garbage"],"name":"a","name_short":"b"}"#.to_string(),
            r#"{"asset_ids":[1],"name":"a","name_short":"b"}"#.to_string(),
            format!(r#"{{"asset_ids":["{}"],"name_short":"b"}}"#, ASSET_ID),
            format!(r#"{{"asset_ids":["{}"],"name":"a"}}"#, ASSET_ID),
            format!(r#"{{"asset_ids":["{}"],"name":"","name_short":"b"}}"#, ASSET_ID),
            format!(r#"{{"asset_ids":["{}"],"name":"a","name_short":""}}"#, ASSET_ID),
            format!(r#"{{"asset_ids":["{}"],"name":1,"name_short":"b"}}"#, ASSET_ID),
            // chain address, not an asset id
            r#"{"asset_ids":["16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM"],"name":"a","name_short":"b"}"#
                .to_string(),
        ];
        for json in cases.iter() {
            let res = AssetDefinition::from_json(json);
            assert!(matches!(res, Err(Error::Definition(_))), "accepted {}", json);
        }
    }

    #[test]
    fn with_asset_id() {
        let asset_id = AssetId::from_str(ASSET_ID).unwrap();
        let definition =
            AssetDefinition::from_asset_id(&asset_id, r#"{"name":"a","name_short":"b"}"#).unwrap();
        assert_eq!(definition.asset_ids(), &[asset_id]);

        assert!(AssetDefinition::from_asset_id(&asset_id, &document()).is_ok());

        let other = AssetId::new(0x17, [9u8; 20]).unwrap();
        let res = AssetDefinition::from_asset_id(&other, &document());
        assert!(matches!(res, Err(Error::Definition(_))));
    }

    #[test]
    fn pointer_is_content_hash() {
        let definition = AssetDefinition::from_json(&document()).unwrap();
        let pointer = definition.pointer();
        assert_eq!(pointer.kind(), PointerKind::Hash);
        assert_eq!(pointer.value(), &definition.hash()[..]);
    }

    #[test]
    fn serde_validates() {
        let definition = AssetDefinition::from_json(&document()).unwrap();
        let json = serde_json::to_string(&definition).unwrap();
        assert_eq!(json, definition.to_canonical_string());
        assert_eq!(serde_json::from_str::<AssetDefinition>(&json).unwrap(), definition);
        assert!(serde_json::from_str::<AssetDefinition>(r#"{"name":"a"}"#).is_err());
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(document().as_bytes()).unwrap();
        let definition = AssetDefinition::from_file(file.path()).unwrap();
        assert_eq!(definition.name_short(), "HAWSCoin");

        let res = AssetDefinition::from_file(file.path().with_extension("missing"));
        assert!(matches!(res, Err(Error::Io(_))));
    }
}
