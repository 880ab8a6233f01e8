/// Makes a type implementing `Display` and `FromStr` serialize as its textual form.
#[macro_export]
macro_rules! impl_string_serde {
    ( $ty:ty ) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<$ty, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Splits a base58check payload into its version byte and 20-byte hash.
pub(crate) fn split_hash(payload: &[u8]) -> Option<(u8, [u8; 20])> {
    let (version, hash) = payload.split_first()?;
    let hash: [u8; 20] = hash.try_into().ok()?;
    Some((*version, hash))
}
