use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use oap_common::AssetId;

use crate::http::DefinitionFetcher;
use crate::kv::{FileStore, KvStore, MemoryStore};
use crate::pointer::{AssetDefinitionPointer, PointerKind};
use crate::{AssetDefinition, Error, Result};

const POINTER_PREFIX: u8 = b'p';
const ASSET_ID_PREFIX: u8 = b'a';

/// Content-addressed store of asset definitions.
///
/// Two maps share the underlying [`KvStore`]: pointer to definition text and asset id to
/// pointer.
pub struct Registry {
    store: Box<dyn KvStore + Send>,
}

impl Registry {
    pub fn new<S: KvStore + Send + 'static>(store: S) -> Self {
        Registry {
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// A registry persisted in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(FileStore::open(dir)?))
    }

    /// Stores the definition of `asset_id` under its content hash.
    ///
    /// Fails with [`Error::DefinitionExists`] without writing anything if a definition with
    /// the same hash is already stored.
    pub fn create_asset_definition(&mut self, asset_id: &AssetId, json: &str) -> Result<AssetDefinition> {
        let definition = AssetDefinition::from_asset_id(asset_id, json)?;
        let pointer = definition.pointer();
        let pointer_key = pointer_key(&pointer);
        if self.store.contains(&pointer_key)? {
            return Err(Error::DefinitionExists(pointer.to_string()));
        }
        // the pointer text goes last, its presence is what marks the definition as created
        self.store.put_batch(&[
            (asset_id_key(asset_id), pointer.to_bytes()),
            (pointer_key, definition.to_canonical_string().into_bytes()),
        ])?;
        info!("created definition {} for {}", pointer, asset_id);
        Ok(definition)
    }

    /// Looks up a definition by asset id, or by the hex form of a pointer.
    pub fn get_asset_definition(&self, hash_or_asset_id: &str) -> Result<AssetDefinition> {
        let pointer = match AssetId::from_str(hash_or_asset_id) {
            Ok(asset_id) => self
                .get_pointer(&asset_id)?
                .ok_or_else(|| Error::NotFound(hash_or_asset_id.to_string()))?,
            Err(_) => AssetDefinitionPointer::from_str(hash_or_asset_id)?,
        };
        self.get_by_pointer(&pointer)?.ok_or_else(|| Error::NotFound(hash_or_asset_id.to_string()))
    }

    pub fn get_pointer(&self, asset_id: &AssetId) -> Result<Option<AssetDefinitionPointer>> {
        match self.store.get(&asset_id_key(asset_id))? {
            Some(bytes) => Ok(Some(AssetDefinitionPointer::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_pointer(&self, pointer: &AssetDefinitionPointer) -> Result<Option<AssetDefinition>> {
        match self.store.get(&pointer_key(pointer))? {
            Some(text) => {
                let text = String::from_utf8(text)
                    .map_err(|_| Error::Definition(format!("stored definition {} is not utf-8", pointer)))?;
                Ok(Some(AssetDefinition::from_json(&text)?))
            }
            None => Ok(None),
        }
    }

    /// Caches a definition retrieved from the url of `pointer`.
    ///
    /// Asset ids of the definition that don't have a pointer yet are mapped to `pointer`.
    pub fn put_url_definition(
        &mut self,
        pointer: &AssetDefinitionPointer,
        text: &str,
    ) -> Result<AssetDefinition> {
        if pointer.kind() != PointerKind::Url {
            return Err(Error::Pointer(format!("{} is not a url pointer", pointer)));
        }
        let definition = AssetDefinition::from_json(text)?;
        let mut entries = Vec::new();
        for asset_id in definition.asset_ids() {
            let key = asset_id_key(asset_id);
            if !self.store.contains(&key)? {
                entries.push((key, pointer.to_bytes()));
            }
        }
        entries.push((pointer_key(pointer), text.as_bytes().to_vec()));
        self.store.put_batch(&entries)?;
        debug!("cached definition {} with {} entries", pointer, entries.len());
        Ok(definition)
    }

    /// The definition `pointer` refers to, retrieving url pointers missing from the store
    /// with `fetcher` when given.
    pub fn resolve_pointer(
        &mut self,
        pointer: &AssetDefinitionPointer,
        fetcher: Option<&dyn DefinitionFetcher>,
    ) -> Result<AssetDefinition> {
        if let Some(definition) = self.get_by_pointer(pointer)? {
            return Ok(definition);
        }
        match (pointer.url(), fetcher) {
            (Some(url), Some(fetcher)) => {
                let text = fetcher.fetch(&url)?;
                self.put_url_definition(pointer, &text)
            }
            _ => Err(Error::NotFound(pointer.to_string())),
        }
    }
}

fn pointer_key(pointer: &AssetDefinitionPointer) -> Vec<u8> {
    let mut key = vec![POINTER_PREFIX];
    key.extend(pointer.to_bytes());
    key
}

fn asset_id_key(asset_id: &AssetId) -> Vec<u8> {
    let mut key = vec![ASSET_ID_PREFIX];
    key.extend(asset_id.to_string().into_bytes());
    key
}
