//! Binary field storing its value inline or in a content-addressed store.
//!
//! Reads and writes always operate on a batch of record ids. In external
//! mode the row only keeps the content key; payloads live in a
//! [`BlobStore`] namespace named after the database or the field's prefix.

use std::collections::{BTreeMap, HashSet};

use common::storage::{BlobStore, ContentHash, Namespace, StorageError};
use tracing::{debug, instrument, warn};

use crate::config::BlobFieldConfig;
use crate::context::{FieldContext, ReadMode};
use crate::cursor::{ColumnValue, RecordCursor};
use crate::error::{FieldError, FieldResult};
use crate::model::{ID_COLUMN, ModelDescriptor, RecordId, validate_identifier};
use crate::value::{BlobValue, LoadedValues, RawValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// The value lives in the field's own column.
    Inline,
    /// The value lives in the blob store; `key_column` holds its key.
    External { key_column: String },
}

/// A registered binary field. Immutable once registered.
#[derive(Debug, Clone)]
pub struct BlobField {
    model: ModelDescriptor,
    name: String,
    mode: StorageMode,
    store_prefix: Option<Namespace>,
    filename: Option<String>,
    size_mode_key: String,
}

impl ReadMode {
    fn default_value(self) -> BlobValue {
        match self {
            ReadMode::Value => BlobValue::Null,
            ReadMode::Size => BlobValue::Size(0),
        }
    }

    fn convert(self, bytes: &[u8]) -> BlobValue {
        match self {
            ReadMode::Value => BlobValue::Bytes(bytes.to_vec()),
            ReadMode::Size => BlobValue::Size(bytes.len() as u64),
        }
    }
}

impl BlobField {
    /// Validate `config` against `model` and freeze it.
    pub fn register(model: &ModelDescriptor, config: BlobFieldConfig) -> FieldResult<Self> {
        validate_identifier("field", &config.name)?;
        if config.name == ID_COLUMN {
            return Err(FieldError::InvalidConfig(format!(
                "field cannot be named {ID_COLUMN:?}"
            )));
        }

        let mode = match config.external_key_column {
            Some(key_column) => {
                validate_identifier("key column", &key_column)?;
                if key_column == config.name || key_column == ID_COLUMN {
                    return Err(FieldError::InvalidConfig(format!(
                        "key column {key_column:?} of {}.{} must be a separate column",
                        model.name(),
                        config.name
                    )));
                }
                StorageMode::External { key_column }
            }
            None => StorageMode::Inline,
        };

        let store_prefix = config
            .store_prefix
            .map(Namespace::new)
            .transpose()
            .map_err(|e| FieldError::InvalidConfig(e.to_string()))?;

        if let Some(filename) = &config.filename {
            validate_identifier("filename column", filename)?;
        }

        Ok(Self {
            size_mode_key: format!("{}.{}", model.name(), config.name),
            model: model.clone(),
            name: config.name,
            mode,
            store_prefix,
            filename: config.filename,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn mode(&self) -> &StorageMode {
        &self.mode
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Columns that must be read together with this field.
    pub fn depends(&self) -> Vec<&str> {
        self.filename().into_iter().collect()
    }

    /// Context flag key selecting size mode, `"<model>.<field>"`.
    pub fn size_mode_key(&self) -> &str {
        &self.size_mode_key
    }

    fn namespace<'a>(&'a self, ctx: &'a FieldContext) -> &'a Namespace {
        self.store_prefix.as_ref().unwrap_or_else(|| ctx.namespace())
    }

    /// Materialize the field for `ids`.
    ///
    /// `loaded` carries rows the caller already read; it is the only source
    /// of inline values. The result holds exactly one entry per id in `ids`.
    #[instrument(
        skip_all,
        fields(model = %self.model.name(), field = %self.name, ids = ids.len())
    )]
    pub async fn get<C, S>(
        &self,
        cursor: &C,
        store: &S,
        ctx: &FieldContext,
        ids: &[RecordId],
        loaded: Option<&LoadedValues>,
    ) -> FieldResult<BTreeMap<RecordId, BlobValue>>
    where
        C: RecordCursor + ?Sized,
        S: BlobStore + ?Sized,
    {
        let mode = ctx.read_mode(&self.size_mode_key);
        let requested: HashSet<RecordId> = ids.iter().copied().collect();
        let mut result = BTreeMap::new();

        if let StorageMode::External { key_column } = &self.mode {
            let ns = self.namespace(ctx);
            for chunk in ids.chunks(cursor.in_max().max(1)) {
                let pointers = cursor
                    .select_pointers(self.model.table(), key_column, chunk)
                    .await?;
                debug!(chunk = chunk.len(), pointers = pointers.len(), "Resolving external keys");

                for (id, key) in pointers {
                    if !requested.contains(&id) {
                        return Err(FieldError::Integrity(format!(
                            "pointer lookup on {} returned unrequested id {id}",
                            self.model.table()
                        )));
                    }
                    match fetch(store, &key, ns, mode).await {
                        Ok(value) => {
                            result.insert(id, value);
                        }
                        Err(e) if e.is_missing() => {
                            warn!(record_id = id, %key, error = %e, "External blob unreadable, using default");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        if let Some(loaded) = loaded {
            for (id, row) in loaded {
                if result.contains_key(id) || !requested.contains(id) {
                    continue;
                }
                let value = row
                    .get(&self.name)
                    .and_then(RawValue::payload)
                    .map_or_else(|| mode.default_value(), |bytes| mode.convert(bytes));
                result.insert(*id, value);
            }
        }

        for id in ids {
            result.entry(*id).or_insert_with(|| mode.default_value());
        }
        Ok(result)
    }

    /// Read the field the way the persistence layer does: load inline
    /// columns first, then resolve.
    pub async fn read<C, S>(
        &self,
        cursor: &C,
        store: &S,
        ctx: &FieldContext,
        ids: &[RecordId],
    ) -> FieldResult<BTreeMap<RecordId, BlobValue>>
    where
        C: RecordCursor + ?Sized,
        S: BlobStore + ?Sized,
    {
        match self.mode {
            StorageMode::Inline => {
                let loaded = cursor
                    .load_values(self.model.table(), &[self.name.as_str()], ids)
                    .await?;
                self.get(cursor, store, ctx, ids, Some(&loaded)).await
            }
            StorageMode::External { .. } => self.get(cursor, store, ctx, ids, None).await,
        }
    }

    /// Apply each `(ids, value)` pair in order, one update per pair.
    ///
    /// Writes overwrite unconditionally. Blobs referenced before the write
    /// stay in the store. Pairs without ids are skipped. Runs inside the caller's transaction; nothing is
    /// rolled back here.
    #[instrument(
        skip_all,
        fields(model = %self.model.name(), field = %self.name, pairs = writes.len())
    )]
    pub async fn set<C, S>(
        &self,
        cursor: &C,
        store: &S,
        ctx: &FieldContext,
        writes: &[(&[RecordId], RawValue)],
    ) -> FieldResult<()>
    where
        C: RecordCursor + ?Sized,
        S: BlobStore + ?Sized,
    {
        for (ids, value) in writes {
            if ids.is_empty() {
                continue;
            }
            let assignments = match &self.mode {
                StorageMode::External { key_column } => {
                    let key = match value.payload() {
                        Some(bytes) => Some(store.put(bytes, self.namespace(ctx)).await?.to_hex()),
                        None => None,
                    };
                    vec![
                        (key_column.as_str(), ColumnValue::Text(key)),
                        (self.name.as_str(), ColumnValue::Bytes(None)),
                    ]
                }
                StorageMode::Inline => {
                    vec![(self.name.as_str(), ColumnValue::Bytes(value.sql_format()))]
                }
            };

            let updated = cursor
                .update_columns(self.model.table(), &assignments, ids)
                .await?;
            debug!(ids = ids.len(), updated, "Wrote binary field");
        }
        Ok(())
    }
}

async fn fetch<S>(
    store: &S,
    key: &str,
    ns: &Namespace,
    mode: ReadMode,
) -> Result<BlobValue, StorageError>
where
    S: BlobStore + ?Sized,
{
    let key = ContentHash::from_hex(key)?;
    Ok(match mode {
        ReadMode::Value => BlobValue::Bytes(store.get(&key, ns).await?),
        ReadMode::Size => BlobValue::Size(store.size(&key, ns).await?),
    })
}
