mod config;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use common::storage::{FilesystemBlobStore, Namespace};
use field::database::init_db;
use field::{
    BlobField, BlobFieldConfig, BlobValue, FieldContext, ModelDescriptor, RawValue, RecordId,
    SqlCursor,
};
use sea_orm::TransactionTrait;
use serde_json::{Value, json};
use tracing::info;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "blobctl", about = "Read and write binary fields")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print field values as hex, `null` when unset
    Get {
        #[command(flatten)]
        field: FieldArgs,
        /// Record ids
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },
    /// Print the byte length of field values
    Size {
        #[command(flatten)]
        field: FieldArgs,
        /// Record ids
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },
    /// Write one value to every given record
    Set {
        #[command(flatten)]
        field: FieldArgs,
        /// File whose content becomes the new value
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        file: Option<PathBuf>,
        /// Clear the value instead
        #[arg(long)]
        clear: bool,
        /// Record ids
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },
}

#[derive(Args)]
struct FieldArgs {
    /// Model name, e.g. "ir.attachment"
    #[arg(long)]
    model: String,
    /// Table name when it differs from the model name
    #[arg(long)]
    table: Option<String>,
    /// Field (inline column) name
    #[arg(long)]
    field: String,
    /// Column holding the content key; stores values externally when set
    #[arg(long)]
    key_column: Option<String>,
    /// Store namespace overriding the database namespace
    #[arg(long)]
    prefix: Option<String>,
    /// Database namespace. Default: `storage.namespace` from config
    #[arg(long, env = "BLOBFIELD_NAMESPACE")]
    namespace: Option<String>,
}

impl FieldArgs {
    fn register(&self) -> anyhow::Result<BlobField> {
        let model = match &self.table {
            Some(table) => ModelDescriptor::with_table(&self.model, table)?,
            None => ModelDescriptor::new(&self.model)?,
        };
        let mut config = match &self.key_column {
            Some(key_column) => BlobFieldConfig::external(&self.field, key_column),
            None => BlobFieldConfig::inline(&self.field),
        };
        if let Some(prefix) = &self.prefix {
            config = config.with_store_prefix(prefix);
        }
        Ok(BlobField::register(&model, config)?)
    }

    fn context(&self, config: &AppConfig) -> anyhow::Result<FieldContext> {
        let name = self.namespace.as_deref().unwrap_or(&config.storage.namespace);
        let namespace = Namespace::new(name).context("Invalid namespace")?;
        Ok(FieldContext::new(namespace))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store = config
        .storage
        .open()
        .await
        .context("Failed to open blob store")?;
    info!(path = %store.base_path().display(), "Blob store ready");

    let output = match cli.command {
        Command::Get { field, ids } => read(&db, &store, &config, &field, &ids, false).await?,
        Command::Size { field, ids } => read(&db, &store, &config, &field, &ids, true).await?,
        Command::Set {
            field: args,
            file,
            clear,
            ids,
        } => {
            let value = match file {
                Some(path) if !clear => tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?
                    .into(),
                _ => RawValue::Null,
            };
            let field = args.register()?;
            let ctx = args.context(&config)?;

            let txn = db.begin().await.context("Failed to begin transaction")?;
            let cursor = SqlCursor::with_in_max(&txn, config.database.in_max);
            field
                .set(&cursor, &store, &ctx, &[(ids.as_slice(), value)])
                .await
                .context("Failed to write field")?;
            txn.commit().await.context("Failed to commit")?;

            info!(records = ids.len(), "Field written");
            json!({ "updated": ids })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn read(
    db: &sea_orm::DatabaseConnection,
    store: &FilesystemBlobStore,
    config: &AppConfig,
    args: &FieldArgs,
    ids: &[RecordId],
    size: bool,
) -> anyhow::Result<Value> {
    let field = args.register()?;
    let mut ctx = args.context(config)?;
    if size {
        ctx = ctx.with_size_mode(field.model().name(), field.name());
    }

    let txn = db.begin().await.context("Failed to begin transaction")?;
    let cursor = SqlCursor::with_in_max(&txn, config.database.in_max);
    let values = field
        .read(&cursor, store, &ctx, ids)
        .await
        .context("Failed to read field")?;
    txn.commit().await.context("Failed to commit")?;

    Ok(render(values))
}

fn render(values: BTreeMap<RecordId, BlobValue>) -> Value {
    let entries = values.into_iter().map(|(id, value)| {
        let value = match value {
            BlobValue::Null => Value::Null,
            BlobValue::Bytes(bytes) => Value::String(hex::encode(bytes)),
            BlobValue::Size(size) => json!(size),
        };
        (id.to_string(), value)
    });
    Value::Object(entries.collect())
}
