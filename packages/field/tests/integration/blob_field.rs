use common::storage::{BlobStore, ContentHash, Namespace, StorageError};
use field::{
    BlobField, BlobFieldConfig, BlobValue, FieldError, RawValue, RecordCursor, RecordId, SqlCursor,
};
use sea_orm::TransactionTrait;

use crate::support::{TestEnv, exec};

fn bytes(value: &[u8]) -> BlobValue {
    BlobValue::Bytes(value.to_vec())
}

/// Content of the pointer column, `None` when unset.
async fn pointer(env: &TestEnv, id: RecordId) -> Option<String> {
    let cursor = SqlCursor::new(&env.db);
    let mut rows = cursor
        .load_values("ir_attachment", &["file_id"], &[id])
        .await
        .unwrap();
    let raw = rows.remove(&id).unwrap().remove("file_id").unwrap();
    raw.payload()
        .map(|bytes| String::from_utf8(bytes.to_vec()).unwrap())
}

mod round_trip {
    use super::*;

    #[tokio::test]
    async fn inline_value_is_stored_in_the_row() {
        let env = TestEnv::with_rows(2).await;
        let field = env.inline_field();

        let txn = env.db.begin().await.unwrap();
        let cursor = SqlCursor::new(&txn);
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"inline bytes".to_vec()))])
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let cursor = SqlCursor::new(&env.db);
        let values = field.read(&cursor, &env.store, &env.ctx(), &[1, 2]).await.unwrap();
        assert_eq!(values[&1], bytes(b"inline bytes"));
        assert_eq!(values[&2], BlobValue::Null);
    }

    #[tokio::test]
    async fn text_written_inline_reads_back_as_bytes() {
        let env = TestEnv::with_rows(1).await;
        let field = env.inline_field();
        let cursor = SqlCursor::new(&env.db);

        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::Text("naïve".into()))])
            .await
            .unwrap();

        let values = field.read(&cursor, &env.store, &env.ctx(), &[1]).await.unwrap();
        assert_eq!(values[&1], bytes("naïve".as_bytes()));
    }

    #[tokio::test]
    async fn external_value_lands_in_store_namespace() {
        let env = TestEnv::with_rows(1).await;
        let field = env.external_field();

        let txn = env.db.begin().await.unwrap();
        let cursor = SqlCursor::new(&txn);
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"external bytes".to_vec()))])
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let key = ContentHash::compute(b"external bytes");
        assert_eq!(pointer(&env, 1).await, Some(key.to_hex()));
        assert!(env.store.exists(&key, &env.namespace()).await.unwrap());

        let cursor = SqlCursor::new(&env.db);
        let inline = cursor
            .load_values("ir_attachment", &["data"], &[1])
            .await
            .unwrap();
        assert_eq!(inline[&1]["data"], RawValue::Null);

        let values = field.read(&cursor, &env.store, &env.ctx(), &[1]).await.unwrap();
        assert_eq!(values[&1], bytes(b"external bytes"));
    }
}

mod clearing_and_overwrite {
    use super::*;

    #[tokio::test]
    async fn empty_value_nulls_the_pointer() {
        let env = TestEnv::with_rows(1).await;
        let field = env.external_field();
        let cursor = SqlCursor::new(&env.db);

        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"to clear".to_vec()))])
            .await
            .unwrap();
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::Null)])
            .await
            .unwrap();

        assert_eq!(pointer(&env, 1).await, None);
        let values = field.get(&cursor, &env.store, &env.ctx(), &[1], None).await.unwrap();
        assert_eq!(values[&1], BlobValue::Null);
    }

    #[tokio::test]
    async fn overwrite_keeps_old_object_unreferenced() {
        let env = TestEnv::with_rows(1).await;
        let field = env.external_field();
        let cursor = SqlCursor::new(&env.db);

        for payload in [&b"version one"[..], &b"version two"[..]] {
            field
                .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(payload))])
                .await
                .unwrap();
        }

        let values = field.get(&cursor, &env.store, &env.ctx(), &[1], None).await.unwrap();
        assert_eq!(values[&1], bytes(b"version two"));

        let old = ContentHash::compute(b"version one");
        assert!(env.store.exists(&old, &env.namespace()).await.unwrap());
        let new = ContentHash::compute(b"version two");
        assert_eq!(pointer(&env, 1).await, Some(new.to_hex()));
    }

    #[tokio::test]
    async fn rollback_discards_pointer_but_not_object() {
        let env = TestEnv::with_rows(1).await;
        let field = env.external_field();

        let txn = env.db.begin().await.unwrap();
        let cursor = SqlCursor::new(&txn);
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"aborted".to_vec()))])
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        assert_eq!(pointer(&env, 1).await, None);
        let key = ContentHash::compute(b"aborted");
        assert!(env.store.exists(&key, &env.namespace()).await.unwrap());
    }
}

mod reads {
    use super::*;

    #[tokio::test]
    async fn deleted_object_reads_as_default() {
        let env = TestEnv::with_rows(1).await;
        let field = env.external_field();
        let cursor = SqlCursor::new(&env.db);
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"short lived".to_vec()))])
            .await
            .unwrap();

        let key = ContentHash::compute(b"short lived");
        assert!(env.store.delete(&key, &env.namespace()).await.unwrap());

        let values = field.get(&cursor, &env.store, &env.ctx(), &[1], None).await.unwrap();
        assert_eq!(values[&1], BlobValue::Null);
    }

    #[tokio::test]
    async fn size_mode_returns_byte_length() {
        let env = TestEnv::with_rows(2).await;
        let field = env.external_field();
        let cursor = SqlCursor::new(&env.db);
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"abcde".to_vec()))])
            .await
            .unwrap();

        let ctx = env.ctx().with_size_mode("ir.attachment", "data");
        let sizes = field.get(&cursor, &env.store, &ctx, &[1, 2], None).await.unwrap();
        assert_eq!(sizes[&1], BlobValue::Size(5));
        assert_eq!(sizes[&2], BlobValue::Size(0));
    }

    #[tokio::test]
    async fn chunking_is_transparent() {
        let env = TestEnv::with_rows(9).await;
        let field = env.external_field();
        let cursor = SqlCursor::with_in_max(&env.db, 2);

        let odd: Vec<RecordId> = vec![1, 3, 5, 7, 9];
        field
            .set(&cursor, &env.store, &env.ctx(), &[(odd.as_slice(), RawValue::from(b"odd".to_vec()))])
            .await
            .unwrap();
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[4], RawValue::from(b"four".to_vec()))])
            .await
            .unwrap();

        let ids: Vec<RecordId> = (1..=9).rev().collect();
        let whole = field.get(&cursor, &env.store, &env.ctx(), &ids, None).await.unwrap();

        let wide = SqlCursor::new(&env.db);
        let mut pieces = std::collections::BTreeMap::new();
        for part in ids.chunks(4) {
            pieces.extend(field.get(&wide, &env.store, &env.ctx(), part, None).await.unwrap());
        }

        assert_eq!(whole, pieces);
        assert_eq!(whole.len(), 9);
        assert_eq!(whole[&4], bytes(b"four"));
        assert_eq!(whole[&9], bytes(b"odd"));
        assert_eq!(whole[&2], BlobValue::Null);
    }

    #[tokio::test]
    async fn empty_string_pointer_is_ignored() {
        let env = TestEnv::with_rows(1).await;
        exec(&env.db, "UPDATE ir_attachment SET file_id = '' WHERE id = 1").await;

        let cursor = SqlCursor::new(&env.db);
        let pointers = cursor
            .select_pointers("ir_attachment", "file_id", &[1])
            .await
            .unwrap();
        assert!(pointers.is_empty());
    }

    #[tokio::test]
    async fn blob_in_pointer_column_is_an_integrity_fault() {
        let env = TestEnv::with_rows(1).await;
        exec(&env.db, "UPDATE ir_attachment SET file_id = X'00FF' WHERE id = 1").await;

        let field = env.external_field();
        let cursor = SqlCursor::new(&env.db);
        let err = field
            .get(&cursor, &env.store, &env.ctx(), &[1], None)
            .await
            .unwrap_err();
        assert!(matches!(err, FieldError::Integrity(_)), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn oversized_value_fails_the_write() {
        let env = TestEnv::with_rows(1).await;
        let field = env.external_field();
        let cursor = SqlCursor::new(&env.db);

        let huge = vec![0u8; 2 * 1024 * 1024];
        let err = field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(huge))])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FieldError::Storage(StorageError::SizeLimitExceeded { .. })
        ));
        assert_eq!(pointer(&env, 1).await, None);
    }

    #[tokio::test]
    async fn store_prefix_overrides_database_namespace() {
        let env = TestEnv::with_rows(1).await;
        let field = BlobField::register(
            &env.model,
            BlobFieldConfig::external("data", "file_id").with_store_prefix("shared"),
        )
        .unwrap();
        let cursor = SqlCursor::new(&env.db);
        field
            .set(&cursor, &env.store, &env.ctx(), &[(&[1], RawValue::from(b"shared".to_vec()))])
            .await
            .unwrap();

        let key = ContentHash::compute(b"shared");
        let shared = Namespace::new("shared").unwrap();
        assert!(env.store.exists(&key, &shared).await.unwrap());
        assert!(!env.store.exists(&key, &env.namespace()).await.unwrap());
        assert!(
            env.store
                .base_path()
                .join("shared")
                .join(&key.to_hex()[..2])
                .join(&key.to_hex()[2..])
                .is_file()
        );

        let values = field.get(&cursor, &env.store, &env.ctx(), &[1], None).await.unwrap();
        assert_eq!(values[&1], bytes(b"shared"));
    }

    #[tokio::test]
    async fn load_values_returns_every_requested_column() {
        let env = TestEnv::with_rows(5).await;
        exec(&env.db, "UPDATE ir_attachment SET data = X'0102' WHERE id = 3").await;

        let cursor = SqlCursor::with_in_max(&env.db, 2);
        let rows = cursor
            .load_values("ir_attachment", &["name", "data"], &[5, 3, 1, 42])
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[&3]["name"].payload(), Some(&b"file3.bin"[..]));
        assert_eq!(rows[&3]["data"], RawValue::Bytes(vec![1, 2]));
        assert_eq!(rows[&5]["data"], RawValue::Null);
        assert!(!rows.contains_key(&42));
    }
}
