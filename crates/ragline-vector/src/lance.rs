//! LanceDB-backed index and document store.
//!
//! Both tables are created lazily on first write. Clearing deletes all rows
//! but keeps the table, so the vector width of a cleared summaries table can
//! only be reused by vectors of the same width.

use arrow_array::types::Float32Type;
use arrow_array::{Array, BinaryArray, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::Table;
use lancedb::{connect, Connection, DistanceType};
use std::sync::Arc;
use tracing::{debug, warn};

use ragline_core::traits::{DocStore, VectorIndex};
use ragline_core::types::{Content, ContentKind, DistanceMetric, DocId, DocumentUnit, EmbeddingRecord, IndexHit, Meta};
use ragline_core::{Error, Result};

use crate::schema::{build_documents_schema, build_summaries_schema, vector_dim};

async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(Error::operation)
}

async fn open_existing(conn: &Connection, name: &str) -> Result<Option<Table>> {
    let names = conn.table_names().execute().await.map_err(Error::operation)?;
    if !names.iter().any(|n| n == name) {
        return Ok(None);
    }
    conn.open_table(name).execute().await.map(Some).map_err(Error::operation)
}

async fn write_batch(conn: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    match open_existing(conn, name).await? {
        Some(table) => {
            table.add(reader).execute().await.map_err(Error::operation)?;
        }
        None => {
            conn.create_table(name, reader).execute().await.map_err(Error::operation)?;
        }
    }
    Ok(())
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Operation(format!("column '{name}' missing")))
}

fn optional_string(col: &StringArray, row: usize) -> Option<String> {
    (!col.is_null(row)).then(|| col.value(row).to_string())
}

pub struct LanceIndex {
    conn: Connection,
    table_name: String,
    metric: DistanceMetric,
}

impl LanceIndex {
    pub async fn open(uri: &str, table_name: &str, metric: DistanceMetric) -> Result<Self> {
        let conn = open_db(uri).await?;
        Ok(Self { conn, table_name: table_name.to_string(), metric })
    }

    async fn table(&self) -> Result<Option<Table>> {
        open_existing(&self.conn, &self.table_name).await
    }

    async fn contains(&self, table: &Table, doc_id: &str) -> Result<bool> {
        let n = table.count_rows(Some(format!("id = {}", quote(doc_id)))).await.map_err(Error::operation)?;
        Ok(n > 0)
    }

    fn distance_type(&self) -> DistanceType {
        match self.metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::L2 => DistanceType::L2,
        }
    }

    fn to_batch(record: &EmbeddingRecord, doc_id: &str) -> Result<RecordBatch> {
        let dim = i32::try_from(record.vector.len()).map_err(Error::operation)?;
        let metadata = serde_json::to_string(&record.metadata).map_err(Error::operation)?;
        let vectors = vec![Some(record.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>())];
        RecordBatch::try_new(
            build_summaries_schema(dim),
            vec![
                Arc::new(StringArray::from(vec![doc_id.to_string()])),
                Arc::new(StringArray::from(vec![metadata])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
            ],
        )
        .map_err(Error::operation)
    }
}

fn parse_metadata(raw: &str) -> Meta {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "unreadable metadata column");
        Meta::new()
    })
}

#[async_trait]
impl VectorIndex for LanceIndex {
    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn dim(&self) -> Result<Option<usize>> {
        let Some(table) = self.table().await? else { return Ok(None) };
        let schema = table.schema().await.map_err(Error::operation)?;
        Ok(vector_dim(&schema))
    }

    async fn add(&self, record: EmbeddingRecord) -> Result<Option<DocId>> {
        if record.vector.is_empty() {
            warn!(doc_id = %record.doc_id, "rejecting zero-length embedding");
            return Ok(None);
        }
        let table = self.table().await?;
        let mut id = record.doc_id.clone();
        if let Some(table) = &table {
            let schema = table.schema().await.map_err(Error::operation)?;
            if let Some(d) = vector_dim(&schema) {
                if d != record.vector.len() {
                    return Err(Error::IntegrityViolation(format!(
                        "embedding for '{}' has dimension {}, table '{}' holds {}",
                        record.doc_id,
                        record.vector.len(),
                        self.table_name,
                        d
                    )));
                }
            }
            let base = if id.trim().is_empty() { "doc".to_string() } else { id.clone() };
            id = base.clone();
            let mut n = 0usize;
            while self.contains(table, &id).await? {
                n += 1;
                id = format!("{base}-{n}");
            }
        } else if id.trim().is_empty() {
            id = "doc".to_string();
        }
        if id != record.doc_id {
            debug!(requested = %record.doc_id, assigned = %id, "doc id collision");
        }
        let batch = Self::to_batch(&record, &id)?;
        write_batch(&self.conn, &self.table_name, batch).await?;
        Ok(Some(id))
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if k == 0 || self.is_empty().await? {
            return Ok(Vec::new());
        }
        let Some(table) = self.table().await? else { return Ok(Vec::new()) };
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(Error::operation)?
            .distance_type(self.distance_type())
            .limit(k)
            .execute()
            .await
            .map_err(Error::operation)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::operation)? {
            let ids = string_column(&batch, "id")?;
            let metas = string_column(&batch, "metadata")?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| Error::Operation("column '_distance' missing".into()))?;
            for i in 0..batch.num_rows() {
                hits.push(IndexHit {
                    doc_id: ids.value(i).to_string(),
                    metadata: parse_metadata(metas.value(i)),
                    distance: distances.value(i),
                });
            }
        }
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn remove(&self, doc_id: &str) -> Result<bool> {
        let Some(table) = self.table().await? else { return Ok(false) };
        if !self.contains(&table, doc_id).await? {
            return Ok(false);
        }
        table.delete(&format!("id = {}", quote(doc_id))).await.map_err(Error::operation)?;
        Ok(true)
    }

    async fn entries(&self) -> Result<Vec<(DocId, Meta)>> {
        let Some(table) = self.table().await? else { return Ok(Vec::new()) };
        let mut stream = table.query().execute().await.map_err(Error::operation)?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::operation)? {
            let ids = string_column(&batch, "id")?;
            let metas = string_column(&batch, "metadata")?;
            for i in 0..batch.num_rows() {
                out.push((ids.value(i).to_string(), parse_metadata(metas.value(i))));
            }
        }
        Ok(out)
    }

    async fn clear(&self) -> Result<()> {
        if let Some(table) = self.table().await? {
            table.delete("id IS NOT NULL").await.map_err(Error::operation)?;
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        match self.table().await? {
            Some(table) => table.count_rows(None).await.map_err(Error::operation),
            None => Ok(0),
        }
    }
}

pub struct LanceDocStore {
    conn: Connection,
    table_name: String,
}

impl LanceDocStore {
    pub async fn open(uri: &str, table_name: &str) -> Result<Self> {
        let conn = open_db(uri).await?;
        Ok(Self { conn, table_name: table_name.to_string() })
    }

    async fn table(&self) -> Result<Option<Table>> {
        open_existing(&self.conn, &self.table_name).await
    }

    fn to_batch(unit: &DocumentUnit) -> Result<RecordBatch> {
        let (text, data): (Option<String>, Option<&[u8]>) = match &unit.content {
            Content::Text(t) => (Some(t.clone()), None),
            Content::Image(b) => (None, Some(b.as_slice())),
        };
        RecordBatch::try_new(
            build_documents_schema(),
            vec![
                Arc::new(StringArray::from(vec![unit.id.clone()])),
                Arc::new(StringArray::from(vec![unit.kind.as_str().to_string()])),
                Arc::new(StringArray::from(vec![unit.source_ref.clone()])),
                Arc::new(StringArray::from(vec![text])),
                Arc::new(BinaryArray::from(vec![data])),
            ],
        )
        .map_err(Error::operation)
    }

    fn from_row(batch: &RecordBatch, row: usize) -> Result<DocumentUnit> {
        let id = string_column(batch, "id")?.value(row).to_string();
        let kind_label = string_column(batch, "kind")?.value(row);
        let kind = ContentKind::parse(kind_label).ok_or_else(|| Error::UnsupportedContentKind(kind_label.to_string()))?;
        let source_ref = string_column(batch, "source_ref")?.value(row).to_string();
        let content = match kind {
            ContentKind::Image => {
                let data = batch
                    .column_by_name("data")
                    .and_then(|c| c.as_any().downcast_ref::<BinaryArray>())
                    .ok_or_else(|| Error::Operation("column 'data' missing".into()))?;
                if data.is_null(row) {
                    return Err(Error::IntegrityViolation(format!("image unit '{id}' has no bytes")));
                }
                Content::Image(data.value(row).to_vec())
            }
            ContentKind::Text | ContentKind::Table => {
                Content::Text(optional_string(string_column(batch, "text")?, row).unwrap_or_default())
            }
        };
        Ok(DocumentUnit { id, kind, content, source_ref })
    }
}

#[async_trait]
impl DocStore for LanceDocStore {
    async fn put(&self, unit: DocumentUnit) -> Result<()> {
        if let Some(table) = self.table().await? {
            table.delete(&format!("id = {}", quote(&unit.id))).await.map_err(Error::operation)?;
        }
        write_batch(&self.conn, &self.table_name, Self::to_batch(&unit)?).await
    }

    async fn get(&self, doc_id: &str) -> Result<DocumentUnit> {
        let Some(table) = self.table().await? else { return Err(Error::NotFound(doc_id.to_string())) };
        let mut stream = table
            .query()
            .only_if(format!("id = {}", quote(doc_id)))
            .limit(1)
            .execute()
            .await
            .map_err(Error::operation)?;
        while let Some(batch) = stream.try_next().await.map_err(Error::operation)? {
            if batch.num_rows() > 0 {
                return Self::from_row(&batch, 0);
            }
        }
        Err(Error::NotFound(doc_id.to_string()))
    }

    async fn remove(&self, doc_id: &str) -> Result<bool> {
        let Some(table) = self.table().await? else { return Ok(false) };
        let filter = format!("id = {}", quote(doc_id));
        if table.count_rows(Some(filter.clone())).await.map_err(Error::operation)? == 0 {
            return Ok(false);
        }
        table.delete(&filter).await.map_err(Error::operation)?;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        if let Some(table) = self.table().await? {
            table.delete("id IS NOT NULL").await.map_err(Error::operation)?;
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        match self.table().await? {
            Some(table) => table.count_rows(None).await.map_err(Error::operation),
            None => Ok(0),
        }
    }
}
