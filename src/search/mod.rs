//! Tantivy-based search index module.
//!
//! Provides full-text search over item records with field boosting. The
//! index is keyed by content-derived item key, so hits resolve onto the
//! aggregated location list regardless of which data source a record came
//! from. Distinct from the pipeline's `searchTerm` filter, which is plain
//! substring matching.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::ItemRecord;

/// Field boost values matching frontend weights.
const BOOST_RESTAURANT_NAME: f32 = 10.0;
const BOOST_ITEM_NAME: f32 = 8.5;
const BOOST_DESCRIPTION: f32 = 7.0;
const BOOST_ALT_DESCRIPTION: f32 = 5.5;
const BOOST_NEIGHBORHOOD: f32 = 4.0;

/// Search result with item key and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub item_key: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    item_key: Field,
    restaurant_name: Field,
    item_name: Field,
    description: Field,
    alt_description: Field,
    neighborhood: Field,
}

/// Tantivy search index over item records.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        // Define schema
        let mut schema_builder = Schema::builder();
        let item_key = schema_builder.add_text_field("item_key", STORED);
        let restaurant_name = schema_builder.add_text_field("restaurant_name", TEXT | STORED);
        let item_name = schema_builder.add_text_field("item_name", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let alt_description = schema_builder.add_text_field("alt_description", TEXT);
        let neighborhood = schema_builder.add_text_field("neighborhood", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            item_key,
            restaurant_name,
            item_name,
            description,
            alt_description,
            neighborhood,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from item records.
    pub async fn rebuild(&self, records: &[ItemRecord]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        // Clear existing index
        writer.delete_all_documents()?;

        // Index all records
        for record in records {
            let doc = self.create_document(record);
            writer.add_document(doc)?;
        }

        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} item records", records.len());
        Ok(())
    }

    /// Search for item records matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // Create query parser for all searchable fields
        let query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.restaurant_name,
                self.fields.item_name,
                self.fields.description,
                self.fields.alt_description,
                self.fields.neighborhood,
            ],
        );

        // Parse the user query
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        // Create field-specific boosted queries
        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();

        // Parse query for each field with boost
        let field_queries = [
            (self.fields.restaurant_name, BOOST_RESTAURANT_NAME),
            (self.fields.item_name, BOOST_ITEM_NAME),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.alt_description, BOOST_ALT_DESCRIPTION),
            (self.fields.neighborhood, BOOST_NEIGHBORHOOD),
        ];

        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                let boosted = BoostQuery::new(field_query, boost);
                subqueries.push((Occur::Should, Box::new(boosted)));
            }
        }

        // Combine with OR semantics
        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        // Execute search with pagination
        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        // Extract results with pagination
        let results: Vec<SearchResult> = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let item_key = doc.get_first(self.fields.item_key)?.as_str()?.to_string();
                Some(SearchResult { item_key, score })
            })
            .collect();

        Ok(results)
    }

    /// Create a Tantivy document from an item record.
    fn create_document(&self, record: &ItemRecord) -> TantivyDocument {
        doc!(
            self.fields.item_key => record.item_key.clone().unwrap_or_default(),
            self.fields.restaurant_name => record.restaurant_name.clone(),
            self.fields.item_name => record.item_name.clone(),
            self.fields.description => record.description.clone().unwrap_or_default(),
            self.fields.alt_description => record.alt_description.clone().unwrap_or_default(),
            self.fields.neighborhood => record.neighborhood.clone()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_record(restaurant: &str, item: &str, description: &str) -> ItemRecord {
        ItemRecord {
            restaurant_name: restaurant.to_string(),
            address: "123 Main St".to_string(),
            neighborhood: "Alberta".to_string(),
            latitude: Some(45.55),
            longitude: Some(-122.65),
            geocoded_address: None,
            geocoding_method: None,
            allow_minors: true,
            allow_takeout: true,
            allow_delivery: false,
            purchase_limits: false,
            phone: None,
            website: None,
            hours: Vec::new(),
            item_name: item.to_string(),
            description: Some(description.to_string()),
            alt_description: None,
            item_type: Some("meat".to_string()),
            gluten_free: false,
            price: None,
            url: None,
            image: None,
            image_url: None,
            item_key: Some(crate::models::item_key(restaurant, item, "123 Main St")),
        }
    }

    #[tokio::test]
    async fn test_search_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let records = vec![
            create_test_record("Fire on the Mountain", "Buffalo Wings", "classic buffalo sauce"),
            create_test_record("Bok a Bok", "Korean Fried", "gochujang glaze"),
        ];

        index.rebuild(&records).await.unwrap();

        let results = index.search("buffalo", 10, 0).unwrap();
        assert!(!results.is_empty());
        assert_eq!(
            results[0].item_key,
            records[0].item_key.clone().unwrap()
        );
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let results = index.search("", 10, 0).unwrap();
        assert!(results.is_empty());
    }
}
