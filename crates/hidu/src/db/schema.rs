use crate::services::MenuItem;
use anyhow::Context;
use arrow_array::{
    cast::AsArray, Array, ArrayRef, BooleanArray, Float64Array, RecordBatch, StringArray,
    TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// Create the Arrow schema for menu items
pub fn create_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("storage_id", DataType::Utf8, false),
        Field::new("id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, false),
        Field::new("price", DataType::Float64, false),
        Field::new("price_large", DataType::Float64, true),
        Field::new("category", DataType::Utf8, false),
        Field::new("image_url", DataType::Utf8, false),
        Field::new("is_popular", DataType::Boolean, false),
        Field::new("is_best_seller", DataType::Boolean, false),
        Field::new("is_new", DataType::Boolean, false),
        Field::new("is_available", DataType::Boolean, false),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new(
            "updated_at",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
    ]))
}

fn strings<'a>(items: &'a [MenuItem], f: impl Fn(&'a MenuItem) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from(items.iter().map(f).collect::<Vec<_>>()))
}

fn flags(items: &[MenuItem], f: impl Fn(&MenuItem) -> bool) -> ArrayRef {
    Arc::new(BooleanArray::from(items.iter().map(f).collect::<Vec<_>>()))
}

fn timestamps(items: &[MenuItem], f: impl Fn(&MenuItem) -> DateTime<Utc>) -> ArrayRef {
    Arc::new(TimestampMillisecondArray::from(
        items
            .iter()
            .map(|item| f(item).timestamp_millis())
            .collect::<Vec<_>>(),
    ))
}

/// Convert menu items to an Arrow RecordBatch
pub fn items_to_batch(items: &[MenuItem]) -> anyhow::Result<RecordBatch> {
    let schema = create_schema();

    let prices: ArrayRef = Arc::new(Float64Array::from(
        items.iter().map(|i| i.price).collect::<Vec<_>>(),
    ));
    let large_prices: ArrayRef = Arc::new(Float64Array::from(
        items.iter().map(|i| i.price_large).collect::<Vec<_>>(),
    ));

    RecordBatch::try_new(
        schema,
        vec![
            strings(items, |i| i.storage_id.as_str()),
            strings(items, |i| i.business_id.as_str()),
            strings(items, |i| i.name.as_str()),
            strings(items, |i| i.description.as_str()),
            prices,
            large_prices,
            strings(items, |i| i.category.as_str()),
            strings(items, |i| i.image_url.as_str()),
            flags(items, |i| i.is_popular),
            flags(items, |i| i.is_best_seller),
            flags(items, |i| i.is_new),
            flags(items, |i| i.is_available),
            timestamps(items, |i| i.created_at),
            timestamps(items, |i| i.updated_at),
        ],
    )
    .map_err(|e| anyhow::anyhow!("Failed to create record batch: {}", e))
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing column '{}'", name))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a StringArray> {
    column(batch, name)?
        .as_string_opt::<i32>()
        .with_context(|| format!("Failed to cast {} column", name))
}

fn bool_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a BooleanArray> {
    column(batch, name)?
        .as_boolean_opt()
        .with_context(|| format!("Failed to cast {} column", name))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Float64Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .with_context(|| format!("Failed to cast {} column", name))
}

fn timestamp_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> anyhow::Result<&'a TimestampMillisecondArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .with_context(|| format!("Failed to cast {} column", name))
}

fn millis_to_utc(millis: i64) -> anyhow::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .with_context(|| format!("Invalid timestamp: {}", millis))
}

/// Convert a RecordBatch back into menu items, reading columns by name
pub fn batch_to_items(batch: &RecordBatch) -> anyhow::Result<Vec<MenuItem>> {
    let storage_ids = string_column(batch, "storage_id")?;
    let ids = string_column(batch, "id")?;
    let names = string_column(batch, "name")?;
    let descriptions = string_column(batch, "description")?;
    let prices = float_column(batch, "price")?;
    let large_prices = float_column(batch, "price_large")?;
    let categories = string_column(batch, "category")?;
    let image_urls = string_column(batch, "image_url")?;
    let popular = bool_column(batch, "is_popular")?;
    let best_sellers = bool_column(batch, "is_best_seller")?;
    let new = bool_column(batch, "is_new")?;
    let available = bool_column(batch, "is_available")?;
    let created_ats = timestamp_column(batch, "created_at")?;
    let updated_ats = timestamp_column(batch, "updated_at")?;

    let mut items = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let price_large = if large_prices.is_null(i) {
            None
        } else {
            Some(large_prices.value(i))
        };

        items.push(MenuItem {
            storage_id: storage_ids.value(i).to_string(),
            business_id: ids.value(i).to_string(),
            name: names.value(i).to_string(),
            description: descriptions.value(i).to_string(),
            price: prices.value(i),
            price_large,
            category: categories.value(i).to_string(),
            image_url: image_urls.value(i).to_string(),
            is_popular: popular.value(i),
            is_best_seller: best_sellers.value(i),
            is_new: new.value(i),
            is_available: available.value(i),
            created_at: millis_to_utc(created_ats.value(i))?,
            updated_at: millis_to_utc(updated_ats.value(i))?,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_item;

    #[test]
    fn schema_has_required_fields() {
        let schema = create_schema();
        let field_names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

        for name in [
            "storage_id",
            "id",
            "name",
            "description",
            "price",
            "price_large",
            "category",
            "image_url",
            "is_popular",
            "is_best_seller",
            "is_new",
            "is_available",
            "created_at",
            "updated_at",
        ] {
            assert!(field_names.contains(&name), "missing field {}", name);
        }
        assert_eq!(schema.fields().len(), 14);
    }

    #[test]
    fn only_price_large_is_nullable() {
        let schema = create_schema();
        let nullable: Vec<&str> = schema
            .fields()
            .iter()
            .filter(|f| f.is_nullable())
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(nullable, vec!["price_large"]);
    }

    #[test]
    fn items_to_batch_empty_vec() {
        let batch = items_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 14);
    }

    #[test]
    fn batch_preserves_every_field() {
        let mut large = sample_item("tea-002", "tea");
        large.price_large = Some(45000.0);
        large.is_available = false;
        let plain = sample_item("cf-001", "coffee");

        let batch = items_to_batch(&[large.clone(), plain.clone()]).unwrap();
        let items = batch_to_items(&batch).unwrap();

        assert_eq!(items.len(), 2);
        // timestamps are stored at millisecond precision
        assert_eq!(items[0].business_id, large.business_id);
        assert_eq!(items[0].price_large, Some(45000.0));
        assert!(!items[0].is_available);
        assert_eq!(
            items[0].created_at.timestamp_millis(),
            large.created_at.timestamp_millis()
        );
        assert_eq!(items[1].price_large, None);
        assert_eq!(items[1].name, plain.name);
        assert_eq!(items[1].storage_id, plain.storage_id);
    }

    #[test]
    fn batch_with_missing_column_is_rejected() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, false)]));
        let ids: ArrayRef = Arc::new(StringArray::from(vec!["cf-001"]));
        let batch = RecordBatch::try_new(schema, vec![ids]).unwrap();

        let err = batch_to_items(&batch).unwrap_err();
        assert!(err.to_string().contains("storage_id"));
    }
}
