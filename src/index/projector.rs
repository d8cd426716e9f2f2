//! Entity Projector Registry
//!
//! A registry that maps source entity types (e.g. "event", "user") to
//! projector closures turning a raw source record into an `IndexableEntity`.
//! Adding a new searchable entity type means registering one projector.

use super::types::IndexableEntity;
use crate::error::{Error, Result, Stage};
use crate::storage::policy::StorePolicy;
use crate::storage::store::SourceStore;

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Type alias for a thread-safe projector function.
/// It takes the requested entity id and the raw source record.
pub type ProjectorFn = Arc<dyn Fn(&str, &Value) -> Result<IndexableEntity> + Send + Sync>;

struct RegisteredProjector {
    /// The index partition entities of this source type are written to.
    index_type: String,
    project: ProjectorFn,
}

/// Registry holding the mapping between source types and their projectors.
pub struct ProjectorRegistry {
    projectors: DashMap<String, RegisteredProjector>,
}

impl ProjectorRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A registry with the platform's entity kinds already registered.
    pub fn with_defaults() -> Arc<Self> {
        let registry = Self::default();
        for projector in default_projectors() {
            registry.register_fields(projector);
        }
        Arc::new(registry)
    }

    /// Registers a projector closure for `source_type`, writing into the
    /// `index_type` partition.
    pub fn register<F>(&self, source_type: &str, index_type: &str, projector: F)
    where
        F: Fn(&str, &Value) -> Result<IndexableEntity> + Send + Sync + 'static,
    {
        self.projectors.insert(
            source_type.to_string(),
            RegisteredProjector {
                index_type: index_type.to_string(),
                project: Arc::new(projector),
            },
        );

        tracing::info!("Registered projector: {} -> {}", source_type, index_type);
    }

    /// Registers a field-mapping projector.
    pub fn register_fields(&self, fields: FieldProjector) {
        let source_type = fields.source_type.clone();
        let index_type = fields.index_type.clone();
        self.register(&source_type, &index_type, move |id, record| {
            fields.project(id, record)
        });
    }

    /// Looks up the projector for `source_type` and runs it on `record`.
    pub fn project(&self, source_type: &str, id: &str, record: &Value) -> Result<IndexableEntity> {
        let project = match self.projectors.get(source_type) {
            Some(registered) => registered.project.clone(),
            None => return Err(Error::UnsupportedType(source_type.to_string())),
        };
        project(id, record)
    }

    pub fn has_projector(&self, source_type: &str) -> bool {
        self.projectors.contains_key(source_type)
    }

    /// Index partitions that can be searched.
    pub fn index_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .projectors
            .iter()
            .map(|entry| entry.value().index_type.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn supports_index_type(&self, index_type: &str) -> bool {
        self.projectors
            .iter()
            .any(|entry| entry.value().index_type == index_type)
    }

    pub fn projector_count(&self) -> usize {
        self.projectors.len()
    }
}

impl Default for ProjectorRegistry {
    fn default() -> Self {
        Self {
            projectors: DashMap::new(),
        }
    }
}

/// Field mapping for the common record shape: an id, a title, a description,
/// an image (string or list of strings) and a creation timestamp.
#[derive(Debug, Clone)]
pub struct FieldProjector {
    pub source_type: String,
    pub index_type: String,
    pub id_field: String,
    pub title_field: String,
    pub description_field: String,
    pub image_field: String,
    pub created_field: String,
}

impl FieldProjector {
    pub fn new(source_type: &str, index_type: &str, id_field: &str) -> Self {
        Self {
            source_type: source_type.to_string(),
            index_type: index_type.to_string(),
            id_field: id_field.to_string(),
            title_field: "title".to_string(),
            description_field: "description".to_string(),
            image_field: "image".to_string(),
            created_field: "createdAt".to_string(),
        }
    }

    pub fn title(mut self, field: &str) -> Self {
        self.title_field = field.to_string();
        self
    }

    pub fn description(mut self, field: &str) -> Self {
        self.description_field = field.to_string();
        self
    }

    pub fn image(mut self, field: &str) -> Self {
        self.image_field = field.to_string();
        self
    }

    pub fn created(mut self, field: &str) -> Self {
        self.created_field = field.to_string();
        self
    }

    pub fn project(&self, id: &str, record: &Value) -> Result<IndexableEntity> {
        if !record.is_object() {
            return Err(Error::projection(
                &self.source_type,
                id,
                "source record is not an object",
            ));
        }

        let entity_id = string_field(record, &self.id_field).unwrap_or_else(|| id.to_string());
        if entity_id.is_empty() {
            return Err(Error::projection(&self.source_type, id, "record has no id"));
        }

        let created_at = record
            .get(&self.created_field)
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        Ok(IndexableEntity {
            id: entity_id,
            entity_type: self.index_type.clone(),
            title: string_field(record, &self.title_field).unwrap_or_default(),
            description: string_field(record, &self.description_field).unwrap_or_default(),
            image: image_field(record, &self.image_field).unwrap_or_default(),
            created_at,
        })
    }
}

fn string_field(record: &Value, field: &str) -> Option<String> {
    record.get(field)?.as_str().map(str::to_string)
}

/// A plain string, or the first entry of a list of strings.
fn image_field(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first()?.as_str().map(str::to_string),
        _ => None,
    }
}

/// Accepts RFC 3339 strings, epoch milliseconds (integer, float or numeric
/// string) and returns `None` for anything else.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(millis) = s.parse::<i64>() {
                return Utc.timestamp_millis_opt(millis).single();
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    }
}

fn default_projectors() -> Vec<FieldProjector> {
    vec![
        FieldProjector::new("song", "songs", "songid").image("poster").created("uploadedAt"),
        FieldProjector::new("user", "users", "userid")
            .title("username")
            .description("bio")
            .image("profile_picture")
            .created("created_at"),
        FieldProjector::new("recipe", "recipes", "recipeid").image("imageUrls"),
        FieldProjector::new("product", "products", "productid")
            .title("name")
            .image("imageUrls"),
        FieldProjector::new("blogpost", "blogposts", "postid")
            .description("content")
            .image("imagePaths"),
        FieldProjector::new("place", "places", "placeid")
            .title("name")
            .image("banner")
            .created("created_at"),
        FieldProjector::new("merch", "merch", "merchid")
            .title("name")
            .description("category")
            .image("merch_pic"),
        FieldProjector::new("menu", "menu", "menuid")
            .title("name")
            .image("menu_pic"),
        FieldProjector::new("media", "media", "mediaid")
            .title("caption")
            .description("caption")
            .image("thumbnailUrl"),
        FieldProjector::new("farm", "farms", "farmid")
            .title("name")
            .image("photo"),
        FieldProjector::new("event", "events", "eventid")
            .image("banner_image")
            .created("date"),
        FieldProjector::new("crop", "crops", "cropid")
            .title("name")
            .description("category")
            .image("imageUrl"),
        FieldProjector::new("baitoworker", "baitoworkers", "baito_user_id")
            .title("name")
            .description("bio")
            .image("profilePic"),
        FieldProjector::new("baito", "baitos", "baitoid").image("bannerURL"),
        FieldProjector::new("artist", "artists", "artistid")
            .title("name")
            .description("bio")
            .image("photo"),
        FieldProjector::new("feedpost", "feedposts", "postid")
            .title("text")
            .description("content")
            .image("media"),
    ]
}

/// Resolves a change event's `(entity_type, id)` into an `IndexableEntity` by
/// fetching the source record and running the registered projector.
#[derive(Clone)]
pub struct EntityProjector {
    source: Arc<dyn SourceStore>,
    registry: Arc<ProjectorRegistry>,
    policy: StorePolicy,
}

impl EntityProjector {
    pub fn new(
        source: Arc<dyn SourceStore>,
        registry: Arc<ProjectorRegistry>,
        policy: StorePolicy,
    ) -> Self {
        Self {
            source,
            registry,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<ProjectorRegistry> {
        &self.registry
    }

    pub async fn resolve(&self, source_type: &str, id: &str) -> Result<IndexableEntity> {
        if !self.registry.has_projector(source_type) {
            return Err(Error::UnsupportedType(source_type.to_string()));
        }

        let source = &self.source;
        let record = self
            .policy
            .call_with_retry(Stage::SourceStore, move || source.fetch(source_type, id))
            .await?
            .ok_or_else(|| Error::projection(source_type, id, "source record not found"))?;

        let entity = self.registry.project(source_type, id, &record)?;
        tracing::debug!(
            "Projected {}/{} into {}/{}",
            source_type,
            id,
            entity.entity_type,
            entity.id
        );
        Ok(entity)
    }
}
