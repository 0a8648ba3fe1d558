//! Curriculum business logic - Grade/subject/module scoped learning units.
//!
//! Anyone may read published modules. Unpublished modules exist only for admins,
//! who are also the only ones allowed to write. Code assets can be attached as
//! inline-encoded snippets, see [`crate::core::snippet`].

use crate::{
    core::{
        access::{CurriculumRule, Operation, Requester, RowRule, Subject, visible},
        snippet,
    },
    entities::{AssetKind, AssetList, AssetRef, CurriculumModule, curriculum_module},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Optional narrowing of a module listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleFilter {
    /// Only modules for this grade
    pub grade: Option<i32>,
    /// Only modules for this subject (case-insensitive)
    pub subject: Option<String>,
}

impl ModuleFilter {
    /// Whether `module` passes the filter.
    #[must_use]
    pub fn matches(&self, module: &curriculum_module::Model) -> bool {
        self.grade.is_none_or(|grade| module.grade == grade)
            && self
                .subject
                .as_deref()
                .is_none_or(|subject| module.subject.eq_ignore_ascii_case(subject))
    }
}

/// Editable fields of a module.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleInput {
    /// Module title
    pub title: String,
    /// School grade
    pub grade: i32,
    /// Subject
    pub subject: String,
    /// Module label within the subject
    pub module: String,
    /// Long-form description
    #[serde(default)]
    pub description: String,
    /// Ordered asset references
    #[serde(default)]
    pub assets: Vec<AssetRef>,
    /// Optional yearly price in dollars
    #[serde(default)]
    pub yearly_price: Option<f64>,
    /// Visible to non-admins when true
    #[serde(default)]
    pub published: bool,
}

/// Decoded code asset, ready to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSnippet {
    /// Asset caption
    pub label: String,
    /// Snippet text
    pub code: String,
}

fn validate(input: &ModuleInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(Error::validation("Module title cannot be empty"));
    }
    if input.subject.trim().is_empty() {
        return Err(Error::validation("Module subject cannot be empty"));
    }
    if input.grade < 1 {
        return Err(Error::validation(format!("Invalid grade: {}", input.grade)));
    }
    if let Some(price) = input.yearly_price {
        if price < 0.0 || !price.is_finite() {
            return Err(Error::InvalidAmount { amount: price });
        }
    }
    if input
        .assets
        .iter()
        .any(|asset| asset.kind != AssetKind::Code && asset.location.trim().is_empty())
    {
        return Err(Error::validation("Video and document assets need a location"));
    }
    Ok(())
}

/// Builds a code asset holding `code` in the inline-encoded form.
#[must_use]
pub fn code_asset(label: &str, code: &str) -> AssetRef {
    AssetRef {
        kind: AssetKind::Code,
        location: snippet::encode(code),
        label: label.trim().to_string(),
    }
}

/// Decodes every code asset of `module`, in asset order.
#[must_use]
pub fn code_snippets(module: &curriculum_module::Model) -> Vec<CodeSnippet> {
    module
        .assets
        .0
        .iter()
        .filter_map(|asset| {
            asset.code_text().map(|code| CodeSnippet {
                label: asset.label.clone(),
                code,
            })
        })
        .collect()
}

/// Lists the modules the requester may see, ordered by grade, subject and module.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_modules(
    db: &DatabaseConnection,
    requester: &Requester,
    filter: &ModuleFilter,
) -> Result<Vec<curriculum_module::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let mut query = CurriculumModule::find();
    if let Some(grade) = filter.grade {
        query = query.filter(curriculum_module::Column::Grade.eq(grade));
    }
    let rows = query
        .order_by_asc(curriculum_module::Column::Grade)
        .order_by_asc(curriculum_module::Column::Subject)
        .order_by_asc(curriculum_module::Column::Module)
        .all(db)
        .await?;
    let rows = rows.into_iter().filter(|row| filter.matches(row)).collect();
    Ok(visible::<CurriculumRule>(&subject, rows))
}

/// Fetches a module if the requester may see it.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_module(
    db: &DatabaseConnection,
    requester: &Requester,
    id: i64,
) -> Result<Option<curriculum_module::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let found = CurriculumModule::find_by_id(id).one(db).await?;
    Ok(found.filter(|row| CurriculumRule::check(&subject, Operation::Select, row).is_allowed()))
}

/// Creates a module (admin only).
///
/// # Errors
/// Returns an error if the input is invalid or the insert fails.
#[instrument(skip(db, input), fields(title = %input.title))]
pub async fn create_module(
    db: &DatabaseConnection,
    requester: &Requester,
    input: ModuleInput,
) -> Result<Option<curriculum_module::Model>> {
    validate(&input)?;

    let subject = Subject::resolve(db, requester).await?;
    let now = chrono::Utc::now();
    let candidate = curriculum_module::Model {
        id: 0,
        title: input.title.trim().to_string(),
        grade: input.grade,
        subject: input.subject.trim().to_string(),
        module: input.module.trim().to_string(),
        description: input.description,
        assets: AssetList(input.assets),
        yearly_price: input.yearly_price,
        published: input.published,
        created_at: now,
        updated_at: now,
    };
    if !CurriculumRule::check(&subject, Operation::Insert, &candidate).is_allowed() {
        debug!("Module insert denied");
        return Ok(None);
    }

    let active = curriculum_module::ActiveModel {
        title: Set(candidate.title),
        grade: Set(candidate.grade),
        subject: Set(candidate.subject),
        module: Set(candidate.module),
        description: Set(candidate.description),
        assets: Set(candidate.assets),
        yearly_price: Set(candidate.yearly_price),
        published: Set(candidate.published),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(Some(active.insert(db).await?))
}

// Loads a module and checks `op` on it; None when missing or denied.
async fn load_for_write(
    db: &DatabaseConnection,
    subject: &Subject,
    id: i64,
    op: Operation,
) -> Result<Option<curriculum_module::Model>> {
    let Some(current) = CurriculumModule::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    if !CurriculumRule::check(subject, op, &current).is_allowed() {
        debug!(?op, id, "Module write denied");
        return Ok(None);
    }
    Ok(Some(current))
}

/// Replaces every editable field of a module (admin only).
///
/// # Errors
/// Returns an error if the input is invalid or the update fails.
#[instrument(skip(db, input))]
pub async fn update_module(
    db: &DatabaseConnection,
    requester: &Requester,
    id: i64,
    input: ModuleInput,
) -> Result<Option<curriculum_module::Model>> {
    validate(&input)?;

    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = load_for_write(db, &subject, id, Operation::Update).await? else {
        return Ok(None);
    };

    let mut active: curriculum_module::ActiveModel = current.into();
    active.title = Set(input.title.trim().to_string());
    active.grade = Set(input.grade);
    active.subject = Set(input.subject.trim().to_string());
    active.module = Set(input.module.trim().to_string());
    active.description = Set(input.description);
    active.assets = Set(AssetList(input.assets));
    active.yearly_price = Set(input.yearly_price);
    active.published = Set(input.published);
    active.updated_at = Set(chrono::Utc::now());
    Ok(Some(active.update(db).await?))
}

/// Publishes or hides a module (admin only).
///
/// # Errors
/// Returns an error if the lookup or the update fails.
#[instrument(skip(db))]
pub async fn set_published(
    db: &DatabaseConnection,
    requester: &Requester,
    id: i64,
    published: bool,
) -> Result<Option<curriculum_module::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = load_for_write(db, &subject, id, Operation::Update).await? else {
        return Ok(None);
    };

    let mut active: curriculum_module::ActiveModel = current.into();
    active.published = Set(published);
    active.updated_at = Set(chrono::Utc::now());
    Ok(Some(active.update(db).await?))
}

/// Appends `code` as an inline-encoded code asset (admin only).
///
/// # Errors
/// Returns an error if the label is empty or the update fails.
#[instrument(skip(db, code))]
pub async fn append_code_asset(
    db: &DatabaseConnection,
    requester: &Requester,
    id: i64,
    label: &str,
    code: &str,
) -> Result<Option<curriculum_module::Model>> {
    if label.trim().is_empty() {
        return Err(Error::validation("Asset label cannot be empty"));
    }

    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = load_for_write(db, &subject, id, Operation::Update).await? else {
        return Ok(None);
    };

    let mut assets = current.assets.clone();
    assets.0.push(code_asset(label, code));
    let mut active: curriculum_module::ActiveModel = current.into();
    active.assets = Set(assets);
    active.updated_at = Set(chrono::Utc::now());
    Ok(Some(active.update(db).await?))
}

/// Deletes a module (admin only).
///
/// # Errors
/// Returns an error if the database query fails.
#[instrument(skip(db))]
pub async fn delete_module(
    db: &DatabaseConnection,
    requester: &Requester,
    id: i64,
) -> Result<Option<curriculum_module::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = load_for_write(db, &subject, id, Operation::Delete).await? else {
        return Ok(None);
    };
    CurriculumModule::delete_by_id(id).exec(db).await?;
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_module_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let admin = Requester::Principal(Uuid::new_v4());

        let mut input = sample_module_input("Hover Basics", true);
        input.title = "  ".to_string();
        let result = create_module(&db, &admin, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let mut input = sample_module_input("Hover Basics", true);
        input.grade = 0;
        let result = create_module(&db, &admin, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let mut input = sample_module_input("Hover Basics", true);
        input.yearly_price = Some(f64::NAN);
        let result = create_module(&db, &admin, input).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: _ }));

        let mut input = sample_module_input("Hover Basics", true);
        input.assets.push(AssetRef {
            kind: AssetKind::Video,
            location: String::new(),
            label: "Intro".to_string(),
        });
        let result = create_module(&db, &admin, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_customer_cannot_create_module() -> Result<()> {
        let world = setup_world().await?;
        let created = create_module(
            &world.db,
            &world.customer_requester(),
            sample_module_input("Hover Basics", true),
        )
        .await?;
        assert!(created.is_none());
        assert!(CurriculumModule::find().all(&world.db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unpublished_module_hidden_from_customer() -> Result<()> {
        let world = setup_world().await?;
        let hidden = create_test_module(&world.db, &world.admin_requester(), "Draft", false).await?;
        let public = create_test_module(&world.db, &world.admin_requester(), "Live", true).await?;

        let filter = ModuleFilter::default();
        let seen = list_modules(&world.db, &world.customer_requester(), &filter).await?;
        assert_eq!(seen, vec![public.clone()]);
        assert!(get_module(&world.db, &world.customer_requester(), hidden.id).await?.is_none());
        assert!(get_module(&world.db, &Requester::Anonymous, hidden.id).await?.is_none());

        let admin_view = list_modules(&world.db, &world.admin_requester(), &filter).await?;
        assert_eq!(admin_view.len(), 2);
        assert_eq!(
            get_module(&world.db, &world.admin_requester(), hidden.id).await?.unwrap().id,
            hidden.id
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_toggle() -> Result<()> {
        let world = setup_world().await?;
        let draft = create_test_module(&world.db, &world.admin_requester(), "Draft", false).await?;

        assert!(
            set_published(&world.db, &world.customer_requester(), draft.id, true)
                .await?
                .is_none()
        );

        let published = set_published(&world.db, &world.admin_requester(), draft.id, true)
            .await?
            .unwrap();
        assert!(published.published);
        assert!(get_module(&world.db, &Requester::Anonymous, draft.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_and_ordering() -> Result<()> {
        let world = setup_world().await?;
        let admin = world.admin_requester();

        let mut input = sample_module_input("Batteries", true);
        input.grade = 8;
        input.subject = "Electronics".to_string();
        create_module(&world.db, &admin, input).await?.unwrap();

        let mut input = sample_module_input("Lift", true);
        input.grade = 7;
        input.subject = "Aerodynamics".to_string();
        create_module(&world.db, &admin, input).await?.unwrap();

        let mut input = sample_module_input("Motors", true);
        input.grade = 7;
        input.subject = "Electronics".to_string();
        create_module(&world.db, &admin, input).await?.unwrap();

        let all = list_modules(&world.db, &Requester::Anonymous, &ModuleFilter::default()).await?;
        let titles: Vec<_> = all.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Lift", "Motors", "Batteries"]);

        let filter = ModuleFilter {
            grade: Some(7),
            subject: Some("electronics".to_string()),
        };
        let narrowed = list_modules(&world.db, &Requester::Anonymous, &filter).await?;
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].title, "Motors");
        Ok(())
    }

    #[tokio::test]
    async fn test_code_assets_round_trip_through_storage() -> Result<()> {
        let world = setup_world().await?;
        let admin = world.admin_requester();
        let module = create_test_module(&world.db, &admin, "Scripting", true).await?;
        let code = "drone.takeoff()\ndrone.land()\n";

        let updated = append_code_asset(&world.db, &admin, module.id, "Takeoff", code)
            .await?
            .unwrap();
        let stored = &updated.assets.0.last().unwrap().location;
        assert!(snippet::is_encoded(stored));

        let reread = get_module(&world.db, &Requester::Anonymous, module.id).await?.unwrap();
        let snippets = code_snippets(&reread);
        assert_eq!(
            snippets,
            vec![CodeSnippet {
                label: "Takeoff".to_string(),
                code: code.to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_code_snippets_tolerates_bad_payloads() {
        let now = chrono::Utc::now();
        let module = curriculum_module::Model {
            id: 1,
            title: "Broken".to_string(),
            grade: 6,
            subject: "Programming".to_string(),
            module: "Module 1".to_string(),
            description: String::new(),
            assets: AssetList(vec![
                AssetRef {
                    kind: AssetKind::Code,
                    location: "data:text/plain;base64,%%%".to_string(),
                    label: "Corrupt".to_string(),
                },
                AssetRef {
                    kind: AssetKind::Code,
                    location: "print(1)".to_string(),
                    label: "Literal".to_string(),
                },
                AssetRef {
                    kind: AssetKind::Video,
                    location: "https://video.test/1".to_string(),
                    label: "Intro".to_string(),
                },
            ]),
            yearly_price: None,
            published: true,
            created_at: now,
            updated_at: now,
        };

        let snippets = code_snippets(&module);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].code, "");
        assert_eq!(snippets[1].code, "print(1)");
    }

    #[tokio::test]
    async fn test_update_and_delete_module() -> Result<()> {
        let world = setup_world().await?;
        let module = create_test_module(&world.db, &world.admin_requester(), "Old", true).await?;

        let mut input = sample_module_input("New", false);
        input.yearly_price = Some(49.0);
        let updated = update_module(&world.db, &world.admin_requester(), module.id, input.clone())
            .await?
            .unwrap();
        assert_eq!(updated.title, "New");
        assert!(!updated.published);

        assert!(
            update_module(&world.db, &world.customer_requester(), module.id, input)
                .await?
                .is_none()
        );
        assert!(
            delete_module(&world.db, &world.customer_requester(), module.id)
                .await?
                .is_none()
        );

        let deleted = delete_module(&world.db, &world.admin_requester(), module.id).await?;
        assert_eq!(deleted.unwrap().id, module.id);
        assert!(CurriculumModule::find_by_id(module.id).one(&world.db).await?.is_none());
        Ok(())
    }
}
