//! Demo accounts and catalog for a fresh database.

use thiserror::Error;

use club_core::model::{PathwayDraft, ResourceDraft, User};
use club_core::{Actor, Role};

use crate::app_services::AppServices;
use crate::error::{AuthError, CatalogError};

pub const SEED_ADMIN_PASSWORD: &str = "Admin@123";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// What a seeding run added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admins_created: usize,
    pub resources_created: usize,
    pub pathways_created: usize,
}

struct SampleResource {
    title: &'static str,
    url: &'static str,
    kind: &'static str,
    tags: &'static [&'static str],
}

const ADMINS: [(&str, &str, u8); 2] = [
    ("Debashish", "debashish@databiz.com", 4),
    ("Test Admin", "testadmin@databiz.com", 3),
];

const RESOURCES: [SampleResource; 3] = [
    SampleResource {
        title: "Intro to Python",
        url: "https://www.youtube.com/watch?v=rfscVS0vtbw",
        kind: "video",
        tags: &["python", "basics"],
    },
    SampleResource {
        title: "Machine Learning Basics",
        url: "https://www.coursera.org/learn/machine-learning",
        kind: "course",
        tags: &["ML", "AIML"],
    },
    SampleResource {
        title: "Data Analytics with Pandas",
        url: "https://pandas.pydata.org/docs/getting_started/index.html",
        kind: "article",
        tags: &["DA", "python"],
    },
];

/// Create the demo admins, then the sample catalog if no pathway exists yet.
/// Safe to run repeatedly.
///
/// # Errors
///
/// Returns `SeedError` if an account or catalog entry cannot be stored.
pub async fn seed_demo(services: &AppServices) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    let auth = services.auth();

    let mut admins: Vec<User> = Vec::with_capacity(ADMINS.len());
    for (name, email, year) in ADMINS {
        let (user, created) = auth
            .provision(name, email, SEED_ADMIN_PASSWORD, Some(year), Role::Admin)
            .await?;
        if created {
            report.admins_created += 1;
            tracing::info!(email, "seeded admin account");
        } else {
            tracing::info!(email, "admin account already present");
        }
        admins.push(user);
    }
    let [first, second] = [&admins[0], &admins[1]].map(|u| Actor::user(u.id, u.role));

    let catalog = services.catalog();
    if !catalog.list_pathways(&first).await?.is_empty() {
        tracing::info!("catalog already seeded");
        return Ok(report);
    }

    let mut ids = Vec::with_capacity(RESOURCES.len());
    for sample in &RESOURCES {
        let mut draft = ResourceDraft::titled(sample.title).with_kind(sample.kind);
        draft.url = Some(sample.url.to_owned());
        draft.tags = sample.tags.iter().map(|t| (*t).to_owned()).collect();
        ids.push(catalog.create_resource(&first, draft).await?.id);
        report.resources_created += 1;
    }

    let pathways = [
        (
            &first,
            "Data Science Beginner Path",
            "A beginner-friendly pathway to start learning Data Science.",
            "DS",
            vec![ids[0], ids[2]],
        ),
        (
            &second,
            "AI & ML Pathway",
            "Introductory path for AI & ML enthusiasts.",
            "AIML",
            vec![ids[1]],
        ),
    ];
    for (owner, title, description, category, resource_ids) in pathways {
        let draft = PathwayDraft {
            title: title.to_owned(),
            description: Some(description.to_owned()),
            category: Some(category.to_owned()),
            resource_ids,
        };
        catalog.create_pathway(owner, draft).await?;
        report.pathways_created += 1;
    }

    tracing::info!(?report, "seeding complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use club_core::time::fixed_clock;
    use storage::repository::Storage;

    use crate::app_services::ServiceSettings;

    #[tokio::test]
    async fn seeding_twice_adds_nothing_new() {
        let storage = Storage::in_memory();
        let services = AppServices::from_storage(&storage, fixed_clock(), ServiceSettings::default());

        let first = seed_demo(&services).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                admins_created: 2,
                resources_created: 3,
                pathways_created: 2,
            }
        );
        let second = seed_demo(&services).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let pathways = services
            .catalog()
            .list_pathways(&Actor::Anonymous)
            .await
            .unwrap();
        assert_eq!(pathways[0].resources[0].title(), "Intro to Python");
        assert_eq!(pathways[0].resources[1].title(), "Data Analytics with Pandas");

        let login = services
            .auth()
            .login("debashish@databiz.com", SEED_ADMIN_PASSWORD)
            .await
            .unwrap();
        assert_eq!(login.user.role, Role::Admin);
    }
}
