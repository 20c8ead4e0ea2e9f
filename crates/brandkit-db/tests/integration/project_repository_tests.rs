use std::collections::BTreeMap;

use brandkit_core::error::{AppError, UpstreamReason};
use brandkit_core::models::{
    BusinessProfile, Completeness, GenerationFailure, Language, Output, OutputType, ProfileFacts,
};
use brandkit_core::project::{Project, ProjectStage, Stage, StageFailure};
use brandkit_core::traits::ProjectStore;
use brandkit_db::{AnyStore, Database, ProjectRepository};

use crate::integration::common::setup_test_db;

fn profile(name: &str) -> BusinessProfile {
    let mut additional = BTreeMap::new();
    additional.insert("language".to_string(), "en".to_string());
    BusinessProfile::from_facts(
        "https://example.com",
        ProfileFacts {
            name: Some(name.into()),
            description: Some("Fresh bread daily".into()),
            offerings: vec!["Sourdough".into(), "Bagels".into()],
            additional,
            ..Default::default()
        },
        Some("# Example\nFresh bread".into()),
    )
}

#[tokio::test]
async fn insert_get_and_list_projects() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let first = Project::new("https://example.com", None).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = Project::new("https://bakery.example.org", Some("Bakery")).unwrap();
    repo.insert_project(&first).await.unwrap();
    repo.insert_project(&second).await.unwrap();

    let fetched = repo.get_project(first.id).await.unwrap().expect("stored");
    assert_eq!(fetched.url, first.url);
    assert_eq!(fetched.name, "example.com");
    assert_eq!(fetched.stage, ProjectStage::Created);
    assert!(fetched.last_failure.is_none());

    let ids: Vec<_> = repo
        .list_projects()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn duplicate_insert_is_a_conflict() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let project = Project::new("https://example.com", None).unwrap();
    repo.insert_project(&project).await.unwrap();
    let err = repo.insert_project(&project).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn update_persists_stage_and_failure() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let mut project = Project::new("https://example.com", None).unwrap();
    repo.insert_project(&project).await.unwrap();

    project.transition(ProjectStage::Scanning);
    project.last_failure = Some(StageFailure::from_error(
        Stage::Scan,
        &AppError::upstream(UpstreamReason::Timeout, "site did not answer"),
    ));
    repo.update_project(&project).await.unwrap();

    let stored = repo.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(stored.stage, ProjectStage::Scanning);
    let failure = stored.last_failure.expect("failure persisted");
    assert_eq!(failure.stage, Stage::Scan);
    assert_eq!(failure.reason, Some(UpstreamReason::Timeout));
}

#[tokio::test]
async fn update_of_unknown_project_is_not_found() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let project = Project::new("https://example.com", None).unwrap();
    let err = repo.update_project(&project).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn replace_profile_swaps_the_whole_profile() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let mut project = Project::new("https://example.com", None).unwrap();
    repo.insert_project(&project).await.unwrap();
    assert!(repo.get_profile(project.id).await.unwrap().is_none());

    project.transition(ProjectStage::Profiled);
    repo.replace_profile(&project, &profile("Old Bakery"))
        .await
        .unwrap();
    repo.replace_profile(&project, &profile("New Bakery"))
        .await
        .unwrap();

    let stored = repo.get_profile(project.id).await.unwrap().unwrap();
    assert_eq!(stored.facts.name.as_deref(), Some("New Bakery"));
    assert_eq!(stored.facts.offerings, vec!["Sourdough", "Bagels"]);
    assert_eq!(stored.facts.additional.get("language").map(String::as_str), Some("en"));
    assert!(matches!(stored.completeness, Completeness::Full | Completeness::Partial { .. }));
    assert_eq!(stored.fingerprint, profile("New Bakery").fingerprint);
    assert_eq!(
        repo.get_project(project.id).await.unwrap().unwrap().stage,
        ProjectStage::Profiled
    );
}

#[tokio::test]
async fn replace_profile_for_deleted_project_leaves_nothing_behind() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let project = Project::new("https://example.com", None).unwrap();
    let err = repo
        .replace_profile(&project, &profile("Ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(repo.get_profile(project.id).await.unwrap().is_none());
}

#[tokio::test]
async fn commit_outputs_upserts_by_type_and_language() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let mut project = Project::new("https://example.com", None).unwrap();
    repo.insert_project(&project).await.unwrap();

    let failure = GenerationFailure {
        reason: UpstreamReason::RateLimited,
        message: "slow down".into(),
    };
    repo.commit_outputs(
        &project,
        &[
            Output::succeeded(project.id, OutputType::Tagline, Language::En, "v1".into()),
            Output::failed(project.id, OutputType::AdCopy, Language::En, &failure),
        ],
    )
    .await
    .unwrap();

    project.transition(ProjectStage::Generated);
    repo.commit_outputs(
        &project,
        &[
            Output::succeeded(project.id, OutputType::Tagline, Language::En, "v2".into()),
            Output::succeeded(project.id, OutputType::Tagline, Language::De, "v2 de".into()),
        ],
    )
    .await
    .unwrap();

    let outputs = repo.list_outputs(project.id).await.unwrap();
    let keys: Vec<_> = outputs
        .iter()
        .map(|o| (o.output_type, o.language))
        .collect();
    assert_eq!(
        keys,
        vec![
            (OutputType::AdCopy, Language::En),
            (OutputType::Tagline, Language::De),
            (OutputType::Tagline, Language::En),
        ]
    );
    assert!(!outputs[0].is_succeeded());
    assert_eq!(outputs[1].content, "v2 de");
    assert_eq!(outputs[2].content, "v2");
    assert_eq!(
        repo.get_project(project.id).await.unwrap().unwrap().stage,
        ProjectStage::Generated
    );
}

#[tokio::test]
async fn delete_cascades_to_profile_and_outputs() {
    let (pool, _container) = setup_test_db().await;
    let repo = ProjectRepository::new(pool);

    let project = Project::new("https://example.com", None).unwrap();
    repo.insert_project(&project).await.unwrap();
    repo.replace_profile(&project, &profile("Bakery"))
        .await
        .unwrap();
    repo.commit_outputs(
        &project,
        &[Output::succeeded(
            project.id,
            OutputType::SeoMeta,
            Language::En,
            "meta".into(),
        )],
    )
    .await
    .unwrap();

    assert!(repo.delete_project(project.id).await.unwrap());
    assert!(!repo.delete_project(project.id).await.unwrap());
    assert!(repo.get_project(project.id).await.unwrap().is_none());
    assert!(repo.get_profile(project.id).await.unwrap().is_none());
    assert!(repo.list_outputs(project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn any_store_dispatches_to_postgres() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let store = AnyStore::from(db.project_repo());
    assert_eq!(store.backend(), "postgres");
    store.health_check().await.unwrap();

    let project = Project::new("https://example.com", None).unwrap();
    store.insert_project(&project).await.unwrap();
    assert_eq!(store.list_projects().await.unwrap().len(), 1);
}
