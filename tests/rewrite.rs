use kodegen_release_pipeline::version::{ManifestRewriter, RewriteRequest, read_version};
use semver::Version;
use std::path::Path;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/workspace");

async fn rewrite_copy(name: &str, new: &str, optimistic: &[&str]) -> (tempfile::TempDir, usize) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::copy(Path::new(FIXTURES).join(name), &path).unwrap();

    let current = read_version(&path).await.unwrap();
    let new = Version::parse(new).unwrap();
    let targets: Vec<String> = optimistic.iter().map(|s| s.to_string()).collect();
    let request = RewriteRequest {
        current: &current,
        new: &new,
        optimistic_targets: &targets,
        pinned_only: false,
    };
    let report = ManifestRewriter::default().rewrite(&path, &request).await.unwrap();
    (dir, report.lines_changed)
}

#[tokio::test]
async fn rewritten_manifests_declare_the_new_version() {
    for name in [
        "FritzCore.podspec",
        "FritzBase.podspec",
        "Fritz.podspec",
        "FritzVisionLabelModelFast.podspec",
    ] {
        let (dir, changed) = rewrite_copy(name, "1.4.0-beta.1", &[]).await;
        assert!(changed > 0, "{name}");
        assert_eq!(
            read_version(&dir.path().join(name)).await.unwrap(),
            Version::parse("1.4.0-beta.1").unwrap(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn base_manifest_keeps_frozen_dependency() {
    let (dir, changed) = rewrite_copy("FritzBase.podspec", "1.3.0", &[]).await;
    let text = std::fs::read_to_string(dir.path().join("FritzBase.podspec")).unwrap();

    // version and source lines only
    assert_eq!(changed, 2);
    assert!(text.contains("vision.dependency 'OpenCV', '3.4.2'"));
    assert!(text.contains("/FritzBase/1.3.0/FritzBase.zip"));
}

#[tokio::test]
async fn rewriting_to_the_current_version_changes_nothing() {
    let original = std::fs::read_to_string(Path::new(FIXTURES).join("Fritz.podspec")).unwrap();
    let (dir, changed) =
        rewrite_copy("Fritz.podspec", "1.2.0", &["FritzVisionLabelModelFast"]).await;

    assert_eq!(changed, 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Fritz.podspec")).unwrap(),
        original
    );
}

#[tokio::test]
async fn missing_manifest_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Nope.podspec");
    let current = Version::new(1, 0, 0);
    let new = Version::new(1, 1, 0);
    let request = RewriteRequest {
        current: &current,
        new: &new,
        optimistic_targets: &[],
        pinned_only: false,
    };

    let err = ManifestRewriter::default().rewrite(&path, &request).await.unwrap_err();
    assert!(matches!(
        err,
        kodegen_release_pipeline::ReleaseError::MissingManifest { .. }
    ));
}
