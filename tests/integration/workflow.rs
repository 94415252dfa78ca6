//! End-to-end library flows against temporary stores.

use super::common::{read, TestContext};
use assert_fs::prelude::*;
use yalc::core::path::{local_package_dir, node_modules_dir, node_modules_package_dir};
use yalc::package::{
    remove_packages, update_packages, AddOptions, DependencyKind, LinkMode, Lockfile,
    PackageInstaller, PackageManifest, RemoveOptions, UpdateOptions,
};
use yalc::store::installations::InstallationsRegistry;
use yalc::store::{PublishOptions, PublishOutcome, Publisher, Store};
use yalc::PackageRef;

fn publish_options(dir: &std::path::Path) -> PublishOptions {
    let mut options = PublishOptions::new(dir);
    options.scripts = false;
    options
}

fn add_options(dir: &std::path::Path) -> AddOptions {
    let mut options = AddOptions::new(dir);
    options.scripts = false;
    options
}

#[tokio::test]
async fn test_publish_add_remove_round_trip() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", Some(("my-lib", "^0.5.0")));
    let original_manifest = read(&app.join("package.json"));

    let publisher = Publisher::new(store.clone());
    let outcome = publisher.publish(&publish_options(&lib)).await.unwrap();
    assert!(matches!(outcome, PublishOutcome::Published { .. }));

    let installer = PackageInstaller::new(store.clone());
    installer
        .add_packages(&[PackageRef::parse("my-lib").unwrap()], &add_options(&app))
        .await
        .unwrap();

    assert!(node_modules_package_dir(&app, "my-lib").join("index.js").exists());
    let manifest = PackageManifest::load(&app).unwrap();
    assert_eq!(
        manifest.dependency(DependencyKind::Regular, "my-lib"),
        Some("file:.yalc/my-lib")
    );
    let registry = InstallationsRegistry::load(&store).unwrap();
    assert_eq!(registry.projects("my-lib"), &[app.clone()]);

    let mut remove = RemoveOptions::new(&app);
    remove.all = true;
    remove_packages(&store, &[], &remove).unwrap();

    assert_eq!(read(&app.join("package.json")), original_manifest);
    assert!(!app.join("yalc.lock").exists());
    assert!(!app.join(".yalc").exists());
    assert!(!node_modules_package_dir(&app, "my-lib").exists());
    assert!(InstallationsRegistry::load(&store).unwrap().is_empty());
}

#[tokio::test]
async fn test_retreat_then_restore_without_store() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", Some(("my-lib", "^0.5.0")));

    Publisher::new(store.clone())
        .publish(&publish_options(&lib))
        .await
        .unwrap();
    let installer = PackageInstaller::new(store.clone());
    installer
        .add_packages(&[PackageRef::parse("my-lib").unwrap()], &add_options(&app))
        .await
        .unwrap();

    let mut retreat = RemoveOptions::new(&app);
    retreat.retreat = true;
    remove_packages(&store, &[PackageRef::parse("my-lib").unwrap()], &retreat).unwrap();

    let manifest = PackageManifest::load(&app).unwrap();
    assert_eq!(manifest.dependency(DependencyKind::Regular, "my-lib"), Some("^0.5.0"));
    assert!(!node_modules_package_dir(&app, "my-lib").exists());
    assert!(local_package_dir(&app, "my-lib").join("index.js").exists());
    assert!(Lockfile::load(&app).unwrap().get("my-lib").is_some());

    std::fs::remove_dir_all(store.packages_dir()).unwrap();

    let mut restore = UpdateOptions::new(&app);
    restore.restore = true;
    restore.scripts = false;
    let report = update_packages(&installer, &[], &restore).await.unwrap();

    assert_eq!(report.updated, vec!["my-lib".to_string()]);
    assert!(node_modules_package_dir(&app, "my-lib").join("index.js").exists());
    let manifest = PackageManifest::load(&app).unwrap();
    assert_eq!(
        manifest.dependency(DependencyKind::Regular, "my-lib"),
        Some("file:.yalc/my-lib")
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_link_mode_survives_update() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", None);

    Publisher::new(store.clone())
        .publish(&publish_options(&lib))
        .await
        .unwrap();
    let installer = PackageInstaller::new(store.clone());
    let mut options = add_options(&app);
    options.mode = Some(LinkMode::Symlink {
        rewrite_manifest: false,
    });
    installer
        .add_packages(&[PackageRef::parse("my-lib").unwrap()], &options)
        .await
        .unwrap();

    let mut update = UpdateOptions::new(&app);
    update.scripts = false;
    update_packages(&installer, &[], &update).await.unwrap();

    let installed = node_modules_package_dir(&app, "my-lib");
    assert!(std::fs::symlink_metadata(&installed).unwrap().file_type().is_symlink());
    assert!(PackageManifest::load(&app)
        .unwrap()
        .dependency(DependencyKind::Regular, "my-lib")
        .is_none());
    let entry = Lockfile::load(&app).unwrap().get("my-lib").cloned().unwrap();
    assert!(!entry.file && !entry.link && !entry.pure && !entry.workspace);
}

#[tokio::test]
async fn test_publish_resolves_workspace_and_catalog_specifiers() {
    let ctx = TestContext::new();
    let root = ctx.temp.child("mono");
    std::fs::create_dir_all(root.child("node_modules/sibling").path()).unwrap();
    std::fs::create_dir_all(root.child("packages/lib").path()).unwrap();
    root.child("pnpm-workspace.yaml")
        .write_str("packages:\n  - 'packages/*'\ncatalog:\n  react: ^18.2.0\n")
        .unwrap();
    root.child("node_modules/sibling/package.json")
        .write_str("{\"name\": \"sibling\", \"version\": \"2.3.4\"}")
        .unwrap();
    let lib = root.child("packages/lib");
    lib.child("package.json")
        .write_str(
            "{\"name\": \"lib\", \"version\": \"0.1.0\", \"dependencies\": {\"react\": \"catalog:\", \"sibling\": \"workspace:^\"}}",
        )
        .unwrap();
    lib.child("index.js").write_str("export {}").unwrap();

    let store = Store::new(&ctx.store);
    Publisher::new(store.clone())
        .publish(&publish_options(lib.path()))
        .await
        .unwrap();

    let stored = PackageManifest::load(&store.version_dir("lib", "0.1.0")).unwrap();
    assert_eq!(stored.dependency(DependencyKind::Regular, "react"), Some("^18.2.0"));
    assert_eq!(stored.dependency(DependencyKind::Regular, "sibling"), Some("^2.3.4"));

    let source = PackageManifest::load(lib.path()).unwrap();
    assert_eq!(source.dependency(DependencyKind::Regular, "react"), Some("catalog:"));
}

#[tokio::test]
async fn test_push_prunes_projects_that_removed_the_package() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", None);
    let gone = ctx.app("gone", None);

    let publisher = Publisher::new(store.clone());
    publisher.publish(&publish_options(&lib)).await.unwrap();
    let installer = PackageInstaller::new(store.clone());
    for project in [&app, &gone] {
        installer
            .add_packages(&[PackageRef::parse("my-lib").unwrap()], &add_options(project))
            .await
            .unwrap();
    }
    std::fs::remove_file(gone.join("yalc.lock")).unwrap();

    let mut push = publish_options(&lib);
    push.push = true;
    let outcome = publisher.publish(&push).await.unwrap();

    assert!(matches!(outcome, PublishOutcome::Published { pushed: 1, .. }));
    let registry = InstallationsRegistry::load(&store).unwrap();
    assert_eq!(registry.projects("my-lib"), &[app.clone()]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_add_link_rewrites_manifest_and_unwires_on_remove() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", Some(("my-lib", "^0.5.0")));

    let publisher = Publisher::new(store.clone());
    publisher.publish(&publish_options(&lib)).await.unwrap();
    let installer = PackageInstaller::new(store.clone());
    let mut options = add_options(&app);
    options.mode = Some(LinkMode::Symlink {
        rewrite_manifest: true,
    });
    installer
        .add_packages(&[PackageRef::parse("my-lib").unwrap()], &options)
        .await
        .unwrap();

    let installed = node_modules_package_dir(&app, "my-lib");
    assert_eq!(
        std::fs::read_link(&installed).unwrap(),
        local_package_dir(&app, "my-lib")
    );
    assert_eq!(
        PackageManifest::load(&app)
            .unwrap()
            .dependency(DependencyKind::Regular, "my-lib"),
        Some("link:.yalc/my-lib")
    );
    let entry = Lockfile::load(&app).unwrap().get("my-lib").cloned().unwrap();
    assert!(entry.link);
    assert_eq!(entry.replaced.as_deref(), Some("^0.5.0"));

    std::fs::write(lib.join("index.js"), "module.exports = 'linked';\n").unwrap();
    publisher.publish(&publish_options(&lib)).await.unwrap();
    let mut update = UpdateOptions::new(&app);
    update.scripts = false;
    update_packages(&installer, &[], &update).await.unwrap();

    assert_eq!(read(&installed.join("index.js")), "module.exports = 'linked';\n");
    assert!(std::fs::symlink_metadata(&installed).unwrap().file_type().is_symlink());
    assert!(Lockfile::load(&app).unwrap().get("my-lib").unwrap().link);

    remove_packages(
        &store,
        &[PackageRef::parse("my-lib").unwrap()],
        &RemoveOptions::new(&app),
    )
    .unwrap();

    assert!(std::fs::symlink_metadata(&installed).is_err());
    assert!(!app.join(".yalc").exists());
    assert_eq!(
        PackageManifest::load(&app)
            .unwrap()
            .dependency(DependencyKind::Regular, "my-lib"),
        Some("^0.5.0")
    );
}

#[tokio::test]
async fn test_path_like_names_never_touch_the_project() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", None);
    std::fs::create_dir_all(app.join("src")).unwrap();
    std::fs::write(app.join("src").join("main.js"), "main").unwrap();

    Publisher::new(store.clone())
        .publish(&publish_options(&lib))
        .await
        .unwrap();
    let installer = PackageInstaller::new(store.clone());
    installer
        .add_packages(&[PackageRef::parse("my-lib").unwrap()], &add_options(&app))
        .await
        .unwrap();

    assert!(PackageRef::parse("..").is_err());
    assert!(PackageRef::parse("../app").is_err());

    let unchecked = |name: &str| PackageRef {
        name: name.to_string(),
        version: None,
    };
    let report = remove_packages(
        &store,
        &[unchecked(".."), unchecked("../src"), unchecked("@scope/..")],
        &RemoveOptions::new(&app),
    )
    .unwrap();
    assert!(report.removed.is_empty());

    let added = installer
        .add_packages(&[unchecked("../escape")], &add_options(&app))
        .await
        .unwrap();
    assert_eq!(added.failed, vec!["../escape".to_string()]);

    assert_eq!(read(&app.join("src").join("main.js")), "main");
    assert!(local_package_dir(&app, "my-lib").join("index.js").exists());
    assert!(node_modules_package_dir(&app, "my-lib").join("index.js").exists());
    assert!(Lockfile::load(&app).unwrap().get("my-lib").is_some());
}

#[tokio::test]
async fn test_partial_batch_commits_successful_packages() {
    let ctx = TestContext::new();
    let store = Store::new(&ctx.store);
    let publisher = Publisher::new(store.clone());
    for lib in [ctx.library("my-lib", "1.0.0"), ctx.library("@scope/beta", "1.0.0")] {
        publisher.publish(&publish_options(&lib)).await.unwrap();
    }
    let app = ctx.app("app", None);
    std::fs::create_dir_all(node_modules_dir(&app)).unwrap();
    std::fs::write(node_modules_dir(&app).join("@scope"), "blocking file").unwrap();

    let installer = PackageInstaller::new(store.clone());
    let batch = [
        PackageRef::parse("@scope/beta").unwrap(),
        PackageRef::parse("my-lib").unwrap(),
    ];
    let report = installer
        .add_packages(&batch, &add_options(&app))
        .await
        .unwrap();

    assert_eq!(report.failed, vec!["@scope/beta".to_string()]);
    assert_eq!(report.added.len(), 1);
    let manifest = PackageManifest::load(&app).unwrap();
    assert_eq!(
        manifest.dependency(DependencyKind::Regular, "my-lib"),
        Some("file:.yalc/my-lib")
    );
    assert_eq!(manifest.dependency(DependencyKind::Regular, "@scope/beta"), None);
    let lockfile = Lockfile::load(&app).unwrap();
    assert!(lockfile.get("my-lib").is_some());
    assert!(lockfile.get("@scope/beta").is_none());
    let registry = InstallationsRegistry::load(&store).unwrap();
    assert_eq!(registry.projects("my-lib"), &[app.clone()]);
    assert!(registry.projects("@scope/beta").is_empty());

    std::fs::remove_file(node_modules_dir(&app).join("@scope")).unwrap();
    let retry = installer
        .add_packages(&batch[..1], &add_options(&app))
        .await
        .unwrap();
    assert!(retry.failed.is_empty());
    assert!(node_modules_package_dir(&app, "@scope/beta").join("index.js").exists());
    assert!(Lockfile::load(&app).unwrap().get("my-lib").is_some());
}
