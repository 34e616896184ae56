// Offline end-to-end workflow tests
// Exercise build -> install -> link -> receipt -> test -> uninstall in a
// temporary prefix, with no network access.


use maltster::pipeline::{InstallOptions, Pipeline};
use maltster::receipt::InstallReceipt;
use maltster::{MaltError, Manifest, cellar, check};
use std::path::Path;
use std::time::Instant;
use test_helpers::TestEnvironment;

/// A manifest whose "build" just copies a shell script into place
fn widget_manifest() -> Manifest {
    Manifest::parse(
        r#"
formula "widget" do
  desc "Tiny test package"
  url "https://example.com/widget/archive/v1.2.3.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  license "MIT"

  conflicts_with "gadget", because: "both install `widget` executables"

  install do
    build "cp widget.sh widget"
    bin "widget"
  end

  test do
    run "{bin}/widget"
    assert_match "name=Parquet_go_root"
  end
end
"#,
    )
    .unwrap()
}

fn pipeline_for(env: &TestEnvironment) -> Pipeline {
    Pipeline::with_roots(env.prefix.clone(), env.cache.clone()).unwrap()
}

/// Stage a fake source tree the way extract would have left it
fn stage_source(env: &TestEnvironment, script: &str) -> std::path::PathBuf {
    let build_root = env.cache.join("build/widget-1.2.3/widget-1.2.3");
    std::fs::create_dir_all(&build_root).unwrap();
    std::fs::write(build_root.join("widget.sh"), script).unwrap();
    build_root
}

fn install_widget(env: &TestEnvironment, pipeline: &Pipeline) -> maltster::InstallResult {
    let build_root = stage_source(env, "#!/bin/sh\necho name=Parquet_go_root\n");
    pipeline
        .install_from_source(
            &widget_manifest(),
            &build_root,
            InstallOptions::default(),
            Instant::now(),
        )
        .unwrap()
}

#[test]
fn test_install_creates_keg_link_and_receipt() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);

    let result = install_widget(&env, &pipeline);

    assert_eq!(result.name, "widget");
    assert_eq!(result.version, "1.2.3");
    assert!(result.linked);

    let keg = cellar::keg_path(&env.prefix, "widget", "1.2.3");
    assert_eq!(result.path, keg);
    assert!(keg.join("bin/widget").exists());

    let receipt = InstallReceipt::read(&keg).unwrap();
    assert_eq!(receipt.version, "1.2.3");
    assert!(receipt.built_from_source);
    assert_eq!(receipt.source.url, "https://example.com/widget/archive/v1.2.3.tar.gz");

    // Linked into the prefix bin with a relative symlink
    let link = env.prefix.join("bin/widget");
    assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    assert!(
        std::fs::read_link(&link)
            .unwrap()
            .starts_with(Path::new("../Cellar/widget"))
    );
}

#[test]
fn test_installed_package_passes_smoke_test() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);
    install_widget(&env, &pipeline);

    let report = check::run_test(&widget_manifest(), &env.prefix, &env.staging).unwrap();
    assert!(report.output.contains("name=Parquet_go_root"));
}

#[test]
fn test_smoke_test_fails_on_wrong_output() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);

    let build_root = stage_source(&env, "#!/bin/sh\necho something else entirely\n");
    pipeline
        .install_from_source(
            &widget_manifest(),
            &build_root,
            InstallOptions::default(),
            Instant::now(),
        )
        .unwrap();

    let e = check::run_test(&widget_manifest(), &env.prefix, &env.staging).unwrap_err();
    match e {
        MaltError::TestAssertionFailed { expected } => {
            assert_eq!(expected, "name=Parquet_go_root");
        }
        other => panic!("unexpected error: {other}"),
    }

    // A failed smoke test does not roll back the installation
    assert!(cellar::keg_path(&env.prefix, "widget", "1.2.3").exists());
}

#[test]
fn test_conflicting_keg_blocks_install() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);

    std::fs::create_dir_all(cellar::keg_path(&env.prefix, "gadget", "0.1.0")).unwrap();

    let rt = tokio::runtime::Runtime::new().unwrap();
    let e = rt
        .block_on(pipeline.install(&widget_manifest(), InstallOptions::default()))
        .unwrap_err();

    assert!(matches!(e, MaltError::Conflict { .. }));

    // Conflict fires before fetch/build/install: nothing was created
    assert!(!cellar::keg_path(&env.prefix, "widget", "1.2.3").exists());
}

#[test]
fn test_build_failure_aborts_before_install() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);

    let manifest = Manifest::parse(
        r#"
formula "widget" do
  url "https://example.com/widget/archive/v1.2.3.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  install do
    build "false"
    bin "widget"
  end
end
"#,
    )
    .unwrap();

    let build_root = stage_source(&env, "#!/bin/sh\n");
    let e = pipeline
        .install_from_source(&manifest, &build_root, InstallOptions::default(), Instant::now())
        .unwrap_err();

    assert!(matches!(e, MaltError::BuildFailed { code: 1, .. }));
    assert!(!cellar::keg_path(&env.prefix, "widget", "1.2.3").join("bin/widget").exists());
}

#[test]
fn test_uninstall_removes_keg_and_link() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);
    install_widget(&env, &pipeline);

    let results = pipeline.uninstall("widget").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].version, "1.2.3");
    assert!(results[0].unlinked);

    assert!(!cellar::cellar_path(&env.prefix).join("widget").exists());
    assert!(env.prefix.join("bin/widget").symlink_metadata().is_err());
}

#[test]
fn test_list_installed_after_install() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);
    install_widget(&env, &pipeline);

    let kegs = cellar::list_installed(&env.prefix).unwrap();
    assert_eq!(kegs.len(), 1);
    assert_eq!(kegs[0].name, "widget");
    assert_eq!(kegs[0].version, "1.2.3");
    assert!(kegs[0].receipt.is_some());
}

#[test]
fn test_reinstall_overwrites_cleanly() {
    let env = TestEnvironment::new();
    let pipeline = pipeline_for(&env);

    install_widget(&env, &pipeline);
    let second = install_widget(&env, &pipeline);

    assert_eq!(second.version, "1.2.3");
    assert!(second.linked);
    assert_eq!(cellar::installed_versions(&env.prefix, "widget").unwrap().len(), 1);
}
