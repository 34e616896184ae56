// Manifest format tests against a complete real-world manifest

use maltster::Manifest;
use maltster::manifest::{BottleSpec, Conflict, Dependency};

const GO_PARQUET_TOOLS: &str = r#"
formula "go-parquet-tools" do
  desc "Utility to deal with Parquet data"
  homepage "https://github.com/hangxie/parquet-tools"
  url "https://github.com/hangxie/parquet-tools/archive/v1.0.1.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  license "BSD-3-Clause"

  bottle do
    cellar :any_skip_relocation
    sha256 arm64_big_sur: "b233737eb56868ab62e2a9d64ee4f798b97088cba2834671946112c60ac4cc46"
    sha256 big_sur: "7dc5db8e42bb8b8eb147738a5c9a41eba06f18bc9cc29bc7aef356a8376deec6"
    sha256 catalina: "8a452452cdd5e32e9a682be1290506d70b8519b780d3039239f9c7bc98d12976"
    sha256 mojave: "24aaac5f6c5875456c953df2413e0357f9d9ccd091e79c8b36ce86d027bcd624"
  end

  depends_on "go" => :build

  conflicts_with "parquet-tools", because: "both install `parquet-tools` executables"

  resource "test-parquet" do
    url "https://github.com/hangxie/parquet-tools/raw/v1.0.1/cmd/testdata/good.parquet"
    sha256 "d6ab36ac8bd23da136b7f8bd2a6c188db6421ea4e85870e247e57ddf554584ed"
  end

  install do
    build "go build -ldflags '-s -w -X main.version=v{version} -X main.build={timestamp}' -o parquet-tools"
    bin "parquet-tools"
  end

  test do
    stage "test-parquet"
    run "{bin}/parquet-tools schema {staging}/good.parquet"
    assert_match "name=Parquet_go_root"
  end
end
"#;

#[test]
fn test_parse_go_parquet_tools() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();

    assert_eq!(manifest.name, "go-parquet-tools");
    assert_eq!(manifest.desc.as_deref(), Some("Utility to deal with Parquet data"));
    assert_eq!(
        manifest.homepage.as_deref(),
        Some("https://github.com/hangxie/parquet-tools")
    );
    assert_eq!(
        manifest.sha256,
        "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
    );
    assert_eq!(manifest.license.as_deref(), Some("BSD-3-Clause"));
    assert_eq!(manifest.effective_version().unwrap(), "1.0.1");
}

#[test]
fn test_bottle_table() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();
    let BottleSpec { cellar, sha256 } = manifest.bottle.unwrap();

    assert_eq!(cellar.as_deref(), Some("any_skip_relocation"));
    assert_eq!(sha256.len(), 4);
    assert_eq!(
        sha256.get("arm64_big_sur").unwrap(),
        "b233737eb56868ab62e2a9d64ee4f798b97088cba2834671946112c60ac4cc46"
    );
    assert_eq!(
        sha256.get("mojave").unwrap(),
        "24aaac5f6c5875456c953df2413e0357f9d9ccd091e79c8b36ce86d027bcd624"
    );
}

#[test]
fn test_dependencies_and_conflicts() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();

    assert_eq!(
        manifest.dependencies,
        vec![Dependency {
            name: "go".into(),
            build: true
        }]
    );
    assert_eq!(
        manifest.conflicts,
        vec![Conflict {
            name: "parquet-tools".into(),
            because: "both install `parquet-tools` executables".into()
        }]
    );
}

#[test]
fn test_resources_and_test_block() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();

    let resource = manifest.resource("test-parquet").unwrap();
    assert_eq!(
        resource.url,
        "https://github.com/hangxie/parquet-tools/raw/v1.0.1/cmd/testdata/good.parquet"
    );

    let test = manifest.test.as_ref().unwrap();
    assert_eq!(test.stage, vec!["test-parquet"]);
    assert_eq!(test.run, "{bin}/parquet-tools schema {staging}/good.parquet");
    assert_eq!(test.assert_match, "name=Parquet_go_root");
}

#[test]
fn test_install_block() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();

    assert_eq!(manifest.install.build.len(), 1);
    assert!(manifest.install.build[0].starts_with("go build"));
    assert!(manifest.install.build[0].contains("{version}"));
    assert!(manifest.install.build[0].contains("{timestamp}"));
    assert_eq!(manifest.install.bin, vec!["parquet-tools"]);
}

#[test]
fn test_round_trip_fidelity() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();
    let serialized = manifest.to_dsl();
    let reparsed = Manifest::parse(&serialized).unwrap();

    assert_eq!(manifest, reparsed);

    // And the canonical form itself is a fixed point
    assert_eq!(serialized, reparsed.to_dsl());
}

#[test]
fn test_serialized_text_quotes_backticks_verbatim() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();
    let serialized = manifest.to_dsl();
    assert!(serialized.contains("because: \"both install `parquet-tools` executables\""));
}

#[test]
fn test_json_round_trip() {
    let manifest = Manifest::parse(GO_PARQUET_TOOLS).unwrap();
    let json = serde_json::to_string(&manifest).unwrap();
    let back: Manifest = serde_json::from_str(&json).unwrap();
    assert_eq!(manifest, back);
}

#[test]
fn test_manifest_file_matches_inline_copy() {
    // The shipped sample manifest stays in sync with this test corpus
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("manifests/go-parquet-tools.formula");
    let from_file = Manifest::from_path(&path).unwrap();
    let inline = Manifest::parse(GO_PARQUET_TOOLS).unwrap();
    assert_eq!(from_file, inline);
}
