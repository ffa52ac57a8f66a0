//! Unit tests for bundle packaging.

use super::*;
use rstest::{fixture, rstest};
use std::io::Read;
use tempfile::TempDir;

struct Layout {
    _temp: TempDir,
    output: Utf8PathBuf,
    workspace: Utf8PathBuf,
}

#[fixture]
fn layout() -> Layout {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = Utf8PathBuf::try_from(temp.path().join("dist")).expect("UTF-8 path");
    let workspace = output.join("offline_builder_v1.0");
    for dir in ["binaries", "artifact_definitions/Windows", "external_tools/t1"] {
        fs::create_dir_all(workspace.join(dir)).expect("mkdir");
    }
    fs::write(workspace.join("artifact_definitions/Windows/A.yaml"), "name: A\n").expect("write");
    fs::write(workspace.join("external_tools/t1.zip"), b"PK").expect("write");
    fs::write(workspace.join("external_tools/t1/t1.exe"), b"MZ").expect("write");
    fs::write(workspace.join("external_tools_manifest.json"), "{}\n").expect("write");
    Layout {
        _temp: temp,
        output,
        workspace,
    }
}

fn params(layout: &Layout, output: &Utf8Path) -> PackageParams {
    PackageParams {
        workspace_dir: layout.workspace.clone(),
        output_dir: output.to_owned(),
        version: CorpusVersion::try_from("1.0").expect("valid version"),
    }
}

fn entry_names(archive_path: &Utf8Path) -> Vec<String> {
    let file = fs::File::open(archive_path).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("read archive");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("entry").name().to_owned())
        .collect()
}

#[rstest]
fn archive_is_rooted_at_bundle_stem(layout: Layout) {
    let output = assemble(&params(&layout, &layout.output)).expect("assemble");

    assert_eq!(output.archive_path, layout.output.join("offline_builder_v1.0.zip"));
    assert_eq!(output.file_count, 4);
    let names = entry_names(&output.archive_path);
    assert_eq!(
        names,
        vec![
            "offline_builder_v1.0/",
            "offline_builder_v1.0/artifact_definitions/",
            "offline_builder_v1.0/artifact_definitions/Windows/",
            "offline_builder_v1.0/artifact_definitions/Windows/A.yaml",
            "offline_builder_v1.0/binaries/",
            "offline_builder_v1.0/external_tools/",
            "offline_builder_v1.0/external_tools/t1/",
            "offline_builder_v1.0/external_tools/t1/t1.exe",
            "offline_builder_v1.0/external_tools/t1.zip",
            "offline_builder_v1.0/external_tools_manifest.json",
        ]
    );
}

#[rstest]
fn file_contents_survive_packaging(layout: Layout) {
    let output = assemble(&params(&layout, &layout.output)).expect("assemble");
    let file = fs::File::open(&output.archive_path).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("read archive");
    let mut entry = archive
        .by_name("offline_builder_v1.0/artifact_definitions/Windows/A.yaml")
        .expect("definition entry");
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("read entry");
    assert_eq!(text, "name: A\n");
}

#[rstest]
fn temporaries_are_never_packaged(layout: Layout) {
    fs::write(layout.workspace.join("external_tools/late.exe.download"), b"half")
        .expect("write partial");
    fs::create_dir_all(layout.workspace.join("external_tools/.t2.partial")).expect("mkdir");
    fs::write(layout.workspace.join("external_tools/.t2.partial/x.exe"), b"x").expect("write");

    let output = assemble(&params(&layout, &layout.output)).expect("assemble");

    let names = entry_names(&output.archive_path);
    assert!(names.iter().all(|n| !n.ends_with(".download")));
    assert!(names.iter().all(|n| !n.contains(".partial")));
    assert_eq!(output.file_count, 4);
}

#[rstest]
fn download_suffixes_inside_extracted_archives_are_kept(layout: Layout) {
    fs::write(layout.workspace.join("external_tools/t1/notes.download"), b"doc")
        .expect("write extracted file");

    let output = assemble(&params(&layout, &layout.output)).expect("assemble");

    let names = entry_names(&output.archive_path);
    assert!(names.contains(&"offline_builder_v1.0/external_tools/t1/notes.download".to_owned()));
    assert_eq!(output.file_count, 5);
}

#[rstest]
fn checksum_sidecar_names_the_archive(layout: Layout) {
    let output = assemble(&params(&layout, &layout.output)).expect("assemble");

    assert_eq!(
        output.checksum_path,
        layout.output.join("offline_builder_v1.0.zip.sha256")
    );
    let sidecar = fs::read_to_string(&output.checksum_path).expect("read sidecar");
    assert_eq!(sidecar, format!("{}  offline_builder_v1.0.zip\n", output.sha256));
    assert_eq!(
        compute_sha256(&output.archive_path).expect("digest"),
        output.sha256
    );
    assert!(!layout.output.join(".offline_builder_v1.0.zip.partial").exists());
}

#[rstest]
fn identical_workspaces_produce_identical_archives(layout: Layout) {
    let other = layout.output.join("second");
    let first = assemble(&params(&layout, &layout.output)).expect("first");
    let second = assemble(&params(&layout, &other)).expect("second");

    assert_eq!(first.sha256, second.sha256);
}

#[rstest]
fn rerun_replaces_previous_archive(layout: Layout) {
    fs::write(layout.output.join("offline_builder_v1.0.zip"), b"stale").expect("write stale");

    let output = assemble(&params(&layout, &layout.output)).expect("assemble");

    assert_eq!(entry_names(&output.archive_path).len(), 10);
}

#[test]
fn missing_workspace_is_reported() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let params = PackageParams {
        workspace_dir: root.join("absent"),
        output_dir: root.clone(),
        version: CorpusVersion::try_from("1.0").expect("valid version"),
    };

    let err = assemble(&params).expect_err("missing workspace");
    assert!(matches!(err, PackagingError::MissingWorkspace { .. }));
}
