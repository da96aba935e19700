use std::io::Write;
use std::path::Path;

use protok_fetch::extract::extract_archives;

fn make_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn extracts_under_archive_stem() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("proto-defs-1.0.jar");
    make_zip(
        &archive,
        &[
            ("com/example/a.proto", b"message A {}".as_slice()),
            ("com/example/deep/b.proto", b"message B {}".as_slice()),
        ],
    );

    let target = tmp.path().join("out");
    let roots = extract_archives(&[archive], &target).unwrap();

    assert_eq!(roots, vec![target.join("proto-defs-1.0")]);
    assert_eq!(
        std::fs::read(roots[0].join("com/example/a.proto")).unwrap(),
        b"message A {}"
    );
    assert!(roots[0].join("com/example/deep/b.proto").is_file());
}

#[test]
fn multiple_archives_keep_input_order() {
    let tmp = tempfile::tempdir().unwrap();
    let first = tmp.path().join("first.zip");
    let second = tmp.path().join("second.zip");
    make_zip(&first, &[("one.proto", b"1")]);
    make_zip(&second, &[("two.proto", b"2")]);

    let target = tmp.path().join("out");
    let roots = extract_archives(&[first, second], &target).unwrap();
    assert_eq!(
        roots,
        vec![target.join("first"), target.join("second")]
    );
}

#[test]
fn unreadable_archive_is_an_extraction_error() {
    let tmp = tempfile::tempdir().unwrap();
    let bogus = tmp.path().join("not-a.zip");
    std::fs::write(&bogus, b"definitely not a zip").unwrap();

    let err = extract_archives(&[bogus], &tmp.path().join("out")).unwrap_err();
    assert!(err.to_string().contains("Extraction failed"));
}
