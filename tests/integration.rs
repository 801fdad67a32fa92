use assert_cmd::Command;
use std::fs::{self, File};
use std::io::prelude::*;
use std::path::{Path, PathBuf};

macro_rules! jackc_test {
    ($name:tt, $code:expr) => {
        #[test]
        fn $name() {
            let path = Path::new("test_data").join(stringify!($name));
            let mut stdout_file =
                File::open(path.join("stdout")).expect("Failed to read stdout file");

            let mut expected_stdout = String::new();
            stdout_file
                .read_to_string(&mut expected_stdout)
                .expect("Failed to read stdout file");

            let mut stderr_file =
                File::open(path.join("stderr")).expect("Failed to read stderr file");
            let mut expected_stderr = String::new();
            stderr_file
                .read_to_string(&mut expected_stderr)
                .expect("Failed to read stderr file");

            Command::cargo_bin(env!("CARGO_PKG_NAME"))
                .unwrap()
                .arg("--stdout")
                .arg(path.join("input.jack").to_str().unwrap())
                .assert()
                .code($code)
                .stdout(expected_stdout)
                .stderr(expected_stderr);
        }
    };

    ($name:tt) => {
        jackc_test!($name, 0);
    };
}

jackc_test!(simple_functions);
jackc_test!(point);
jackc_test!(missing_brace, 1);
jackc_test!(unexpected_character, 1);
jackc_test!(undefined_variable, 1);

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("jackc-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

#[test]
fn emit_trace() {
    let assert = Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .args(&["--emit", "trace", "--stdout", "test_data/simple_functions/input.jack"])
        .assert()
        .code(0);
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.starts_with("(class\n  keyword 'class'\n  identifier 'Main'\n  symbol '{'\n"));
    assert!(stdout.contains("    (parameterList\n      keyword 'int'\n      identifier 'x'\n"));
    assert!(stdout.ends_with("  symbol '}'\n)\n"));
}

#[test]
fn directory_writes_vm_files() {
    let dir = scratch_dir("dir");
    fs::copy("test_data/simple_functions/input.jack", dir.join("Main.jack")).unwrap();
    fs::copy("test_data/point/input.jack", dir.join("Point.jack")).unwrap();
    fs::write(dir.join("notes.txt"), "not a source").unwrap();

    Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .arg(dir.to_str().unwrap())
        .assert()
        .code(0)
        .stdout("");

    let main = fs::read_to_string(dir.join("Main.vm")).unwrap();
    let expected = fs::read_to_string("test_data/simple_functions/stdout").unwrap();
    assert_eq!(main, expected);
    let point = fs::read_to_string(dir.join("Point.vm")).unwrap();
    assert!(point.starts_with("function Point.new 0\n"));
    assert!(!dir.join("notes.vm").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn failing_unit_does_not_block_others() {
    let dir = scratch_dir("mixed");
    fs::copy("test_data/missing_brace/input.jack", dir.join("Broken.jack")).unwrap();
    fs::copy("test_data/simple_functions/input.jack", dir.join("Main.jack")).unwrap();

    let broken = dir.join("Broken.jack");
    Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .arg(dir.to_str().unwrap())
        .assert()
        .code(1)
        .stderr(format!(
            "{}: [line 5] Error at 'function': Expected '}}'\n",
            broken.display()
        ));

    assert!(dir.join("Main.vm").exists());
    assert!(!dir.join("Broken.vm").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn write_failure_does_not_stop_later_units() {
    let dir = scratch_dir("unwritable");
    fs::copy("test_data/simple_functions/input.jack", dir.join("A.jack")).unwrap();
    fs::create_dir(dir.join("A.vm")).unwrap();
    fs::copy("test_data/missing_brace/input.jack", dir.join("B.jack")).unwrap();
    fs::copy("test_data/point/input.jack", dir.join("C.jack")).unwrap();

    let assert = Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .arg(dir.to_str().unwrap())
        .assert()
        .code(1);
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    let a_out = dir.join("A.vm");
    assert!(stderr.contains(&format!("Error: failed to write {}", a_out.display())));
    assert!(stderr.contains(&format!(
        "{}: [line 5] Error at 'function': Expected '}}'",
        dir.join("B.jack").display()
    )));
    assert!(dir.join("C.vm").is_file());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_is_reported() {
    Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .arg("test_data/does_not_exist.jack")
        .assert()
        .code(1);
}
