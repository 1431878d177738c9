use assert_cmd::Command;
use predicates::prelude::predicate;

#[test]
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn test_hotloop() {
    let mut cmd = Command::cargo_bin("ilprof-tests").unwrap();

    cmd.arg("hotloop");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("ilprof_tests::hot_loop : 10 samples (100%)\n"))
        .stdout(predicate::str::contains(" : 10 samples (100%)\n").count(2));
}

#[test]
fn test_nomatch() {
    let mut cmd = Command::cargo_bin("ilprof-tests").unwrap();

    cmd.arg("nomatch");
    cmd.assert()
        .success()
        .stdout("No CPU samples hit method, cold_path\n");
}
