fn main() {
    println!("cargo:rerun-if-changed=assets/viewer.html");

    // Host builds (tests, fuzzing) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
