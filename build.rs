use std::env;

fn main() {
    // The ESP-IDF link arguments only exist when esp-idf-sys is part of the build,
    // which is the case for the device target alone. Host builds (tests) skip it.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "espidf" {
        embuild::espidf::sysenv::output();
    }

    println!("cargo:rerun-if-changed=sdkconfig.defaults");
}
